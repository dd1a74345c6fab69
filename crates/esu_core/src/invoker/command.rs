//! Argument building for the external upscaler.

use std::ffi::OsString;
use std::path::Path;

use crate::models::UpscaleParams;

/// One image to transform.
#[derive(Debug, Clone, Copy)]
pub struct InvocationRequest<'a> {
    pub image: &'a Path,
    pub output_dir: &'a Path,
    pub params: &'a UpscaleParams,
}

impl<'a> InvocationRequest<'a> {
    pub fn new(image: &'a Path, output_dir: &'a Path, params: &'a UpscaleParams) -> Self {
        Self {
            image,
            output_dir,
            params,
        }
    }

    /// File name of the image, for progress and log output.
    pub fn image_name(&self) -> String {
        self.image
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.image.display().to_string())
    }
}

/// Build the arguments following the program (and script, if any).
///
/// Suffix and face enhancement are only passed when set.
pub fn build_args(request: &InvocationRequest<'_>) -> Vec<OsString> {
    let params = request.params;
    let mut args: Vec<OsString> = vec![
        "-n".into(),
        params.model.model_name().into(),
        "-i".into(),
        request.image.as_os_str().to_owned(),
        "-o".into(),
        request.output_dir.as_os_str().to_owned(),
        "--outscale".into(),
        params.outscale_arg().into(),
        "--gpu-id".into(),
        params.gpu_id.to_string().into(),
        "--ext".into(),
        params.ext.extension().into(),
        "--tile".into(),
        params.tile.to_string().into(),
        "--tile_pad".into(),
        params.tile_pad.to_string().into(),
    ];

    if let Some(suffix) = params.suffix() {
        args.push("--suffix".into());
        args.push(suffix.into());
    }
    if params.face_enhance {
        args.push("--face_enhance".into());
    }

    args
}

/// Render a full command line for logging.
pub fn format_command(program: &str, script: Option<&Path>, args: &[OsString]) -> String {
    let mut parts = vec![program.to_string()];
    if let Some(script) = script {
        parts.push(script.display().to_string());
    }
    parts.extend(args.iter().map(|a| {
        let s = a.to_string_lossy();
        if s.contains(' ') {
            format!("\"{}\"", s)
        } else {
            s.to_string()
        }
    }));
    parts.join(" ")
}
