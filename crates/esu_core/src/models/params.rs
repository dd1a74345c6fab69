//! Global parameters shared by every invocation in a run.

use serde::{Deserialize, Serialize};

use super::enums::{OutputFormat, UpscaleModel};

/// Parameters passed unchanged to every external invocation of a run.
///
/// Also used as the `[upscale]` section of the settings file, so every
/// field falls back to its default when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpscaleParams {
    /// Model to run.
    #[serde(default)]
    pub model: UpscaleModel,

    /// Final scale factor applied to the output image.
    #[serde(default = "default_outscale")]
    pub outscale: f64,

    /// Tile size in pixels (0 disables tiling).
    #[serde(default = "default_tile")]
    pub tile: u32,

    /// Padding around each tile in pixels.
    #[serde(default = "default_tile_pad")]
    pub tile_pad: u32,

    /// GPU index.
    #[serde(default)]
    pub gpu_id: u32,

    /// Output image format.
    #[serde(default)]
    pub ext: OutputFormat,

    /// Run face enhancement after upscaling.
    #[serde(default)]
    pub face_enhance: bool,

    /// Suffix appended to output file names (empty = none).
    #[serde(default)]
    pub suffix: String,
}

fn default_outscale() -> f64 {
    1.0
}

fn default_tile() -> u32 {
    800
}

fn default_tile_pad() -> u32 {
    10
}

impl Default for UpscaleParams {
    fn default() -> Self {
        Self {
            model: UpscaleModel::default(),
            outscale: default_outscale(),
            tile: default_tile(),
            tile_pad: default_tile_pad(),
            gpu_id: 0,
            ext: OutputFormat::default(),
            face_enhance: false,
            suffix: String::new(),
        }
    }
}

impl UpscaleParams {
    /// Check values that would make every invocation fail.
    pub fn validate(&self) -> Result<(), String> {
        if !self.outscale.is_finite() || self.outscale <= 0.0 {
            return Err(format!(
                "outscale must be a positive number, got {}",
                self.outscale
            ));
        }
        Ok(())
    }

    /// Scale factor as passed on the command line.
    ///
    /// Whole numbers keep one decimal place ("1.0", not "1").
    pub fn outscale_arg(&self) -> String {
        if self.outscale.fract() == 0.0 {
            format!("{:.1}", self.outscale)
        } else {
            self.outscale.to_string()
        }
    }

    /// Suffix, if one is set.
    pub fn suffix(&self) -> Option<&str> {
        if self.suffix.is_empty() {
            None
        } else {
            Some(&self.suffix)
        }
    }
}
