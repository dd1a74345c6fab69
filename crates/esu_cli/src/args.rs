//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{ArgGroup, Parser, ValueEnum};

use esu_core::config::Settings;
use esu_core::jobs::PlanTarget;
use esu_core::models::{OutputFormat, UpscaleModel, UpscaleParams};

/// Batch upscale image sets with Real-ESRGAN.
///
/// Input trees look like `Root/[Studio/]Model/Set/*.{jpg,jpeg,png}`; the
/// same layout is mirrored under the output root.
#[derive(Parser, Debug)]
#[command(name = "esrgan-sets", version, about, long_about = None)]
#[command(group(ArgGroup::new("root_source").args(["root", "root_preset"])))]
#[command(group(ArgGroup::new("target").args(["path", "files"])))]
pub struct Cli {
    /// Input root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Named root from the [presets] config section (e.g. p1)
    #[arg(long, alias = "root_preset")]
    pub root_preset: Option<String>,

    /// Model directory relative to the root (e.g. Studio/Model)
    #[arg(short = 'P', long, alias = "Path")]
    pub path: Option<PathBuf>,

    /// Individual image files relative to the root
    #[arg(short = 'F', long, alias = "Files", num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Sets to process: 001, 001-010, 225- or * for all
    #[arg(short, long, num_args = 1.., requires = "path")]
    pub sets: Option<Vec<String>>,

    /// Suffix appended to output file names (e.g. V1)
    #[arg(long)]
    pub suffix: Option<String>,

    /// Output image extension (png, jpg, jpeg)
    #[arg(long)]
    pub ext: Option<OutputFormat>,

    /// Upscaling model (see --model-help)
    #[arg(short, long)]
    pub model: Option<UpscaleModel>,

    /// Describe the available models and exit
    #[arg(long)]
    pub model_help: bool,

    /// Enable face enhancement
    #[arg(long, alias = "face_enhance")]
    pub face_enhance: bool,

    /// Tile size in pixels (0 disables tiling)
    #[arg(long)]
    pub tile: Option<u32>,

    /// Padding around each tile in pixels
    #[arg(long, alias = "tile_pad")]
    pub tile_pad: Option<u32>,

    /// Final scale factor
    #[arg(long)]
    pub outscale: Option<f64>,

    /// GPU index
    #[arg(long, alias = "gpu_id")]
    pub gpu_id: Option<u32>,

    /// Output root (default: from config, else <root>_upscaled)
    #[arg(short, long)]
    pub output_root: Option<PathBuf>,

    /// Settings file
    #[arg(long, default_value = ".config/settings.toml")]
    pub config: PathBuf,

    /// What to do when an image fails
    #[arg(long, value_enum, default_value_t = OnError::Prompt)]
    pub on_error: OnError,

    /// Print events as JSON lines instead of text
    #[arg(long)]
    pub json_events: bool,

    /// Store the input root under this preset name before running
    #[arg(long, value_name = "NAME")]
    pub save_preset: Option<String>,

    /// Store the effective upscaling options as the new config defaults
    #[arg(long)]
    pub save_defaults: bool,
}

/// Answer to a failed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    /// Ask on stdin
    Prompt,
    /// Skip the rest of the set and go on
    Continue,
    /// Stop the run
    Abort,
}

impl Cli {
    /// Input root from `--root`, `--root-preset`, or the configured default.
    pub fn resolve_root(&self, settings: &Settings) -> Result<PathBuf> {
        if let Some(ref root) = self.root {
            return Ok(root.clone());
        }
        if let Some(ref name) = self.root_preset {
            return match settings.preset(name) {
                Some(root) => Ok(root),
                None => {
                    let known: Vec<&str> = settings.presets.keys().map(String::as_str).collect();
                    bail!(
                        "Unknown root preset '{}' (configured: {})",
                        name,
                        if known.is_empty() {
                            "none".to_string()
                        } else {
                            known.join(", ")
                        }
                    )
                }
            };
        }
        if !settings.paths.default_root.is_empty() {
            return Ok(PathBuf::from(&settings.paths.default_root));
        }
        bail!("One of --root or --root-preset is required")
    }

    /// What to process: a model directory or a list of files.
    pub fn target(&self) -> Result<PlanTarget> {
        if let Some(ref path) = self.path {
            return Ok(PlanTarget::Directory {
                model_dir: path.clone(),
                sets: self.sets.clone(),
            });
        }
        if !self.files.is_empty() {
            return Ok(PlanTarget::Files(self.files.clone()));
        }
        bail!("One of --path or --files is required")
    }

    /// Configured parameters with command-line overrides applied.
    pub fn merge_params(&self, defaults: &UpscaleParams) -> UpscaleParams {
        let mut params = defaults.clone();
        if let Some(model) = self.model {
            params.model = model;
        }
        if let Some(ext) = self.ext {
            params.ext = ext;
        }
        if let Some(ref suffix) = self.suffix {
            params.suffix = suffix.clone();
        }
        if let Some(tile) = self.tile {
            params.tile = tile;
        }
        if let Some(tile_pad) = self.tile_pad {
            params.tile_pad = tile_pad;
        }
        if let Some(outscale) = self.outscale {
            params.outscale = outscale;
        }
        if let Some(gpu_id) = self.gpu_id {
            params.gpu_id = gpu_id;
        }
        if self.face_enhance {
            params.face_enhance = true;
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("esrgan-sets").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_directory_mode() {
        let cli = parse(&[
            "--root", "/data", "--path", "Studio/Model", "--sets", "001-003", "007", "--model",
            "x2plus", "--ext", "JPG",
        ]);
        assert_eq!(cli.root, Some(PathBuf::from("/data")));
        assert_eq!(
            cli.sets,
            Some(vec!["001-003".to_string(), "007".to_string()])
        );
        assert_eq!(cli.model, Some(UpscaleModel::X2Plus));
        assert_eq!(cli.ext, Some(OutputFormat::Jpg));
        assert_eq!(cli.on_error, OnError::Prompt);
    }

    #[test]
    fn root_and_preset_conflict() {
        let result = Cli::try_parse_from([
            "esrgan-sets",
            "--root",
            "/a",
            "--root-preset",
            "p1",
            "--path",
            "M",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn path_and_files_conflict() {
        let result = Cli::try_parse_from([
            "esrgan-sets",
            "--root",
            "/a",
            "--path",
            "M",
            "--files",
            "M/a.png",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn underscore_aliases_are_accepted() {
        let cli = parse(&["--root_preset", "p1", "--Path", "M", "--tile_pad", "4", "--gpu_id", "1"]);
        assert_eq!(cli.root_preset.as_deref(), Some("p1"));
        assert_eq!(cli.tile_pad, Some(4));
        assert_eq!(cli.gpu_id, Some(1));
    }

    #[test]
    fn preset_resolves_from_settings() {
        let mut settings = Settings::default();
        settings
            .presets
            .insert("p1".to_string(), "/photos".to_string());

        let cli = parse(&["--root-preset", "p1", "--path", "M"]);
        assert_eq!(cli.resolve_root(&settings).unwrap(), PathBuf::from("/photos"));

        let cli = parse(&["--root-preset", "p9", "--path", "M"]);
        assert!(cli.resolve_root(&settings).is_err());

        let cli = parse(&["--path", "M"]);
        assert!(cli.resolve_root(&settings).is_err());
        settings.paths.default_root = "/fallback".to_string();
        assert_eq!(cli.resolve_root(&settings).unwrap(), PathBuf::from("/fallback"));
    }

    #[test]
    fn cli_overrides_config_params() {
        let defaults = UpscaleParams {
            tile: 400,
            ..UpscaleParams::default()
        };
        let cli = parse(&["--root", "/r", "--files", "a.png", "--outscale", "2", "--face-enhance"]);
        let params = cli.merge_params(&defaults);

        assert_eq!(params.tile, 400);
        assert_eq!(params.outscale, 2.0);
        assert!(params.face_enhance);
        assert!(matches!(cli.target().unwrap(), PlanTarget::Files(files) if files.len() == 1));
    }

    #[test]
    fn save_flags_parse() {
        let cli = parse(&[
            "--root", "/r", "--path", "M", "--save-preset", "p2", "--save-defaults",
        ]);
        assert_eq!(cli.save_preset.as_deref(), Some("p2"));
        assert!(cli.save_defaults);
        assert!(!parse(&["--root", "/r", "--path", "M"]).save_defaults);
    }

    #[test]
    fn missing_target_is_an_error() {
        let cli = parse(&["--root", "/r"]);
        assert!(cli.target().is_err());
    }
}
