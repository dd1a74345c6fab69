//! Core enums used throughout the application.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Upscaling model understood by the inference script.
///
/// The short names (`x4v3`, `x4plus`, ...) are what users type and what the
/// config file stores; `model_name()` is the identifier passed to the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpscaleModel {
    /// General purpose, small and fast.
    #[default]
    #[serde(rename = "x4v3")]
    X4v3,
    /// Larger 4x GAN model.
    #[serde(rename = "x4plus")]
    X4Plus,
    /// 4x model trained without the GAN loss.
    #[serde(rename = "net_x4plus")]
    NetX4Plus,
    /// 2x GAN model.
    #[serde(rename = "x2plus")]
    X2Plus,
    /// Anime / line art model.
    #[serde(rename = "x4plus_anime_6B")]
    X4PlusAnime6B,
}

impl UpscaleModel {
    /// Every model, in menu order.
    pub const ALL: [UpscaleModel; 5] = [
        UpscaleModel::X4v3,
        UpscaleModel::X4Plus,
        UpscaleModel::NetX4Plus,
        UpscaleModel::X2Plus,
        UpscaleModel::X4PlusAnime6B,
    ];

    /// Short name used on the command line and in config.
    pub fn short_name(&self) -> &'static str {
        match self {
            UpscaleModel::X4v3 => "x4v3",
            UpscaleModel::X4Plus => "x4plus",
            UpscaleModel::NetX4Plus => "net_x4plus",
            UpscaleModel::X2Plus => "x2plus",
            UpscaleModel::X4PlusAnime6B => "x4plus_anime_6B",
        }
    }

    /// Model identifier passed to the inference script with `-n`.
    pub fn model_name(&self) -> &'static str {
        match self {
            UpscaleModel::X4v3 => "realesr-general-x4v3",
            UpscaleModel::X4Plus => "RealESRGAN_x4plus",
            UpscaleModel::NetX4Plus => "RealESRNet_x4plus",
            UpscaleModel::X2Plus => "RealESRGAN_x2plus",
            UpscaleModel::X4PlusAnime6B => "RealESRGAN_x4plus_anime_6B",
        }
    }

    /// Human readable guidance for picking a model.
    pub fn description(&self) -> &'static str {
        match self {
            UpscaleModel::X4v3 => {
                "Small and fast. Handles fine detail and natural textures well; \
                 the default when speed and quality both matter."
            }
            UpscaleModel::X4Plus => {
                "Larger model with stronger detail recovery on natural textures. \
                 Noticeably slower than x4v3."
            }
            UpscaleModel::NetX4Plus => {
                "Less aggressive sharpening, stays closer to the original. \
                 Try it when output looks over-processed or plastic."
            }
            UpscaleModel::X2Plus => {
                "2x model. Gentler enhancement with a lower risk of artifacts."
            }
            UpscaleModel::X4PlusAnime6B => {
                "Tuned for line art and flat colors. Use for images with strong \
                 edges or stylized elements."
            }
        }
    }
}

impl std::fmt::Display for UpscaleModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for UpscaleModel {
    type Err = String;

    /// Accepts either the short name or the full model identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UpscaleModel::ALL
            .into_iter()
            .find(|m| m.short_name() == s || m.model_name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = UpscaleModel::ALL.iter().map(|m| m.short_name()).collect();
                format!("Unknown model '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Output image format written by the inference script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpg,
    Jpeg,
}

impl OutputFormat {
    /// Extension passed with `--ext`.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpg => "jpg",
            OutputFormat::Jpeg => "jpeg",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" => Ok(OutputFormat::Jpg),
            "jpeg" => Ok(OutputFormat::Jpeg),
            other => Err(format!(
                "Unsupported output format '{}' (expected png, jpg or jpeg)",
                other
            )),
        }
    }
}
