//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::models::UpscaleParams;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Named input roots, selectable instead of an explicit root.
    #[serde(default)]
    pub presets: BTreeMap<String, String>,

    /// How the external upscaler is launched.
    #[serde(default)]
    pub invoker: InvokerSettings,

    /// Default upscaling parameters.
    #[serde(default)]
    pub upscale: UpscaleParams,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LogConfig,
}

impl Settings {
    /// Look up a root preset by name.
    pub fn preset(&self, name: &str) -> Option<PathBuf> {
        self.presets.get(name).map(PathBuf::from)
    }
}

/// Path configuration for input, output, and logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root used when none is given (empty = must be given).
    #[serde(default)]
    pub default_root: String,

    /// Output root (empty = `<root>_upscaled` next to the input root).
    #[serde(default)]
    pub output_root: String,

    /// Folder for run logs.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            default_root: String::new(),
            output_root: String::new(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// External upscaler launch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokerSettings {
    /// Interpreter or executable to run.
    #[serde(default = "default_program")]
    pub program: String,

    /// Inference script passed as the first argument (empty = none).
    #[serde(default = "default_script")]
    pub script: String,
}

fn default_program() -> String {
    "python".to_string()
}

fn default_script() -> String {
    "inference_realesrgan.py".to_string()
}

impl Default for InvokerSettings {
    fn default() -> Self {
        Self {
            program: default_program(),
            script: default_script(),
        }
    }
}

impl InvokerSettings {
    /// Script path, if one is configured.
    pub fn script_path(&self) -> Option<PathBuf> {
        if self.script.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.script))
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Presets,
    Invoker,
    Upscale,
    Logging,
}

impl ConfigSection {
    /// Every section, in file order.
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Paths,
        ConfigSection::Presets,
        ConfigSection::Invoker,
        ConfigSection::Upscale,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Presets => "presets",
            ConfigSection::Invoker => "invoker",
            ConfigSection::Upscale => "upscale",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section in a generated file.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Input, output and log directories",
            ConfigSection::Presets => "Named input roots (name = \"/path/to/root\")",
            ConfigSection::Invoker => "External upscaler command",
            ConfigSection::Upscale => "Default upscaling parameters",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpscaleModel;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[invoker]"));
        assert!(toml.contains("[upscale]"));
        assert!(toml.contains("program = \"python\""));
    }

    #[test]
    fn settings_round_trip() {
        let mut settings = Settings::default();
        settings
            .presets
            .insert("p1".to_string(), "/data/photos".to_string());
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[upscale]\nmodel = \"x4plus\"\n[presets]\np1 = \"/data\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.upscale.model, UpscaleModel::X4Plus);
        assert_eq!(parsed.upscale.tile, 800);
        assert_eq!(parsed.invoker.program, "python");
        assert_eq!(parsed.paths.logs_folder, ".logs");
        assert!(parsed.logging.compact);
        assert_eq!(parsed.preset("p1"), Some(PathBuf::from("/data")));
        assert_eq!(parsed.preset("p2"), None);
    }
}
