//! Settings file handling.
//!
//! The whole file is only written when it is created or when loading had to
//! normalize it. Saving a preset or new upscale defaults rewrites that one
//! table through `toml_edit`, so hand-written comments elsewhere survive.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table};

use super::settings::{ConfigSection, Settings};
use crate::models::UpscaleParams;

const FILE_HEADER: &str = "# ESRGAN Set Upscaler settings\n\
# Generated on first run. Edit freely; unknown sections are dropped on load.\n";

/// Errors from reading or writing the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Malformed TOML in {path}: {source}")]
    Syntax {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    #[error("Cannot serialize [{section}]: {source}")]
    Serialize {
        section: &'static str,
        #[source]
        source: toml::ser::Error,
    },

    /// Preset names become TOML keys and CLI values.
    #[error("Invalid preset name '{0}' (use letters, digits, '-' or '_')")]
    InvalidPresetName(String),

    #[error("Refusing to save upscale defaults: {0}")]
    InvalidParams(String),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings file and its in-memory [`Settings`].
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Manager for the file at `config_path`. Nothing is read until
    /// [`load_or_create`](Self::load_or_create).
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Read the settings file, writing a commented default file if there is
    /// none. A file with unknown sections or missing keys is rewritten in
    /// normalized form.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            tracing::info!("Creating settings file {}", self.config_path.display());
            self.settings = Settings::default();
            return self.write_full();
        }

        let content = fs::read_to_string(&self.config_path).map_err(|e| self.io_error(e))?;
        let (settings, needs_rewrite) = self.read_settings(&content)?;
        self.settings = settings;
        if needs_rewrite {
            tracing::debug!("Normalizing settings file {}", self.config_path.display());
            self.write_full()?;
        }
        Ok(())
    }

    /// Create the logs folder if it is missing.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let logs = self.logs_folder();
        fs::create_dir_all(&logs).map_err(|source| ConfigError::Io { path: logs, source })
    }

    /// Folder for run logs, as configured.
    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Store `root` under `name` in `[presets]`, replacing an existing entry.
    pub fn save_preset(&mut self, name: &str, root: &Path) -> ConfigResult<()> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ConfigError::InvalidPresetName(name.to_string()));
        }

        self.settings
            .presets
            .insert(name.to_string(), root.to_string_lossy().into_owned());
        self.write_section(ConfigSection::Presets)?;
        tracing::info!("Saved preset {} = {}", name, root.display());
        Ok(())
    }

    /// Make `params` the `[upscale]` defaults for later runs.
    pub fn save_upscale_defaults(&mut self, params: &UpscaleParams) -> ConfigResult<()> {
        params.validate().map_err(ConfigError::InvalidParams)?;
        self.settings.upscale = params.clone();
        self.write_section(ConfigSection::Upscale)?;
        tracing::info!("Saved upscale defaults ({})", params.model);
        Ok(())
    }

    /// Deserialize `content`, reporting whether the file should be rewritten.
    fn read_settings(&self, content: &str) -> ConfigResult<(Settings, bool)> {
        let doc: DocumentMut = content.parse().map_err(|source| ConfigError::Syntax {
            path: self.config_path.clone(),
            source,
        })?;
        let settings: Settings = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })?;

        let unknown = unknown_sections(&doc);
        if !unknown.is_empty() {
            tracing::warn!("Dropping unknown settings sections: {}", unknown.join(", "));
        }

        // Serde defaults filled something in that the file lacks.
        let normalized = toml::Value::try_from(&settings)
            .map_err(|source| ConfigError::Serialize {
                section: "settings",
                source,
            })?;
        let on_disk: toml::Table = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })?;
        let incomplete = normalized != toml::Value::Table(on_disk);

        Ok((settings, !unknown.is_empty() || incomplete))
    }

    /// Replace one table of the on-disk file with the in-memory section.
    fn write_section(&self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path).map_err(|e| self.io_error(e))?;
            content
                .parse::<DocumentMut>()
                .map_err(|source| ConfigError::Syntax {
                    path: self.config_path.clone(),
                    source,
                })?
        } else {
            DocumentMut::new()
        };

        let mut table = self.section_table(section)?;
        let name = section.table_name();
        match doc.get(name).and_then(Item::as_table) {
            Some(existing) => *table.decor_mut() = existing.decor().clone(),
            None => table
                .decor_mut()
                .set_prefix(format!("\n# {}\n", section.description())),
        }
        doc[name] = Item::Table(table);

        self.replace_file(&doc.to_string())
    }

    fn section_body(&self, section: ConfigSection) -> ConfigResult<String> {
        let settings = &self.settings;
        let body = match section {
            ConfigSection::Paths => toml::to_string_pretty(&settings.paths),
            ConfigSection::Presets => toml::to_string_pretty(&settings.presets),
            ConfigSection::Invoker => toml::to_string_pretty(&settings.invoker),
            ConfigSection::Upscale => toml::to_string_pretty(&settings.upscale),
            ConfigSection::Logging => toml::to_string_pretty(&settings.logging),
        };
        body.map_err(|source| ConfigError::Serialize {
            section: section.table_name(),
            source,
        })
    }

    fn section_table(&self, section: ConfigSection) -> ConfigResult<Table> {
        let body = self.section_body(section)?;
        let doc: DocumentMut = body.parse().map_err(|source| ConfigError::Syntax {
            path: self.config_path.clone(),
            source,
        })?;
        Ok(doc.as_table().clone())
    }

    /// Write every section, each preceded by its description.
    fn write_full(&self) -> ConfigResult<()> {
        let mut content = String::from(FILE_HEADER);
        for section in ConfigSection::ALL {
            content.push_str(&format!(
                "\n# {}\n[{}]\n",
                section.description(),
                section.table_name()
            ));
            content.push_str(&self.section_body(section)?);
        }
        self.replace_file(&content)
    }

    /// Write through a sibling temp file and rename it over the target.
    fn replace_file(&self, content: &str) -> ConfigResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let staging = self.config_path.with_extension("toml.tmp");
        let written = fs::File::create(&staging).and_then(|mut file| {
            file.write_all(content.as_bytes())?;
            file.sync_all()
        });
        if let Err(source) = written {
            let _ = fs::remove_file(&staging);
            return Err(ConfigError::Io {
                path: staging,
                source,
            });
        }

        fs::rename(&staging, &self.config_path).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.config_path.clone(),
            source,
        }
    }
}

/// Top-level tables that no [`ConfigSection`] claims.
fn unknown_sections(doc: &DocumentMut) -> Vec<String> {
    doc.iter()
        .map(|(key, _)| key)
        .filter(|key| !ConfigSection::ALL.iter().any(|s| s.table_name() == *key))
        .map(str::to_string)
        .collect()
}
