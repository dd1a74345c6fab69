//! Configuration management for ESRGAN Set Upscaler.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates for presets and upscale defaults
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use esu_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create()?;
//!
//! println!("Upscaler: {}", config.settings().invoker.program);
//! config.save_preset("p1", Path::new("/data/photos"))?;
//! # Ok::<(), esu_core::config::ConfigError>(())
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{ConfigSection, InvokerSettings, PathSettings, Settings};
