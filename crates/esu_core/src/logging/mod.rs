//! Logging infrastructure for ESRGAN Set Upscaler.
//!
//! This module provides:
//! - Per-run loggers with file + callback dual output
//! - Compact mode keeping external process output in a tail buffer
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use esu_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new(
//!     RunLogger::timestamped_name("run"),
//!     "/path/to/logs",
//!     LogConfig::default(),
//!     None,
//! ).unwrap();
//!
//! logger.unit("Model / set 001");
//! logger.command("python inference_realesrgan.py -n realesr-general-x4v3 ...");
//! logger.success("Set 001 done");
//! ```

mod run_logger;
mod types;

pub use run_logger::RunLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber: stderr plus a file layer in
/// `log_dir`.
///
/// RUST_LOG overrides `default_level`. The returned guard flushes the file
/// writer on drop; keep it alive for the lifetime of the application.
/// Should be called once at application startup.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    log_dir: &Path,
) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "esrgan-sets.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .with(default_filter(default_level))
        .try_init();

    Ok(guard)
}

fn default_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()))
}
