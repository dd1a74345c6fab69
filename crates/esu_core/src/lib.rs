//! ESU Core - batch upscaling of image sets with an external ESRGAN process.
//!
//! This crate contains all business logic with zero UI dependencies:
//! set selection, work unit discovery, the job orchestrator and the
//! process invoker. It is driven by the `esrgan-sets` CLI.

pub mod config;
pub mod invoker;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod orchestrator;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
