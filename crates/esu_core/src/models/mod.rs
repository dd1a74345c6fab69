//! Data models for ESRGAN Set Upscaler.
//!
//! This module contains the core data structures shared by discovery and
//! orchestration:
//! - Enums for upscaling models and output formats
//! - Global invocation parameters
//! - Work units and job plans

mod enums;
mod jobs;
mod params;

pub use enums::{OutputFormat, UpscaleModel};
pub use jobs::{JobPlan, TreeLocation, WorkUnit};
pub use params::UpscaleParams;
