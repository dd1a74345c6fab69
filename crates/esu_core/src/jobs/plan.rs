//! Plan building.
//!
//! Turns a request from a front end into an immutable [`JobPlan`]. Every
//! configuration error is raised here, before an orchestrator ever starts.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::discovery::{discover_file_units, discover_work_units, DiscoveryError};
use super::selector::{resolve_sets, SetSelector};
use crate::models::{JobPlan, UpscaleParams};

/// What part of the tree to process.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanTarget {
    /// A model directory, optionally narrowed to a set selection.
    ///
    /// `sets: None` means flat mode (images directly in the model directory).
    Directory {
        model_dir: PathBuf,
        sets: Option<Vec<String>>,
    },
    /// Individual image files relative to the root.
    Files(Vec<PathBuf>),
}

/// Inputs for [`build_plan`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub root: PathBuf,
    pub target: PlanTarget,
    pub output_root: PathBuf,
    pub params: UpscaleParams,
}

/// Configuration errors reported before any processing starts.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Root directory {0} does not exist")]
    InvalidRoot(PathBuf),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Set specifiers were given but none of them selected anything.
    #[error("No valid sets in: {}", specifiers.join(" "))]
    NoSetsSelected { specifiers: Vec<String> },

    #[error("No eligible images found under {0}")]
    NoEligibleImages(PathBuf),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
}

/// Result type for plan building.
pub type PlanResult<T> = Result<T, PlanError>;

/// Resolve a request into a plan.
///
/// Fails if the root is missing, the parameters are invalid, set
/// specifiers resolve to nothing, or no eligible image is found.
pub fn build_plan(request: &PlanRequest) -> PlanResult<JobPlan> {
    if !request.root.is_dir() {
        return Err(PlanError::InvalidRoot(request.root.clone()));
    }
    request.params.validate().map_err(PlanError::InvalidParams)?;

    let (units, searched) = match &request.target {
        PlanTarget::Directory { model_dir, sets } => {
            let selector = match sets {
                None => SetSelector::none(),
                Some(specifiers) => {
                    let selection = resolve_sets(specifiers);
                    if selection.selector.is_empty() {
                        return Err(PlanError::NoSetsSelected {
                            specifiers: specifiers.clone(),
                        });
                    }
                    selection.selector
                }
            };
            tracing::debug!("Set selection: {}", selector);

            let units = discover_work_units(
                &request.root,
                model_dir,
                &selector,
                &request.output_root,
            )?;
            (units, request.root.join(model_dir))
        }
        PlanTarget::Files(files) => {
            let units = discover_file_units(&request.root, files, &request.output_root)?;
            (units, request.root.clone())
        }
    };

    if units.is_empty() {
        return Err(PlanError::NoEligibleImages(searched));
    }

    let plan = JobPlan::new(units, request.params.clone());
    tracing::info!(
        "Plan ready: {} unit(s), {} image(s), output under {}",
        plan.units().len(),
        plan.total_images(),
        request.output_root.display()
    );
    Ok(plan)
}

/// Default output root: a sibling of the input root named `<root>_upscaled`.
///
/// The root is resolved first so `.` and `..` name a real directory.
pub fn default_output_root(root: &Path) -> PathBuf {
    let resolved = fs::canonicalize(root)
        .or_else(|_| std::path::absolute(root))
        .unwrap_or_else(|_| root.to_path_buf());
    match resolved.file_name() {
        Some(name) => resolved.with_file_name(format!("{}_upscaled", name.to_string_lossy())),
        // Filesystem root: nowhere to put a sibling.
        None => resolved.join("output_upscaled"),
    }
}
