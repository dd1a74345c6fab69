//! Job resolution.
//!
//! This module provides:
//! - `selector`: set specifier parsing (`001`, `001-010`, `225-`, `*`)
//! - `discovery`: work unit discovery from the input tree
//! - `plan`: request validation and `JobPlan` construction

mod discovery;
mod plan;
mod selector;

pub use discovery::{
    discover_file_units, discover_work_units, has_image_extension, list_images, DiscoveryError,
    DiscoveryResult, IMAGE_EXTENSIONS,
};
pub use plan::{build_plan, default_output_root, PlanError, PlanRequest, PlanResult, PlanTarget};
pub use selector::{format_set_id, resolve_sets, SetSelection, SetSelector, MAX_SET_NUMBER};
