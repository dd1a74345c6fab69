//! Error types for the orchestrator.
//!
//! These cover misuse of the control surface and the execution context
//! itself. Failures inside a run are reported as events, never as errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from starting or joining a run.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// `start` was called a second time.
    #[error("Orchestrator was already started")]
    AlreadyStarted,

    /// `wait` was called before `start` (or twice).
    #[error("Orchestrator has no run to wait for")]
    NotStarted,

    /// The execution thread could not be created.
    #[error("Failed to spawn run thread: {0}")]
    SpawnFailed(#[source] io::Error),

    /// The execution thread panicked.
    #[error("Run thread panicked")]
    WorkerPanicked,

    /// Creating a unit's output directory failed.
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OrchestratorError {
    /// Create an output directory error.
    pub fn output_dir(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::OutputDir {
            path: path.into(),
            source,
        }
    }
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
