//! Core types for the orchestrator: phases, events and the run summary.

use std::path::PathBuf;

use serde::Serialize;

/// Observable state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Not started yet.
    Idle,
    Running,
    /// Blocked at the pause barrier.
    Paused,
    /// Every unit was processed (or the plan was empty).
    Finished,
    /// Cancellation was observed before completion.
    Cancelled,
    /// An internal error ended the run.
    Failed,
}

impl RunPhase {
    /// True for phases a run never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Finished | RunPhase::Cancelled | RunPhase::Failed
        )
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Paused => "paused",
            RunPhase::Finished => "finished",
            RunPhase::Cancelled => "cancelled",
            RunPhase::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot published right before an image is handed to the invoker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// 1-based index of the image within its unit.
    pub image_index: usize,
    pub images_in_unit: usize,
    /// Unit identifier (set directory name).
    pub unit: String,
    /// 1-based index of the unit within the plan.
    pub unit_index: usize,
    pub image_name: String,
    pub completed_units: usize,
    pub total_units: usize,
}

/// Events emitted by a run, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Started {
        total_units: usize,
        total_images: usize,
    },
    UnitStarted {
        unit: String,
        /// Unit directory relative to the input root.
        path: PathBuf,
        unit_index: usize,
        total_units: usize,
        images: usize,
    },
    /// One per image, in dispatch order.
    Dispatch(ProgressSnapshot),
    ImageCompleted {
        unit: String,
        image_name: String,
    },
    UnitCompleted {
        unit: String,
        completed_units: usize,
        total_units: usize,
    },
    /// The rest of a unit was skipped after a failure was acknowledged.
    UnitAbandoned {
        unit: String,
        remaining_images: usize,
    },
    Paused,
    Resumed,
    /// An image failed. The run is paused until the caller continues or aborts.
    RecoverableError {
        unit: String,
        image_name: String,
        exit_code: Option<i32>,
        diagnostic: String,
    },
    /// The run ended on an internal error; no decision is expected.
    Fatal {
        message: String,
    },
    Finished {
        completed_units: usize,
        total_units: usize,
        failed_images: usize,
    },
    Cancelled {
        completed_units: usize,
        total_units: usize,
    },
}

impl RunEvent {
    /// True for the last event of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunEvent::Finished { .. } | RunEvent::Cancelled { .. } | RunEvent::Fatal { .. }
        )
    }
}

/// Callback receiving every run event, on the run's own thread.
///
/// Must not block for long: the run waits for it to return.
pub type EventCallback = Box<dyn Fn(RunEvent) + Send + Sync>;

/// One image that failed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFailure {
    pub unit: String,
    pub image: PathBuf,
    pub exit_code: Option<i32>,
    pub diagnostic: String,
}

/// What a run did, returned by `Orchestrator::wait`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Terminal phase.
    pub phase: RunPhase,
    pub completed_units: usize,
    pub total_units: usize,
    pub images_dispatched: usize,
    pub images_succeeded: usize,
    pub failures: Vec<ImageFailure>,
    /// Units whose remaining images were skipped after a failure.
    pub abandoned_units: Vec<String>,
    /// Message of the internal error that ended a `Failed` run.
    pub error: Option<String>,
}

impl RunSummary {
    pub(crate) fn new(total_units: usize) -> Self {
        Self {
            phase: RunPhase::Running,
            completed_units: 0,
            total_units,
            images_dispatched: 0,
            images_succeeded: 0,
            failures: Vec::new(),
            abandoned_units: Vec::new(),
            error: None,
        }
    }

    /// Finished with every dispatched image succeeding.
    pub fn is_clean(&self) -> bool {
        self.phase == RunPhase::Finished && self.failures.is_empty()
    }
}
