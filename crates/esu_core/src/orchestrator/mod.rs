//! Job orchestrator.
//!
//! Walks a [`JobPlan`](crate::models::JobPlan) one image at a time on a
//! dedicated thread, with cooperative pause, resume and cancel.
//!
//! # Architecture
//!
//! ```text
//! caller ── ControlHandle ──► RunControl (Mutex + Condvar)
//!                                   │
//! Orchestrator ── run thread ── barrier ─► Invoker::invoke (one in flight)
//!        ▲                                       │
//!        └────────────── RunEvent callback ◄─────┘
//! ```
//!
//! A failed image pauses the run and emits `RecoverableError`; the caller
//! answers with `continue_after_error` or `abort_after_error`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use esu_core::invoker::ProcessInvoker;
//! use esu_core::orchestrator::{Orchestrator, RunEvent};
//!
//! let invoker = Arc::new(ProcessInvoker::new("python", Some("inference_realesrgan.py".into())));
//! let mut orchestrator = Orchestrator::new(invoker)
//!     .with_event_callback(Box::new(|event| println!("{:?}", event)));
//!
//! orchestrator.start(plan)?;
//! let summary = orchestrator.wait()?;
//! println!("{} of {} sets done", summary.completed_units, summary.total_units);
//! ```

mod control;
mod errors;
mod runner;
mod types;

pub use control::ControlHandle;
pub use errors::{OrchestratorError, OrchestratorResult};
pub use runner::Orchestrator;
pub use types::{EventCallback, ImageFailure, ProgressSnapshot, RunEvent, RunPhase, RunSummary};
