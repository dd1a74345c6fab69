//! Transformation invoker.
//!
//! Runs the external upscaler once per image and classifies the outcome.
//! The [`Invoker`] trait is the seam the orchestrator depends on, so runs
//! can be driven by [`ProcessInvoker`] or by an in-memory fake.

mod command;
mod outcome;
mod process;

pub use command::{build_args, format_command, InvocationRequest};
pub use outcome::{classify, InvocationResult, FAILURE_MARKERS};
pub use process::ProcessInvoker;

/// Runs one transformation at a time.
pub trait Invoker: Send + Sync {
    /// Transform one image. Blocks until the process exits or is terminated.
    fn invoke(&self, request: &InvocationRequest<'_>) -> InvocationResult;

    /// Request termination of the in-flight invocation, if any.
    ///
    /// Called from a different thread than [`Invoker::invoke`]. The
    /// interrupted invocation must report [`InvocationResult::Cancelled`].
    fn terminate(&self);
}
