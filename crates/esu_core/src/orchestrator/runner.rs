//! Orchestrator runner that walks a plan on its own thread.

use std::fs;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::control::{BarrierOutcome, ControlHandle, RunControl};
use super::errors::{OrchestratorError, OrchestratorResult};
use super::types::{EventCallback, ImageFailure, ProgressSnapshot, RunEvent, RunPhase, RunSummary};
use crate::invoker::{InvocationRequest, InvocationResult, Invoker};
use crate::logging::RunLogger;
use crate::models::{JobPlan, WorkUnit};

/// Runs a [`JobPlan`] image by image against an [`Invoker`].
///
/// The run happens on a dedicated thread. Callers steer it through
/// [`ControlHandle`]s and observe it through the event callback.
pub struct Orchestrator {
    invoker: Arc<dyn Invoker>,
    control: Arc<RunControl>,
    callback: Option<EventCallback>,
    logger: Option<Arc<RunLogger>>,
    started: bool,
    worker: Option<JoinHandle<RunSummary>>,
}

impl Orchestrator {
    /// Create an orchestrator that dispatches through `invoker`.
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self {
            invoker,
            control: Arc::new(RunControl::new()),
            callback: None,
            logger: None,
            started: false,
            worker: None,
        }
    }

    /// Set the event callback.
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Attach a run logger.
    pub fn with_logger(mut self, logger: Arc<RunLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Get a control handle usable from any thread.
    pub fn control_handle(&self) -> ControlHandle {
        ControlHandle::new(Arc::clone(&self.control), Arc::clone(&self.invoker))
    }

    /// Current phase of the run.
    pub fn phase(&self) -> RunPhase {
        self.control.phase()
    }

    /// Start processing `plan` on a new thread.
    ///
    /// May be called once per orchestrator.
    pub fn start(&mut self, plan: JobPlan) -> OrchestratorResult<()> {
        if self.started {
            return Err(OrchestratorError::AlreadyStarted);
        }
        self.started = true;

        let run = Run {
            invoker: Arc::clone(&self.invoker),
            control: Arc::clone(&self.control),
            callback: self.callback.take(),
            logger: self.logger.clone(),
        };

        self.control.set_phase(RunPhase::Running);
        let handle = thread::Builder::new()
            .name("esu-run".to_string())
            .spawn(move || run.execute(&plan))
            .map_err(|e| {
                self.control.set_phase(RunPhase::Failed);
                OrchestratorError::SpawnFailed(e)
            })?;

        self.worker = Some(handle);
        Ok(())
    }

    /// Pause before the next dispatch.
    pub fn pause(&self) {
        self.control_handle().pause();
    }

    /// Resume a paused run.
    pub fn resume(&self) {
        self.control_handle().resume();
    }

    /// Cancel the run and terminate the in-flight process.
    pub fn cancel(&self) {
        self.control_handle().cancel();
    }

    /// Wait for the run thread to finish and return its summary.
    pub fn wait(&mut self) -> OrchestratorResult<RunSummary> {
        let handle = self.worker.take().ok_or(OrchestratorError::NotStarted)?;
        handle.join().map_err(|_| {
            self.control.set_phase(RunPhase::Failed);
            OrchestratorError::WorkerPanicked
        })
    }
}

/// Everything the run thread owns.
struct Run {
    invoker: Arc<dyn Invoker>,
    control: Arc<RunControl>,
    callback: Option<EventCallback>,
    logger: Option<Arc<RunLogger>>,
}

/// How a unit ended.
enum UnitEnd {
    /// Every image was dispatched.
    Done,
    /// A failure was acknowledged and the rest of the unit skipped.
    Abandoned { remaining: usize },
    Cancelled,
    Fatal(OrchestratorError),
}

impl Run {
    fn emit(&self, event: RunEvent) {
        tracing::trace!("Event: {:?}", event);
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }

    fn log(&self, f: impl FnOnce(&RunLogger)) {
        if let Some(ref logger) = self.logger {
            f(logger);
        }
    }

    /// Block at the pause barrier, emitting pause/resume events.
    fn barrier(&self) -> BarrierOutcome {
        let outcome = self.control.wait_at_barrier(|| {
            tracing::info!("Run paused");
            self.emit(RunEvent::Paused);
        });
        if outcome == BarrierOutcome::Resumed {
            tracing::info!("Run resumed");
            self.emit(RunEvent::Resumed);
        }
        outcome
    }

    fn execute(&self, plan: &JobPlan) -> RunSummary {
        let total_units = plan.units().len();
        let mut summary = RunSummary::new(total_units);

        tracing::info!(
            "Run started: {} unit(s), {} image(s)",
            total_units,
            plan.total_images()
        );
        self.log(|l| l.log_json("Parameters", plan.params()));
        self.emit(RunEvent::Started {
            total_units,
            total_images: plan.total_images(),
        });

        let mut fatal = None;

        for (index, unit) in plan.units().iter().enumerate() {
            if self.control.is_cancelled() {
                break;
            }

            match self.process_unit(plan, unit, index, &mut summary) {
                UnitEnd::Done => {
                    if self.control.is_cancelled() {
                        break;
                    }
                    summary.completed_units += 1;
                    self.log(|l| l.success(&format!("Set {} done", unit.id())));
                    self.emit(RunEvent::UnitCompleted {
                        unit: unit.id(),
                        completed_units: summary.completed_units,
                        total_units,
                    });
                }
                UnitEnd::Abandoned { remaining } => {
                    tracing::warn!(
                        "Skipping {} remaining image(s) of {}",
                        remaining,
                        unit.id()
                    );
                    summary.abandoned_units.push(unit.id());
                    self.emit(RunEvent::UnitAbandoned {
                        unit: unit.id(),
                        remaining_images: remaining,
                    });
                }
                UnitEnd::Cancelled => break,
                UnitEnd::Fatal(e) => {
                    fatal = Some(e);
                    break;
                }
            }
        }

        self.finish(summary, fatal)
    }

    fn process_unit(
        &self,
        plan: &JobPlan,
        unit: &WorkUnit,
        index: usize,
        summary: &mut RunSummary,
    ) -> UnitEnd {
        let unit_id = unit.id();
        let images_in_unit = unit.image_count();

        let label = unit
            .location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| unit.relative_dir().display().to_string());
        tracing::info!("Processing {} ({} image(s))", label, images_in_unit);
        self.log(|l| l.unit(&label));
        self.emit(RunEvent::UnitStarted {
            unit: unit_id.clone(),
            path: unit.relative_dir().to_path_buf(),
            unit_index: index + 1,
            total_units: summary.total_units,
            images: images_in_unit,
        });

        let mut output_ready = false;

        for (i, image) in unit.images().iter().enumerate() {
            if self.barrier() == BarrierOutcome::Cancelled {
                return UnitEnd::Cancelled;
            }

            if !output_ready {
                if let Err(e) = fs::create_dir_all(unit.output_dir()) {
                    return UnitEnd::Fatal(OrchestratorError::output_dir(unit.output_dir(), e));
                }
                output_ready = true;
            }

            let request = InvocationRequest::new(image, unit.output_dir(), plan.params());
            let image_name = request.image_name();

            self.emit(RunEvent::Dispatch(ProgressSnapshot {
                image_index: i + 1,
                images_in_unit,
                unit: unit_id.clone(),
                unit_index: index + 1,
                image_name: image_name.clone(),
                completed_units: summary.completed_units,
                total_units: summary.total_units,
            }));
            summary.images_dispatched += 1;

            match self.invoker.invoke(&request) {
                InvocationResult::Succeeded => {
                    summary.images_succeeded += 1;
                    self.emit(RunEvent::ImageCompleted {
                        unit: unit_id.clone(),
                        image_name,
                    });
                }
                InvocationResult::Cancelled => return UnitEnd::Cancelled,
                InvocationResult::Failed {
                    exit_code,
                    diagnostic,
                } => {
                    tracing::error!("Image {} in {} failed", image_name, unit_id);
                    self.log(|l| l.error(&format!("{} failed:\n{}", image_name, diagnostic)));
                    summary.failures.push(ImageFailure {
                        unit: unit_id.clone(),
                        image: image.clone(),
                        exit_code,
                        diagnostic: diagnostic.clone(),
                    });

                    // Pause first so a decision arriving during the event
                    // callback is not lost.
                    self.control.pause();
                    self.emit(RunEvent::RecoverableError {
                        unit: unit_id.clone(),
                        image_name,
                        exit_code,
                        diagnostic,
                    });

                    if self.barrier() == BarrierOutcome::Cancelled {
                        return UnitEnd::Cancelled;
                    }

                    let remaining = images_in_unit - (i + 1);
                    if remaining > 0 {
                        return UnitEnd::Abandoned { remaining };
                    }
                }
            }
        }

        UnitEnd::Done
    }

    fn finish(&self, mut summary: RunSummary, fatal: Option<OrchestratorError>) -> RunSummary {
        let event = if let Some(e) = fatal {
            let message = e.to_string();
            tracing::error!("Run failed: {}", message);
            self.log(|l| l.error(&message));
            summary.phase = RunPhase::Failed;
            summary.error = Some(message.clone());
            RunEvent::Fatal { message }
        } else if self.control.is_cancelled() {
            tracing::warn!(
                "Run cancelled after {}/{} unit(s)",
                summary.completed_units,
                summary.total_units
            );
            summary.phase = RunPhase::Cancelled;
            RunEvent::Cancelled {
                completed_units: summary.completed_units,
                total_units: summary.total_units,
            }
        } else {
            tracing::info!(
                "Run finished: {}/{} unit(s), {} failed image(s)",
                summary.completed_units,
                summary.total_units,
                summary.failures.len()
            );
            summary.phase = RunPhase::Finished;
            RunEvent::Finished {
                completed_units: summary.completed_units,
                total_units: summary.total_units,
                failed_images: summary.failures.len(),
            }
        };

        self.log(|l| {
            l.log_json("Summary", &summary);
            l.flush();
        });
        // Phase first so observers reacting to the event see the terminal state.
        self.control.set_phase(summary.phase);
        self.emit(event);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UpscaleParams;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Invoker returning scripted results per image name.
    #[derive(Default)]
    struct MockInvoker {
        results: HashMap<String, InvocationResult>,
        calls: Mutex<Vec<String>>,
        terminated: Mutex<bool>,
        /// Block inside invoke until terminate() for this image.
        hang_on: Option<String>,
    }

    impl MockInvoker {
        fn failing(image: &str) -> Self {
            let mut mock = Self::default();
            mock.results.insert(
                image.to_string(),
                InvocationResult::Failed {
                    exit_code: Some(1),
                    diagnostic: "--- STDERR ---\nboom\n\n--- STDOUT ---\n".to_string(),
                },
            );
            mock
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl Invoker for MockInvoker {
        fn invoke(&self, request: &InvocationRequest<'_>) -> InvocationResult {
            let name = request.image_name();
            self.calls.lock().push(name.clone());
            if self.hang_on.as_deref() == Some(name.as_str()) {
                while !*self.terminated.lock() {
                    thread::sleep(Duration::from_millis(5));
                }
                return InvocationResult::Cancelled;
            }
            self.results
                .get(&name)
                .cloned()
                .unwrap_or(InvocationResult::Succeeded)
        }

        fn terminate(&self) {
            *self.terminated.lock() = true;
        }
    }

    fn unit(out: &Path, set: &str, images: &[&str]) -> WorkUnit {
        let dir = PathBuf::from("/in/Model").join(set);
        WorkUnit::new(
            dir.clone(),
            PathBuf::from("Model").join(set),
            images.iter().map(|i| dir.join(i)).collect(),
            out,
        )
    }

    /// Two units: A = [a1.png, a2.png], B = [b1.jpg].
    fn scenario_plan(out: &Path) -> JobPlan {
        JobPlan::new(
            vec![
                unit(out, "001", &["a2.png", "a1.png"]),
                unit(out, "002", &["b1.jpg"]),
            ],
            UpscaleParams::default(),
        )
    }

    fn channel_orchestrator(invoker: Arc<MockInvoker>) -> (Orchestrator, mpsc::Receiver<RunEvent>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let orchestrator = Orchestrator::new(invoker).with_event_callback(Box::new(move |event| {
            let _ = tx.lock().send(event);
        }));
        (orchestrator, rx)
    }

    fn dispatched(events: &[RunEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Dispatch(s) => Some(s.image_name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn scenario_runs_in_order() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(MockInvoker::default());
        let (mut orchestrator, rx) = channel_orchestrator(invoker.clone());

        orchestrator.start(scenario_plan(dir.path())).unwrap();
        let summary = orchestrator.wait().unwrap();
        let events: Vec<RunEvent> = rx.try_iter().collect();

        assert_eq!(dispatched(&events), vec!["a1.png", "a2.png", "b1.jpg"]);
        assert_eq!(invoker.calls(), vec!["a1.png", "a2.png", "b1.jpg"]);

        let completions: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::UnitCompleted {
                    completed_units, ..
                } => Some(*completed_units),
                _ => None,
            })
            .collect();
        assert_eq!(completions, vec![1, 2]);

        // Unit A completes right after a2's dispatch, before b1's.
        let a2 = events
            .iter()
            .position(|e| matches!(e, RunEvent::Dispatch(s) if s.image_name == "a2.png"))
            .unwrap();
        let b1 = events
            .iter()
            .position(|e| matches!(e, RunEvent::Dispatch(s) if s.image_name == "b1.jpg"))
            .unwrap();
        let first_completion = events
            .iter()
            .position(|e| matches!(e, RunEvent::UnitCompleted { .. }))
            .unwrap();
        assert!(a2 < first_completion && first_completion < b1);

        assert!(matches!(events.last(), Some(RunEvent::Finished { .. })));
        assert_eq!(summary.phase, RunPhase::Finished);
        assert!(summary.is_clean());
        assert_eq!(orchestrator.phase(), RunPhase::Finished);
    }

    #[test]
    fn dispatch_count_matches_images_and_indices_have_no_gaps() {
        let dir = tempdir().unwrap();
        let plan = JobPlan::new(
            vec![
                unit(dir.path(), "001", &["1.png", "2.png", "3.png"]),
                unit(dir.path(), "002", &["1.png"]),
                unit(dir.path(), "003", &["1.png", "2.png"]),
            ],
            UpscaleParams::default(),
        );
        let (mut orchestrator, rx) = channel_orchestrator(Arc::new(MockInvoker::default()));

        orchestrator.start(plan).unwrap();
        let summary = orchestrator.wait().unwrap();

        let snapshots: Vec<ProgressSnapshot> = rx
            .try_iter()
            .filter_map(|e| match e {
                RunEvent::Dispatch(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(snapshots.len(), 6);
        assert_eq!(summary.images_dispatched, 6);

        let indices: Vec<(String, usize, usize)> = snapshots
            .iter()
            .map(|s| (s.unit.clone(), s.image_index, s.images_in_unit))
            .collect();
        assert_eq!(
            indices,
            vec![
                ("001".to_string(), 1, 3),
                ("001".to_string(), 2, 3),
                ("001".to_string(), 3, 3),
                ("002".to_string(), 1, 1),
                ("003".to_string(), 1, 2),
                ("003".to_string(), 2, 2),
            ]
        );
    }

    #[test]
    fn output_dirs_created_lazily() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let (mut orchestrator, _rx) = channel_orchestrator(Arc::new(MockInvoker::default()));

        let plan = scenario_plan(&out);
        assert!(!out.exists());
        orchestrator.start(plan).unwrap();
        orchestrator.wait().unwrap();

        assert!(out.join("Model/001").is_dir());
        assert!(out.join("Model/002").is_dir());
    }

    #[test]
    fn existing_output_dir_is_reused() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let existing = out.join("Model/001");
        fs::create_dir_all(&existing).unwrap();
        fs::write(existing.join("a1.png"), b"old").unwrap();
        let (mut orchestrator, _rx) = channel_orchestrator(Arc::new(MockInvoker::default()));

        orchestrator.start(scenario_plan(&out)).unwrap();
        let summary = orchestrator.wait().unwrap();

        assert_eq!(summary.phase, RunPhase::Finished);
        assert_eq!(summary.images_dispatched, 3);
        assert_eq!(summary.completed_units, 2);
        assert_eq!(fs::read(existing.join("a1.png")).unwrap(), b"old");
    }

    /// Cancel from inside the event callback, on the run thread itself.
    fn cancel_on_event(trigger: fn(&RunEvent) -> bool) {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(MockInvoker::failing("a2.png"));
        let handle: Arc<Mutex<Option<ControlHandle>>> = Arc::new(Mutex::new(None));
        let events: Arc<Mutex<Vec<RunEvent>>> = Arc::new(Mutex::new(Vec::new()));

        let mut orchestrator = {
            let handle = handle.clone();
            let events = events.clone();
            Orchestrator::new(invoker.clone()).with_event_callback(Box::new(move |event| {
                if trigger(&event) {
                    if let Some(control) = handle.lock().as_ref() {
                        control.cancel();
                    }
                }
                events.lock().push(event);
            }))
        };
        *handle.lock() = Some(orchestrator.control_handle());

        orchestrator.start(scenario_plan(dir.path())).unwrap();
        let summary = orchestrator.wait().unwrap();
        let events = events.lock().clone();

        assert_eq!(summary.phase, RunPhase::Cancelled);
        assert_eq!(invoker.calls(), vec!["a1.png", "a2.png"]);
        assert!(*invoker.terminated.lock());
        let cancelled = events
            .iter()
            .filter(|e| matches!(e, RunEvent::Cancelled { .. }))
            .count();
        assert_eq!(cancelled, 1);
        assert!(matches!(events.last(), Some(RunEvent::Cancelled { .. })));
        assert!(!events.contains(&RunEvent::Resumed));
    }

    #[test]
    fn cancel_during_recoverable_error_callback() {
        cancel_on_event(|e| matches!(e, RunEvent::RecoverableError { .. }));
    }

    #[test]
    fn cancel_while_blocking_at_barrier() {
        // Paused is emitted with the control lock released, right before
        // the run thread waits on the condvar.
        cancel_on_event(|e| *e == RunEvent::Paused);
    }

    #[test]
    fn failure_pauses_until_continue() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(MockInvoker::failing("a2.png"));
        let (mut orchestrator, rx) = channel_orchestrator(invoker.clone());
        let control = orchestrator.control_handle();

        orchestrator.start(scenario_plan(dir.path())).unwrap();

        // Wait for the recovery event
        loop {
            match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                RunEvent::RecoverableError {
                    image_name,
                    exit_code,
                    diagnostic,
                    ..
                } => {
                    assert_eq!(image_name, "a2.png");
                    assert_eq!(exit_code, Some(1));
                    assert!(diagnostic.contains("boom"));
                    break;
                }
                RunEvent::Dispatch(s) => assert_ne!(s.image_name, "b1.jpg"),
                _ => {}
            }
        }

        // Held at the barrier: b1 is not dispatched until continue
        thread::sleep(Duration::from_millis(100));
        assert_eq!(invoker.calls(), vec!["a1.png", "a2.png"]);
        assert_eq!(control.phase(), RunPhase::Paused);

        control.continue_after_error();
        let summary = orchestrator.wait().unwrap();

        assert_eq!(invoker.calls(), vec!["a1.png", "a2.png", "b1.jpg"]);
        assert_eq!(summary.phase, RunPhase::Finished);
        assert_eq!(summary.completed_units, 2);
        assert_eq!(summary.failures.len(), 1);
        assert!(!summary.is_clean());
    }

    #[test]
    fn failure_mid_unit_abandons_remainder() {
        let dir = tempdir().unwrap();
        let plan = JobPlan::new(
            vec![
                unit(dir.path(), "001", &["a1.png", "a2.png", "a3.png"]),
                unit(dir.path(), "002", &["b1.jpg"]),
            ],
            UpscaleParams::default(),
        );
        let invoker = Arc::new(MockInvoker::failing("a1.png"));
        let (mut orchestrator, rx) = channel_orchestrator(invoker.clone());
        let control = orchestrator.control_handle();

        orchestrator.start(plan).unwrap();
        for event in rx.iter() {
            if matches!(event, RunEvent::RecoverableError { .. }) {
                control.continue_after_error();
                break;
            }
        }
        let summary = orchestrator.wait().unwrap();

        assert_eq!(invoker.calls(), vec!["a1.png", "b1.jpg"]);
        assert_eq!(summary.abandoned_units, vec!["001"]);
        assert_eq!(summary.completed_units, 1);
        assert_eq!(summary.phase, RunPhase::Finished);
    }

    #[test]
    fn abort_after_failure_cancels() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(MockInvoker::failing("a2.png"));
        let (mut orchestrator, rx) = channel_orchestrator(invoker.clone());
        let control = orchestrator.control_handle();

        orchestrator.start(scenario_plan(dir.path())).unwrap();
        let mut events = Vec::new();
        for event in rx.iter() {
            if matches!(event, RunEvent::RecoverableError { .. }) {
                control.abort_after_error();
            }
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        let summary = orchestrator.wait().unwrap();

        assert_eq!(invoker.calls(), vec!["a1.png", "a2.png"]);
        assert_eq!(summary.phase, RunPhase::Cancelled);
        assert_eq!(summary.completed_units, 0);
        assert!(*invoker.terminated.lock());
        let cancelled = events
            .iter()
            .filter(|e| matches!(e, RunEvent::Cancelled { .. }))
            .count();
        assert_eq!(cancelled, 1);
    }

    #[test]
    fn cancel_terminates_in_flight_and_stops_dispatch() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(MockInvoker {
            hang_on: Some("a2.png".to_string()),
            ..MockInvoker::default()
        });
        let (mut orchestrator, rx) = channel_orchestrator(invoker.clone());

        orchestrator.start(scenario_plan(dir.path())).unwrap();
        loop {
            if let RunEvent::Dispatch(s) = rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                if s.image_name == "a2.png" {
                    break;
                }
            }
        }
        orchestrator.cancel();
        let summary = orchestrator.wait().unwrap();
        let rest: Vec<RunEvent> = rx.try_iter().collect();

        assert!(dispatched(&rest).is_empty());
        assert_eq!(invoker.calls(), vec!["a1.png", "a2.png"]);
        assert_eq!(summary.phase, RunPhase::Cancelled);
        // Cancelled mid-unit: unit A is not counted
        assert_eq!(summary.completed_units, 0);
        assert!(matches!(rest.last(), Some(RunEvent::Cancelled { .. })));
    }

    #[test]
    fn pause_then_resume() {
        let dir = tempdir().unwrap();
        let invoker = Arc::new(MockInvoker::default());
        let (mut orchestrator, rx) = channel_orchestrator(invoker.clone());
        let control = orchestrator.control_handle();

        // Paused before start: held before the first dispatch
        control.pause();
        control.pause();
        orchestrator.start(scenario_plan(dir.path())).unwrap();

        loop {
            if rx.recv_timeout(Duration::from_secs(5)).unwrap() == RunEvent::Paused {
                break;
            }
        }
        assert!(invoker.calls().is_empty());

        control.resume();
        control.resume();
        let summary = orchestrator.wait().unwrap();
        let events: Vec<RunEvent> = rx.try_iter().collect();

        assert_eq!(summary.images_dispatched, 3);
        let resumed = events.iter().filter(|e| **e == RunEvent::Resumed).count();
        assert_eq!(resumed, 1);
    }

    #[test]
    fn empty_plan_finishes() {
        let (mut orchestrator, rx) = channel_orchestrator(Arc::new(MockInvoker::default()));
        orchestrator
            .start(JobPlan::new(Vec::new(), UpscaleParams::default()))
            .unwrap();
        let summary = orchestrator.wait().unwrap();

        assert_eq!(summary.phase, RunPhase::Finished);
        let events: Vec<RunEvent> = rx.try_iter().collect();
        assert!(matches!(events.last(), Some(RunEvent::Finished { .. })));
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut orchestrator = Orchestrator::new(Arc::new(MockInvoker::default()));
        orchestrator
            .start(JobPlan::new(Vec::new(), UpscaleParams::default()))
            .unwrap();
        assert!(matches!(
            orchestrator.start(JobPlan::new(Vec::new(), UpscaleParams::default())),
            Err(OrchestratorError::AlreadyStarted)
        ));
        orchestrator.wait().unwrap();
        assert!(matches!(
            orchestrator.wait(),
            Err(OrchestratorError::NotStarted)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn output_dir_failure_is_fatal() {
        let dir = tempdir().unwrap();
        // A file where a directory is needed
        let blocker = dir.path().join("out");
        fs::write(&blocker, b"x").unwrap();

        let (mut orchestrator, rx) = channel_orchestrator(Arc::new(MockInvoker::default()));
        orchestrator.start(scenario_plan(&blocker)).unwrap();
        let summary = orchestrator.wait().unwrap();
        let events: Vec<RunEvent> = rx.try_iter().collect();

        assert_eq!(summary.phase, RunPhase::Failed);
        assert!(summary.error.is_some());
        assert!(dispatched(&events).is_empty());
        assert!(matches!(events.last(), Some(RunEvent::Fatal { .. })));
    }
}
