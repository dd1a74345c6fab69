//! Real process invoker.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::command::{build_args, format_command, InvocationRequest};
use super::outcome::{classify, InvocationResult};
use super::Invoker;
use crate::config::InvokerSettings;
use crate::logging::RunLogger;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the upscaler as a child process, one image at a time.
///
/// Termination is sticky: once [`Invoker::terminate`] is called, the
/// running child is killed and every later invocation reports
/// `Cancelled` without spawning. Use one instance per run.
pub struct ProcessInvoker {
    program: String,
    script: Option<PathBuf>,
    child: Mutex<Option<Child>>,
    terminate_requested: AtomicBool,
    logger: Option<Arc<RunLogger>>,
}

impl ProcessInvoker {
    /// Create an invoker for `program [script] <args>`.
    pub fn new(program: impl Into<String>, script: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script,
            child: Mutex::new(None),
            terminate_requested: AtomicBool::new(false),
            logger: None,
        }
    }

    /// Create an invoker from the `[invoker]` settings section.
    pub fn from_settings(settings: &InvokerSettings) -> Self {
        Self::new(settings.program.clone(), settings.script_path())
    }

    /// Attach a run logger receiving command lines and process output.
    pub fn with_logger(mut self, logger: Arc<RunLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    fn spawn(&self, request: &InvocationRequest<'_>) -> Result<Option<Readers>, String> {
        let args = build_args(request);
        let command_line = format_command(&self.program, self.script.as_deref(), &args);
        tracing::debug!("Running: {}", command_line);
        if let Some(ref logger) = self.logger {
            logger.command(&command_line);
        }

        // Flag check, spawn and slot store happen under one lock so a
        // concurrent terminate() either sees the child or is seen here.
        let mut slot = self.child.lock();
        if self.terminate_requested.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let mut cmd = Command::new(&self.program);
        if let Some(ref script) = self.script {
            cmd.arg(script);
        }
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group: a terminal Ctrl-C reaches the front end only,
        // which then cancels through terminate().
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| format!("Failed to start {}: {}", self.program, e))?;

        let readers = Readers {
            stdout: spawn_reader(child.stdout.take()),
            stderr: spawn_reader(child.stderr.take()),
        };
        *slot = Some(child);
        Ok(Some(readers))
    }

    /// Poll the child until it exits. The lock is only held per poll.
    fn wait_for_exit(&self) -> std::io::Result<Option<ExitStatus>> {
        loop {
            {
                let mut slot = self.child.lock();
                let Some(child) = slot.as_mut() else {
                    return Ok(None);
                };
                match child.try_wait() {
                    Ok(Some(status)) => {
                        *slot = None;
                        return Ok(Some(status));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let _ = child.kill();
                        let _ = child.wait();
                        *slot = None;
                        return Err(e);
                    }
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn log_output(&self, stdout: &str, stderr: &str) {
        if let Some(ref logger) = self.logger {
            for line in stdout.lines() {
                logger.output_line(line, false);
            }
            for line in stderr.lines() {
                logger.output_line(line, true);
            }
        }
    }
}

impl Invoker for ProcessInvoker {
    fn invoke(&self, request: &InvocationRequest<'_>) -> InvocationResult {
        let readers = match self.spawn(request) {
            Ok(Some(readers)) => readers,
            Ok(None) => return InvocationResult::Cancelled,
            Err(message) => {
                tracing::error!("{}", message);
                return InvocationResult::failed(message);
            }
        };

        let status = self.wait_for_exit();
        let stdout = readers.stdout.map(join_reader).unwrap_or_default();
        let stderr = readers.stderr.map(join_reader).unwrap_or_default();

        // Read after exit so a kill during the run is always seen here.
        let terminated = self.terminate_requested.load(Ordering::SeqCst);

        let exit_code = match status {
            Ok(status) => status.and_then(|s| s.code()),
            Err(e) if !terminated => {
                return InvocationResult::failed(format!(
                    "Failed waiting for {}: {}",
                    self.program, e
                ));
            }
            Err(_) => None,
        };

        self.log_output(&stdout, &stderr);
        let result = classify(exit_code, &stdout, &stderr, terminated);
        if let InvocationResult::Failed { exit_code, .. } = &result {
            tracing::warn!(
                "Upscale of {} failed (exit code {:?})",
                request.image_name(),
                exit_code
            );
            if let Some(ref logger) = self.logger {
                logger.show_tail(&self.program);
            }
        }
        if let Some(ref logger) = self.logger {
            logger.clear_tail();
        }
        result
    }

    fn terminate(&self) {
        self.terminate_requested.store(true, Ordering::SeqCst);

        let mut slot = self.child.lock();
        if let Some(child) = slot.as_mut() {
            tracing::info!("Terminating upscaler process {}", child.id());
            if let Err(e) = child.kill() {
                tracing::debug!("Kill failed (process likely exited): {}", e);
            }
        }
    }
}

struct Readers {
    stdout: Option<JoinHandle<String>>,
    stderr: Option<JoinHandle<String>>,
}

/// Drain a pipe on its own thread so neither stream can fill up and block the child.
fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> Option<JoinHandle<String>> {
    stream.map(|mut stream| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stream.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
