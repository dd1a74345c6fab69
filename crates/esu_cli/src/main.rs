//! esrgan-sets: batch upscale image sets with Real-ESRGAN.

mod args;
mod printer;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::{self, ExitCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use clap::Parser;

use esu_core::config::ConfigManager;
use esu_core::invoker::ProcessInvoker;
use esu_core::jobs::{build_plan, default_output_root, PlanRequest};
use esu_core::logging::{self, RunLogger};
use esu_core::orchestrator::{ControlHandle, Orchestrator, RunEvent, RunPhase, RunSummary};

use crate::args::{Cli, OnError};
use crate::printer::EventPrinter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.model_help {
        printer::print_model_help();
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    config.ensure_dirs_exist()?;
    let settings = config.settings().clone();

    let _log_guard = logging::init_tracing_with_file(settings.logging.level, &config.logs_folder())
        .context("Failed to set up logging")?;
    tracing::debug!("esu_core {}", esu_core::version());

    let root = cli.resolve_root(&settings)?;
    let params = cli.merge_params(&settings.upscale);

    if let Some(ref name) = cli.save_preset {
        let absolute = std::path::absolute(&root)
            .with_context(|| format!("Cannot resolve {}", root.display()))?;
        config.save_preset(name, &absolute)?;
        println!("Saved root preset {} = {}", name, absolute.display());
    }
    if cli.save_defaults {
        config.save_upscale_defaults(&params)?;
        println!("Saved upscale defaults to {}", cli.config.display());
    }

    let output_root = cli
        .output_root
        .clone()
        .or_else(|| {
            (!settings.paths.output_root.is_empty())
                .then(|| PathBuf::from(&settings.paths.output_root))
        })
        .unwrap_or_else(|| default_output_root(&root));

    let request = PlanRequest {
        root,
        target: cli.target()?,
        output_root,
        params,
    };
    printer::print_options(&request);

    let plan = build_plan(&request)?;

    let logger = Arc::new(
        RunLogger::new(
            RunLogger::timestamped_name("run"),
            config.logs_folder(),
            settings.logging.clone(),
            None,
        )
        .context("Failed to create run log")?,
    );
    let invoker =
        Arc::new(ProcessInvoker::from_settings(&settings.invoker).with_logger(Arc::clone(&logger)));

    let (tx, rx) = mpsc::channel();
    let mut orchestrator = Orchestrator::new(invoker)
        .with_logger(Arc::clone(&logger))
        .with_event_callback(Box::new(move |event| {
            let _ = tx.send(event);
        }));
    let control = orchestrator.control_handle();

    InterruptHandler::new(control.clone())
        .install()
        .context("Failed to install Ctrl-C handler")?;
    orchestrator.start(plan)?;

    let printer = EventPrinter::new(cli.json_events);
    for event in rx.iter() {
        printer.print(&event);
        if matches!(event, RunEvent::RecoverableError { .. }) {
            answer_failure(cli.on_error, &control);
        }
        if event.is_terminal() {
            break;
        }
    }

    let summary = orchestrator.wait()?;
    printer.print_summary(&summary, logger.log_path());
    Ok(exit_code(&summary))
}

/// First Ctrl-C cancels the run, a second one exits at once.
struct InterruptHandler {
    control: ControlHandle,
    interrupted: AtomicBool,
}

impl InterruptHandler {
    fn new(control: ControlHandle) -> Self {
        Self {
            control,
            interrupted: AtomicBool::new(false),
        }
    }

    /// Handle one interrupt. Returns true when the process should exit
    /// without waiting for the run to wind down.
    fn interrupt(&self) -> bool {
        if self.interrupted.swap(true, Ordering::SeqCst) {
            return true;
        }
        eprintln!("\nCancelling run (press Ctrl-C again to exit immediately)");
        self.control.cancel();
        false
    }

    fn install(self) -> Result<(), ctrlc::Error> {
        ctrlc::set_handler(move || {
            if self.interrupt() {
                process::exit(130);
            }
        })
    }
}

/// Continue or abort after a failed image, asking in prompt mode.
fn answer_failure(policy: OnError, control: &ControlHandle) {
    // Ctrl-C may already have decided.
    if control.is_cancelled() {
        return;
    }

    let keep_going = match policy {
        OnError::Continue => true,
        OnError::Abort => false,
        OnError::Prompt => prompt_continue(&mut io::stdin().lock(), &mut io::stderr()),
    };

    if keep_going {
        control.continue_after_error();
    } else {
        control.abort_after_error();
    }
}

/// Ask whether to continue. End of input counts as abort.
///
/// The question goes to `out` (stderr in the binary) so stdout carries
/// only events.
fn prompt_continue(input: &mut impl BufRead, out: &mut impl Write) -> bool {
    loop {
        let _ = write!(out, "[c]ontinue with the next set or [a]bort? ");
        let _ = out.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        match parse_answer(&line) {
            Some(answer) => return answer,
            None => continue,
        }
    }
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "c" | "continue" | "y" | "yes" => Some(true),
        "a" | "abort" | "n" | "no" | "q" => Some(false),
        _ => None,
    }
}

/// 0 for a clean run, 1 when images failed, 2 when the run did not finish.
fn exit_code(summary: &RunSummary) -> ExitCode {
    match summary.phase {
        RunPhase::Finished if summary.failures.is_empty() => ExitCode::SUCCESS,
        RunPhase::Finished => ExitCode::from(1),
        _ => ExitCode::from(2),
    }
}
