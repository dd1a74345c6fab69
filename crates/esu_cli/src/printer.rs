//! Terminal output for options, events and the final summary.

use std::path::Path;

use esu_core::jobs::PlanRequest;
use esu_core::jobs::PlanTarget;
use esu_core::models::UpscaleModel;
use esu_core::orchestrator::{RunEvent, RunPhase, RunSummary};

/// Print every model with its description.
pub fn print_model_help() {
    println!("Available models:\n");
    for model in UpscaleModel::ALL {
        println!("  {:<16} {}", model.short_name(), model.model_name());
        println!("  {:<16} {}\n", "", model.description());
    }
}

/// Print the effective options before the run starts.
pub fn print_options(request: &PlanRequest) {
    let params = &request.params;
    println!();
    println!("root:         {}", request.root.display());
    match &request.target {
        PlanTarget::Directory { model_dir, sets } => {
            println!("path:         {}", model_dir.display());
            if let Some(sets) = sets {
                println!("sets:         {}", sets.join(" "));
            }
        }
        PlanTarget::Files(files) => {
            let names: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
            println!("files:        {}", names.join(" "));
        }
    }
    if let Some(suffix) = params.suffix() {
        println!("suffix:       {}", suffix);
    }
    println!("ext:          {}", params.ext);
    println!("model:        {} ({})", params.model, params.model.model_name());
    println!(
        "face_enhance: {}",
        if params.face_enhance {
            "Enabled"
        } else {
            "Disabled"
        }
    );
    println!("tile:         {}", params.tile);
    println!("tile_pad:     {}", params.tile_pad);
    println!("outscale:     {}", params.outscale_arg());
    println!("gpu_id:       {}", params.gpu_id);
    println!("output_root:  {}", request.output_root.display());
    println!();
}

/// Renders run events as text or JSON lines.
pub struct EventPrinter {
    json: bool,
}

impl EventPrinter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn print(&self, event: &RunEvent) {
        if self.json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Could not serialize event: {}", e),
            }
            return;
        }

        if let Some(text) = format_event(event) {
            match event {
                RunEvent::RecoverableError { .. } | RunEvent::Fatal { .. } => eprintln!("{}", text),
                _ => println!("{}", text),
            }
        }
    }

    pub fn print_summary(&self, summary: &RunSummary, log_path: &Path) {
        if self.json {
            match serde_json::to_string(summary) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Could not serialize summary: {}", e),
            }
            return;
        }

        println!();
        println!(
            "{}: {}/{} set(s), {}/{} image(s) succeeded",
            phase_label(summary.phase),
            summary.completed_units,
            summary.total_units,
            summary.images_succeeded,
            summary.images_dispatched
        );
        for failure in &summary.failures {
            println!("  failed: {} ({})", failure.image.display(), failure.unit);
        }
        for unit in &summary.abandoned_units {
            println!("  incomplete set: {}", unit);
        }
        if let Some(ref error) = summary.error {
            println!("  error: {}", error);
        }
        println!("Log: {}", log_path.display());
    }
}

fn phase_label(phase: RunPhase) -> &'static str {
    match phase {
        RunPhase::Finished => "Finished",
        RunPhase::Cancelled => "Cancelled",
        RunPhase::Failed => "Failed",
        _ => "Stopped",
    }
}

/// Text for one event, or `None` for events not shown in text mode.
fn format_event(event: &RunEvent) -> Option<String> {
    let text = match event {
        RunEvent::Started {
            total_units,
            total_images,
        } => format!(
            "Processing {} set(s), {} image(s)",
            total_units, total_images
        ),
        RunEvent::UnitStarted {
            unit,
            path,
            unit_index,
            total_units,
            images,
        } => format!(
            "\n[{}/{}] Set {} ({}) - {} image(s)",
            unit_index,
            total_units,
            unit,
            path.display(),
            images
        ),
        RunEvent::Dispatch(s) => format!(
            "  [{}/{}] {}",
            s.image_index, s.images_in_unit, s.image_name
        ),
        RunEvent::ImageCompleted { .. } => return None,
        RunEvent::UnitCompleted {
            unit,
            completed_units,
            total_units,
        } => format!(
            "  Set {} done ({}/{})",
            unit, completed_units, total_units
        ),
        RunEvent::UnitAbandoned {
            unit,
            remaining_images,
        } => format!(
            "  Skipped {} remaining image(s) of set {}",
            remaining_images, unit
        ),
        RunEvent::Paused => "Paused".to_string(),
        RunEvent::Resumed => "Resumed".to_string(),
        RunEvent::RecoverableError {
            unit,
            image_name,
            diagnostic,
            ..
        } => format!(
            "\nUpscale failed for {} in set {}\n{}\n",
            image_name, unit, diagnostic
        ),
        RunEvent::Fatal { message } => format!("Fatal: {}", message),
        RunEvent::Finished { failed_images, .. } if *failed_images > 0 => {
            format!("Done with {} failed image(s)", failed_images)
        }
        RunEvent::Finished { .. } => "Done".to_string(),
        RunEvent::Cancelled {
            completed_units,
            total_units,
        } => format!(
            "Cancelled after {}/{} set(s)",
            completed_units, total_units
        ),
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esu_core::orchestrator::ProgressSnapshot;

    #[test]
    fn dispatch_shows_position() {
        let event = RunEvent::Dispatch(ProgressSnapshot {
            image_index: 2,
            images_in_unit: 5,
            unit: "001".to_string(),
            unit_index: 1,
            image_name: "a2.png".to_string(),
            completed_units: 0,
            total_units: 3,
        });
        assert_eq!(format_event(&event).unwrap(), "  [2/5] a2.png");
    }

    #[test]
    fn image_completion_is_quiet() {
        let event = RunEvent::ImageCompleted {
            unit: "001".to_string(),
            image_name: "a.png".to_string(),
        };
        assert!(format_event(&event).is_none());
    }

    #[test]
    fn cancelled_and_finished_differ() {
        let finished = format_event(&RunEvent::Finished {
            completed_units: 2,
            total_units: 2,
            failed_images: 0,
        });
        let cancelled = format_event(&RunEvent::Cancelled {
            completed_units: 1,
            total_units: 2,
        });
        assert_eq!(finished.as_deref(), Some("Done"));
        assert_eq!(cancelled.as_deref(), Some("Cancelled after 1/2 set(s)"));
    }
}
