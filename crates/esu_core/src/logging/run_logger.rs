//! Per-run logger with file and callback output.
//!
//! Each orchestrator run gets its own logger that:
//! - Writes to a dedicated log file
//! - Forwards lines to a front-end callback (if provided)
//! - Keeps external process output in a tail buffer for failure diagnosis

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;
use serde::Serialize;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-run logger, shared between the orchestrator and the invoker.
pub struct RunLogger {
    log_path: PathBuf,
    file_writer: Mutex<Option<BufWriter<File>>>,
    callback: Mutex<Option<LogCallback>>,
    config: LogConfig,
    tail_buffer: Mutex<VecDeque<String>>,
}

impl RunLogger {
    /// Create a new run logger.
    ///
    /// # Arguments
    /// * `run_name` - Name of the run (used in log filename)
    /// * `log_dir` - Directory to write the log file to (created if missing)
    /// * `config` - Logging configuration
    /// * `callback` - Optional callback receiving every formatted line
    pub fn new(
        run_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let run_name = run_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&run_name)));
        let file = File::create(&log_path)?;

        Ok(Self {
            log_path,
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback: Mutex::new(callback),
            tail_buffer: Mutex::new(VecDeque::with_capacity(config.error_tail)),
            config,
        })
    }

    /// Log name derived from the current local time, e.g. `run_20250101_120000`.
    pub fn timestamped_name(prefix: &str) -> String {
        format!("{}_{}", prefix, Local::now().format("%Y%m%d_%H%M%S"))
    }

    /// Get the log file path.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message.
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Log a warning message.
    pub fn warn(&self, message: &str) {
        let msg = MessagePrefix::Warning.format(message);
        self.log(LogLevel::Warn, &msg);
    }

    /// Log an error message.
    pub fn error(&self, message: &str) {
        let msg = MessagePrefix::Error.format(message);
        self.log(LogLevel::Error, &msg);
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        let msg = MessagePrefix::Command.format(command);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a work unit marker.
    pub fn unit(&self, unit_name: &str) {
        let msg = MessagePrefix::Unit.format(unit_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a section marker.
    pub fn section(&self, section_name: &str) {
        let msg = MessagePrefix::Section.format(section_name);
        self.log(LogLevel::Info, &msg);
    }

    /// Log a success message.
    pub fn success(&self, message: &str) {
        let msg = MessagePrefix::Success.format(message);
        self.log(LogLevel::Info, &msg);
    }

    /// Log an output line from the external process.
    ///
    /// In compact mode, lines only go to the tail buffer.
    pub fn output_line(&self, line: &str, is_stderr: bool) {
        {
            let mut buffer = self.tail_buffer.lock();
            if buffer.len() >= self.config.error_tail {
                buffer.pop_front();
            }
            if self.config.error_tail > 0 {
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }

        let prefix = if is_stderr { "[stderr] " } else { "" };
        let msg = format!("{}{}", prefix, line);
        self.output(&self.format_message(&msg));
    }

    /// Write the tail buffer (typically after a failure).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    /// Clear the tail buffer.
    pub fn clear_tail(&self) {
        self.tail_buffer.lock().clear();
    }

    /// Write a value as pretty JSON under a section marker.
    pub fn log_json<T: Serialize>(&self, title: &str, value: &T) {
        self.section(title);
        match serde_json::to_string_pretty(value) {
            Ok(json) => self.info(&json),
            Err(e) => self.warn(&format!("Could not serialize {}: {}", title, e)),
        }
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        if let Some(mut writer) = self.file_writer.get_mut().take() {
            let _ = writer.flush();
        }
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn plain_config() -> LogConfig {
        LogConfig {
            show_timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("run_1", dir.path().join("logs"), plain_config(), None).unwrap();

        assert!(logger.log_path().exists());
        assert!(logger.log_path().ends_with("logs/run_1.log"));
    }

    #[test]
    fn writes_to_file_and_respects_level() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("run", dir.path(), plain_config(), None).unwrap();

        logger.unit("Model / set 001");
        logger.debug("hidden");
        logger.error("boom");
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("=== Model / set 001 ==="));
        assert!(content.contains("[ERROR] boom"));
        assert!(!content.contains("hidden"));
    }

    #[test]
    fn forwards_to_callback() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let callback: LogCallback = Box::new(move |_line| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let logger = RunLogger::new("run", dir.path(), plain_config(), Some(callback)).unwrap();

        logger.info("one");
        logger.success("two");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn compact_mode_keeps_output_in_tail_only() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            error_tail: 3,
            ..plain_config()
        };
        let logger = RunLogger::new("run", dir.path(), config, None).unwrap();

        for i in 0..5 {
            logger.output_line(&format!("line {}", i), false);
        }
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(!content.contains("line 4"));

        logger.show_tail("upscale");
        logger.flush();
        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("[upscale/tail]"));
        assert!(content.contains("line 2"));
        assert!(content.contains("line 4"));
        assert!(!content.contains("line 1"));
    }

    #[test]
    fn verbose_mode_writes_output_lines() {
        let dir = tempdir().unwrap();
        let config = LogConfig {
            compact: false,
            ..plain_config()
        };
        let logger = RunLogger::new("run", dir.path(), config, None).unwrap();

        logger.output_line("tile 1/4", true);
        logger.flush();

        let content = fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains("[stderr] tile 1/4"));
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
