//! Plain-text run log kept next to each engine run's outputs.
//!
//! Lines look like `2026-01-31 14:02:11 [INFO] message`. Every line is also
//! emitted as a tracing event, so the terminal and the file tell the same
//! story.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info, warn};

use accelerator_shared::{AcceleratorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Append-only log file for one engine run.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Create `lakebridge_run_<stamp>.txt` in `dir`.
    pub fn create(dir: &Path, stamp: &str) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| AcceleratorError::io(dir, e))?;
        let path = dir.join(format!("lakebridge_run_{stamp}.txt"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AcceleratorError::io(&path, e))?;

        let mut log = Self { path, file };
        log.info(&format!("Logging initialized. Log file: {}", log.path.display()));
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&mut self, message: &str) {
        info!(target: "accelerator::runlog", "{message}");
        self.write(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: &str) {
        warn!(target: "accelerator::runlog", "{message}");
        self.write(LogLevel::Warning, message);
    }

    pub fn error(&mut self, message: &str) {
        error!(target: "accelerator::runlog", "{message}");
        self.write(LogLevel::Error, message);
    }

    fn write(&mut self, level: LogLevel, message: &str) {
        let line = format!(
            "{} [{}] {message}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level.as_str()
        );
        // A failed log write must not fail the run.
        if let Err(e) = self.file.write_all(line.as_bytes()) {
            warn!(path = %self.path.display(), error = %e, "could not write run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_timestamp_and_level() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut log = RunLog::create(dir.path(), "20260101_120000").expect("create");
        log.warn("no .sql files found");
        log.error("Lakebridge Analyze failed with exit code 7");

        assert_eq!(
            log.path(),
            dir.path().join("lakebridge_run_20260101_120000.txt")
        );
        let text = std::fs::read_to_string(log.path()).expect("read");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("[INFO] Logging initialized"));
        assert!(lines[1].ends_with("[WARNING] no .sql files found"));
        assert!(lines[2].ends_with("[ERROR] Lakebridge Analyze failed with exit code 7"));

        // `YYYY-MM-DD HH:MM:SS ` prefix.
        let stamp = &lines[1][..19];
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").is_ok());
    }
}
