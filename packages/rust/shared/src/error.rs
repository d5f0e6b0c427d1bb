//! Error types for the accelerator.
//!
//! Library crates use [`AcceleratorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` and maps it back to a process exit code.

use std::path::PathBuf;
use std::time::Duration;

/// Exit code for generic step failures and user cancellation.
pub const EXIT_STEP_FAILED: i32 = 1;
/// Exit code when the migration CLI is not on `PATH`.
pub const EXIT_CLI_NOT_FOUND: i32 = 2;
/// Exit code when an external command exceeds its timeout.
pub const EXIT_TIMEOUT: i32 = 3;
/// Exit code when the dialect source folder does not exist.
pub const EXIT_SOURCE_NOT_FOUND: i32 = 4;
/// Exit code when the config file does not exist.
pub const EXIT_CONFIG_NOT_FOUND: i32 = 10;

/// Top-level error type for all accelerator operations.
#[derive(Debug, thiserror::Error)]
pub enum AcceleratorError {
    /// Configuration parsing or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The config file is missing.
    #[error("config file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A step hand-off or input failed validation.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A required program could not be found on `PATH`.
    #[error("'{program}' not found in PATH. Install/configure it and try again.")]
    CliNotFound { program: String },

    /// An external command exited with a non-zero status.
    #[error("{title} failed with exit code {code}")]
    CommandFailed {
        title: String,
        code: i32,
        stderr: String,
    },

    /// An external command did not finish within its timeout.
    #[error("{title} timed out after {}s", timeout.as_secs())]
    Timeout { title: String, timeout: Duration },

    /// The dialect source folder does not exist.
    #[error("source path not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// The preprocessing hook could not be resolved or failed.
    #[error("preprocess error: {0}")]
    Preprocess(String),

    /// The user declined to continue at a prompt.
    #[error("cancelled by user: {0}")]
    Cancelled(String),

    /// Reading an answer from the terminal failed.
    #[error("prompt error: {0}")]
    Prompt(String),

    /// Rendering or writing an output artifact failed.
    #[error("artifact error: {0}")]
    Artifact(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AcceleratorError>;

impl AcceleratorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code the pipeline terminates with for this error.
    ///
    /// A failed external command propagates its own exit code unless that
    /// code would read as success.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigNotFound { .. } => EXIT_CONFIG_NOT_FOUND,
            Self::CliNotFound { .. } => EXIT_CLI_NOT_FOUND,
            Self::Timeout { .. } => EXIT_TIMEOUT,
            Self::SourceNotFound { .. } => EXIT_SOURCE_NOT_FOUND,
            Self::CommandFailed { code, .. } if *code != 0 => *code,
            _ => EXIT_STEP_FAILED,
        }
    }
}
