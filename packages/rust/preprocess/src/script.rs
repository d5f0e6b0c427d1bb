//! Script-backed preprocessing hook.
//!
//! The hook receives the SQL text on stdin and writes the rewritten text to
//! stdout. A non-zero exit fails the file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use accelerator_shared::{AcceleratorError, Result};
use tracing::debug;

use crate::Preprocessor;

/// A preprocessing hook implemented as an external script.
#[derive(Debug, Clone)]
pub struct ScriptPreprocessor {
    program: String,
    args: Vec<String>,
    script: PathBuf,
}

impl ScriptPreprocessor {
    /// Pick the interpreter from the script's extension.
    ///
    /// `.py` runs under `python_interpreter`, `.ps1` under `powershell`, and
    /// anything else under `sh`.
    pub fn for_script(script: &Path, python_interpreter: &str, powershell: &str) -> Self {
        let ext = script
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let (program, args) = match ext.as_deref() {
            Some("py") => (python_interpreter.to_string(), Vec::new()),
            Some("ps1") => (
                powershell.to_string(),
                vec!["-ExecutionPolicy".into(), "Bypass".into(), "-File".into()],
            ),
            _ => ("sh".to_string(), Vec::new()),
        };

        Self {
            program,
            args,
            script: script.to_path_buf(),
        }
    }
}

impl Preprocessor for ScriptPreprocessor {
    fn name(&self) -> String {
        self.script.display().to_string()
    }

    fn preprocess(&self, sql: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AcceleratorError::Preprocess(format!(
                    "failed to start `{}` for {}: {e}",
                    self.program,
                    self.script.display()
                ))
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            AcceleratorError::Preprocess("failed to capture preprocessor stdin".into())
        })?;

        // Feed stdin from a separate thread so a hook that writes before it
        // finishes reading cannot fill the stdout pipe and stall both sides.
        let input = sql.to_owned();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output().map_err(|e| {
            AcceleratorError::Preprocess(format!("failed to wait for preprocessor: {e}"))
        })?;

        match writer.join() {
            Ok(Ok(())) => {}
            // The hook may legitimately stop reading early.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(AcceleratorError::Preprocess(format!(
                    "failed to write to preprocessor stdin: {e}"
                )));
            }
            Err(_) => {
                return Err(AcceleratorError::Preprocess(
                    "preprocessor stdin writer panicked".into(),
                ));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AcceleratorError::Preprocess(format!(
                "{} exited with {}: {}",
                self.script.display(),
                output
                    .status
                    .code()
                    .map_or_else(|| "a signal".to_string(), |c| format!("code {c}")),
                stderr.trim()
            )));
        }

        debug!(
            bytes_in = sql.len(),
            bytes_out = output.stdout.len(),
            "preprocessor finished"
        );

        String::from_utf8(output.stdout).map_err(|_| {
            AcceleratorError::Preprocess(format!(
                "{} produced non-UTF-8 output",
                self.script.display()
            ))
        })
    }
}
