//! External process execution with timeout, output capture, and failure policy.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, instrument, warn};

use accelerator_shared::{AcceleratorError, Result};

// ---------------------------------------------------------------------------
// ExternalCommand
// ---------------------------------------------------------------------------

/// How the child's stdio is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Share the terminal, for scripts that prompt the user.
    Inherit,
    /// Pipe stdout/stderr, logging each line and keeping it in the outcome.
    Capture,
}

/// What to do when a command exits non-zero or times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Turn the failure into an error that stops the pipeline.
    Abort,
    /// Record the failure in the outcome and keep going.
    Continue,
}

/// A fully-specified external call. Arguments are passed as an argv vector,
/// never through a shell.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    /// Human-readable label used in logs and errors.
    pub title: String,
    pub program: String,
    pub args: Vec<String>,
    pub output: OutputMode,
    pub timeout: Option<Duration>,
}

impl ExternalCommand {
    pub fn new(title: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            program: program.into(),
            args: Vec::new(),
            output: OutputMode::Capture,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn output(mut self, mode: OutputMode) -> Self {
        self.output = mode;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Printable command line, quoting arguments that contain whitespace.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command to completion.
    ///
    /// A non-zero exit is reported in the outcome, not as an error. A timeout
    /// kills the child (and, on unix, every process in its group) and returns
    /// [`AcceleratorError::Timeout`].
    #[instrument(skip_all, fields(title = %self.title))]
    pub async fn run(&self) -> Result<CommandOutcome> {
        info!(command = %self.display(), "running external command");

        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        match self.output {
            OutputMode::Inherit => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
                // Own group, so a timeout can take down whatever the tool spawned.
                #[cfg(unix)]
                command.process_group(0);
            }
        }

        let start = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AcceleratorError::CliNotFound {
                    program: self.program.clone(),
                }
            } else {
                AcceleratorError::io(&self.program, e)
            }
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let title = self.title.as_str();

        let finished = async {
            let (out, err, status) = tokio::join!(
                collect_lines(stdout, title, "stdout"),
                collect_lines(stderr, title, "stderr"),
                child.wait(),
            );
            status.map(|s| (s, out, err))
        };

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, finished).await.ok(),
            None => Some(finished.await),
        };
        let Some(waited) = waited else {
            let limit = self.timeout.unwrap_or_default();
            kill_tree(&mut child).await;
            warn!(timeout_secs = limit.as_secs(), "command timed out, child killed");
            return Err(AcceleratorError::Timeout {
                title: self.title.clone(),
                timeout: limit,
            });
        };

        let (status, stdout, stderr) =
            waited.map_err(|e| AcceleratorError::io(&self.program, e))?;

        let outcome = CommandOutcome {
            title: self.title.clone(),
            command_line: self.display(),
            exit_code: status.code(),
            success: status.success(),
            timed_out: false,
            stdout,
            stderr,
            elapsed: start.elapsed(),
        };

        debug!(
            exit_code = ?outcome.exit_code,
            elapsed_ms = outcome.elapsed.as_millis(),
            "command finished"
        );

        Ok(outcome)
    }

    /// Run the command and apply a [`FailurePolicy`] to non-zero exits and
    /// timeouts.
    pub async fn run_with(&self, policy: FailurePolicy) -> Result<CommandOutcome> {
        let start = Instant::now();
        match self.run().await {
            Ok(outcome) if outcome.success => Ok(outcome),
            Ok(outcome) => match policy {
                FailurePolicy::Abort => Err(AcceleratorError::CommandFailed {
                    title: self.title.clone(),
                    code: outcome.exit_code.unwrap_or(1),
                    stderr: outcome.stderr,
                }),
                FailurePolicy::Continue => {
                    warn!(
                        title = %self.title,
                        exit_code = ?outcome.exit_code,
                        "command failed, continuing"
                    );
                    Ok(outcome)
                }
            },
            Err(AcceleratorError::Timeout { .. }) if policy == FailurePolicy::Continue => {
                Ok(CommandOutcome {
                    title: self.title.clone(),
                    command_line: self.display(),
                    exit_code: None,
                    success: false,
                    timed_out: true,
                    stdout: String::new(),
                    stderr: String::new(),
                    elapsed: start.elapsed(),
                })
            }
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// CommandOutcome
// ---------------------------------------------------------------------------

/// Structured result of one external call.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub title: String,
    pub command_line: String,
    /// `None` when the process was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutcome {
    /// One-line summary for the run log.
    pub fn summary(&self) -> String {
        if self.success {
            format!("{} succeeded", self.title)
        } else if self.timed_out {
            format!("{} timed out", self.title)
        } else {
            match self.exit_code {
                Some(code) => format!("{} failed with exit code {code}", self.title),
                None => format!("{} was terminated", self.title),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PATH lookup
// ---------------------------------------------------------------------------

/// Locate `program` the way a shell would: paths are checked directly, bare
/// names are searched in `PATH`.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        executable_names(program)
            .into_iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    })
}

/// Like [`find_on_path`], but a missing program is
/// [`AcceleratorError::CliNotFound`].
pub fn require_program(program: &str) -> Result<PathBuf> {
    find_on_path(program).ok_or_else(|| AcceleratorError::CliNotFound {
        program: program.to_string(),
    })
}

#[cfg(windows)]
fn executable_names(program: &str) -> Vec<String> {
    let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.CMD;.BAT".into());
    std::iter::once(program.to_string())
        .chain(exts.split(';').filter(|e| !e.is_empty()).map(|e| format!("{program}{e}")))
        .collect()
}

#[cfg(not(windows))]
fn executable_names(program: &str) -> Vec<String> {
    vec![program.to_string()]
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn collect_lines<R: AsyncRead + Unpin>(pipe: Option<R>, title: &str, stream: &str) -> String {
    let Some(pipe) = pipe else {
        return String::new();
    };

    let mut buf = String::new();
    let mut lines = BufReader::new(pipe).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                info!(target: "accelerator::external", title, stream, "{line}");
                buf.push_str(&line);
                buf.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                warn!(title, stream, error = %e, "stopped reading command output");
                break;
            }
        }
    }
    buf
}

/// Kill a timed-out child and reap it. On unix the whole process group goes,
/// since CLIs such as `databricks labs` run their work in a grandchild.
async fn kill_tree(child: &mut Child) {
    kill_group(child);
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill timed-out command");
    }
}

#[cfg(unix)]
fn kill_group(child: &Child) {
    let Some(pid) = child.id().and_then(|id| libc::pid_t::try_from(id).ok()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; `pid` leads the group created at spawn.
    let rc = unsafe { libc::killpg(pid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn quote_arg(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}
