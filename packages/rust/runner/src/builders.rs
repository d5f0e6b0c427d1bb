//! Argument builders for the external tools the pipeline drives.
//!
//! Every invocation is assembled here so the exact argv the accelerator
//! sends can be checked without spawning anything.

use std::path::Path;
use std::time::Duration;

use accelerator_shared::{Dialect, EngineSettings};

use crate::command::{ExternalCommand, OutputMode};

/// Builder for `databricks labs lakebridge ...` and `databricks workspace ...`.
#[derive(Debug, Clone)]
pub struct LakebridgeCli {
    program: String,
    profile: Option<String>,
    debug: bool,
    timeout: Option<Duration>,
}

impl LakebridgeCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            profile: None,
            debug: false,
            timeout: None,
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            program: settings.cli_command.clone(),
            profile: settings.profile.clone(),
            debug: settings.debug,
            timeout: Some(settings.timeout),
        }
    }

    /// An empty or whitespace-only profile is ignored.
    pub fn profile(mut self, profile: Option<&str>) -> Self {
        self.profile = profile
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Flags appended after every lakebridge subcommand: `-p <profile>`
    /// first, then `--debug`.
    pub fn global_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(profile) = &self.profile {
            flags.push("-p".to_string());
            flags.push(profile.clone());
        }
        if self.debug {
            flags.push("--debug".to_string());
        }
        flags
    }

    fn lakebridge(&self, title: impl Into<String>, subcommand: &str) -> ExternalCommand {
        let cmd = ExternalCommand::new(title, &self.program).args(["labs", "lakebridge", subcommand]);
        match self.timeout {
            Some(t) => cmd.timeout(t),
            None => cmd,
        }
    }

    /// `labs lakebridge --help`, used to confirm the CLI sees the plugin.
    pub fn help(&self) -> ExternalCommand {
        ExternalCommand::new("Lakebridge CLI check", &self.program)
            .args(["labs", "lakebridge", "--help"])
            .timeout(Duration::from_secs(120))
    }

    /// `labs lakebridge analyze` over a whole source folder.
    pub fn analyze(&self, source_dir: &Path, report_file: &Path, dialect: &Dialect) -> ExternalCommand {
        self.lakebridge("Lakebridge Analyze", "analyze")
            .arg("--source-directory")
            .arg(path_arg(source_dir))
            .arg("--report-file")
            .arg(path_arg(report_file))
            .arg("--source-tech")
            .arg(dialect.as_str())
            .args(self.global_flags())
    }

    /// `labs lakebridge transpile` for a single script.
    pub fn transpile(&self, input: &Path, dialect: &Dialect, output_folder: &Path) -> ExternalCommand {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.lakebridge(format!("Transpile {name}"), "transpile")
            .arg("--input-source")
            .arg(path_arg(input))
            .arg("--source-dialect")
            .arg(dialect.as_str())
            .arg("--output-folder")
            .arg(path_arg(output_folder))
            .args(self.global_flags())
    }

    /// `workspace import` of one notebook, overwriting any existing copy.
    pub fn workspace_import(&self, notebook: &Path, remote_dir: &str, language: &str) -> ExternalCommand {
        let name = notebook
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote = format!("{}/{name}", remote_dir.trim_end_matches('/'));

        let mut cmd = ExternalCommand::new(format!("Upload Notebook {name}"), &self.program)
            .args(["workspace", "import", "--file"])
            .arg(path_arg(notebook))
            .arg(remote)
            .args(["--language", language, "--overwrite"]);
        if let Some(profile) = &self.profile {
            cmd = cmd.args(["-p", profile.as_str()]);
        }
        match self.timeout {
            Some(t) => cmd.timeout(t),
            None => cmd,
        }
    }
}

/// `<powershell> -ExecutionPolicy Bypass -File <script>`, sharing the terminal
/// so interactive scripts can prompt.
pub fn powershell_script(powershell: &str, script: &Path) -> ExternalCommand {
    ExternalCommand::new(format!("PowerShell {}", script.display()), powershell)
        .args(["-ExecutionPolicy", "Bypass", "-File"])
        .arg(path_arg(script))
        .output(OutputMode::Inherit)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
