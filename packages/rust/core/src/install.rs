//! Stage 1: preflight checks, lakebridge installation, and verification.

use std::path::Path;

use tracing::{error, info, instrument};

use accelerator_runner::{CommandOutcome, LakebridgeCli, powershell_script, require_program};
use accelerator_shared::{
    AcceleratorConfig, AcceleratorError, ProjectLayout, Result, error::EXIT_STEP_FAILED,
};

use crate::pipeline::ProgressReporter;

/// Programs stage 1 needs.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub powershell: String,
    pub cli_command: String,
}

impl InstallOptions {
    pub fn from_config(config: &AcceleratorConfig) -> Self {
        Self {
            powershell: config.powershell.clone(),
            cli_command: config.cli_command.clone(),
        }
    }
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self::from_config(&AcceleratorConfig::default())
    }
}

/// Run one PowerShell script with the terminal attached.
///
/// Any non-zero exit fails the step with exit code 1, whatever code the
/// script returned.
#[instrument(skip_all, fields(script = %script.display()))]
pub async fn run_script(powershell: &str, script: &Path) -> Result<CommandOutcome> {
    if !script.is_file() {
        return Err(AcceleratorError::validation(format!(
            "script not found: {}",
            script.display()
        )));
    }

    let outcome = powershell_script(powershell, script).run().await?;
    if !outcome.success {
        error!(exit_code = ?outcome.exit_code, "script failed");
        return Err(AcceleratorError::CommandFailed {
            title: format!("Script {}", script.display()),
            code: EXIT_STEP_FAILED,
            stderr: format!(
                "script exited with {}",
                outcome
                    .exit_code
                    .map_or_else(|| "a signal".to_string(), |c| format!("code {c}"))
            ),
        });
    }
    Ok(outcome)
}

/// Step 1.
pub async fn preflight(layout: &ProjectLayout, opts: &InstallOptions) -> Result<CommandOutcome> {
    run_script(&opts.powershell, &layout.preflight_script()).await
}

/// Step 2.
pub async fn install(layout: &ProjectLayout, opts: &InstallOptions) -> Result<CommandOutcome> {
    run_script(&opts.powershell, &layout.install_script()).await
}

/// Check the CLI is on `PATH` and can see the lakebridge plugin.
#[instrument(skip_all, fields(cli = %cli_command))]
pub async fn verify_installation(cli_command: &str) -> Result<CommandOutcome> {
    require_program(cli_command)?;

    let outcome = LakebridgeCli::new(cli_command).help().run().await?;
    if !outcome.success {
        error!("CLI cannot detect lakebridge");
        return Err(AcceleratorError::CommandFailed {
            title: outcome.title.clone(),
            code: EXIT_STEP_FAILED,
            stderr: outcome.stderr,
        });
    }

    info!("installation verified");
    Ok(outcome)
}

/// Stage 1 on its own: preflight, install, verify.
pub async fn stage_one(
    layout: &ProjectLayout,
    opts: &InstallOptions,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    progress.phase("Preflight checks");
    preflight(layout, opts).await?;

    progress.phase("Lakebridge installation");
    install(layout, opts).await?;

    progress.phase("Verifying installation");
    verify_installation(&opts.cli_command).await?;

    Ok(())
}
