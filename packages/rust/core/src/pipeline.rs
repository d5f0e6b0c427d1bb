//! End-to-end `run` pipeline: preflight → install → verify → paths →
//! preprocess → engine → manifest.
//!
//! Steps run strictly in order. The first failing step aborts the run and its
//! error carries the process exit code.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, instrument};

use accelerator_artifacts::{checksum_files, write_manifest};
use accelerator_shared::{
    CURRENT_SCHEMA_VERSION, ProjectLayout, Result, RunId, RunManifest, StepRecord, StepStatus,
};

use crate::engine::{EngineOptions, run_engine_from_config};
use crate::handoff::EngineReport;
use crate::install::{self, InstallOptions};
use crate::paths::setup_paths;
use crate::preprocess::run_preprocess;
use crate::prompt::Prompter;

/// Configuration for [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub layout: ProjectLayout,
    /// Config file read by every step after path setup.
    pub config_file: PathBuf,
    /// Tool version recorded in the manifest.
    pub tool_version: String,
    pub install: InstallOptions,
}

/// Result of a completed pipeline run.
#[derive(Debug)]
pub struct RunResult {
    pub run_id: RunId,
    pub manifest_path: PathBuf,
    pub report: EngineReport,
    /// Every step that ran, in order, including the manifest write.
    pub steps: Vec<StepRecord>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each file of a per-file loop.
    fn file_progress(&self, name: &str, current: usize, total: usize);
    /// Called after each pipeline step, whether it passed or not.
    fn step_finished(&self, record: &StepRecord);
    /// Called when the pipeline completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_progress(&self, _name: &str, _current: usize, _total: usize) {}
    fn step_finished(&self, _record: &StepRecord) {}
    fn done(&self, _result: &RunResult) {}
}

/// Timing and status of each executed step.
struct StepLog<'a> {
    records: Vec<StepRecord>,
    progress: &'a dyn ProgressReporter,
}

impl<'a> StepLog<'a> {
    fn new(progress: &'a dyn ProgressReporter) -> Self {
        Self {
            records: Vec::new(),
            progress,
        }
    }

    /// Record a finished step and pass its result through.
    fn record<T>(&mut self, name: &str, start: Instant, result: Result<T>) -> Result<T> {
        let status = match &result {
            Ok(_) => StepStatus::Success,
            Err(e) => {
                error!(step = name, error = %e, "step failed, aborting pipeline");
                StepStatus::failed_with(e.to_string())
            }
        };
        let record = StepRecord {
            name: name.to_string(),
            status,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        self.progress.step_finished(&record);
        self.records.push(record);
        result
    }
}

/// Run the full pipeline.
///
/// 1. Preflight and install scripts (PowerShell, interactive)
/// 2. Verify the CLI sees lakebridge
/// 3. Confirm source/target paths and record them in the config
/// 4. Preprocess the dialect scripts into the staging folder
/// 5. Analyze, transpile, format, and upload the staged scripts
/// 6. Write `run_manifest.json`
#[instrument(skip_all, fields(root = %opts.layout.root().display()))]
pub async fn run_pipeline(
    opts: &RunOptions,
    prompter: &mut dyn Prompter,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();
    let mut steps = StepLog::new(progress);

    info!(%run_id, "starting pipeline");

    // --- Stage 1 ---
    progress.phase("Preflight checks");
    let t = Instant::now();
    let r = install::preflight(&opts.layout, &opts.install).await;
    steps.record("preflight", t, r)?;

    progress.phase("Lakebridge installation");
    let t = Instant::now();
    let r = install::install(&opts.layout, &opts.install).await;
    steps.record("install", t, r)?;

    progress.phase("Verifying installation");
    let t = Instant::now();
    let r = install::verify_installation(&opts.install.cli_command).await;
    steps.record("verify", t, r)?;

    // --- Paths ---
    progress.phase("Path setup");
    let t = Instant::now();
    let r = setup_paths(&opts.layout, &opts.config_file, prompter);
    steps.record("paths", t, r)?;

    // --- Preprocess ---
    progress.phase("Preprocessing");
    let t = Instant::now();
    let r = run_preprocess(&opts.layout, &opts.config_file, progress);
    let staged = steps.record("preprocess", t, r)?;

    // --- Engine ---
    let engine_opts = EngineOptions {
        source_override: Some(staged.staging_folder.clone()),
    };
    let t = Instant::now();
    let r = run_engine_from_config(&opts.config_file, &opts.layout, &engine_opts, progress).await;
    let report = steps.record("engine", t, r)?;

    // --- Manifest ---
    // The manifest lists the steps before it; its own record is only in the
    // returned result.
    progress.phase("Writing run manifest");
    let t = Instant::now();
    let r = write_run_manifest(opts, &run_id, started_at, &steps.records, &report);
    let manifest_path = steps.record("manifest", t, r)?;

    let result = RunResult {
        run_id,
        manifest_path,
        report,
        steps: steps.records,
        elapsed: start.elapsed(),
    };

    info!(
        run_id = %result.run_id,
        scripts = result.report.scripts.len(),
        failed = result.report.failed_scripts(),
        elapsed_ms = result.elapsed.as_millis(),
        "pipeline complete"
    );
    progress.done(&result);
    Ok(result)
}

/// Checksum the engine outputs and write the manifest into the run's
/// metadata folder.
fn write_run_manifest(
    opts: &RunOptions,
    run_id: &RunId,
    started_at: chrono::DateTime<Utc>,
    steps: &[StepRecord],
    report: &EngineReport,
) -> Result<PathBuf> {
    let mut files = report.generated.clone();
    files.push(report.summary_csv.clone());
    files.push(report.log_file.clone());
    if let Some(analyzer) = &report.analyzer_report {
        files.push(analyzer.clone());
    }

    let manifest = RunManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        run_id: run_id.clone(),
        tool_version: opts.tool_version.clone(),
        dialect: report.dialect.clone(),
        started_at,
        finished_at: Utc::now(),
        steps: steps.to_vec(),
        scripts: report.scripts.clone(),
        artifacts: checksum_files(&files, &report.target_folder)?,
    };
    write_manifest(&report.metadata_folder, &manifest)
}
