//! Step 6: the core engine.
//!
//! Runs the lakebridge analyzer once over the source folder, transpiles
//! each script, then formats, renders, and uploads every converted script.
//! Analyzer failures abort; per-script transpile and upload failures are
//! recorded in the summary and the run carries on.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, instrument};

use accelerator_artifacts::{StageFlags, StatusTable, write_atomic, write_notebook, write_summary};
use accelerator_discovery::{discover_sql_files, file_name, validate_source};
use accelerator_runner::{FailurePolicy, LakebridgeCli, require_program};
use accelerator_shared::{
    AcceleratorError, EngineSettings, ProjectLayout, Result, StepStatus, load_config_from,
};

use crate::handoff::{EngineReport, Handoff};
use crate::pipeline::ProgressReporter;
use crate::runlog::RunLog;

/// Output folder names under `<target>/<dialect>/`.
pub const METADATA_DIR: &str = "metadata";
pub const ANALYZER_DIR: &str = "analyzer_output";
pub const CONVERTED_DIR: &str = "Converted_Code";
pub const FORMATTED_DIR: &str = "Final_Formatted";
pub const NOTEBOOKS_DIR: &str = "Databricks_Notebooks";

/// Where the engine reads scripts from.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Analyze and transpile this folder instead of `<source_path>/<dialect>`.
    /// The pipeline points it at the preprocess staging folder.
    pub source_override: Option<PathBuf>,
}

/// Load the config at `config_file` and run the engine.
///
/// A missing config is [`AcceleratorError::ConfigNotFound`] (exit 10).
pub async fn run_engine_from_config(
    config_file: &Path,
    layout: &ProjectLayout,
    options: &EngineOptions,
    progress: &dyn ProgressReporter,
) -> Result<EngineReport> {
    let config = load_config_from(config_file)?;
    let settings = EngineSettings::resolve(&config, layout)?;
    run_engine(&settings, options, progress).await
}

/// Run the engine with resolved settings.
#[instrument(skip_all, fields(dialect = %settings.dialect))]
pub async fn run_engine(
    settings: &EngineSettings,
    options: &EngineOptions,
    progress: &dyn ProgressReporter,
) -> Result<EngineReport> {
    let source = options
        .source_override
        .clone()
        .unwrap_or_else(|| settings.source_path.clone());
    let target = settings.target_path.clone();

    create_dir(&settings.source_path)?;
    create_dir(&target)?;

    let now = Local::now();
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    let metadata = target.join(METADATA_DIR).join(now.format("%Y%m%d").to_string());
    let mut log = RunLog::create(&metadata, &stamp)?;
    log.info("Lakebridge core engine started");

    if let Err(e) = require_program(&settings.cli_command) {
        log.error(&e.to_string());
        return Err(e);
    }

    if settings.run_validation {
        match validate_source(&source) {
            Ok(0) => log.warn(&format!("No .sql files found in {}", source.display())),
            Ok(n) => log.info(&format!("{n} .sql files found in {}", source.display())),
            Err(e) => {
                log.error(&e.to_string());
                return Err(e);
            }
        }
    }

    let cli = LakebridgeCli::from_settings(settings);
    let scripts = if source.is_dir() {
        discover_sql_files(&source)?
    } else {
        Vec::new()
    };
    let mut table = StatusTable::default();

    // --- Analyze ---
    let analyzer_report = if settings.run_analyzer {
        progress.phase("Lakebridge Analyze");
        let dir = target.join(ANALYZER_DIR);
        create_dir(&dir)?;
        let report = dir.join(format!("lakebridge_analysis_{stamp}.xlsx"));

        let cmd = cli.analyze(&source, &report, &settings.dialect);
        log.info(&format!("Command: {}", cmd.display()));
        if let Err(e) = cmd.run_with(FailurePolicy::Abort).await {
            log.error(&e.to_string());
            return Err(e);
        }
        for script in &scripts {
            table.analyzer.insert(file_name(script), StepStatus::Success);
        }
        Some(report)
    } else {
        None
    };

    // --- Transpile ---
    let converted = target.join(CONVERTED_DIR);
    create_dir(&converted)?;
    if settings.run_transpiler {
        progress.phase("Transpiling scripts");
        let total = scripts.len();
        for (i, script) in scripts.iter().enumerate() {
            let name = file_name(script);
            progress.file_progress(&name, i + 1, total);

            let cmd = cli.transpile(script, &settings.dialect, &converted);
            log.info(&format!("Command: {}", cmd.display()));
            let status = match cmd.run_with(FailurePolicy::Continue).await {
                Ok(outcome) if outcome.success => StepStatus::Success,
                Ok(outcome) => {
                    log.error(&outcome.summary());
                    StepStatus::failed()
                }
                Err(e) => {
                    log.error(&format!("Transpile failed for {name}: {e}"));
                    StepStatus::failed()
                }
            };
            table.transpile.insert(name, status);
        }
    }

    // --- Post-process ---
    let mut generated = Vec::new();
    if settings.run_transpiler {
        progress.phase("Formatting and publishing notebooks");
        post_process(settings, &cli, &target, &mut log, &mut table, &mut generated, progress)
            .await?;
    }

    // --- Summary ---
    let stages = StageFlags {
        analyzer: settings.run_analyzer,
        transpiler: settings.run_transpiler,
        upload: settings.upload.enabled,
    };
    let reports = table.reports(stages);
    let summary_csv = metadata.join(format!("sql_summary_{stamp}.csv"));
    write_summary(&summary_csv, &reports)?;
    log.info(&format!(
        "All tasks completed. Summary CSV saved at {}",
        summary_csv.display()
    ));

    let report = EngineReport {
        dialect: settings.dialect.clone(),
        target_folder: target,
        metadata_folder: metadata,
        log_file: log.path().to_path_buf(),
        analyzer_report,
        scripts: reports,
        summary_csv,
        generated,
    };
    report.validate()?;

    info!(
        scripts = report.scripts.len(),
        failed = report.failed_scripts(),
        "engine finished"
    );
    Ok(report)
}

/// Format, render, and upload every converted script.
async fn post_process(
    settings: &EngineSettings,
    cli: &LakebridgeCli,
    target: &Path,
    log: &mut RunLog,
    table: &mut StatusTable,
    generated: &mut Vec<PathBuf>,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let converted = target.join(CONVERTED_DIR);
    let formatted_dir = target.join(FORMATTED_DIR);
    let notebooks_dir = target.join(NOTEBOOKS_DIR);
    create_dir(&formatted_dir)?;
    create_dir(&notebooks_dir)?;

    let outputs = discover_sql_files(&converted)?;
    let total = outputs.len();

    for (i, sql_file) in outputs.iter().enumerate() {
        let name = file_name(sql_file);
        progress.file_progress(&name, i + 1, total);

        let notebook = match render_outputs(sql_file, &formatted_dir, &notebooks_dir) {
            Ok((formatted, notebook)) => {
                generated.push(formatted);
                generated.push(notebook.clone());
                table.post_process.insert(name.clone(), StepStatus::Success);
                notebook
            }
            Err(e) => {
                log.error(&format!("Error processing {name}: {e}"));
                table
                    .post_process
                    .insert(name.clone(), StepStatus::failed_with(e.to_string()));
                table.upload.insert(name, StepStatus::Skipped);
                continue;
            }
        };

        if !settings.upload.enabled {
            table.upload.insert(name, StepStatus::Skipped);
            continue;
        }

        let cmd = cli.workspace_import(
            &notebook,
            &settings.upload.workspace_dir,
            &settings.upload.language,
        );
        log.info(&format!("Command: {}", cmd.display()));
        let status = match cmd.run_with(FailurePolicy::Continue).await {
            Ok(outcome) if outcome.success => StepStatus::Success,
            Ok(outcome) => {
                log.error(&outcome.summary());
                StepStatus::failed()
            }
            Err(e) => {
                log.error(&format!("Upload failed for {name}: {e}"));
                StepStatus::failed_with(e.to_string())
            }
        };
        table.upload.insert(name, status);
    }

    Ok(())
}

/// Write the formatted script and its notebook. Returns both paths.
fn render_outputs(
    sql_file: &Path,
    formatted_dir: &Path,
    notebooks_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    let bytes = std::fs::read(sql_file).map_err(|e| AcceleratorError::io(sql_file, e))?;
    let sql = String::from_utf8_lossy(&bytes);
    let formatted = accelerator_format::format_sql(&sql);

    let name = sql_file
        .file_name()
        .ok_or_else(|| AcceleratorError::Artifact(format!("not a file: {}", sql_file.display())))?;
    let formatted_path = formatted_dir.join(name);
    write_atomic(&formatted_path, formatted.as_bytes())?;

    let notebook = write_notebook(notebooks_dir, sql_file, &formatted)?;
    Ok((formatted_path, notebook))
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| AcceleratorError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use accelerator_shared::{AcceleratorConfig, save_config};

    #[tokio::test]
    async fn missing_config_exits_ten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ProjectLayout::new(dir.path());
        let err = run_engine_from_config(
            &dir.path().join("nope.yaml"),
            &layout,
            &EngineOptions::default(),
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 10);
    }

    #[tokio::test]
    async fn missing_cli_exits_two_and_logs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ProjectLayout::new(dir.path());
        let config = AcceleratorConfig {
            cli_command: "no-such-databricks-cli-77".into(),
            ..AcceleratorConfig::default()
        };
        save_config(&layout.config_file(), &config).expect("save");

        let err = run_engine_from_config(
            &layout.config_file(),
            &layout,
            &EngineOptions::default(),
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);

        // The run log exists and records the failure.
        let metadata = layout.output_dir().join("synapse").join(METADATA_DIR);
        let day = std::fs::read_dir(&metadata)
            .expect("metadata")
            .next()
            .expect("day folder")
            .expect("entry")
            .path();
        let log = std::fs::read_dir(&day)
            .expect("day")
            .next()
            .expect("log file")
            .expect("entry")
            .path();
        let text = std::fs::read_to_string(log).expect("read log");
        assert!(text.contains("[ERROR] 'no-such-databricks-cli-77' not found in PATH"));
    }

    #[test]
    fn render_outputs_writes_formatted_and_notebook() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sql = dir.path().join("q.sql");
        std::fs::write(&sql, "select a from t").expect("write");
        let (formatted, notebook) =
            render_outputs(&sql, &dir.path().join("ff"), &dir.path().join("nb")).expect("render");

        assert_eq!(
            std::fs::read_to_string(formatted).expect("read"),
            "SELECT a\nFROM t\n"
        );
        let nb = std::fs::read_to_string(notebook).expect("read");
        assert!(nb.contains("sql_query = \"\"\"\nSELECT a\nFROM t\n\"\"\""));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::test_support::fake_cli;

        struct Project {
            _dir: tempfile::TempDir,
            layout: ProjectLayout,
            bin: PathBuf,
        }

        fn project(scripts: &[&str], tweak: impl FnOnce(&mut AcceleratorConfig)) -> Project {
            let dir = tempfile::tempdir().expect("tempdir");
            let layout = ProjectLayout::new(dir.path().join("proj"));
            let bin = dir.path().join("bin");
            let cli = fake_cli(&bin);

            let input = layout.input_dir().join("synapse");
            std::fs::create_dir_all(&input).expect("mkdir");
            for s in scripts {
                std::fs::write(input.join(s), "select a, b from t where x = 1").expect("write");
            }

            let mut config = AcceleratorConfig {
                cli_command: cli.to_string_lossy().into_owned(),
                timeout_secs: 30,
                ..AcceleratorConfig::default()
            };
            tweak(&mut config);
            save_config(&layout.config_file(), &config).expect("save");
            Project {
                _dir: dir,
                layout,
                bin,
            }
        }

        async fn run(p: &Project) -> Result<EngineReport> {
            run_engine_from_config(
                &p.layout.config_file(),
                &p.layout,
                &EngineOptions::default(),
                &SilentProgress,
            )
            .await
        }

        #[tokio::test]
        async fn end_to_end_against_fake_cli() {
            let p = project(&["a.sql", "bad.sql", "noup.sql"], |_| {});
            let report = run(&p).await.expect("engine");

            let target = p.layout.output_dir().join("synapse");
            assert!(target.join(FORMATTED_DIR).join("a.sql").is_file());
            assert!(target.join(NOTEBOOKS_DIR).join("a.py").is_file());
            assert!(!target.join(NOTEBOOKS_DIR).join("bad.py").exists());

            let by_name = |n: &str| {
                report
                    .scripts
                    .iter()
                    .find(|s| s.script == n)
                    .cloned()
                    .expect("script row")
            };
            let a = by_name("a.sql");
            assert_eq!(a.analyzer, StepStatus::Success);
            assert_eq!(a.transpile, StepStatus::Success);
            assert_eq!(a.post_process, StepStatus::Success);
            assert_eq!(a.upload, StepStatus::Success);

            let bad = by_name("bad.sql");
            assert_eq!(bad.transpile, StepStatus::failed());
            assert_eq!(bad.post_process, StepStatus::failed());

            let noup = by_name("noup.sql");
            assert_eq!(noup.post_process, StepStatus::Success);
            assert_eq!(noup.upload, StepStatus::failed());

            let csv = std::fs::read_to_string(&report.summary_csv).expect("summary");
            let rows: Vec<&str> = csv.lines().collect();
            assert_eq!(rows.len(), 4);
            assert!(rows[1].starts_with("a.sql,"));
            assert!(rows[2].starts_with("bad.sql,Success,Failed,Failed"));

            let imports = std::fs::read_to_string(p.bin.join("imports.log")).expect("imports");
            assert!(imports.contains("/Shared/a.py"));
            assert_eq!(report.failed_scripts(), 1);
            assert!(report.analyzer_report.is_some());
        }

        #[tokio::test]
        async fn analyzer_exit_code_propagates() {
            let p = project(&["a.sql"], |_| {});
            std::fs::write(p.bin.join("analyze_exit"), "7").expect("write");
            let err = run(&p).await.unwrap_err();
            assert_eq!(err.exit_code(), 7);
        }

        #[tokio::test]
        async fn analyzer_timeout_exits_three() {
            let p = project(&["a.sql"], |c| c.timeout_secs = 1);
            std::fs::write(p.bin.join("analyze_exit"), "sleep").expect("write");
            let err = run(&p).await.unwrap_err();
            assert_eq!(err.exit_code(), 3);
        }

        #[tokio::test]
        async fn disabled_stages_are_skipped() {
            let p = project(&["a.sql"], |c| {
                c.run_analyzer = false;
                c.run_transpiler = false;
            });
            let report = run(&p).await.expect("engine");
            assert!(report.scripts.is_empty());
            assert!(report.analyzer_report.is_none());
            let csv = std::fs::read_to_string(&report.summary_csv).expect("summary");
            assert_eq!(csv.lines().count(), 1);
        }

        #[tokio::test]
        async fn upload_can_be_turned_off() {
            let p = project(&["a.sql"], |c| c.upload.enabled = false);
            let report = run(&p).await.expect("engine");
            assert_eq!(report.scripts[0].upload, StepStatus::Skipped);
            assert!(!p.bin.join("imports.log").exists());
        }

        #[tokio::test]
        async fn missing_source_with_validation_exits_four() {
            let p = project(&["a.sql"], |_| {});
            let elsewhere = p.layout.root().join("staged-but-missing");
            let err = run_engine_from_config(
                &p.layout.config_file(),
                &p.layout,
                &EngineOptions {
                    source_override: Some(elsewhere),
                },
                &SilentProgress,
            )
            .await
            .unwrap_err();
            assert_eq!(err.exit_code(), 4);
        }
    }
}
