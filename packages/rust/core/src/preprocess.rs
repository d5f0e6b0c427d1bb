//! Step 5: run every source script through the dialect hook and stage the
//! results for the engine.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, instrument};

use accelerator_discovery::{discover_sql_files, file_name};
use accelerator_preprocess::{STAGING_DIR_NAME, resolve_preprocessor, stage_files};
use accelerator_shared::{AcceleratorError, EngineSettings, ProjectLayout, Result, load_config_from};

use crate::handoff::{Handoff, PreprocessOutput};
use crate::pipeline::ProgressReporter;

/// Preprocess `<source_path>/<dialect>/*.sql` into
/// `<target_path>/<dialect>/preprocessed/`.
///
/// Every failure, including a missing config, surfaces as
/// [`AcceleratorError::Preprocess`] so the pipeline aborts with exit 1.
#[instrument(skip_all, fields(config = %config_file.display()))]
pub fn run_preprocess(
    layout: &ProjectLayout,
    config_file: &Path,
    progress: &dyn ProgressReporter,
) -> Result<PreprocessOutput> {
    preprocess_inner(layout, config_file, progress).map_err(|e| match e {
        AcceleratorError::Preprocess(_) => e,
        other => AcceleratorError::Preprocess(other.to_string()),
    })
}

fn preprocess_inner(
    layout: &ProjectLayout,
    config_file: &Path,
    progress: &dyn ProgressReporter,
) -> Result<PreprocessOutput> {
    let config = load_config_from(config_file)?;
    let settings = EngineSettings::resolve(&config, layout)?;

    let input = &settings.source_path;
    if !input.is_dir() {
        return Err(AcceleratorError::Preprocess(format!(
            "dialect input folder not found: {}",
            input.display()
        )));
    }

    let files = discover_sql_files(input)?;
    if files.is_empty() {
        return Err(AcceleratorError::Preprocess(format!(
            "no SQL files found in: {}",
            input.display()
        )));
    }
    info!(
        dialect = %settings.dialect,
        files = files.len(),
        output = %settings.target_path.display(),
        "preprocessing"
    );

    let hook = resolve_preprocessor(
        layout,
        &settings.dialect,
        &settings.preprocessor_interpreter,
        &settings.powershell,
    )?;

    let staging_folder = settings.target_path.join(STAGING_DIR_NAME);
    let staged = stage_files(&files, hook.as_ref(), &staging_folder, |path, i, n| {
        progress.file_progress(&file_name(path), i, n);
    })?;

    let output = PreprocessOutput {
        dialect: settings.dialect,
        processed_files: staged
            .into_iter()
            .map(|s| (s.source, s.staged))
            .collect::<BTreeMap<_, _>>(),
        staging_folder,
        output_folder: settings.target_path,
    };
    output.validate()?;
    Ok(output)
}
