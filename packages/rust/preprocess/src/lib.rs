//! Per-dialect preprocessing hook.
//!
//! Each dialect may ship a hook at
//! `dialects/<dialect>/preprocessor/preprocess.{py,ps1,sh}` that rewrites raw
//! SQL before it reaches the migration CLI. The contract is plain text in,
//! plain text out. The accelerator stages the rewritten scripts under the
//! target folder so the analyzer and transpiler consume them.

mod script;

use std::path::{Path, PathBuf};

use accelerator_shared::{AcceleratorError, Dialect, ProjectLayout, Result};
use tracing::{info, instrument};

pub use script::ScriptPreprocessor;

/// Hook file names, in lookup order.
pub const HOOK_FILE_NAMES: &[&str] = &["preprocess.py", "preprocess.ps1", "preprocess.sh"];

/// Folder under `<target>/<dialect>/` that receives preprocessed scripts.
pub const STAGING_DIR_NAME: &str = "preprocessed";

/// Text-in/text-out rewrite applied to each SQL script.
pub trait Preprocessor: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> String;
    /// Rewrite one script.
    fn preprocess(&self, sql: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Hook resolution
// ---------------------------------------------------------------------------

/// Find the hook script for a dialect, if any.
pub fn find_hook(layout: &ProjectLayout, dialect: &Dialect) -> Option<PathBuf> {
    let dir = layout.preprocessor_dir(dialect);
    HOOK_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Resolve the hook for a dialect. A dialect without a hook is an error.
pub fn resolve_preprocessor(
    layout: &ProjectLayout,
    dialect: &Dialect,
    python_interpreter: &str,
    powershell: &str,
) -> Result<Box<dyn Preprocessor>> {
    let script = find_hook(layout, dialect).ok_or_else(|| {
        AcceleratorError::Preprocess(format!(
            "preprocessor not found: {}",
            layout.preprocessor_dir(dialect).join(HOOK_FILE_NAMES[0]).display()
        ))
    })?;

    info!(hook = %script.display(), "using preprocessor");
    Ok(Box::new(ScriptPreprocessor::for_script(
        &script,
        python_interpreter,
        powershell,
    )))
}

// ---------------------------------------------------------------------------
// Staging
// ---------------------------------------------------------------------------

/// One script after preprocessing.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub source: PathBuf,
    pub staged: PathBuf,
}

/// Run every file through the hook and write the results into `staging_dir`
/// under their original file names.
///
/// Scripts left in `staging_dir` by a previous run are removed first so
/// later steps only see this run's inputs.
#[instrument(skip_all, fields(hook = %preprocessor.name(), files = files.len()))]
pub fn stage_files(
    files: &[PathBuf],
    preprocessor: &dyn Preprocessor,
    staging_dir: &Path,
    mut on_file: impl FnMut(&Path, usize, usize),
) -> Result<Vec<StagedFile>> {
    clear_staged_scripts(staging_dir)?;
    std::fs::create_dir_all(staging_dir).map_err(|e| AcceleratorError::io(staging_dir, e))?;

    let total = files.len();
    let mut staged = Vec::with_capacity(total);

    for (i, source) in files.iter().enumerate() {
        on_file(source, i + 1, total);

        let sql = std::fs::read_to_string(source).map_err(|e| AcceleratorError::io(source, e))?;
        let processed = preprocessor.preprocess(&sql).map_err(|e| match e {
            AcceleratorError::Preprocess(msg) => {
                AcceleratorError::Preprocess(format!("{}: {msg}", source.display()))
            }
            other => other,
        })?;

        let name = source.file_name().ok_or_else(|| {
            AcceleratorError::validation(format!("not a file path: {}", source.display()))
        })?;
        let target = staging_dir.join(name);
        std::fs::write(&target, &processed).map_err(|e| AcceleratorError::io(&target, e))?;

        staged.push(StagedFile {
            source: source.clone(),
            staged: target,
        });
    }

    info!(count = staged.len(), dir = %staging_dir.display(), "scripts preprocessed");
    Ok(staged)
}

fn clear_staged_scripts(staging_dir: &Path) -> Result<()> {
    if !staging_dir.is_dir() {
        return Ok(());
    }
    for path in accelerator_discovery::discover_sql_files(staging_dir)? {
        std::fs::remove_file(&path).map_err(|e| AcceleratorError::io(&path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Preprocessor for Upper {
        fn name(&self) -> String {
            "upper".into()
        }

        fn preprocess(&self, sql: &str) -> Result<String> {
            Ok(sql.to_uppercase())
        }
    }

    struct Rejecting;

    impl Preprocessor for Rejecting {
        fn name(&self) -> String {
            "rejecting".into()
        }

        fn preprocess(&self, _sql: &str) -> Result<String> {
            Err(AcceleratorError::Preprocess("unsupported construct".into()))
        }
    }

    #[test]
    fn missing_hook_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ProjectLayout::new(dir.path());
        let err = resolve_preprocessor(&layout, &Dialect::new("synapse"), "python", "pwsh")
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("preprocessor not found"));
        assert!(err.to_string().contains("preprocess.py"));
    }

    #[test]
    fn hook_lookup_prefers_python() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ProjectLayout::new(dir.path());
        let dialect = Dialect::new("synapse");
        let hook_dir = layout.preprocessor_dir(&dialect);
        std::fs::create_dir_all(&hook_dir).expect("mkdir");
        std::fs::write(hook_dir.join("preprocess.sh"), "cat").expect("write");
        assert_eq!(find_hook(&layout, &dialect), Some(hook_dir.join("preprocess.sh")));

        std::fs::write(hook_dir.join("preprocess.py"), "").expect("write");
        assert_eq!(find_hook(&layout, &dialect), Some(hook_dir.join("preprocess.py")));
    }

    #[test]
    fn staging_writes_processed_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("input");
        let staging = dir.path().join("out").join(STAGING_DIR_NAME);
        std::fs::create_dir_all(&input).expect("mkdir");
        std::fs::write(input.join("a.sql"), "select 1;").expect("write");
        std::fs::write(input.join("b.sql"), "select 2;").expect("write");

        // Left over from an earlier run.
        std::fs::create_dir_all(&staging).expect("mkdir");
        std::fs::write(staging.join("stale.sql"), "old").expect("write");

        let files = vec![input.join("a.sql"), input.join("b.sql")];
        let mut seen = Vec::new();
        let staged = stage_files(&files, &Upper, &staging, |p, i, n| {
            seen.push((p.to_path_buf(), i, n));
        })
        .expect("stage");

        assert_eq!(staged.len(), 2);
        assert_eq!(
            std::fs::read_to_string(staging.join("a.sql")).expect("read"),
            "SELECT 1;"
        );
        assert!(!staging.join("stale.sql").exists());
        assert_eq!(seen[1], (input.join("b.sql"), 2, 2));
    }

    #[test]
    fn hook_failure_names_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.sql"), "select 1;").expect("write");

        let err = stage_files(
            &[dir.path().join("a.sql")],
            &Rejecting,
            &dir.path().join("staged"),
            |_, _, _| {},
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("a.sql"), "{msg}");
        assert!(msg.contains("unsupported construct"), "{msg}");
    }
}
