//! SQL script discovery and project folder setup.
//!
//! Before anything is sent to the migration CLI, the accelerator finds the
//! scripts under `<source>/<dialect>/`, checks the folder is usable, and
//! narrows the set down to what the user picked.

mod folders;

use std::path::{Path, PathBuf};

use accelerator_shared::{AcceleratorError, Result};
use tracing::{debug, info, instrument, warn};

pub use folders::{
    DialectScope, FolderState, ensure_dir, is_first_time_setup, planned_folders, setup_folders,
};

/// File extension the migration CLI accepts.
const SQL_EXTENSION: &str = "sql";

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Whether a path names a SQL script (`.sql`, any case).
pub fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(SQL_EXTENSION))
}

/// Regular files directly inside `dir`, sorted by name.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| AcceleratorError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AcceleratorError::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// SQL scripts directly inside `dir`, sorted by name.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn discover_sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AcceleratorError::SourceNotFound {
            path: dir.to_path_buf(),
        });
    }

    let files: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|p| is_sql_file(p))
        .collect();

    debug!(count = files.len(), "sql files discovered");
    Ok(files)
}

/// Pre-analysis check of the dialect source folder.
///
/// A missing folder is fatal. An empty one only warns, since the analyzer
/// still produces a (blank) report for it.
pub fn validate_source(dir: &Path) -> Result<usize> {
    let files = discover_sql_files(dir)?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no .sql files found");
    } else {
        info!(dir = %dir.display(), count = files.len(), "source folder validated");
    }
    Ok(files.len())
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Which of the discovered files to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    All,
    /// Exact file name (no directory), as the user typed it.
    Named(String),
}

/// Narrow `files` down to the selection.
///
/// A named file that is not present is a validation error.
pub fn select_files(files: &[PathBuf], selection: &FileSelection) -> Result<Vec<PathBuf>> {
    match selection {
        FileSelection::All => Ok(files.to_vec()),
        FileSelection::Named(name) => files
            .iter()
            .find(|p| p.file_name().is_some_and(|n| n == name.as_str()))
            .map(|p| vec![p.clone()])
            .ok_or_else(|| {
                AcceleratorError::validation(format!("file '{name}' not found in input folder"))
            }),
    }
}

/// File name of a path as a display string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), "select 1;").expect("write fixture");
        }
    }

    #[test]
    fn discovers_only_sql_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path(), &["b.sql", "a.SQL", "notes.txt"]);
        std::fs::create_dir(dir.path().join("nested.sql")).expect("mkdir");

        let files = discover_sql_files(dir.path()).expect("discover");
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.SQL", "b.sql"]);
    }

    #[test]
    fn missing_source_is_exit_four() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = validate_source(&dir.path().join("synapse")).unwrap_err();
        assert!(matches!(err, AcceleratorError::SourceNotFound { .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn empty_source_is_only_a_warning() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(validate_source(dir.path()).expect("validate"), 0);
    }

    #[test]
    fn list_files_includes_non_sql() {
        let dir = tempfile::tempdir().expect("tempdir");
        seed(dir.path(), &["x.sql", "readme.md"]);
        assert_eq!(list_files(dir.path()).expect("list").len(), 2);
    }

    #[test]
    fn select_named_file() {
        let files = vec![PathBuf::from("/in/a.sql"), PathBuf::from("/in/b.sql")];

        let all = select_files(&files, &FileSelection::All).expect("all");
        assert_eq!(all.len(), 2);

        let one = select_files(&files, &FileSelection::Named("b.sql".into())).expect("named");
        assert_eq!(one, vec![PathBuf::from("/in/b.sql")]);

        let err = select_files(&files, &FileSelection::Named("c.sql".into())).unwrap_err();
        assert!(err.to_string().contains("'c.sql' not found"));
    }
}
