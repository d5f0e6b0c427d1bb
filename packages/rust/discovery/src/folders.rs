//! Idempotent creation of the project folder structure.

use std::path::{Path, PathBuf};

use accelerator_shared::{AcceleratorError, Dialect, ProjectLayout, Result, SUPPORTED_DIALECTS};
use tracing::{debug, info, instrument};

/// What [`ensure_dir`] found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderState {
    Created,
    Exists,
}

impl std::fmt::Display for FolderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => f.pad("Created"),
            Self::Exists => f.pad("Exists"),
        }
    }
}

/// Create `path` (and parents) unless it is already a directory.
pub fn ensure_dir(path: &Path) -> Result<FolderState> {
    if path.is_dir() {
        debug!(path = %path.display(), "folder exists");
        return Ok(FolderState::Exists);
    }
    std::fs::create_dir_all(path).map_err(|e| AcceleratorError::io(path, e))?;
    debug!(path = %path.display(), "folder created");
    Ok(FolderState::Created)
}

/// Which dialects get `input/` and `output/` folders.
#[derive(Debug, Clone)]
pub enum DialectScope {
    /// Only the configured dialect.
    Single(Dialect),
    /// Every dialect the lakebridge CLI supports.
    All,
}

impl DialectScope {
    fn dialects(&self) -> Vec<Dialect> {
        match self {
            Self::Single(d) => vec![d.clone()],
            Self::All => SUPPORTED_DIALECTS.iter().map(|d| Dialect::new(d)).collect(),
        }
    }
}

/// Ordered list of folders a project needs for the given dialects.
pub fn planned_folders(layout: &ProjectLayout, scope: &DialectScope) -> Vec<PathBuf> {
    let dialects = scope.dialects();
    let mut folders = vec![layout.input_dir()];
    folders.extend(dialects.iter().map(|d| layout.input_dir().join(d.as_str())));
    folders.push(layout.output_dir());
    folders.extend(dialects.iter().map(|d| layout.output_dir().join(d.as_str())));
    folders.push(layout.dialects_dir());
    folders.extend(dialects.iter().map(|d| layout.preprocessor_dir(d)));
    folders.push(layout.temp_dir());
    folders.push(layout.logs_dir());
    folders.push(layout.config_dir());
    folders
}

/// Create the project folder structure, reporting each folder's state.
///
/// Running this twice creates nothing the second time.
#[instrument(skip_all, fields(root = %layout.root().display()))]
pub fn setup_folders(
    layout: &ProjectLayout,
    scope: &DialectScope,
) -> Result<Vec<(PathBuf, FolderState)>> {
    let mut report = Vec::new();
    for folder in planned_folders(layout, scope) {
        let state = ensure_dir(&folder)?;
        report.push((folder, state));
    }

    let created = report
        .iter()
        .filter(|(_, s)| *s == FolderState::Created)
        .count();
    info!(created, total = report.len(), "folder structure ready");

    Ok(report)
}

/// A project is new when its root is missing or empty.
pub fn is_first_time_setup(root: &Path) -> bool {
    match std::fs::read_dir(root) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
