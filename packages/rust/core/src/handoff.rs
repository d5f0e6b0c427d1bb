//! Typed results passed from one step to the next.
//!
//! Each hand-off checks its own required fields before the next step reads
//! it, so a step never starts on half-filled input.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use accelerator_shared::{AcceleratorError, Dialect, Result, ScriptReport, StepStatus};

/// Boundary check for a step result.
pub trait Handoff {
    /// Name used in validation messages.
    const NAME: &'static str;

    fn validate(&self) -> Result<()>;
}

fn require_path(handoff: &str, field: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(AcceleratorError::validation(format!(
            "{handoff}: `{field}` is required"
        )));
    }
    Ok(())
}

fn require_dialect(handoff: &str, dialect: &Dialect) -> Result<()> {
    if dialect.is_empty() {
        return Err(AcceleratorError::validation(format!(
            "{handoff}: `dialect` is required"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Path setup
// ---------------------------------------------------------------------------

/// Source and target roots confirmed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSelection {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    pub config_file: PathBuf,
}

impl Handoff for PathSelection {
    const NAME: &'static str = "path selection";

    fn validate(&self) -> Result<()> {
        require_path(Self::NAME, "source_root", &self.source_root)?;
        require_path(Self::NAME, "target_root", &self.target_root)?;
        require_path(Self::NAME, "config_file", &self.config_file)
    }
}

// ---------------------------------------------------------------------------
// Input selection
// ---------------------------------------------------------------------------

/// Dialect and scripts picked interactively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSelection {
    pub dialect: Dialect,
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    pub files: Vec<PathBuf>,
}

impl Handoff for InputSelection {
    const NAME: &'static str = "input selection";

    fn validate(&self) -> Result<()> {
        require_dialect(Self::NAME, &self.dialect)?;
        require_path(Self::NAME, "input_folder", &self.input_folder)?;
        require_path(Self::NAME, "output_folder", &self.output_folder)?;
        if self.files.is_empty() {
            return Err(AcceleratorError::validation(format!(
                "{}: `files` must not be empty",
                Self::NAME
            )));
        }
        if let Some(stray) = self
            .files
            .iter()
            .find(|f| f.parent() != Some(self.input_folder.as_path()))
        {
            return Err(AcceleratorError::validation(format!(
                "{}: {} is not in {}",
                Self::NAME,
                stray.display(),
                self.input_folder.display()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Preprocess
// ---------------------------------------------------------------------------

/// Scripts after the dialect hook ran, mapped original → staged path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreprocessOutput {
    pub dialect: Dialect,
    pub processed_files: BTreeMap<PathBuf, PathBuf>,
    pub staging_folder: PathBuf,
    pub output_folder: PathBuf,
}

impl Handoff for PreprocessOutput {
    const NAME: &'static str = "preprocess output";

    fn validate(&self) -> Result<()> {
        require_dialect(Self::NAME, &self.dialect)?;
        require_path(Self::NAME, "staging_folder", &self.staging_folder)?;
        require_path(Self::NAME, "output_folder", &self.output_folder)?;
        if self.processed_files.is_empty() {
            return Err(AcceleratorError::validation(format!(
                "{}: `processed_files` must not be empty",
                Self::NAME
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Everything the core engine produced.
#[derive(Debug, Clone, Serialize)]
pub struct EngineReport {
    pub dialect: Dialect,
    /// `<target>/<dialect>` the outputs were written under.
    pub target_folder: PathBuf,
    pub metadata_folder: PathBuf,
    pub log_file: PathBuf,
    /// Set when the analyzer ran.
    pub analyzer_report: Option<PathBuf>,
    pub scripts: Vec<ScriptReport>,
    pub summary_csv: PathBuf,
    /// Formatted scripts and notebooks written by post-processing.
    pub generated: Vec<PathBuf>,
}

impl EngineReport {
    /// Scripts with a failed transpile or post-processing status.
    pub fn failed_scripts(&self) -> usize {
        self.scripts
            .iter()
            .filter(|s| {
                matches!(s.transpile, StepStatus::Failed { .. })
                    || matches!(s.post_process, StepStatus::Failed { .. })
            })
            .count()
    }
}

impl Handoff for EngineReport {
    const NAME: &'static str = "engine report";

    fn validate(&self) -> Result<()> {
        require_dialect(Self::NAME, &self.dialect)?;
        require_path(Self::NAME, "log_file", &self.log_file)?;
        require_path(Self::NAME, "summary_csv", &self.summary_csv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> InputSelection {
        InputSelection {
            dialect: Dialect::new("synapse"),
            input_folder: PathBuf::from("/p/input/synapse"),
            output_folder: PathBuf::from("/p/output/synapse"),
            files: vec![PathBuf::from("/p/input/synapse/a.sql")],
        }
    }

    #[test]
    fn input_selection_requires_files() {
        assert!(selection().validate().is_ok());

        let empty = InputSelection {
            files: vec![],
            ..selection()
        };
        let err = empty.validate().unwrap_err();
        assert!(err.to_string().contains("`files` must not be empty"));
    }

    #[test]
    fn input_selection_rejects_files_outside_folder() {
        let stray = InputSelection {
            files: vec![PathBuf::from("/elsewhere/a.sql")],
            ..selection()
        };
        assert!(stray.validate().is_err());
    }

    #[test]
    fn path_selection_requires_every_path() {
        let sel = PathSelection {
            source_root: PathBuf::from("/p/input"),
            target_root: PathBuf::new(),
            config_file: PathBuf::from("/p/config/config.yaml"),
        };
        let err = sel.validate().unwrap_err();
        assert!(err.to_string().contains("target_root"));
    }

    #[test]
    fn preprocess_output_requires_files_and_dialect() {
        let out = PreprocessOutput {
            dialect: Dialect::new("synapse"),
            processed_files: BTreeMap::new(),
            staging_folder: PathBuf::from("/p/output/synapse/preprocessed"),
            output_folder: PathBuf::from("/p/output/synapse"),
        };
        assert!(out.validate().is_err());

        let mut files = BTreeMap::new();
        files.insert(
            PathBuf::from("/p/input/synapse/a.sql"),
            PathBuf::from("/p/output/synapse/preprocessed/a.sql"),
        );
        let ok = PreprocessOutput {
            processed_files: files.clone(),
            ..out.clone()
        };
        assert!(ok.validate().is_ok());

        let no_dialect = PreprocessOutput {
            dialect: Dialect::new(" "),
            processed_files: files,
            ..out
        };
        assert!(no_dialect.validate().unwrap_err().to_string().contains("dialect"));
    }
}
