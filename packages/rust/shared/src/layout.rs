//! On-disk folder convention of an accelerator project.
//!
//! ```text
//! <root>/
//! ├── config/config.yaml
//! ├── scripts/preflight/preflight_interactive.ps1
//! ├── scripts/install/install_lakebridge.ps1
//! ├── input/<dialect>/*.sql
//! ├── output/<dialect>/
//! ├── dialects/<dialect>/preprocessor/preprocess.py
//! ├── temp/
//! └── logs/
//! ```

use std::path::{Path, PathBuf};

use crate::types::Dialect;

/// Paths of a project rooted at a single directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    /// Default config location (`config/config.yaml`).
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("config.yaml")
    }

    pub fn preflight_script(&self) -> PathBuf {
        self.root
            .join("scripts")
            .join("preflight")
            .join("preflight_interactive.ps1")
    }

    pub fn install_script(&self) -> PathBuf {
        self.root
            .join("scripts")
            .join("install")
            .join("install_lakebridge.ps1")
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn dialects_dir(&self) -> PathBuf {
        self.root.join("dialects")
    }

    /// Folder holding the preprocessing hook for one dialect.
    pub fn preprocessor_dir(&self, dialect: &Dialect) -> PathBuf {
        self.dialects_dir()
            .join(dialect.as_str())
            .join("preprocessor")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Resolve a configured path: absolute paths are kept, relative ones are
    /// taken from the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
