//! Pipeline configuration.
//!
//! The config lives at `<root>/config/config.yaml`. The engine reads it, and
//! the path-setup step rewrites its `source_path` / `target_path` keys.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{AcceleratorError, Result};
use crate::layout::ProjectLayout;
use crate::types::Dialect;

/// Default timeout for a single migration CLI call (six hours).
const DEFAULT_TIMEOUT_SECS: u64 = 21_600;

// ---------------------------------------------------------------------------
// Config structs (matching config.yaml schema)
// ---------------------------------------------------------------------------

/// Top-level config, deserialized from YAML.
///
/// [`Default`] is the template written when no config exists yet. It sets
/// the `lakebridge` profile. A file that omits `profile` runs without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceleratorConfig {
    /// Source dialect, e.g. `synapse`.
    #[serde(default = "default_dialect")]
    pub dialect: String,

    /// Databricks CLI profile passed as `-p`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Pass `--debug` to the migration CLI.
    #[serde(default)]
    pub debug: bool,

    /// Check the dialect source folder before analyzing.
    #[serde(default = "default_true")]
    pub run_validation: bool,

    #[serde(default = "default_true")]
    pub run_analyzer: bool,

    #[serde(default = "default_true")]
    pub run_transpiler: bool,

    /// Root holding `<dialect>/*.sql`. Defaults to `<root>/input`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,

    /// Root receiving `<dialect>/...` outputs. Defaults to `<root>/output`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,

    /// Program providing `labs lakebridge` and `workspace import`.
    #[serde(default = "default_cli_command")]
    pub cli_command: String,

    /// Per-call timeout for the migration CLI, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// PowerShell executable for the preflight/install scripts.
    #[serde(default = "default_powershell")]
    pub powershell: String,

    /// Interpreter for `preprocess.py` hooks.
    #[serde(default = "default_interpreter")]
    pub preprocessor_interpreter: String,

    /// Notebook upload settings.
    #[serde(default)]
    pub upload: UploadConfig,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            profile: Some("lakebridge".into()),
            debug: false,
            run_validation: true,
            run_analyzer: true,
            run_transpiler: true,
            source_path: None,
            target_path: None,
            cli_command: default_cli_command(),
            timeout_secs: default_timeout_secs(),
            powershell: default_powershell(),
            preprocessor_interpreter: default_interpreter(),
            upload: UploadConfig::default(),
        }
    }
}

fn default_dialect() -> String {
    "synapse".into()
}
fn default_true() -> bool {
    true
}
fn default_cli_command() -> String {
    "databricks".into()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_powershell() -> String {
    "powershell".into()
}
fn default_interpreter() -> String {
    "python".into()
}

/// `upload:` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Workspace folder notebooks are imported into.
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: String,

    /// `--language` value for `workspace import`.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workspace_dir: default_workspace_dir(),
            language: default_language(),
        }
    }
}

fn default_workspace_dir() -> String {
    "/Shared".into()
}
fn default_language() -> String {
    "PYTHON".into()
}

// ---------------------------------------------------------------------------
// Engine settings (runtime, resolved against the project layout)
// ---------------------------------------------------------------------------

/// Runtime settings, resolved from the config file and the project root.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub dialect: Dialect,
    /// `<source_root>/<dialect>`.
    pub source_path: PathBuf,
    /// `<target_root>/<dialect>`.
    pub target_path: PathBuf,
    /// Non-empty profile, if any.
    pub profile: Option<String>,
    pub debug: bool,
    pub run_validation: bool,
    pub run_analyzer: bool,
    pub run_transpiler: bool,
    pub cli_command: String,
    pub timeout: Duration,
    pub powershell: String,
    pub preprocessor_interpreter: String,
    pub upload: UploadConfig,
}

impl EngineSettings {
    /// Resolve a config against the project layout.
    pub fn resolve(config: &AcceleratorConfig, layout: &ProjectLayout) -> Result<Self> {
        let dialect = Dialect::new(&config.dialect);
        if dialect.is_empty() {
            return Err(AcceleratorError::config("dialect must not be empty"));
        }
        if !dialect.is_supported() {
            tracing::warn!(%dialect, "dialect is not a known lakebridge source technology");
        }
        if config.timeout_secs == 0 {
            return Err(AcceleratorError::config("timeout_secs must be greater than 0"));
        }

        let source_root = config
            .source_path
            .as_deref()
            .map(|p| layout.resolve(p))
            .unwrap_or_else(|| layout.input_dir());
        let target_root = config
            .target_path
            .as_deref()
            .map(|p| layout.resolve(p))
            .unwrap_or_else(|| layout.output_dir());

        let profile = config
            .profile
            .as_ref()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            source_path: source_root.join(dialect.as_str()),
            target_path: target_root.join(dialect.as_str()),
            dialect,
            profile,
            debug: config.debug,
            run_validation: config.run_validation,
            run_analyzer: config.run_analyzer,
            run_transpiler: config.run_transpiler,
            cli_command: config.cli_command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            powershell: config.powershell.clone(),
            preprocessor_interpreter: config.preprocessor_interpreter.clone(),
            upload: config.upload.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Whether a config write created the file or edited an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWrite {
    Created,
    Updated,
    /// The file existed and was left untouched.
    Kept,
}

/// Load the config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AcceleratorConfig> {
    if !path.exists() {
        return Err(AcceleratorError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| AcceleratorError::io(path, e))?;

    // An empty file is a config with every default.
    if content.trim().is_empty() {
        return serde_yaml::from_str("{}")
            .map_err(|e| AcceleratorError::config(e.to_string()));
    }

    serde_yaml::from_str(&content).map_err(|e| {
        AcceleratorError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a config to disk, creating the parent directory.
pub fn save_config(path: &Path, config: &AcceleratorConfig) -> Result<()> {
    let content =
        serde_yaml::to_string(config).map_err(|e| AcceleratorError::config(e.to_string()))?;
    write_config_text(path, &content)
}

/// Write the default config unless one already exists.
pub fn init_config(path: &Path) -> Result<ConfigWrite> {
    if path.exists() {
        tracing::debug!(?path, "config file already exists");
        return Ok(ConfigWrite::Kept);
    }
    save_config(path, &AcceleratorConfig::default())?;
    tracing::info!(?path, "created default config file");
    Ok(ConfigWrite::Created)
}

/// Set `source_path` and `target_path` in the config at `path`.
///
/// A missing config is created from the defaults. An existing one is edited
/// as a YAML mapping so every other key, known or not, is kept in place.
pub fn update_paths(path: &Path, source: &Path, target: &Path) -> Result<ConfigWrite> {
    if !path.exists() {
        let config = AcceleratorConfig {
            source_path: Some(source.to_path_buf()),
            target_path: Some(target.to_path_buf()),
            ..AcceleratorConfig::default()
        };
        save_config(path, &config)?;
        tracing::info!(?path, "created config with detected paths");
        return Ok(ConfigWrite::Created);
    }

    let content = std::fs::read_to_string(path).map_err(|e| AcceleratorError::io(path, e))?;
    let mut doc: Value = if content.trim().is_empty() {
        Value::Mapping(Mapping::new())
    } else {
        serde_yaml::from_str(&content).map_err(|e| {
            AcceleratorError::config(format!("failed to parse {}: {e}", path.display()))
        })?
    };

    if doc.is_null() {
        doc = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(map) = &mut doc else {
        return Err(AcceleratorError::config(format!(
            "{} is not a YAML mapping",
            path.display()
        )));
    };

    map.insert(
        Value::from("source_path"),
        Value::from(source.to_string_lossy().into_owned()),
    );
    map.insert(
        Value::from("target_path"),
        Value::from(target.to_string_lossy().into_owned()),
    );

    let content =
        serde_yaml::to_string(&doc).map_err(|e| AcceleratorError::config(e.to_string()))?;
    write_config_text(path, &content)?;
    tracing::info!(?path, "updated config with detected paths");
    Ok(ConfigWrite::Updated)
}

fn write_config_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AcceleratorError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| AcceleratorError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AcceleratorConfig::default();
        let yaml = serde_yaml::to_string(&config).expect("serialize default config");
        assert!(yaml.contains("dialect: synapse"));
        assert!(yaml.contains("profile: lakebridge"));
        assert!(yaml.contains("run_transpiler: true"));
    }

    #[test]
    fn absent_fields_use_defaults() {
        let config: AcceleratorConfig = serde_yaml::from_str("dialect: oracle\n").expect("parse");
        assert_eq!(config.dialect, "oracle");
        assert_eq!(config.profile, None);
        assert!(!config.debug);
        assert!(config.run_validation && config.run_analyzer && config.run_transpiler);
        assert_eq!(config.cli_command, "databricks");
        assert_eq!(config.timeout_secs, 21_600);
        assert_eq!(config.upload.workspace_dir, "/Shared");
    }

    #[test]
    fn missing_file_is_config_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_config_from(&dir.path().join("config.yaml")).unwrap_err();
        assert!(matches!(err, AcceleratorError::ConfigNotFound { .. }));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "dialect: [unclosed").expect("write");
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn settings_resolve_dialect_folders() {
        let layout = ProjectLayout::new("/work/accel");
        let config = AcceleratorConfig {
            dialect: "MS SQL Server".into(),
            profile: Some("  ".into()),
            source_path: Some("custom/in".into()),
            ..AcceleratorConfig::default()
        };

        let settings = EngineSettings::resolve(&config, &layout).expect("resolve");
        assert_eq!(settings.dialect.as_str(), "ms_sql_server");
        assert_eq!(
            settings.source_path,
            PathBuf::from("/work/accel/custom/in/ms_sql_server")
        );
        assert_eq!(
            settings.target_path,
            PathBuf::from("/work/accel/output/ms_sql_server")
        );
        assert_eq!(settings.profile, None);
        assert_eq!(settings.timeout, Duration::from_secs(21_600));
    }

    #[test]
    fn settings_reject_empty_dialect() {
        let layout = ProjectLayout::new("/work/accel");
        let config = AcceleratorConfig {
            dialect: "  ".into(),
            ..AcceleratorConfig::default()
        };
        assert!(EngineSettings::resolve(&config, &layout).is_err());
    }

    #[test]
    fn update_paths_creates_missing_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config").join("config.yaml");

        let write = update_paths(&path, Path::new("/data/in"), Path::new("/data/out"))
            .expect("update");
        assert_eq!(write, ConfigWrite::Created);

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.profile.as_deref(), Some("lakebridge"));
        assert_eq!(config.source_path, Some(PathBuf::from("/data/in")));
        assert_eq!(config.target_path, Some(PathBuf::from("/data/out")));
    }

    #[test]
    fn update_paths_preserves_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "dialect: teradata\nprofile: prod\nowner_team: migration\nsource_path: /old\n",
        )
        .expect("write");

        let write = update_paths(&path, Path::new("/new/in"), Path::new("/new/out"))
            .expect("update");
        assert_eq!(write, ConfigWrite::Updated);

        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.contains("owner_team: migration"));
        assert!(text.contains("source_path: /new/in"));
        assert!(!text.contains("/old"));

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.dialect, "teradata");
        assert_eq!(config.profile.as_deref(), Some("prod"));
        assert_eq!(config.target_path, Some(PathBuf::from("/new/out")));
    }

    #[test]
    fn init_config_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yaml");
        assert_eq!(init_config(&path).expect("init"), ConfigWrite::Created);
        std::fs::write(&path, "dialect: oracle\n").expect("write");
        assert_eq!(init_config(&path).expect("init"), ConfigWrite::Kept);
        assert_eq!(load_config_from(&path).expect("load").dialect, "oracle");
    }
}
