//! Core domain types for accelerator runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the run manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Source technologies the lakebridge CLI accepts for `--source-tech`.
pub const SUPPORTED_DIALECTS: &[&str] = &[
    "abinitio",
    "adf",
    "alteryx",
    "athena",
    "bigquery",
    "cloudera_impala",
    "datastage",
    "greenplum",
    "hive",
    "ibm_db2",
    "ms_sql_server",
    "netezza",
    "oozie",
    "oracle",
    "oracle_data_integrator",
    "pentahodi",
    "pig",
    "presto",
    "pyspark",
    "redshift",
    "sap_hana_calcviews",
    "snowflake",
    "sp_ss",
    "sqoop",
    "ssis",
    "ssrs",
    "synapse",
    "talend",
    "teradata",
    "vertica",
];

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for pipeline run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Dialect
// ---------------------------------------------------------------------------

/// A normalised source dialect name, usable as a folder name and CLI value.
///
/// Normalisation trims, lower-cases and replaces spaces with `_`, so
/// `"MS SQL Server"` becomes `ms_sql_server`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Dialect(String);

impl Dialect {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase().replace(' ', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the lakebridge CLI knows this source technology.
    pub fn is_supported(&self) -> bool {
        SUPPORTED_DIALECTS.contains(&self.0.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Dialect {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<Dialect> for String {
    fn from(d: Dialect) -> Self {
        d.0
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// StepStatus
// ---------------------------------------------------------------------------

/// Outcome of one stage, for a whole step or a single script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Skipped,
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl StepStatus {
    pub fn failed() -> Self {
        Self::Failed { reason: None }
    }

    pub fn failed_with(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: Some(reason.into()),
        }
    }

    /// Status used when a stage produced nothing for a script: `Skipped` if
    /// the stage was disabled, `Failed` otherwise.
    pub fn missing(stage_enabled: bool) -> Self {
        if stage_enabled {
            Self::failed()
        } else {
            Self::Skipped
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("Success"),
            Self::Skipped => f.write_str("Skipped"),
            Self::Failed { reason: None } => f.write_str("Failed"),
            Self::Failed {
                reason: Some(reason),
            } => write!(f, "Failed: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptReport
// ---------------------------------------------------------------------------

/// Per-script statuses across the engine stages (one summary CSV row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptReport {
    /// File name of the SQL script (no directory).
    pub script: String,
    pub analyzer: StepStatus,
    pub transpile: StepStatus,
    pub post_process: StepStatus,
    pub upload: StepStatus,
}

// ---------------------------------------------------------------------------
// RunManifest
// ---------------------------------------------------------------------------

/// The `run_manifest.json` written to the metadata folder after each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    pub run_id: RunId,
    /// Tool version that produced this run.
    pub tool_version: String,
    pub dialect: Dialect,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Pipeline steps in execution order.
    pub steps: Vec<StepRecord>,
    /// Per-script outcomes.
    #[serde(default)]
    pub scripts: Vec<ScriptReport>,
    /// Generated files with checksums.
    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,
}

/// One executed pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    #[serde(flatten)]
    pub status: StepStatus,
    pub elapsed_ms: u64,
}

/// A generated file recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Path relative to the dialect target folder.
    pub path: String,
    pub sha256: String,
    pub size_bytes: u64,
}
