//! Per-script summary CSV.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use accelerator_shared::{AcceleratorError, Result, ScriptReport, StepStatus};
use tracing::{info, instrument};

use crate::write_atomic;

pub const SUMMARY_HEADER: [&str; 5] = [
    "Script Name",
    "Analyzer Status",
    "Transpile Status",
    "Post-process Status",
    "Upload Status",
];

/// Which engine stages ran. A stage that did not run reports `Skipped` for
/// scripts it has no status for; one that ran reports `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageFlags {
    pub analyzer: bool,
    pub transpiler: bool,
    pub upload: bool,
}

/// Status maps collected during an engine run, keyed by script file name.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    pub analyzer: BTreeMap<String, StepStatus>,
    pub transpile: BTreeMap<String, StepStatus>,
    pub post_process: BTreeMap<String, StepStatus>,
    pub upload: BTreeMap<String, StepStatus>,
}

impl StatusTable {
    /// One report per script seen by the analyzer or the transpiler, sorted
    /// by name.
    pub fn reports(&self, stages: StageFlags) -> Vec<ScriptReport> {
        let names: BTreeSet<&String> = self
            .analyzer
            .keys()
            .chain(self.transpile.keys())
            .collect();

        let lookup = |map: &BTreeMap<String, StepStatus>, name: &str, enabled: bool| {
            map.get(name)
                .cloned()
                .unwrap_or_else(|| StepStatus::missing(enabled))
        };

        names
            .into_iter()
            .map(|name| ScriptReport {
                script: name.clone(),
                analyzer: lookup(&self.analyzer, name.as_str(), stages.analyzer),
                transpile: lookup(&self.transpile, name.as_str(), stages.transpiler),
                post_process: lookup(&self.post_process, name.as_str(), stages.transpiler),
                upload: lookup(&self.upload, name.as_str(), stages.transpiler && stages.upload),
            })
            .collect()
    }
}

/// Render the summary as CSV text.
pub fn render_summary(reports: &[ScriptReport]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| AcceleratorError::Artifact(format!("summary csv: {e}"));

    writer.write_record(SUMMARY_HEADER).map_err(csv_err)?;
    for report in reports {
        writer
            .write_record([
                report.script.clone(),
                report.analyzer.to_string(),
                report.transpile.to_string(),
                report.post_process.to_string(),
                report.upload.to_string(),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AcceleratorError::Artifact(format!("summary csv: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AcceleratorError::Artifact(format!("summary csv: {e}")))
}

/// Write the summary CSV to `path`.
#[instrument(skip_all, fields(path = %path.display(), rows = reports.len()))]
pub fn write_summary(path: &Path, reports: &[ScriptReport]) -> Result<()> {
    let text = render_summary(reports)?;
    write_atomic(path, text.as_bytes())?;
    info!("summary written");
    Ok(())
}
