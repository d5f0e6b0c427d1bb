//! `run_manifest.json`: the record of one pipeline run.

use std::path::{Path, PathBuf};

use accelerator_shared::{
    AcceleratorError, ArtifactRecord, CURRENT_SCHEMA_VERSION, Result, RunManifest,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::write_atomic;

pub const MANIFEST_FILE_NAME: &str = "run_manifest.json";

/// Hash a generated file. The recorded path is relative to `base` when the
/// file lives under it.
pub fn checksum_file(path: &Path, base: &Path) -> Result<ArtifactRecord> {
    let bytes = std::fs::read(path).map_err(|e| AcceleratorError::io(path, e))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = format!("{:x}", hasher.finalize());

    let shown = path.strip_prefix(base).unwrap_or(path);
    debug!(file = %shown.display(), size = bytes.len(), "checksummed artifact");

    Ok(ArtifactRecord {
        path: shown.to_string_lossy().replace('\\', "/"),
        sha256,
        size_bytes: bytes.len() as u64,
    })
}

/// Checksum every file that exists. Missing paths are skipped.
pub fn checksum_files(paths: &[PathBuf], base: &Path) -> Result<Vec<ArtifactRecord>> {
    paths
        .iter()
        .filter(|p| p.is_file())
        .map(|p| checksum_file(p, base))
        .collect()
}

/// Write the manifest into `dir`, replacing any earlier one atomically.
#[instrument(skip_all, fields(run_id = %manifest.run_id, dir = %dir.display()))]
pub fn write_manifest(dir: &Path, manifest: &RunManifest) -> Result<PathBuf> {
    let path = dir.join(MANIFEST_FILE_NAME);
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| AcceleratorError::Artifact(format!("serialize manifest: {e}")))?;
    write_atomic(&path, json.as_bytes())?;

    info!(
        steps = manifest.steps.len(),
        scripts = manifest.scripts.len(),
        artifacts = manifest.artifacts.len(),
        "run manifest written"
    );
    Ok(path)
}

/// Read a manifest back and check its schema version.
pub fn read_manifest(path: &Path) -> Result<RunManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| AcceleratorError::io(path, e))?;
    let manifest: RunManifest = serde_json::from_str(&content)
        .map_err(|e| AcceleratorError::validation(format!("invalid {MANIFEST_FILE_NAME}: {e}")))?;

    if manifest.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(AcceleratorError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }
    Ok(manifest)
}
