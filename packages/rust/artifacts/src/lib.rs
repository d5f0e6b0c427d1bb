//! Output files produced by the engine: notebooks, the summary CSV, and
//! the run manifest.
//!
//! Every file is written atomically (temp file, then rename) so an
//! interrupted run never leaves a half-written artifact behind.

pub mod manifest;
pub mod notebook;
pub mod summary;

use std::path::Path;

use accelerator_shared::{AcceleratorError, Result};

pub use manifest::{MANIFEST_FILE_NAME, checksum_file, checksum_files, read_manifest, write_manifest};
pub use notebook::{notebook_file_name, render_notebook, write_notebook};
pub use summary::{SUMMARY_HEADER, StageFlags, StatusTable, render_summary, write_summary};

/// Write `bytes` to `path` through a sibling temp file and a rename.
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent).map_err(|e| AcceleratorError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| AcceleratorError::Artifact(format!("not a file path: {}", path.display())))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    let temp = path.with_file_name(temp_name);

    std::fs::write(&temp, bytes).map_err(|e| AcceleratorError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| AcceleratorError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a").join("b").join("out.txt");
        write_atomic(&path, b"one").expect("first");
        write_atomic(&path, b"two").expect("second");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "two");
        assert!(!path.with_file_name(".out.txt.tmp").exists());
    }
}
