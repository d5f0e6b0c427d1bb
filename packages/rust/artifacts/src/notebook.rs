//! Databricks notebook rendering.

use std::path::{Path, PathBuf};

use accelerator_shared::{AcceleratorError, Result};
use tracing::debug;

use crate::write_atomic;

/// Render a Python notebook that runs `sql` through `spark.sql`.
///
/// The SQL is embedded in a triple-quoted string, so backslashes and any
/// `"""` inside it are escaped.
pub fn render_notebook(source_name: &str, sql: &str) -> String {
    let body = escape_triple_quoted(sql.trim_end());
    let source = escape_triple_quoted(source_name);
    format!(
        "# Databricks notebook source\n\
         \"\"\"\nAuto-generated from {source}\n\"\"\"\n\n\
         sql_query = \"\"\"\n{body}\n\"\"\"\n\
         display(spark.sql(sql_query))\n"
    )
}

/// Notebook file name for a script: its stem with a `.py` extension.
pub fn notebook_file_name(script: &Path) -> Result<String> {
    let stem = script
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AcceleratorError::Artifact(format!("no file stem in {}", script.display()))
        })?;
    Ok(format!("{stem}.py"))
}

/// Render and write the notebook for `script` into `dir`.
pub fn write_notebook(dir: &Path, script: &Path, sql: &str) -> Result<PathBuf> {
    let source_name = script
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let target = dir.join(notebook_file_name(script)?);
    write_atomic(&target, render_notebook(&source_name, sql).as_bytes())?;
    debug!(notebook = %target.display(), "notebook written");
    Ok(target)
}

fn escape_triple_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notebook_layout() {
        let nb = render_notebook("orders.sql", "SELECT 1;\n");
        assert_eq!(
            nb,
            "# Databricks notebook source\n\"\"\"\nAuto-generated from orders.sql\n\"\"\"\n\n\
             sql_query = \"\"\"\nSELECT 1;\n\"\"\"\ndisplay(spark.sql(sql_query))\n"
        );
    }

    #[test]
    fn triple_quotes_are_escaped() {
        let nb = render_notebook("a.sql", "SELECT '\"\"\"' AS q, 'C:\\tmp' AS p");
        assert!(nb.contains("'\\\"\\\"\\\"' AS q"), "{nb}");
        assert!(nb.contains("'C:\\\\tmp'"), "{nb}");
        // Only the wrapper quotes remain unescaped.
        assert_eq!(nb.matches("\"\"\"").count(), 4);
    }

    #[test]
    fn file_name_uses_stem() {
        assert_eq!(
            notebook_file_name(Path::new("/out/Converted_Code/dim.orders.sql")).expect("name"),
            "dim.orders.py"
        );
        assert!(notebook_file_name(Path::new("/")).is_err());
    }

    #[test]
    fn writes_into_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_notebook(dir.path(), Path::new("x/report.sql"), "SELECT 2").expect("write");
        assert_eq!(path, dir.path().join("report.py"));
        let text = std::fs::read_to_string(&path).expect("read");
        assert!(text.contains("Auto-generated from report.sql"));
    }
}
