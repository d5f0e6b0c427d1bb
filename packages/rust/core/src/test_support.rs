//! Fixtures shared by the process-level tests in this crate.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// A stand-in for the databricks CLI.
///
/// - `analyze` exits with the code stored in `analyze_exit` next to the
///   script (default 0), or sleeps when the file says `sleep`.
/// - `transpile` copies the input into the output folder, except scripts
///   named `bad*`.
/// - `workspace import` fails for notebooks named `noup*` and appends the
///   others to `imports.log`.
/// - Anything else, including `--help`, succeeds.
const FAKE_CLI: &str = r#"#!/bin/sh
here=$(dirname "$0")
case "$1 $2 $3" in
  "labs lakebridge analyze")
    code=$(cat "$here/analyze_exit" 2>/dev/null || echo 0)
    if [ "$code" = "sleep" ]; then sleep 5; exit 0; fi
    exit "$code" ;;
  "labs lakebridge transpile")
    shift 3
    while [ $# -gt 0 ]; do
      case "$1" in
        --input-source) input="$2"; shift 2 ;;
        --output-folder) out="$2"; shift 2 ;;
        *) shift ;;
      esac
    done
    case "$(basename "$input")" in bad*) echo "cannot convert" >&2; exit 1 ;; esac
    cp "$input" "$out/" ;;
  "workspace import --file")
    case "$(basename "$4")" in noup*) exit 1 ;; esac
    echo "$4 $5" >> "$here/imports.log" ;;
  *) exit 0 ;;
esac
"#;

/// Write an executable shell script into `dir`.
pub(crate) fn write_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    std::fs::create_dir_all(dir).expect("mkdir");
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

/// Install the fake CLI as `<dir>/databricks`.
pub(crate) fn fake_cli(dir: &Path) -> PathBuf {
    write_executable(dir, "databricks", FAKE_CLI)
}
