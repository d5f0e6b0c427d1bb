//! Step 2.5: confirm or override the source and target roots, then record
//! them in the config file.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use accelerator_discovery::ensure_dir;
use accelerator_shared::{ProjectLayout, Result, update_paths};

use crate::handoff::{Handoff, PathSelection};
use crate::prompt::{Prompter, confirm};

/// Ask for the source and target roots and write them to `config_file`.
///
/// The defaults are `<root>/input` and `<root>/output`. Relative answers
/// resolve against the project root; a blank answer keeps the default.
#[instrument(skip_all, fields(root = %layout.root().display()))]
pub fn setup_paths(
    layout: &ProjectLayout,
    config_file: &Path,
    prompter: &mut dyn Prompter,
) -> Result<PathSelection> {
    let default_source = layout.input_dir();
    let default_target = layout.output_dir();

    prompter.show(&format!("Default source path: {}", default_source.display()));
    prompter.show(&format!("Default target path: {}", default_target.display()));

    let (source, target) = if confirm(prompter, "Are these paths correct? (y/n): ")? {
        (default_source, default_target)
    } else {
        let source = ask_path(prompter, "Enter source path", &default_source)?;
        let target = ask_path(prompter, "Enter target path", &default_target)?;
        (layout.resolve(&source), layout.resolve(&target))
    };

    ensure_dir(&source)?;
    ensure_dir(&target)?;

    let write = update_paths(config_file, &source, &target)?;
    info!(
        source = %source.display(),
        target = %target.display(),
        config = %config_file.display(),
        ?write,
        "paths recorded"
    );
    prompter.show(&format!("Config updated: {}", config_file.display()));

    let selection = PathSelection {
        source_root: source,
        target_root: target,
        config_file: config_file.to_path_buf(),
    };
    selection.validate()?;
    Ok(selection)
}

fn ask_path(prompter: &mut dyn Prompter, label: &str, default: &Path) -> Result<PathBuf> {
    let answer = prompter.ask(&format!("{label} [{}]: ", default.display()))?;
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.to_path_buf()
    } else {
        PathBuf::from(answer)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{AutoAccept, ScriptedPrompter};
    use accelerator_shared::{ConfigWrite, load_config_from};

    #[test]
    fn accepting_defaults_creates_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ProjectLayout::new(dir.path());
        let config_file = layout.config_file();

        let sel = setup_paths(&layout, &config_file, &mut AutoAccept::default()).expect("paths");
        assert_eq!(sel.source_root, layout.input_dir());
        assert!(sel.target_root.is_dir());

        let config = load_config_from(&config_file).expect("load");
        assert_eq!(config.source_path, Some(layout.input_dir()));
        assert_eq!(config.profile.as_deref(), Some("lakebridge"));
    }

    #[test]
    fn custom_paths_resolve_against_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ProjectLayout::new(dir.path());
        let config_file = layout.config_file();

        let mut prompter = ScriptedPrompter::new(["n", "src", ""]);
        let sel = setup_paths(&layout, &config_file, &mut prompter).expect("paths");

        assert_eq!(sel.source_root, dir.path().join("src"));
        assert_eq!(sel.target_root, layout.output_dir());
        assert!(dir.path().join("src").is_dir());
        assert_eq!(prompter.remaining(), 0);
        assert!(prompter.questions[1].starts_with("Enter source path"));
    }

    #[test]
    fn existing_config_keeps_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = ProjectLayout::new(dir.path());
        let config_file = layout.config_file();
        std::fs::create_dir_all(layout.config_dir()).expect("mkdir");
        std::fs::write(&config_file, "dialect: oracle\ncustom_key: 42\n").expect("write");

        setup_paths(&layout, &config_file, &mut AutoAccept::default()).expect("paths");

        let text = std::fs::read_to_string(&config_file).expect("read");
        assert!(text.contains("custom_key: 42"), "{text}");
        assert!(text.contains("dialect: oracle"), "{text}");
        assert_eq!(
            update_paths(&config_file, &layout.input_dir(), &layout.output_dir()).expect("update"),
            ConfigWrite::Updated
        );
    }
}
