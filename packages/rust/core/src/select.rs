//! Step 4: interactive choice of dialect and input scripts.

use tracing::{info, instrument};

use accelerator_discovery::{FileSelection, file_name, list_files, select_files};
use accelerator_shared::{AcceleratorError, Dialect, ProjectLayout, Result, SUPPORTED_DIALECTS};

use crate::handoff::{Handoff, InputSelection};
use crate::prompt::{Prompter, confirm};

/// Walk the user through picking a dialect and the files to run.
///
/// An out-of-range dialect number or a declined output location cancels
/// the step. A missing or empty input folder, or an unknown file name, is an
/// error.
#[instrument(skip_all, fields(root = %layout.root().display()))]
pub fn select_inputs(layout: &ProjectLayout, prompter: &mut dyn Prompter) -> Result<InputSelection> {
    prompter.show("Available Dialects:");
    for (i, dialect) in SUPPORTED_DIALECTS.iter().enumerate() {
        prompter.show(&format!("  {}. {dialect}", i + 1));
    }

    let answer = prompter.ask("Select dialect number: ")?;
    let dialect = answer
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| SUPPORTED_DIALECTS.get(i))
        .map(|d| Dialect::new(d))
        .ok_or_else(|| AcceleratorError::Cancelled(format!("invalid dialect choice '{}'", answer.trim())))?;
    prompter.show(&format!("Selected Dialect: {dialect}"));

    let input_folder = layout.input_dir().join(dialect.as_str());
    if !input_folder.is_dir() {
        return Err(AcceleratorError::validation(format!(
            "input folder not found: {}",
            input_folder.display()
        )));
    }
    let files = list_files(&input_folder)?;
    if files.is_empty() {
        return Err(AcceleratorError::validation(format!(
            "no files found in {}",
            input_folder.display()
        )));
    }

    prompter.show(&format!("Files found in {}:", input_folder.display()));
    for file in &files {
        prompter.show(&format!("  - {}", file_name(file)));
    }

    let selection = if confirm(prompter, "Run ALL files? (y/n): ")? {
        FileSelection::All
    } else {
        let name = prompter.ask("Enter EXACT filename to run: ")?;
        FileSelection::Named(name.trim().to_string())
    };
    let selected = select_files(&files, &selection)?;

    let output_folder = layout.output_dir().join(dialect.as_str());
    prompter.show(&format!("Output will be generated in: {}", output_folder.display()));
    if !confirm(prompter, "Proceed with this output location? (y/n): ")? {
        return Err(AcceleratorError::Cancelled("output location not confirmed".into()));
    }

    info!(%dialect, files = selected.len(), "input selection complete");

    let result = InputSelection {
        dialect,
        input_folder,
        output_folder,
        files: selected,
    };
    result.validate()?;
    Ok(result)
}
