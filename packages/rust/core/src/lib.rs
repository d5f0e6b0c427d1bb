//! Pipeline steps and orchestration for the Lakebridge accelerator.
//!
//! Each step lives in its own module and hands a typed, validated result to
//! the next one (see [`handoff`]). [`pipeline::run_pipeline`] strings them
//! together for the `run` command; the CLI also exposes most steps on their
//! own.

pub mod engine;
pub mod handoff;
pub mod install;
pub mod paths;
pub mod pipeline;
pub mod preprocess;
pub mod prompt;
pub mod runlog;
pub mod select;

#[cfg(all(test, unix))]
mod test_support;

pub use engine::{EngineOptions, run_engine, run_engine_from_config};
pub use handoff::{EngineReport, Handoff, InputSelection, PathSelection, PreprocessOutput};
pub use install::{InstallOptions, stage_one, verify_installation};
pub use paths::setup_paths;
pub use pipeline::{ProgressReporter, RunOptions, RunResult, SilentProgress, run_pipeline};
pub use preprocess::run_preprocess;
pub use prompt::{AutoAccept, Prompter, ScriptedPrompter, StdinPrompter, confirm};
pub use runlog::RunLog;
pub use select::select_inputs;
