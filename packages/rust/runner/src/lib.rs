//! External command execution for the accelerator.
//!
//! This crate provides:
//! - [`ExternalCommand`]: an argv-based process invocation with timeout and
//!   output capture, returning a structured [`CommandOutcome`]
//! - [`FailurePolicy`]: abort-on-failure vs. record-and-continue
//! - [`LakebridgeCli`] / [`powershell_script`]: the concrete invocations the
//!   pipeline makes

pub mod builders;
pub mod command;

pub use builders::{LakebridgeCli, powershell_script};
pub use command::{
    CommandOutcome, ExternalCommand, FailurePolicy, OutputMode, find_on_path, require_program,
};
