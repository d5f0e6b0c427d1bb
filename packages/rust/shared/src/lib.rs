//! Shared types, error model, and configuration for the accelerator.
//!
//! This crate is the foundation depended on by all other accelerator crates.
//! It provides:
//! - [`AcceleratorError`]: the unified error type and its exit codes
//! - Domain types ([`Dialect`], [`RunId`], [`StepStatus`], [`RunManifest`])
//! - Configuration ([`AcceleratorConfig`], [`EngineSettings`], config loading)
//! - The project folder convention ([`ProjectLayout`])

pub mod config;
pub mod error;
pub mod layout;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AcceleratorConfig, ConfigWrite, EngineSettings, UploadConfig, init_config, load_config_from,
    save_config, update_paths,
};
pub use error::{AcceleratorError, Result};
pub use layout::ProjectLayout;
pub use types::{
    ArtifactRecord, CURRENT_SCHEMA_VERSION, Dialect, RunId, RunManifest, SUPPORTED_DIALECTS,
    ScriptReport, StepRecord, StepStatus,
};
