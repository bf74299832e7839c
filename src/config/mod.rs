// src/config/mod.rs

//! Taskfile loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a Taskfile from disk (`loader.rs`).
//! - Validate task bodies, member references and cycles (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_TASKFILE, load_and_validate, load_from_path, load_from_str};
pub use model::{ConfigSection, RawTaskfile, TaskBody, TaskConfig, Taskfile, WatchSection};
pub use validate::validate_taskfile;
