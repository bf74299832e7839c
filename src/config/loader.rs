// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{RawTaskfile, Taskfile};
use crate::errors::Result;

pub const DEFAULT_TASKFILE: &str = "Taskfile.toml";

/// Read and deserialize a Taskfile without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawTaskfile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> Result<RawTaskfile> {
    Ok(toml::from_str(contents)?)
}

/// Load a Taskfile and validate it.
///
/// - Reads TOML and applies defaults.
/// - Checks that every task has exactly one body.
/// - Checks composition members exist and do not form cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Taskfile> {
    let raw = load_from_path(&path)?;
    let taskfile = Taskfile::try_from(raw)?;
    debug!(
        path = %path.as_ref().display(),
        tasks = taskfile.tasks().len(),
        "taskfile loaded"
    );
    Ok(taskfile)
}
