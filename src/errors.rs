// src/errors.rs

//! Crate-wide error types.
//!
//! There are two families:
//! - [`TaskmillError`] is returned synchronously when building things
//!   (declaring tasks, composing, loading a Taskfile, starting a watcher).
//! - [`TaskError`] is what a task *execution* fails with. It is cheap to
//!   clone because the same failure is handed to hooks, events, the settle
//!   aggregation and the caller.

use std::fmt;

use thiserror::Error;

use crate::types::TaskName;

#[derive(Error, Debug)]
pub enum TaskmillError {
    #[error("Invalid composition input: {0}")]
    CompositionInput(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    #[error("Task execution failed: {0}")]
    Execution(#[from] TaskError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskmillError>;

/// A task name could not be resolved against the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    pub name: TaskName,
    /// Registered names that are close to `name` by edit distance.
    pub suggestions: Vec<TaskName>,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task never defined: {}", self.name)?;
        if !self.suggestions.is_empty() {
            write!(f, " - did you mean? {}", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

/// Rejected task declaration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("Task with name \"{0}\" already exists")]
    TaskWithNameAlreadyExists(TaskName),

    #[error(
        "Task with name \"{0}\" is a callback task and is not allowed; declare it with a future, stream or plain return value instead"
    )]
    CallbackTaskIsNotAllowed(TaskName),

    #[error("Task name must be specified")]
    EmptyName,
}

/// Failure of a single task execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// The task body reported a failure (returned `Err`, called back with an
    /// error, returned an error value, or yielded an error from its stream).
    #[error("{0}")]
    Failed(String),

    /// The task body panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// A callback-style body dropped its completion handle without calling it.
    #[error("task completion callback was dropped without being called")]
    CallbackDropped,

    /// Failures collected by a nested settle composition.
    #[error("{}", describe_settled(.0))]
    Settled(Vec<TaskError>),
}

impl TaskError {
    pub fn msg(message: impl fmt::Display) -> Self {
        TaskError::Failed(message.to_string())
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        TaskError::Failed(format!("{err:#}"))
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        TaskError::Failed(err.to_string())
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        TaskError::Failed(message)
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        TaskError::Failed(message.to_string())
    }
}

fn describe_settled(errors: &[TaskError]) -> String {
    let joined = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} task(s) failed: {joined}", errors.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_error_lists_suggestions() {
        let err = ResolutionError {
            name: "clear".into(),
            suggestions: vec!["clean".into(), "clearall".into()],
        };
        assert_eq!(
            err.to_string(),
            "Task never defined: clear - did you mean? clean, clearall"
        );
    }

    #[test]
    fn resolution_error_without_suggestions() {
        let err = ResolutionError {
            name: "deploy".into(),
            suggestions: vec![],
        };
        assert_eq!(err.to_string(), "Task never defined: deploy");
    }

    #[test]
    fn settled_error_describes_every_failure() {
        let err = TaskError::Settled(vec![TaskError::msg("a"), TaskError::Panicked("b".into())]);
        assert_eq!(err.to_string(), "2 task(s) failed: a; task panicked: b");
    }

    #[test]
    fn execution_wraps_the_task_failure() {
        let err = TaskmillError::from(TaskError::msg("lint failed"));
        assert!(matches!(err, TaskmillError::Execution(_)));
        assert_eq!(err.to_string(), "Task execution failed: lint failed");
    }
}
