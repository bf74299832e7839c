// src/types.rs

//! Small shared types: task names and ids, the dynamic task value, and the
//! watch-related enums that are also read from the Taskfile.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;

use crate::errors::TaskError;

/// Canonical task name type.
pub type TaskName = String;

/// Opaque identity of a task handle.
///
/// Identities are allocated from a process-wide counter, so two handles
/// wrapping the same closure still have distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

impl TaskId {
    pub(crate) fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Value a task resolves with.
///
/// `Error` only exists so that a body can *return* a failure as a value; the
/// adapter turns it into a rejection before anything else sees it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TaskValue {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<TaskValue>),
    Error(TaskError),
}

impl TaskValue {
    pub fn is_unit(&self) -> bool {
        matches!(self, TaskValue::Unit)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            TaskValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TaskValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[TaskValue]> {
        match self {
            TaskValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<()> for TaskValue {
    fn from(_: ()) -> Self {
        TaskValue::Unit
    }
}

impl From<bool> for TaskValue {
    fn from(v: bool) -> Self {
        TaskValue::Bool(v)
    }
}

impl From<i64> for TaskValue {
    fn from(v: i64) -> Self {
        TaskValue::Int(v)
    }
}

impl From<i32> for TaskValue {
    fn from(v: i32) -> Self {
        TaskValue::Int(i64::from(v))
    }
}

impl From<f64> for TaskValue {
    fn from(v: f64) -> Self {
        TaskValue::Float(v)
    }
}

impl From<&str> for TaskValue {
    fn from(v: &str) -> Self {
        TaskValue::Text(v.to_string())
    }
}

impl From<String> for TaskValue {
    fn from(v: String) -> Self {
        TaskValue::Text(v)
    }
}

impl From<Vec<TaskValue>> for TaskValue {
    fn from(v: Vec<TaskValue>) -> Self {
        TaskValue::List(v)
    }
}

impl From<TaskError> for TaskValue {
    fn from(err: TaskError) -> Self {
        TaskValue::Error(err)
    }
}

/// What happens to a watch trigger that arrives while the payload is busy.
///
/// - `Queued`: remember it and run the payload again once the current run
///   finishes; every trigger runs exactly once, in order (default).
/// - `Singleton`: drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    #[default]
    #[serde(alias = "queue")]
    Queued,
    Singleton,
}

impl FromStr for QueueMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queued" | "queue" => Ok(QueueMode::Queued),
            "singleton" => Ok(QueueMode::Singleton),
            other => Err(format!(
                "invalid queue mode: {other} (expected \"queued\" or \"singleton\")"
            )),
        }
    }
}

/// Kind of a raw filesystem change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Add,
    Change,
    Unlink,
    #[serde(rename = "adddir")]
    AddDir,
    #[serde(rename = "unlinkdir")]
    UnlinkDir,
}

impl ChangeKind {
    /// Kinds a watch subscription listens to unless told otherwise.
    pub fn defaults() -> Vec<ChangeKind> {
        vec![ChangeKind::Add, ChangeKind::Change, ChangeKind::Unlink]
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "add" => Ok(ChangeKind::Add),
            "change" => Ok(ChangeKind::Change),
            "unlink" => Ok(ChangeKind::Unlink),
            "adddir" => Ok(ChangeKind::AddDir),
            "unlinkdir" => Ok(ChangeKind::UnlinkDir),
            other => Err(format!("invalid change kind: {other}")),
        }
    }
}

/// A single raw change notification as produced by the filesystem watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_unique() {
        let a = TaskId::next();
        let b = TaskId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn queue_mode_parses_both_spellings() {
        assert_eq!("queue".parse::<QueueMode>(), Ok(QueueMode::Queued));
        assert_eq!(" Singleton ".parse::<QueueMode>(), Ok(QueueMode::Singleton));
        assert!("later".parse::<QueueMode>().is_err());
    }

    #[test]
    fn change_kind_parses() {
        assert_eq!("unlinkDir".parse::<ChangeKind>(), Ok(ChangeKind::UnlinkDir));
        assert!("rename".parse::<ChangeKind>().is_err());
    }
}
