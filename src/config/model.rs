// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{ChangeKind, QueueMode, TaskName};
use crate::watch::WatchOptions;

/// Taskfile as read from TOML, before validation.
///
/// ```toml
/// [config]
/// settle = false
/// time_resolution_ms = 1000
/// default_task = "default"
///
/// [watch]
/// delay_ms = 200
/// events = ["add", "change", "unlink"]
/// queue = "queued"
///
/// [task.clean]
/// cmd = "rm -rf dist"
/// run_once = true
///
/// [task.build]
/// series = ["clean", "compile"]
/// watch = ["src/**/*.rs", "!src/generated/**"]
/// ```
///
/// All sections are optional and have defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTaskfile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub watch: WatchSection,

    /// Keys are task names.
    #[serde(default)]
    pub task: BTreeMap<TaskName, TaskConfig>,
}

/// A validated Taskfile. Construct through `TryFrom<RawTaskfile>`.
#[derive(Debug, Clone)]
pub struct Taskfile {
    pub config: ConfigSection,
    pub watch: WatchSection,
    pub task: BTreeMap<TaskName, TaskConfig>,
    /// Task names ordered so that composition members come before the
    /// compositions referring to them.
    order: Vec<TaskName>,
}

impl Taskfile {
    pub(crate) fn new_unchecked(raw: RawTaskfile, order: Vec<TaskName>) -> Self {
        Self {
            config: raw.config,
            watch: raw.watch,
            task: raw.task,
            order,
        }
    }

    pub fn tasks(&self) -> &BTreeMap<TaskName, TaskConfig> {
        &self.task
    }

    pub fn declaration_order(&self) -> &[TaskName] {
        &self.order
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            delay: Duration::from_millis(self.watch.delay_ms),
            events: self.watch.events.clone(),
            queue: self.watch.queue,
        }
    }

    /// Tasks that declare watch globs, in name order.
    pub fn watched_tasks(&self) -> impl Iterator<Item = (&TaskName, &[String])> {
        self.task
            .iter()
            .filter(|(_, t)| !t.watch.is_empty())
            .map(|(name, t)| (name, t.watch.as_slice()))
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Use settle variants for every `series` / `parallel` composition.
    #[serde(default)]
    pub settle: bool,

    /// Rounding applied by `last_run` when the caller passes none.
    #[serde(default)]
    pub time_resolution_ms: Option<u64>,

    /// Task run when no task names are given on the command line.
    #[serde(default = "default_task_name")]
    pub default_task: TaskName,
}

fn default_task_name() -> TaskName {
    "default".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            settle: false,
            time_resolution_ms: None,
            default_task: default_task_name(),
        }
    }
}

/// `[watch]` section, shared by every watched task.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "ChangeKind::defaults")]
    pub events: Vec<ChangeKind>,

    #[serde(default)]
    pub queue: QueueMode,
}

fn default_delay_ms() -> u64 {
    200
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            events: ChangeKind::defaults(),
            queue: QueueMode::default(),
        }
    }
}

/// `[task.<name>]` section.
///
/// Exactly one of `cmd`, `series` and `parallel` must be set.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Shell command to run.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Names of tasks to run one after another.
    #[serde(default)]
    pub series: Option<Vec<TaskName>>,

    /// Names of tasks to run concurrently.
    #[serde(default)]
    pub parallel: Option<Vec<TaskName>>,

    #[serde(default)]
    pub run_once: bool,

    /// Globs that re-run this task on change (`!` excludes).
    #[serde(default)]
    pub watch: Vec<String>,
}

/// The body a task config describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskBody<'a> {
    Cmd(&'a str),
    Series(&'a [TaskName]),
    Parallel(&'a [TaskName]),
}

impl TaskConfig {
    /// The configured body, or `None` unless exactly one is set.
    pub fn body(&self) -> Option<TaskBody<'_>> {
        match (&self.cmd, &self.series, &self.parallel) {
            (Some(cmd), None, None) => Some(TaskBody::Cmd(cmd)),
            (None, Some(members), None) => Some(TaskBody::Series(members)),
            (None, None, Some(members)) => Some(TaskBody::Parallel(members)),
            _ => None,
        }
    }

    /// Composition members (empty for `cmd` tasks).
    pub fn members(&self) -> &[TaskName] {
        match self.body() {
            Some(TaskBody::Series(m)) | Some(TaskBody::Parallel(m)) => m,
            _ => &[],
        }
    }
}
