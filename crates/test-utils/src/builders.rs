#![allow(dead_code)]

use taskmill::config::{RawTaskfile, TaskConfig, Taskfile};
use taskmill::types::{ChangeKind, QueueMode};

/// Builder for `Taskfile` to simplify test setup.
pub struct TaskfileBuilder {
    raw: RawTaskfile,
}

impl TaskfileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawTaskfile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.raw.task.insert(name.to_string(), task);
        self
    }

    pub fn settle(mut self, val: bool) -> Self {
        self.raw.config.settle = val;
        self
    }

    pub fn default_task(mut self, name: &str) -> Self {
        self.raw.config.default_task = name.to_string();
        self
    }

    pub fn watch_delay_ms(mut self, ms: u64) -> Self {
        self.raw.watch.delay_ms = ms;
        self
    }

    pub fn watch_events(mut self, events: &[ChangeKind]) -> Self {
        self.raw.watch.events = events.to_vec();
        self
    }

    pub fn queue(mut self, mode: QueueMode) -> Self {
        self.raw.watch.queue = mode;
        self
    }

    pub fn raw(self) -> RawTaskfile {
        self.raw
    }

    pub fn build(self) -> Taskfile {
        Taskfile::try_from(self.raw).expect("Failed to build valid Taskfile from builder")
    }
}

impl Default for TaskfileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn cmd(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: Some(cmd.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn series(members: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                series: Some(members.iter().map(|m| m.to_string()).collect()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn parallel(members: &[&str]) -> Self {
        Self {
            task: TaskConfig {
                parallel: Some(members.iter().map(|m| m.to_string()).collect()),
                ..TaskConfig::default()
            },
        }
    }

    pub fn run_once(mut self) -> Self {
        self.task.run_once = true;
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.task.watch.push(pattern.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
