// src/taskfile.rs

//! Turning a validated [`Taskfile`] into declared tasks and watches.

use std::path::Path;

use tracing::{debug, info};

use crate::config::{TaskBody, Taskfile};
use crate::errors::{Result, TaskmillError};
use crate::exec::shell_task;
use crate::orchestrator::{Orchestrator, Settings};
use crate::registry::{TaskOptions, TaskSource};
use crate::watch::WatchHandle;

impl Taskfile {
    /// Orchestrator settings described by `[config]`.
    pub fn settings(&self) -> Settings {
        Settings {
            settle: self.config.settle,
            time_resolution: self
                .config
                .time_resolution_ms
                .map(std::time::Duration::from_millis),
        }
    }
}

/// Declare every Taskfile task on `orchestrator`, members first.
pub fn declare_taskfile(orchestrator: &Orchestrator, taskfile: &Taskfile) -> Result<()> {
    for name in taskfile.declaration_order() {
        let config = &taskfile.tasks()[name];
        let body = config.body().ok_or_else(|| {
            TaskmillError::ConfigError(format!("task '{name}' has no body"))
        })?;

        let source: TaskSource = match body {
            TaskBody::Cmd(cmd) => shell_task(cmd).into(),
            TaskBody::Series(members) => orchestrator.series(members)?.into(),
            TaskBody::Parallel(members) => orchestrator.parallel(members)?.into(),
        };

        let options = TaskOptions {
            run_once: config.run_once,
        };
        orchestrator.declare_task_with(name, source, options)?;
        debug!(task = %name, "declared from taskfile");
    }
    Ok(())
}

/// Start one watch subscription per task with `watch` globs.
pub fn watch_taskfile(
    orchestrator: &Orchestrator,
    taskfile: &Taskfile,
    root: &Path,
) -> Result<Vec<WatchHandle>> {
    let options = taskfile.watch_options();
    let mut handles = Vec::new();
    for (name, globs) in taskfile.watched_tasks() {
        info!(task = %name, ?globs, "watching");
        handles.push(orchestrator.watch(root, globs, &options, name)?);
    }
    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_from_str;

    #[test]
    fn declares_every_task() {
        let raw = load_from_str(
            r#"
            [task.default]
            series = ["clean", "build"]

            [task.clean]
            cmd = "true"
            run_once = true

            [task.build]
            parallel = ["clean"]
            "#,
        )
        .unwrap();
        let taskfile = Taskfile::try_from(raw).unwrap();
        let orchestrator = Orchestrator::with_settings(taskfile.settings());

        declare_taskfile(&orchestrator, &taskfile).unwrap();
        assert_eq!(orchestrator.list(), vec!["build", "clean", "default"]);
        assert!(orchestrator.task("clean").unwrap().is_run_once());

        let tree = orchestrator.tree(true);
        let default = tree.nodes.iter().find(|n| n.label == "default").unwrap();
        assert_eq!(default.nodes[0].label, "<series>");
    }
}
