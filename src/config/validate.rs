// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{RawTaskfile, Taskfile};
use crate::errors::{Result, TaskmillError};
use crate::types::TaskName;

impl TryFrom<RawTaskfile> for Taskfile {
    type Error = TaskmillError;

    fn try_from(raw: RawTaskfile) -> std::result::Result<Self, Self::Error> {
        let order = validate_taskfile(&raw)?;
        Ok(Taskfile::new_unchecked(raw, order))
    }
}

/// Check a raw Taskfile and return the declaration order of its tasks.
pub fn validate_taskfile(cfg: &RawTaskfile) -> Result<Vec<TaskName>> {
    ensure_has_tasks(cfg)?;
    validate_watch_section(cfg)?;
    validate_task_bodies(cfg)?;
    validate_members(cfg)?;
    declaration_order(cfg)
}

fn ensure_has_tasks(cfg: &RawTaskfile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskmillError::ConfigError(
            "Taskfile must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch_section(cfg: &RawTaskfile) -> Result<()> {
    if cfg.watch.events.is_empty() {
        return Err(TaskmillError::ConfigError(
            "[watch].events must list at least one event kind".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_bodies(cfg: &RawTaskfile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.body().is_none() {
            return Err(TaskmillError::ConfigError(format!(
                "task '{name}' must set exactly one of `cmd`, `series` or `parallel`"
            )));
        }
        if task.series.as_ref().or(task.parallel.as_ref()).is_some_and(Vec::is_empty) {
            return Err(TaskmillError::ConfigError(format!(
                "task '{name}' combines no tasks"
            )));
        }
    }
    Ok(())
}

fn validate_members(cfg: &RawTaskfile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for member in task.members() {
            if member == name {
                return Err(TaskmillError::ConfigError(format!(
                    "task '{name}' cannot refer to itself"
                )));
            }
            if !cfg.task.contains_key(member) {
                return Err(TaskmillError::ConfigError(format!(
                    "task '{name}' refers to unknown task '{member}'"
                )));
            }
        }
    }
    Ok(())
}

/// Edge direction: member -> composition, so a topological order declares
/// members first.
fn declaration_order(cfg: &RawTaskfile) -> Result<Vec<TaskName>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }
    for (name, task) in cfg.task.iter() {
        for member in task.members() {
            graph.add_edge(member.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(TaskmillError::TaskCycle(format!(
            "task '{}' is part of a reference cycle",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::TaskConfig;

    fn cmd(c: &str) -> TaskConfig {
        TaskConfig {
            cmd: Some(c.to_string()),
            ..TaskConfig::default()
        }
    }

    fn series(members: &[&str]) -> TaskConfig {
        TaskConfig {
            series: Some(members.iter().map(|m| m.to_string()).collect()),
            ..TaskConfig::default()
        }
    }

    fn raw(tasks: Vec<(&str, TaskConfig)>) -> RawTaskfile {
        RawTaskfile {
            task: tasks.into_iter().map(|(n, t)| (n.to_string(), t)).collect(),
            ..RawTaskfile::default()
        }
    }

    #[test]
    fn members_are_declared_first() {
        let cfg = raw(vec![
            ("all", series(&["build", "lint"])),
            ("build", series(&["clean"])),
            ("clean", cmd("rm -rf dist")),
            ("lint", cmd("cargo clippy")),
        ]);
        let order = validate_taskfile(&cfg).unwrap();
        let pos = |n: &str| order.iter().position(|o| o == n).unwrap();

        assert!(pos("clean") < pos("build"));
        assert!(pos("build") < pos("all"));
        assert!(pos("lint") < pos("all"));
    }

    #[test]
    fn cycles_are_rejected() {
        let cfg = raw(vec![("a", series(&["b"])), ("b", series(&["a"]))]);
        assert!(matches!(validate_taskfile(&cfg), Err(TaskmillError::TaskCycle(_))));
    }

    #[test]
    fn ambiguous_bodies_are_rejected() {
        let both = TaskConfig {
            cmd: Some("make".into()),
            parallel: Some(vec!["x".into()]),
            ..TaskConfig::default()
        };
        let cfg = raw(vec![("x", cmd("true")), ("both", both)]);
        assert!(matches!(validate_taskfile(&cfg), Err(TaskmillError::ConfigError(_))));

        let cfg = raw(vec![("nothing", TaskConfig::default())]);
        assert!(matches!(validate_taskfile(&cfg), Err(TaskmillError::ConfigError(_))));
    }

    #[test]
    fn unknown_and_self_members_are_rejected() {
        let cfg = raw(vec![("build", series(&["compile"]))]);
        assert!(matches!(validate_taskfile(&cfg), Err(TaskmillError::ConfigError(_))));

        let cfg = raw(vec![("build", series(&["build"]))]);
        assert!(matches!(validate_taskfile(&cfg), Err(TaskmillError::ConfigError(_))));
    }

    #[test]
    fn empty_taskfile_is_rejected() {
        assert!(matches!(
            validate_taskfile(&RawTaskfile::default()),
            Err(TaskmillError::ConfigError(_))
        ));
    }
}
