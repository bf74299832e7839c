// src/orchestrator.rs

//! The public entry point: a registry, an engine and an event sink.
//!
//! Every composition built here threads [`EventHooks`] through its slots,
//! so subscribers see `Start` / `Stop` / `Error` for each task run and
//! `last_run` can report completion times.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::engine::{Composition, CompositionKind, Engine, ExecutionHooks, NoHooks, RunOnceCache};
use crate::errors::{Result, TaskmillError};
use crate::events::{EventHooks, LastRunStore, OrchestratorEvent};
use crate::registry::{
    DefaultRegistry, Registry, TaskOptions, TaskRef, TaskSource, declare, lookup, resolve_refs,
};
use crate::task::{Task, TaskTree, TreeNode};
use crate::types::TaskName;
use crate::watch::{WatchHandle, WatchOptions};

pub const SETTLE_ENV: &str = "TASKMILL_SETTLE";
pub const TIME_RESOLUTION_ENV: &str = "TASKMILL_TIME_RESOLUTION";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    /// Make `series` / `parallel` build their settle variants.
    pub settle: bool,
    /// Default rounding for [`Orchestrator::last_run`].
    pub time_resolution: Option<Duration>,
}

impl Settings {
    /// Read `TASKMILL_SETTLE` (`"true"` enables) and
    /// `TASKMILL_TIME_RESOLUTION` (milliseconds).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let settle = lookup(SETTLE_ENV).is_some_and(|v| v.trim() == "true");
        let time_resolution = lookup(TIME_RESOLUTION_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis);
        Self {
            settle,
            time_resolution,
        }
    }
}

pub struct Orchestrator {
    registry: RwLock<Box<dyn Registry>>,
    engine: Engine,
    events: EventHooks,
    last_runs: Arc<LastRunStore>,
    settings: Settings,
}

impl Orchestrator {
    /// Orchestrator with settings read from the environment.
    pub fn new() -> Self {
        Self::with_settings(Settings::from_env())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let last_runs = Arc::new(LastRunStore::new());
        Self {
            registry: RwLock::new(Box::new(DefaultRegistry::new())),
            engine: Engine::new(Arc::new(RunOnceCache::new())),
            events: EventHooks::new(EventHooks::channel(), Arc::clone(&last_runs)),
            last_runs,
            settings,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Receive lifecycle events of every composition built from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    pub fn declare_task(&self, name: &str, source: impl Into<TaskSource>) -> Result<Task> {
        self.declare_task_with(name, source, TaskOptions::default())
    }

    pub fn declare_task_with(
        &self,
        name: &str,
        source: impl Into<TaskSource>,
        options: TaskOptions,
    ) -> Result<Task> {
        let mut registry = self.write_registry();
        Ok(declare(registry.as_mut(), name, source.into(), options)?)
    }

    pub fn task(&self, name: &str) -> Result<Task> {
        Ok(lookup(self.read_registry().as_ref(), name)?)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<TaskName> {
        self.read_registry().tasks().into_keys().collect()
    }

    pub fn series<I, R>(&self, refs: I) -> Result<Composition>
    where
        I: IntoIterator<Item = R>,
        R: Into<TaskRef>,
    {
        self.compose(self.strict_or_settle(CompositionKind::Series), refs, NoHooks)
    }

    pub fn parallel<I, R>(&self, refs: I) -> Result<Composition>
    where
        I: IntoIterator<Item = R>,
        R: Into<TaskRef>,
    {
        self.compose(self.strict_or_settle(CompositionKind::Parallel), refs, NoHooks)
    }

    pub fn settle_series<I, R>(&self, refs: I) -> Result<Composition>
    where
        I: IntoIterator<Item = R>,
        R: Into<TaskRef>,
    {
        self.compose(CompositionKind::SettleSeries, refs, NoHooks)
    }

    pub fn settle_parallel<I, R>(&self, refs: I) -> Result<Composition>
    where
        I: IntoIterator<Item = R>,
        R: Into<TaskRef>,
    {
        self.compose(CompositionKind::SettleParallel, refs, NoHooks)
    }

    /// Build a composition of exactly `kind` with extra caller hooks.
    ///
    /// Lifecycle events are emitted before `hooks` runs for each stage.
    pub fn compose<I, R, H>(&self, kind: CompositionKind, refs: I, hooks: H) -> Result<Composition>
    where
        I: IntoIterator<Item = R>,
        R: Into<TaskRef>,
        H: ExecutionHooks,
    {
        let refs = refs.into_iter().map(Into::into).collect();
        let tasks = resolve_refs(self.read_registry().as_ref(), refs)?;
        self.engine
            .compose(kind, tasks, Arc::new((self.events.clone(), hooks)))
    }

    /// Time of the last successful run of a task inside a composition built
    /// by this orchestrator.
    ///
    /// `resolution` falls back to the configured time resolution. Returns
    /// `Ok(None)` for tasks that never completed.
    pub fn last_run(
        &self,
        task: impl Into<TaskRef>,
        resolution: Option<Duration>,
    ) -> Result<Option<SystemTime>> {
        let mut tasks = resolve_refs(self.read_registry().as_ref(), vec![task.into()])?;
        if tasks.len() != 1 {
            return Err(TaskmillError::CompositionInput(
                "last_run expects exactly one task".to_string(),
            ));
        }
        let task = tasks.remove(0);
        let resolution = resolution.or(self.settings.time_resolution);
        Ok(self.last_runs.get(task.id(), resolution))
    }

    /// Registered tasks as a tree. Without `deep`, nodes carry labels only.
    pub fn tree(&self, deep: bool) -> TaskTree {
        let nodes = self
            .read_registry()
            .tasks()
            .into_iter()
            .map(|(name, task)| {
                if deep {
                    task.tree().clone()
                } else {
                    TreeNode::task(name, Vec::new())
                }
            })
            .collect();

        TaskTree {
            label: "Tasks".to_string(),
            nodes,
        }
    }

    /// Run `task` (wrapped in a parallel composition) whenever files matching
    /// `globs` under `root` change.
    pub fn watch<S: AsRef<str>>(
        &self,
        root: &Path,
        globs: &[S],
        options: &WatchOptions,
        task: impl Into<TaskRef>,
    ) -> Result<WatchHandle> {
        let payload = self.parallel([task.into()])?.into_task();
        info!(root = %root.display(), queue = ?options.queue, "starting watch subscription");
        crate::watch::watch(root, globs, options, payload)
    }

    /// Replace the registry, moving every registered task into it.
    pub fn set_registry(&self, mut registry: Box<dyn Registry>) {
        let mut current = self.write_registry();
        let existing: BTreeMap<TaskName, Task> = current.tasks();
        for (name, task) in existing {
            registry.set(&name, task);
        }
        debug!(tasks = registry.tasks().len(), "registry replaced");
        *current = registry;
    }

    fn strict_or_settle(&self, kind: CompositionKind) -> CompositionKind {
        if self.settings.settle {
            kind.settled()
        } else {
            kind
        }
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, Box<dyn Registry>> {
        self.registry.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Box<dyn Registry>> {
        self.registry.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("tasks", &self.list())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::task::TaskFn;

    #[test]
    fn settings_from_lookup() {
        let env: HashMap<&str, &str> =
            [(SETTLE_ENV, "true"), (TIME_RESOLUTION_ENV, "1000")].into_iter().collect();
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(settings.settle);
        assert_eq!(settings.time_resolution, Some(Duration::from_secs(1)));

        let settings = Settings::from_lookup(|_| Some("yes".to_string()));
        assert!(!settings.settle);
        assert_eq!(settings.time_resolution, None);
    }

    #[test]
    fn settle_setting_switches_combinators() {
        let orchestrator = Orchestrator::with_settings(Settings {
            settle: true,
            ..Settings::default()
        });
        let composition = orchestrator.series([TaskFn::value(1)]).unwrap();
        assert_eq!(composition.kind(), CompositionKind::SettleSeries);

        let strict = Orchestrator::with_settings(Settings::default());
        assert_eq!(strict.parallel([TaskFn::value(1)]).unwrap().kind(), CompositionKind::Parallel);
    }

    #[test]
    fn shallow_and_deep_trees() {
        let orchestrator = Orchestrator::with_settings(Settings::default());
        orchestrator.declare_task("clean", TaskFn::value(())).unwrap();
        let build = orchestrator.series(["clean"]).unwrap();
        orchestrator.declare_task("build", build).unwrap();

        let shallow = orchestrator.tree(false);
        assert_eq!(shallow.label, "Tasks");
        assert!(shallow.nodes.iter().all(|n| n.nodes.is_empty()));

        let deep = orchestrator.tree(true);
        let build = deep.nodes.iter().find(|n| n.label == "build").unwrap();
        assert_eq!(build.nodes[0].label, "<series>");
        assert_eq!(build.nodes[0].nodes[0].label, "clean");
    }

    #[test]
    fn set_registry_migrates_tasks() {
        let orchestrator = Orchestrator::with_settings(Settings::default());
        orchestrator.declare_task("lint", TaskFn::value(())).unwrap();
        let before = orchestrator.task("lint").unwrap().id();

        orchestrator.set_registry(Box::new(DefaultRegistry::new()));
        assert_eq!(orchestrator.list(), vec!["lint".to_string()]);
        assert_eq!(orchestrator.task("lint").unwrap().id(), before);
    }
}
