// src/engine/mod.rs

//! Composition engine.
//!
//! This module ties together:
//! - the four combinators (`series`, `parallel`, `settle_series`,
//!   `settle_parallel`), implemented in [`combinators`] and [`settle`];
//! - the per-slot lifecycle hooks in [`hooks`];
//! - the run-once cache in [`cache`], injected into every [`Engine`].
//!
//! The engine only sees already-resolved [`Task`] handles. Name resolution
//! and declaration live in [`crate::registry`].

pub mod cache;
pub mod combinators;
pub mod hooks;
pub mod settle;

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::debug;

use crate::errors::{Result, TaskError, TaskmillError};
use crate::task::{Task, TaskFn, TreeNode};
use crate::types::TaskValue;

pub use cache::RunOnceCache;
pub use hooks::{ExecutionHooks, NoHooks};

/// Which combinator a composition uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionKind {
    Series,
    Parallel,
    SettleSeries,
    SettleParallel,
}

impl CompositionKind {
    /// Tree label of compositions of this kind.
    pub fn label(self) -> &'static str {
        match self {
            CompositionKind::Series | CompositionKind::SettleSeries => "<series>",
            CompositionKind::Parallel | CompositionKind::SettleParallel => "<parallel>",
        }
    }

    pub fn is_settle(self) -> bool {
        matches!(
            self,
            CompositionKind::SettleSeries | CompositionKind::SettleParallel
        )
    }

    /// The settle counterpart of a strict kind (settle kinds map to themselves).
    pub fn settled(self) -> Self {
        match self {
            CompositionKind::Series | CompositionKind::SettleSeries => CompositionKind::SettleSeries,
            CompositionKind::Parallel | CompositionKind::SettleParallel => {
                CompositionKind::SettleParallel
            }
        }
    }
}

/// Outcome of a strict composition.
///
/// `results` always has one slot per task, index-aligned with task order.
/// Slots that did not complete successfully before the composition returned
/// are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionResult {
    pub error: Option<TaskError>,
    pub results: Vec<Option<TaskValue>>,
}

impl ExecutionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of a settle composition.
///
/// Both sequences keep the relative order of their slots but not the
/// absolute task index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SettledResult {
    pub errors: Option<Vec<TaskError>>,
    pub results: Option<Vec<TaskValue>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompositionOutput {
    Strict(ExecutionResult),
    Settled(SettledResult),
}

impl CompositionOutput {
    pub fn is_success(&self) -> bool {
        match self {
            CompositionOutput::Strict(r) => r.error.is_none(),
            CompositionOutput::Settled(r) => r.errors.is_none(),
        }
    }

    pub fn strict(self) -> Option<ExecutionResult> {
        match self {
            CompositionOutput::Strict(r) => Some(r),
            CompositionOutput::Settled(_) => None,
        }
    }

    pub fn settled(self) -> Option<SettledResult> {
        match self {
            CompositionOutput::Settled(r) => Some(r),
            CompositionOutput::Strict(_) => None,
        }
    }

    /// Collapse into the single value/error a parent composition sees when
    /// this composition is one of its slots.
    pub fn into_task_result(self) -> std::result::Result<TaskValue, TaskError> {
        match self {
            CompositionOutput::Strict(ExecutionResult { error: Some(err), .. }) => Err(err),
            CompositionOutput::Strict(ExecutionResult { error: None, results }) => Ok(
                TaskValue::List(results.into_iter().map(Option::unwrap_or_default).collect()),
            ),
            CompositionOutput::Settled(SettledResult { errors: Some(errors), .. }) => {
                Err(TaskError::Settled(errors))
            }
            CompositionOutput::Settled(SettledResult { errors: None, results }) => {
                Ok(TaskValue::List(results.unwrap_or_default()))
            }
        }
    }
}

type Runner = dyn Fn() -> BoxFuture<'static, CompositionOutput> + Send + Sync;

/// A built composition.
///
/// It can be run directly for its full output, or used as a [`Task`] (via
/// [`Composition::task`]) inside another composition, a declaration, or a
/// watch subscription.
#[derive(Clone)]
pub struct Composition {
    kind: CompositionKind,
    task: Task,
    runner: Arc<Runner>,
}

impl Composition {
    pub fn kind(&self) -> CompositionKind {
        self.kind
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn into_task(self) -> Task {
        self.task
    }

    pub fn tree(&self) -> &TreeNode {
        self.task.tree()
    }

    /// Run every slot and report the full output.
    pub async fn run(&self) -> CompositionOutput {
        (self.runner)().await
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("kind", &self.kind)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

/// Runs compositions. Cloning is cheap; clones share the run-once cache.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    cache: Arc<RunOnceCache>,
}

impl Engine {
    pub fn new(cache: Arc<RunOnceCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<RunOnceCache> {
        &self.cache
    }

    /// Run `tasks` with the combinator for `kind`.
    pub async fn execute<H: ExecutionHooks>(
        &self,
        kind: CompositionKind,
        tasks: &[Task],
        hooks: Arc<H>,
    ) -> CompositionOutput {
        match kind {
            CompositionKind::Series => CompositionOutput::Strict(self.series(tasks, hooks).await),
            CompositionKind::Parallel => {
                CompositionOutput::Strict(self.parallel(tasks, hooks).await)
            }
            CompositionKind::SettleSeries => {
                CompositionOutput::Settled(self.settle_series(tasks, hooks).await)
            }
            CompositionKind::SettleParallel => {
                CompositionOutput::Settled(self.settle_parallel(tasks, hooks).await)
            }
        }
    }

    /// Build a composition over `tasks`.
    ///
    /// Fails with [`TaskmillError::CompositionInput`] when `tasks` is empty.
    /// Nothing runs until the composition (or its task) is invoked.
    pub fn compose<H: ExecutionHooks>(
        &self,
        kind: CompositionKind,
        tasks: Vec<Task>,
        hooks: Arc<H>,
    ) -> Result<Composition> {
        if tasks.is_empty() {
            return Err(TaskmillError::CompositionInput(
                "one or more tasks should be combined using series or parallel".to_string(),
            ));
        }

        let nodes = tasks.iter().map(|t| t.tree().clone()).collect();
        let tasks: Arc<[Task]> = tasks.into();
        debug!(kind = ?kind, slots = tasks.len(), "composition built");

        let engine = self.clone();
        let runner: Arc<Runner> = Arc::new(move || {
            let engine = engine.clone();
            let tasks = Arc::clone(&tasks);
            let hooks = Arc::clone(&hooks);
            async move { engine.execute(kind, &tasks, hooks).await }.boxed()
        });

        let body_runner = Arc::clone(&runner);
        let body = TaskFn::Async(Arc::new(move || {
            let runner = Arc::clone(&body_runner);
            async move { runner().await.into_task_result() }.boxed()
        }));

        let task = Task::new(
            kind.label(),
            body,
            false,
            TreeNode::composition(kind.label(), nodes),
        );

        Ok(Composition { kind, task, runner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_composition_is_rejected() {
        let engine = Engine::default();
        let err = engine
            .compose(CompositionKind::Series, vec![], Arc::new(NoHooks))
            .unwrap_err();
        assert!(matches!(err, TaskmillError::CompositionInput(_)));
    }

    #[test]
    fn composition_tree_lists_members() {
        let engine = Engine::default();
        let a = Task::anonymous(TaskFn::value(1));
        let composition = engine
            .compose(CompositionKind::SettleParallel, vec![a.clone(), a], Arc::new(NoHooks))
            .unwrap();

        let tree = composition.tree();
        assert_eq!(tree.label, "<parallel>");
        assert!(tree.branch);
        assert_eq!(tree.nodes.len(), 2);
        assert!(composition.task().is_branch());
    }

    #[test]
    fn nested_strict_output_fills_missing_slots_with_unit() {
        let output = CompositionOutput::Strict(ExecutionResult {
            error: None,
            results: vec![Some(TaskValue::Int(1)), None],
        });
        assert_eq!(
            output.into_task_result(),
            Ok(TaskValue::List(vec![TaskValue::Int(1), TaskValue::Unit]))
        );
    }

    #[test]
    fn nested_settled_output_with_errors_rejects() {
        let output = CompositionOutput::Settled(SettledResult {
            errors: Some(vec![TaskError::msg("x")]),
            results: Some(vec![TaskValue::Int(1)]),
        });
        assert_eq!(
            output.into_task_result(),
            Err(TaskError::Settled(vec![TaskError::msg("x")]))
        );
    }

    #[test]
    fn settled_kind_mapping() {
        assert_eq!(CompositionKind::Series.settled(), CompositionKind::SettleSeries);
        assert_eq!(CompositionKind::Parallel.settled(), CompositionKind::SettleParallel);
        assert!(CompositionKind::SettleSeries.is_settle());
        assert!(!CompositionKind::Parallel.is_settle());
    }
}
