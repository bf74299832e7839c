// src/engine/combinators.rs

//! Strict combinators: `series` and `parallel`.
//!
//! Both stop recording at the first observed failure. `series` also stops
//! *starting* tasks; `parallel` has already started everything, and slots
//! still in flight are detached, not cancelled.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::engine::cache::RunOnceCache;
use crate::engine::hooks::ExecutionHooks;
use crate::engine::{Engine, ExecutionResult};
use crate::errors::TaskError;
use crate::task::Task;
use crate::types::TaskValue;

impl Engine {
    /// Run `tasks` one after another, halting at the first failure.
    pub async fn series<H: ExecutionHooks>(&self, tasks: &[Task], hooks: Arc<H>) -> ExecutionResult {
        let mut results = vec![None; tasks.len()];

        for (index, task) in tasks.iter().enumerate() {
            match run_slot(&self.cache, task, index, hooks.as_ref()).await {
                Ok(value) => results[index] = Some(value),
                Err(err) => {
                    warn!(task = %task.name(), index, error = %err, "series halted");
                    return ExecutionResult {
                        error: Some(err),
                        results,
                    };
                }
            }
        }

        ExecutionResult {
            error: None,
            results,
        }
    }

    /// Start every task concurrently and collect results by index.
    ///
    /// Returns as soon as one slot fails; the others keep running in the
    /// background and their outcome is not reflected in the result.
    ///
    /// Each slot runs on its own `tokio::spawn`ed task. On a multi-thread
    /// runtime, bodies and [`ExecutionHooks`] of sibling slots may run at the
    /// same time on different threads, so hooks must not assume they are
    /// called one slot at a time. On a current-thread runtime (the CLI's)
    /// slots only interleave at `.await` points. Per-slot hook order is
    /// always create, before, then after or error.
    pub async fn parallel<H: ExecutionHooks>(
        &self,
        tasks: &[Task],
        hooks: Arc<H>,
    ) -> ExecutionResult {
        let mut results = vec![None; tasks.len()];
        let mut pending: FuturesUnordered<_> = tasks
            .iter()
            .enumerate()
            .map(|(index, task)| spawn_slot(&self.cache, task, index, &hooks))
            .collect();

        while let Some(joined) = pending.next().await {
            let err = match joined {
                Ok((index, Ok(value))) => {
                    results[index] = Some(value);
                    continue;
                }
                Ok((index, Err(err))) => {
                    warn!(index, error = %err, "parallel composition failed");
                    err
                }
                Err(join_err) => {
                    warn!(error = %join_err, "parallel slot could not be joined");
                    join_failure(join_err)
                }
            };
            // Dropping the remaining join handles detaches their slots.
            return ExecutionResult {
                error: Some(err),
                results,
            };
        }

        ExecutionResult {
            error: None,
            results,
        }
    }
}

/// Drive one slot through its hooks and the run-once cache.
pub(crate) async fn run_slot<H: ExecutionHooks>(
    cache: &RunOnceCache,
    task: &Task,
    index: usize,
    hooks: &H,
) -> Result<TaskValue, TaskError> {
    let mut storage = hooks.create(task, index);
    hooks.before(&mut storage);
    debug!(task = %task.name(), index, "slot started");

    match cache.call(task).await {
        Ok(value) => {
            debug!(task = %task.name(), index, "slot finished");
            hooks.after(&value, &mut storage);
            Ok(value)
        }
        Err(err) => {
            debug!(task = %task.name(), index, error = %err, "slot failed");
            hooks.error(&err, &mut storage);
            Err(err)
        }
    }
}

pub(crate) type SlotHandle = tokio::task::JoinHandle<(usize, Result<TaskValue, TaskError>)>;

/// Run one slot on its own runtime task.
pub(crate) fn spawn_slot<H: ExecutionHooks>(
    cache: &Arc<RunOnceCache>,
    task: &Task,
    index: usize,
    hooks: &Arc<H>,
) -> SlotHandle {
    let cache = Arc::clone(cache);
    let task = task.clone();
    let hooks = Arc::clone(hooks);
    tokio::spawn(async move {
        let outcome = run_slot(&cache, &task, index, hooks.as_ref()).await;
        (index, outcome)
    })
}

/// A slot whose runtime task could not be joined counts as panicked.
pub(crate) fn join_failure(err: JoinError) -> TaskError {
    TaskError::Panicked(err.to_string())
}
