// src/engine/settle.rs

//! Settle combinators: every task runs, failures are aggregated.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::engine::combinators::{join_failure, run_slot, spawn_slot};
use crate::engine::hooks::ExecutionHooks;
use crate::engine::{Engine, SettledResult};
use crate::errors::TaskError;
use crate::task::Task;
use crate::types::TaskValue;

impl Engine {
    /// Run `tasks` one after another, continuing past failures.
    pub async fn settle_series<H: ExecutionHooks>(
        &self,
        tasks: &[Task],
        hooks: Arc<H>,
    ) -> SettledResult {
        let mut outcomes = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            outcomes.push(run_slot(&self.cache, task, index, hooks.as_ref()).await);
        }
        partition(outcomes)
    }

    /// Run `tasks` concurrently and wait for all of them. Hooks see the same
    /// cross-slot concurrency as [`Engine::parallel`].
    pub async fn settle_parallel<H: ExecutionHooks>(
        &self,
        tasks: &[Task],
        hooks: Arc<H>,
    ) -> SettledResult {
        let handles = tasks
            .iter()
            .enumerate()
            .map(|(index, task)| spawn_slot(&self.cache, task, index, &hooks));

        // Awaited in slot order so both sequences keep relative slot order.
        let outcomes = join_all(handles)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok((_, outcome)) => outcome,
                Err(err) => Err(join_failure(err)),
            })
            .collect();
        partition(outcomes)
    }
}

/// Split per-slot outcomes into the success and failure sequences.
///
/// Each side is `None` when empty.
pub fn partition(outcomes: Vec<Result<TaskValue, TaskError>>) -> SettledResult {
    let total = outcomes.len();
    let (results, errors): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(Result::is_ok);

    let results: Vec<TaskValue> = results.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<TaskError> = errors.into_iter().filter_map(Result::err).collect();

    if errors.is_empty() {
        info!(slots = total, "settled without failures");
    } else {
        warn!(slots = total, failed = errors.len(), "settled with failures");
    }

    SettledResult {
        errors: (!errors.is_empty()).then_some(errors),
        results: (!results.is_empty()).then_some(results),
    }
}
