// src/engine/cache.rs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::errors::TaskError;
use crate::task::{Task, adapter};
use crate::types::{TaskId, TaskValue};

/// Memoized results of `run_once` tasks, keyed by task identity.
///
/// Entries are written on the first *successful* completion and never
/// evicted. The lookup and the write are not atomic with the execution:
/// two invocations that both miss will both run the body, and the later
/// completion overwrites the earlier one.
#[derive(Debug, Default)]
pub struct RunOnceCache {
    values: Mutex<HashMap<TaskId, TaskValue>>,
}

impl RunOnceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TaskId) -> Option<TaskValue> {
        self.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn insert(&self, id: TaskId, value: TaskValue) {
        self.lock().insert(id, value);
    }

    /// Run `task` through the adapter, honouring its `run_once` flag.
    pub async fn call(&self, task: &Task) -> Result<TaskValue, TaskError> {
        if !task.is_run_once() {
            return adapter::run(task.body()).await;
        }

        if let Some(value) = self.get(task.id()) {
            debug!(task = %task.name(), id = %task.id(), "run-once cache hit");
            return Ok(value);
        }

        let value = adapter::run(task.body()).await?;
        debug!(task = %task.name(), id = %task.id(), "storing run-once result");
        self.insert(task.id(), value.clone());
        Ok(value)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, TaskValue>> {
        // A poisoned map is still a valid map.
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
