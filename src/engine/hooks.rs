// src/engine/hooks.rs

//! Per-slot lifecycle hooks.
//!
//! For every slot of a composition the engine calls:
//! 1. `create(task, index)` to build per-slot storage,
//! 2. `before(storage)` right before the body starts,
//! 3. exactly one of `after(value, storage)` / `error(err, storage)` once the
//!    body has settled.
//!
//! Storage never leaks between slots. In parallel compositions there is no
//! ordering between sibling slots' hooks.

use crate::errors::TaskError;
use crate::task::Task;
use crate::types::TaskValue;

pub trait ExecutionHooks: Send + Sync + 'static {
    type Storage: Send + 'static;

    fn create(&self, task: &Task, index: usize) -> Self::Storage;

    fn before(&self, _storage: &mut Self::Storage) {}

    fn after(&self, _value: &TaskValue, _storage: &mut Self::Storage) {}

    fn error(&self, _error: &TaskError, _storage: &mut Self::Storage) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ExecutionHooks for NoHooks {
    type Storage = ();

    fn create(&self, _task: &Task, _index: usize) {}
}

/// Run two hook sets side by side; `A` is always called first.
impl<A, B> ExecutionHooks for (A, B)
where
    A: ExecutionHooks,
    B: ExecutionHooks,
{
    type Storage = (A::Storage, B::Storage);

    fn create(&self, task: &Task, index: usize) -> Self::Storage {
        (self.0.create(task, index), self.1.create(task, index))
    }

    fn before(&self, storage: &mut Self::Storage) {
        self.0.before(&mut storage.0);
        self.1.before(&mut storage.1);
    }

    fn after(&self, value: &TaskValue, storage: &mut Self::Storage) {
        self.0.after(value, &mut storage.0);
        self.1.after(value, &mut storage.1);
    }

    fn error(&self, error: &TaskError, storage: &mut Self::Storage) {
        self.0.error(error, &mut storage.0);
        self.1.error(error, &mut storage.1);
    }
}
