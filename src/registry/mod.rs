// src/registry/mod.rs

//! Task registry.
//!
//! - [`Registry`] is the storage seam: name to task handle. The default
//!   implementation is an in-memory sorted map; callers can plug their own.
//! - [`declare`] wraps bodies into handles and enforces the declaration
//!   rules before anything reaches the registry.
//! - [`resolve`] turns the loose references accepted by the composition API
//!   into task handles, with "did you mean" suggestions on unknown names.

pub mod declare;
pub mod resolve;

use std::collections::BTreeMap;

use crate::task::Task;
use crate::types::TaskName;

pub use declare::{TaskOptions, TaskSource, declare};
pub use resolve::{TaskRef, lookup, resolve_refs, similar_tasks};

/// Name to task storage.
///
/// Implementations must keep names unique; uniqueness of *declarations* is
/// checked before `set` is called.
pub trait Registry: Send + Sync {
    fn get(&self, name: &str) -> Option<Task>;

    /// Store `task` under `name` and return the handle that should be used
    /// from now on. Implementations may return a different (wrapped) handle.
    fn set(&mut self, name: &str, task: Task) -> Task;

    /// Every registered task, keyed by name.
    fn tasks(&self) -> BTreeMap<TaskName, Task>;
}

#[derive(Debug, Default)]
pub struct DefaultRegistry {
    tasks: BTreeMap<TaskName, Task>,
}

impl DefaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Registry for DefaultRegistry {
    fn get(&self, name: &str) -> Option<Task> {
        self.tasks.get(name).cloned()
    }

    fn set(&mut self, name: &str, task: Task) -> Task {
        self.tasks.insert(name.to_string(), task.clone());
        task
    }

    fn tasks(&self) -> BTreeMap<TaskName, Task> {
        self.tasks.clone()
    }
}
