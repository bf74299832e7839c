// src/registry/declare.rs

use tracing::debug;

use crate::engine::Composition;
use crate::errors::DeclarationError;
use crate::registry::Registry;
use crate::task::{Task, TaskFn, TaskShape, TreeNode};

/// Per-declaration options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Memoize the first successful result for the rest of the process.
    pub run_once: bool,
}

impl TaskOptions {
    pub fn run_once() -> Self {
        Self { run_once: true }
    }
}

/// What a task can be declared from: a bare body or a built composition.
#[derive(Debug, Clone)]
pub enum TaskSource {
    Body(TaskFn),
    Composition(Composition),
}

impl TaskSource {
    fn shape(&self) -> TaskShape {
        match self {
            TaskSource::Body(body) => body.shape(),
            TaskSource::Composition(c) => c.task().shape(),
        }
    }
}

impl From<TaskFn> for TaskSource {
    fn from(body: TaskFn) -> Self {
        TaskSource::Body(body)
    }
}

impl From<Composition> for TaskSource {
    fn from(composition: Composition) -> Self {
        TaskSource::Composition(composition)
    }
}

impl From<&Composition> for TaskSource {
    fn from(composition: &Composition) -> Self {
        TaskSource::Composition(composition.clone())
    }
}

/// Validate and register a new task.
///
/// Rejects empty names, names already in `registry`, and callback-shaped
/// bodies. On success the returned handle is the one stored in the registry.
pub fn declare(
    registry: &mut dyn Registry,
    name: &str,
    source: TaskSource,
    options: TaskOptions,
) -> Result<Task, DeclarationError> {
    if name.is_empty() {
        return Err(DeclarationError::EmptyName);
    }
    if registry.get(name).is_some() {
        return Err(DeclarationError::TaskWithNameAlreadyExists(name.to_string()));
    }
    if source.shape() == TaskShape::Callback {
        return Err(DeclarationError::CallbackTaskIsNotAllowed(name.to_string()));
    }

    let (body, nodes) = match source {
        TaskSource::Body(body) => (body, Vec::new()),
        TaskSource::Composition(c) => (c.task().body().clone(), vec![c.tree().clone()]),
    };

    let task = Task::new(name, body, options.run_once, TreeNode::task(name, nodes));
    debug!(task = %name, id = %task.id(), run_once = options.run_once, "task declared");
    Ok(registry.set(name, task))
}
