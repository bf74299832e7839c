// src/registry/resolve.rs

//! Turning composition arguments into task handles.

use crate::engine::Composition;
use crate::errors::{ResolutionError, TaskmillError};
use crate::registry::Registry;
use crate::task::{Task, TaskFn};
use crate::types::TaskName;

/// Anything the composition API accepts as a member.
///
/// Groups nest arbitrarily and are flattened, in order, before resolution.
#[derive(Debug, Clone)]
pub enum TaskRef {
    Task(Task),
    Name(TaskName),
    Fn(TaskFn),
    Group(Vec<TaskRef>),
}

impl From<Task> for TaskRef {
    fn from(task: Task) -> Self {
        TaskRef::Task(task)
    }
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        TaskRef::Task(task.clone())
    }
}

impl From<&str> for TaskRef {
    fn from(name: &str) -> Self {
        TaskRef::Name(name.to_string())
    }
}

impl From<String> for TaskRef {
    fn from(name: String) -> Self {
        TaskRef::Name(name)
    }
}

impl From<&String> for TaskRef {
    fn from(name: &String) -> Self {
        TaskRef::Name(name.clone())
    }
}

impl From<TaskFn> for TaskRef {
    fn from(body: TaskFn) -> Self {
        TaskRef::Fn(body)
    }
}

impl From<Composition> for TaskRef {
    fn from(composition: Composition) -> Self {
        TaskRef::Task(composition.into_task())
    }
}

impl From<&Composition> for TaskRef {
    fn from(composition: &Composition) -> Self {
        TaskRef::Task(composition.task().clone())
    }
}

impl<T: Into<TaskRef>> From<Vec<T>> for TaskRef {
    fn from(items: Vec<T>) -> Self {
        TaskRef::Group(items.into_iter().map(Into::into).collect())
    }
}

impl TaskRef {
    /// Depth-first, order-preserving flattening of nested groups.
    pub fn flatten(refs: Vec<TaskRef>) -> Vec<TaskRef> {
        let mut flat = Vec::with_capacity(refs.len());
        for r in refs {
            match r {
                TaskRef::Group(inner) => flat.extend(TaskRef::flatten(inner)),
                other => flat.push(other),
            }
        }
        flat
    }
}

/// Flatten `refs` and resolve every member to a handle.
///
/// Fails when nothing is left after flattening, when a name is empty, or
/// when a name is not registered.
pub fn resolve_refs(registry: &dyn Registry, refs: Vec<TaskRef>) -> Result<Vec<Task>, TaskmillError> {
    let flat = TaskRef::flatten(refs);
    if flat.is_empty() {
        return Err(TaskmillError::CompositionInput(
            "one or more tasks should be combined using series or parallel".to_string(),
        ));
    }

    flat.into_iter()
        .map(|r| match r {
            TaskRef::Task(task) => Ok(task),
            TaskRef::Fn(body) => Ok(Task::anonymous(body)),
            TaskRef::Name(name) if name.is_empty() => Err(TaskmillError::CompositionInput(
                "task name must not be empty".to_string(),
            )),
            TaskRef::Name(name) => Ok(lookup(registry, &name)?),
            TaskRef::Group(_) => unreachable!("groups are flattened above"),
        })
        .collect()
}

/// Look up a registered task by name.
pub fn lookup(registry: &dyn Registry, name: &str) -> Result<Task, ResolutionError> {
    registry.get(name).ok_or_else(|| ResolutionError {
        name: name.to_string(),
        suggestions: similar_tasks(name, registry.tasks().keys().map(String::as_str)),
    })
}

/// Registered names close enough to `query` to be worth suggesting.
///
/// A candidate qualifies when its edit distance to `query` is below
/// `floor(0.4 * candidate_len) + 1`.
pub fn similar_tasks<'a>(query: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<TaskName> {
    candidates
        .into_iter()
        .filter(|candidate| {
            let allowed = (candidate.chars().count() * 2) / 5 + 1;
            strsim::levenshtein(candidate, query) < allowed
        })
        .map(str::to_string)
        .collect()
}
