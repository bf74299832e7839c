// src/task/mod.rs

//! Task handles and task bodies.
//!
//! - [`TaskFn`] is a task body tagged with its shape (sync, async, callback,
//!   stream). The shape is fixed when the body is built and never sniffed
//!   again.
//! - [`Task`] is the stable, cheaply clonable handle the registry and the
//!   engine pass around. Its [`TaskId`] is the identity used as cache key.
//! - [`adapter`] normalizes every shape into one async contract.
//! - [`tree`] holds the introspection metadata.

pub mod adapter;
pub mod tree;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};

use crate::errors::TaskError;
use crate::types::{TaskId, TaskValue};

pub use adapter::Done;
pub use tree::{NodeKind, TaskTree, TreeNode};

/// Label used for bodies that were never given a name.
pub const ANONYMOUS_LABEL: &str = "<anonymous>";

pub type SyncBody = dyn Fn() -> Result<TaskValue, TaskError> + Send + Sync;
pub type AsyncBody = dyn Fn() -> BoxFuture<'static, Result<TaskValue, TaskError>> + Send + Sync;
pub type CallbackBody = dyn Fn(Done) + Send + Sync;
pub type StreamBody = dyn Fn() -> BoxStream<'static, Result<(), TaskError>> + Send + Sync;

/// The authored shape of a task body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskShape {
    Sync,
    Async,
    Callback,
    Stream,
}

impl fmt::Display for TaskShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskShape::Sync => "sync",
            TaskShape::Async => "async",
            TaskShape::Callback => "callback",
            TaskShape::Stream => "stream",
        };
        f.write_str(s)
    }
}

/// A task body, tagged with its shape.
#[derive(Clone)]
pub enum TaskFn {
    /// Returns its value directly.
    Sync(Arc<SyncBody>),
    /// Returns a future that resolves with the value.
    Async(Arc<AsyncBody>),
    /// Receives a [`Done`] handle and reports `(error, value)` through it.
    Callback(Arc<CallbackBody>),
    /// Returns a stream; the task is complete once the stream is drained.
    Stream(Arc<StreamBody>),
}

impl TaskFn {
    pub fn sync<F, V, E>(f: F) -> Self
    where
        F: Fn() -> Result<V, E> + Send + Sync + 'static,
        V: Into<TaskValue>,
        E: Into<TaskError>,
    {
        TaskFn::Sync(Arc::new(move || f().map(Into::into).map_err(Into::into)))
    }

    pub fn future<F, Fut, V, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        V: Into<TaskValue>,
        E: Into<TaskError>,
    {
        TaskFn::Async(Arc::new(move || {
            f().map(|res| res.map(Into::into).map_err(Into::into))
                .boxed()
        }))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        TaskFn::Callback(Arc::new(f))
    }

    /// Build a stream-shaped body. Items are discarded; only completion and
    /// errors matter.
    pub fn stream<F, S, T, E>(f: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Stream<Item = Result<T, E>> + Send + 'static,
        E: Into<TaskError>,
    {
        TaskFn::Stream(Arc::new(move || {
            f().map(|item| item.map(|_| ()).map_err(Into::into)).boxed()
        }))
    }

    /// Sync body that always resolves with a clone of `value`.
    pub fn value(value: impl Into<TaskValue>) -> Self {
        let value = value.into();
        TaskFn::Sync(Arc::new(move || Ok(value.clone())))
    }

    pub fn shape(&self) -> TaskShape {
        match self {
            TaskFn::Sync(_) => TaskShape::Sync,
            TaskFn::Async(_) => TaskShape::Async,
            TaskFn::Callback(_) => TaskShape::Callback,
            TaskFn::Stream(_) => TaskShape::Stream,
        }
    }
}

impl fmt::Debug for TaskFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskFn").field(&self.shape()).finish()
    }
}

/// Stable handle around a task body.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

struct TaskInner {
    id: TaskId,
    name: String,
    run_once: bool,
    body: TaskFn,
    tree: TreeNode,
}

impl Task {
    pub(crate) fn new(name: impl Into<String>, body: TaskFn, run_once: bool, tree: TreeNode) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id: TaskId::next(),
                name: name.into(),
                run_once,
                body,
                tree,
            }),
        }
    }

    /// Wrap a bare body that was handed to a composition directly.
    pub fn anonymous(body: TaskFn) -> Self {
        Self::new(
            ANONYMOUS_LABEL,
            body,
            false,
            TreeNode::function(ANONYMOUS_LABEL),
        )
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_run_once(&self) -> bool {
        self.inner.run_once
    }

    pub fn shape(&self) -> TaskShape {
        self.inner.body.shape()
    }

    pub fn body(&self) -> &TaskFn {
        &self.inner.body
    }

    pub fn tree(&self) -> &TreeNode {
        &self.inner.tree
    }

    /// Whether this handle wraps a composition.
    pub fn is_branch(&self) -> bool {
        self.inner.tree.branch
    }

    /// Run the body once through the adapter, bypassing hooks and the
    /// run-once cache.
    pub async fn run(&self) -> Result<TaskValue, TaskError> {
        adapter::run(self.body()).await
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("run_once", &self.inner.run_once)
            .field("shape", &self.shape())
            .finish()
    }
}
