// src/task/adapter.rs

//! Function-shape normalization.
//!
//! Every [`TaskFn`] shape is turned into the same contract: an async
//! operation that resolves with a [`TaskValue`] or rejects with a
//! [`TaskError`]. Panics inside a body become [`TaskError::Panicked`], and a
//! body that resolves with [`TaskValue::Error`] is treated as having failed.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use tokio::sync::oneshot;

use crate::errors::TaskError;
use crate::task::TaskFn;
use crate::types::TaskValue;

/// One-shot completion handle passed to callback-shaped bodies.
///
/// Exactly one of the methods consumes it. Dropping it without calling any
/// of them fails the task with [`TaskError::CallbackDropped`].
pub struct Done {
    tx: oneshot::Sender<Result<TaskValue, TaskError>>,
}

impl Done {
    fn channel() -> (Self, oneshot::Receiver<Result<TaskValue, TaskError>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Report completion in `(error, value)` form. A present error wins over
    /// the value.
    pub fn call(self, error: Option<TaskError>, value: impl Into<TaskValue>) {
        let outcome = match error {
            Some(err) => Err(err),
            None => Ok(value.into()),
        };
        // The receiver is gone only if the adapter future was dropped.
        let _ = self.tx.send(outcome);
    }

    pub fn ok(self, value: impl Into<TaskValue>) {
        self.call(None, value);
    }

    pub fn fail(self, error: impl Into<TaskError>) {
        self.call(Some(error.into()), TaskValue::Unit);
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done").finish_non_exhaustive()
    }
}

/// Invoke `body` and wait for it to settle.
pub async fn run(body: &TaskFn) -> Result<TaskValue, TaskError> {
    let outcome = match body {
        TaskFn::Sync(f) => catch_unwind(AssertUnwindSafe(|| f())).unwrap_or_else(|p| Err(panicked(p))),
        TaskFn::Async(f) => match catch_unwind(AssertUnwindSafe(|| f())) {
            Ok(fut) => AssertUnwindSafe(fut)
                .catch_unwind()
                .await
                .unwrap_or_else(|p| Err(panicked(p))),
            Err(p) => Err(panicked(p)),
        },
        TaskFn::Stream(f) => match catch_unwind(AssertUnwindSafe(|| f())) {
            Ok(stream) => AssertUnwindSafe(drain(stream))
                .catch_unwind()
                .await
                .unwrap_or_else(|p| Err(panicked(p))),
            Err(p) => Err(panicked(p)),
        },
        TaskFn::Callback(f) => {
            let (done, rx) = Done::channel();
            match catch_unwind(AssertUnwindSafe(|| f(done))) {
                Ok(()) => rx.await.unwrap_or(Err(TaskError::CallbackDropped)),
                Err(p) => Err(panicked(p)),
            }
        }
    };

    reject_error_value(outcome)
}

/// A resolved `TaskValue::Error` counts as a rejection.
fn reject_error_value(outcome: Result<TaskValue, TaskError>) -> Result<TaskValue, TaskError> {
    match outcome {
        Ok(TaskValue::Error(err)) => Err(err),
        other => other,
    }
}

async fn drain(mut stream: BoxStream<'static, Result<(), TaskError>>) -> Result<TaskValue, TaskError> {
    while let Some(item) = stream.next().await {
        item?;
    }
    Ok(TaskValue::Unit)
}

fn panicked(payload: Box<dyn Any + Send>) -> TaskError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    TaskError::Panicked(message)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn sync_value_is_resolved() {
        let body = TaskFn::sync(|| Ok::<_, TaskError>(5));
        assert_eq!(run(&body).await, Ok(TaskValue::Int(5)));
    }

    #[tokio::test]
    async fn future_is_awaited() {
        let body = TaskFn::future(|| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<_, TaskError>("late")
        });
        assert_eq!(run(&body).await, Ok(TaskValue::from("late")));
    }

    #[tokio::test]
    async fn future_error_rejects() {
        let body = TaskFn::future(|| async { Err::<(), _>(TaskError::msg("nope")) });
        assert_eq!(run(&body).await, Err(TaskError::msg("nope")));
    }

    #[tokio::test]
    async fn stream_is_drained_and_resolves_unit() {
        let body = TaskFn::stream(|| futures::stream::iter(vec![Ok::<_, TaskError>(1), Ok(2)]));
        assert_eq!(run(&body).await, Ok(TaskValue::Unit));
    }

    #[tokio::test]
    async fn stream_error_rejects() {
        let body = TaskFn::stream(|| {
            futures::stream::iter(vec![Ok(1), Err(TaskError::msg("broken pipe")), Ok(3)])
        });
        assert_eq!(run(&body).await, Err(TaskError::msg("broken pipe")));
    }

    #[tokio::test]
    async fn callback_value_and_error() {
        let ok = TaskFn::callback(|done| done.call(None, 7));
        assert_eq!(run(&ok).await, Ok(TaskValue::Int(7)));

        let failed = TaskFn::callback(|done| done.fail("bad"));
        assert_eq!(run(&failed).await, Err(TaskError::msg("bad")));
    }

    #[tokio::test]
    async fn callback_from_another_task() {
        let body = TaskFn::callback(|done| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.ok("spawned");
            });
        });
        assert_eq!(run(&body).await, Ok(TaskValue::from("spawned")));
    }

    #[tokio::test]
    async fn callback_with_error_value_rejects() {
        let body = TaskFn::callback(|done| done.call(None, TaskError::msg("as value")));
        assert_eq!(run(&body).await, Err(TaskError::msg("as value")));
    }

    #[tokio::test]
    async fn dropped_callback_rejects() {
        let body = TaskFn::callback(|done| drop(done));
        assert_eq!(run(&body).await, Err(TaskError::CallbackDropped));
    }

    #[tokio::test]
    async fn returned_error_value_rejects() {
        let body = TaskFn::value(TaskError::msg("returned"));
        assert_eq!(run(&body).await, Err(TaskError::msg("returned")));
    }

    #[tokio::test]
    async fn panics_are_reported() {
        let body = TaskFn::sync(|| -> Result<(), TaskError> { panic!("boom") });
        assert_eq!(run(&body).await, Err(TaskError::Panicked("boom".into())));

        let body = TaskFn::future(|| async {
            if true {
                panic!("async boom");
            }
            Ok::<_, TaskError>(())
        });
        assert_eq!(run(&body).await, Err(TaskError::Panicked("async boom".into())));
    }
}
