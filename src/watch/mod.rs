// src/watch/mod.rs

//! File watching and the watch invocation queue.
//!
//! This module is responsible for:
//! - Compiling ordered watch globs (with `!` exclusions) in [`patterns`].
//! - Wiring up a cross-platform filesystem watcher (`notify`) that turns raw
//!   notifications into [`ChangeEvent`]s in [`watcher`].
//! - Debouncing bursts of events into single triggers in [`debounce`].
//! - Running the payload task with singleton or queued discipline in
//!   [`queue`].
//!
//! It does **not** know about the registry; it runs whatever task it is
//! handed. [`spawn_subscription`] accepts any channel of change events, so
//! the filesystem side can be replaced (tests feed events by hand).

pub mod debounce;
pub mod patterns;
pub mod queue;
pub mod watcher;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::combinators::join_failure;
use crate::errors::{Result, TaskError, TaskmillError};
use crate::task::Task;
use crate::types::{ChangeEvent, ChangeKind, QueueMode};

pub use patterns::{WatchPatterns, relative_str};
pub use queue::RunQueue;
pub use watcher::{change_kinds, spawn_watcher};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Quiet period before a burst of events triggers a run.
    pub delay: Duration,
    /// Change kinds that count as triggers.
    pub events: Vec<ChangeKind>,
    pub queue: QueueMode,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            events: ChangeKind::defaults(),
            queue: QueueMode::default(),
        }
    }
}

/// A running debounce + queue pipeline for one payload task.
pub struct Subscription {
    errors: broadcast::Sender<TaskError>,
    worker: JoinHandle<()>,
}

impl Subscription {
    pub fn subscribe_errors(&self) -> broadcast::Receiver<TaskError> {
        self.errors.subscribe()
    }

    /// Stop reacting to further events. Runs already started are not
    /// interrupted.
    pub fn abort(&self) {
        self.worker.abort();
    }

    /// Wait until the event channel has closed and the last trigger has been
    /// handed to the queue.
    ///
    /// A panic in the debounce worker is logged and returned. An aborted
    /// subscription closes normally.
    pub async fn closed(self) -> std::result::Result<(), TaskError> {
        match self.worker.await {
            Ok(()) => Ok(()),
            Err(err) if err.is_panic() => {
                warn!(error = %err, "watch subscription worker panicked");
                Err(join_failure(err))
            }
            Err(err) => {
                debug!(error = %err, "watch subscription worker cancelled");
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Debounce `events` and run `task` through a [`RunQueue`] per trigger.
pub fn spawn_subscription(
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    options: &WatchOptions,
    task: Task,
) -> Subscription {
    let name = task.name().to_string();
    let queue = RunQueue::new(options.queue, task);
    let errors = queue.errors_sender();
    let kinds: HashSet<ChangeKind> = options.events.iter().copied().collect();

    let worker = tokio::spawn(debounce::debounce(events, options.delay, kinds, move || {
        info!(task = %name, "change detected, triggering run");
        queue.trigger();
    }));

    Subscription { errors, worker }
}

/// A live filesystem subscription. Dropping it stops watching.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    subscription: Subscription,
}

impl WatchHandle {
    pub fn subscribe_errors(&self) -> broadcast::Receiver<TaskError> {
        self.subscription.subscribe_errors()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.subscription.abort();
    }
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle").finish_non_exhaustive()
    }
}

/// Watch `globs` under `root` and run `task` on changes.
pub fn watch<S: AsRef<str>>(
    root: &Path,
    globs: &[S],
    options: &WatchOptions,
    task: Task,
) -> Result<WatchHandle> {
    let patterns = WatchPatterns::new(globs)?;
    if !patterns.has_positive() {
        return Err(TaskmillError::ConfigError(format!(
            "watch for task '{}' needs at least one non-negated glob",
            task.name()
        )));
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let subscription = spawn_subscription(rx, options, task);
    let watcher = spawn_watcher(root, patterns, tx)?;

    Ok(WatchHandle {
        _watcher: watcher,
        subscription,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskFn;

    #[tokio::test]
    async fn worker_panic_surfaces_on_close() {
        let (errors, _) = broadcast::channel(1);
        let subscription = Subscription {
            errors,
            worker: tokio::spawn(async { panic!("debounce broke") }),
        };

        let outcome = subscription.closed().await;
        assert!(matches!(outcome, Err(TaskError::Panicked(_))));
    }

    #[tokio::test]
    async fn aborted_subscription_closes_cleanly() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let task = Task::anonymous(TaskFn::value(()));
        let subscription = spawn_subscription(rx, &WatchOptions::default(), task);

        subscription.abort();
        assert_eq!(subscription.closed().await, Ok(()));
    }
}
