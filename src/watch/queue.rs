// src/watch/queue.rs

//! Serialization of watch payload runs.
//!
//! - [`QueueMode::Singleton`]: a trigger that arrives while the payload is
//!   running is dropped. The running flag is an atomic.
//! - [`QueueMode::Queued`]: triggers go through an unbounded FIFO drained
//!   by one worker, so runs never overlap and each trigger runs once.
//!
//! Payload failures are published on a broadcast channel. With no
//! subscriber they are logged at debug level and otherwise ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::errors::TaskError;
use crate::task::Task;
use crate::types::{QueueMode, TaskValue};

const ERROR_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct RunQueue {
    mode: Mode,
    errors: broadcast::Sender<TaskError>,
}

#[derive(Debug)]
enum Mode {
    Singleton { task: Task, running: Arc<AtomicBool> },
    Queued { tx: mpsc::UnboundedSender<()> },
}

impl RunQueue {
    /// Build a queue for `task`.
    ///
    /// Must be called from within a tokio runtime: queued mode spawns its
    /// worker immediately.
    pub fn new(mode: QueueMode, task: Task) -> Self {
        let (errors, _) = broadcast::channel(ERROR_CAPACITY);
        let mode = match mode {
            QueueMode::Singleton => Mode::Singleton {
                task,
                running: Arc::new(AtomicBool::new(false)),
            },
            QueueMode::Queued => {
                let (tx, mut rx) = mpsc::unbounded_channel::<()>();
                let errors = errors.clone();
                tokio::spawn(async move {
                    while rx.recv().await.is_some() {
                        report(&task, task.run().await, &errors);
                    }
                    debug!(task = %task.name(), "run queue closed");
                });
                Mode::Queued { tx }
            }
        };
        Self { mode, errors }
    }

    /// Subscribe to payload failures.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<TaskError> {
        self.errors.subscribe()
    }

    pub(crate) fn errors_sender(&self) -> broadcast::Sender<TaskError> {
        self.errors.clone()
    }

    /// Request a run. Returns false when the trigger was dropped.
    pub fn trigger(&self) -> bool {
        match &self.mode {
            Mode::Singleton { task, running } => {
                if running
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    debug!(task = %task.name(), "payload still running, trigger dropped");
                    return false;
                }
                let task = task.clone();
                let running = Arc::clone(running);
                let errors = self.errors.clone();
                tokio::spawn(async move {
                    report(&task, task.run().await, &errors);
                    running.store(false, Ordering::Release);
                });
                true
            }
            Mode::Queued { tx } => tx.send(()).is_ok(),
        }
    }
}

fn report(task: &Task, outcome: Result<TaskValue, TaskError>, errors: &broadcast::Sender<TaskError>) {
    match outcome {
        Ok(_) => info!(task = %task.name(), "watch run finished"),
        Err(err) => {
            if let Err(broadcast::error::SendError(err)) = errors.send(err) {
                debug!(task = %task.name(), error = %err, "no error listener, watch error dropped");
            }
        }
    }
}
