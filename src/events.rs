// src/events.rs

//! Lifecycle events for orchestrator-built compositions.
//!
//! [`EventHooks`] is the [`ExecutionHooks`] implementation the orchestrator
//! threads through every composition it builds. Per slot it:
//! - allocates a unique `uid`,
//! - broadcasts `Start` before the body runs,
//! - broadcasts `Stop` or `Error` once it has settled,
//! - records the completion time of successful runs for `last_run`.
//!
//! Events go out on a `tokio::sync::broadcast` channel. Sending with no
//! subscriber is not an error; the event is simply dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::engine::ExecutionHooks;
use crate::errors::TaskError;
use crate::task::Task;
use crate::types::{TaskId, TaskValue};

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    Start {
        uid: u64,
        name: String,
        branch: bool,
        time: SystemTime,
    },
    Stop {
        uid: u64,
        name: String,
        branch: bool,
        time: SystemTime,
        duration: Duration,
    },
    Error {
        uid: u64,
        name: String,
        branch: bool,
        time: SystemTime,
        duration: Duration,
        error: TaskError,
    },
}

impl OrchestratorEvent {
    pub fn uid(&self) -> u64 {
        match self {
            OrchestratorEvent::Start { uid, .. }
            | OrchestratorEvent::Stop { uid, .. }
            | OrchestratorEvent::Error { uid, .. } => *uid,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OrchestratorEvent::Start { name, .. }
            | OrchestratorEvent::Stop { name, .. }
            | OrchestratorEvent::Error { name, .. } => name,
        }
    }

    pub fn is_branch(&self) -> bool {
        match self {
            OrchestratorEvent::Start { branch, .. }
            | OrchestratorEvent::Stop { branch, .. }
            | OrchestratorEvent::Error { branch, .. } => *branch,
        }
    }
}

/// Completion times of successful runs, keyed by task identity.
#[derive(Debug, Default)]
pub struct LastRunStore {
    times: Mutex<HashMap<TaskId, SystemTime>>,
}

impl LastRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: TaskId, time: SystemTime) {
        self.times
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, time);
    }

    /// Last successful completion, rounded down to a multiple of
    /// `resolution` (counted from the Unix epoch) when one is given.
    pub fn get(&self, id: TaskId, resolution: Option<Duration>) -> Option<SystemTime> {
        let time = *self
            .times
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&id)?;

        match resolution {
            Some(res) if !res.is_zero() => Some(round_down(time, res)),
            _ => Some(time),
        }
    }
}

fn round_down(time: SystemTime, resolution: Duration) -> SystemTime {
    let Ok(since_epoch) = time.duration_since(UNIX_EPOCH) else {
        return time;
    };
    let res = resolution.as_nanos();
    let rounded = since_epoch.as_nanos() - since_epoch.as_nanos() % res;
    // Nanoseconds since the epoch fit in u64 until 2554.
    UNIX_EPOCH + Duration::from_nanos(u64::try_from(rounded).unwrap_or(u64::MAX))
}

/// Per-slot record threaded through the hooks.
#[derive(Debug)]
pub struct SlotRecord {
    uid: u64,
    id: TaskId,
    name: String,
    branch: bool,
    started: Instant,
}

/// Hooks that publish [`OrchestratorEvent`]s and record last runs.
#[derive(Debug, Clone)]
pub struct EventHooks {
    sender: broadcast::Sender<OrchestratorEvent>,
    last_runs: Arc<LastRunStore>,
    next_uid: Arc<AtomicU64>,
}

impl EventHooks {
    pub fn new(sender: broadcast::Sender<OrchestratorEvent>, last_runs: Arc<LastRunStore>) -> Self {
        Self {
            sender,
            last_runs,
            next_uid: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn channel() -> broadcast::Sender<OrchestratorEvent> {
        broadcast::channel(EVENT_CAPACITY).0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.sender.subscribe()
    }

    fn emit(&self, event: OrchestratorEvent) {
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            debug!(uid = event.uid(), task = %event.name(), "no event listener, dropping event");
        }
    }
}

impl ExecutionHooks for EventHooks {
    type Storage = SlotRecord;

    fn create(&self, task: &Task, _index: usize) -> SlotRecord {
        SlotRecord {
            uid: self.next_uid.fetch_add(1, Ordering::Relaxed),
            id: task.id(),
            name: task.name().to_string(),
            branch: task.is_branch(),
            started: Instant::now(),
        }
    }

    fn before(&self, record: &mut SlotRecord) {
        record.started = Instant::now();
        self.emit(OrchestratorEvent::Start {
            uid: record.uid,
            name: record.name.clone(),
            branch: record.branch,
            time: SystemTime::now(),
        });
    }

    fn after(&self, _value: &TaskValue, record: &mut SlotRecord) {
        let now = SystemTime::now();
        self.last_runs.record(record.id, now);
        self.emit(OrchestratorEvent::Stop {
            uid: record.uid,
            name: record.name.clone(),
            branch: record.branch,
            time: now,
            duration: record.started.elapsed(),
        });
    }

    fn error(&self, error: &TaskError, record: &mut SlotRecord) {
        self.emit(OrchestratorEvent::Error {
            uid: record.uid,
            name: record.name.clone(),
            branch: record.branch,
            time: SystemTime::now(),
            duration: record.started.elapsed(),
            error: error.clone(),
        });
    }
}

/// Log lifecycle events until the channel closes.
///
/// Compositions themselves (branch slots) are logged at debug level only.
pub fn spawn_event_logger(
    mut rx: broadcast::Receiver<OrchestratorEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &OrchestratorEvent) {
    if event.is_branch() {
        debug!(uid = event.uid(), event = ?event, "composition event");
        return;
    }

    match event {
        OrchestratorEvent::Start { uid, name, .. } => {
            info!(uid, "Starting '{name}'...");
        }
        OrchestratorEvent::Stop {
            uid, name, duration, ..
        } => {
            info!(uid, "Finished '{name}' after {}", format_duration(*duration));
        }
        OrchestratorEvent::Error {
            uid,
            name,
            duration,
            error,
            ..
        } => {
            warn!(uid, error = %error, "'{name}' errored after {}", format_duration(*duration));
        }
    }
}

/// Short human form: `850 μs`, `12 ms`, `1.42 s`.
pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_millis(1) {
        format!("{} μs", duration.as_micros())
    } else if duration < Duration::from_secs(1) {
        format!("{} ms", duration.as_millis())
    } else {
        format!("{:.2} s", duration.as_secs_f64())
    }
}
