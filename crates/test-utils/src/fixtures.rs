#![allow(dead_code)]

//! Task bodies and hooks that record what happened to them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskmill::engine::ExecutionHooks;
use taskmill::{Task, TaskError, TaskFn, TaskValue};

/// Shared invocation counter.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Sync body resolving with `value`, counting every call.
pub fn counting(counter: &Counter, value: i64) -> TaskFn {
    let counter = counter.clone();
    TaskFn::sync(move || {
        counter.bump();
        Ok::<_, TaskError>(value)
    })
}

/// Async body that sleeps for `ms` and then resolves with `value`.
pub fn delayed(value: i64, ms: u64) -> TaskFn {
    TaskFn::future(move || async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok::<_, TaskError>(value)
    })
}

pub fn failing(message: &'static str) -> TaskFn {
    TaskFn::sync(move || Err::<(), _>(TaskError::msg(message)))
}

/// Async body that sleeps for `ms`, counts, and flags any overlapping run.
pub fn exclusive(counter: &Counter, overlap: Arc<AtomicBool>, ms: u64) -> TaskFn {
    let counter = counter.clone();
    let busy = Arc::new(AtomicBool::new(false));
    TaskFn::future(move || {
        let counter = counter.clone();
        let busy = Arc::clone(&busy);
        let overlap = Arc::clone(&overlap);
        async move {
            if busy.swap(true, Ordering::SeqCst) {
                overlap.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(ms)).await;
            counter.bump();
            busy.store(false, Ordering::SeqCst);
            Ok::<_, TaskError>(())
        }
    })
}

pub fn anonymous(body: TaskFn) -> Task {
    Task::anonymous(body)
}

/// One recorded hook call.
#[derive(Debug, Clone, PartialEq)]
pub enum HookCall {
    Create(usize),
    Before(usize),
    After(usize, TaskValue),
    Error(usize, TaskError),
}

/// Hooks that append every call to a shared log. Storage is the slot index.
#[derive(Debug, Clone, Default)]
pub struct RecordingHooks {
    calls: Arc<Mutex<Vec<HookCall>>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls for one slot, in order.
    pub fn calls_for(&self, index: usize) -> Vec<HookCall> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                HookCall::Create(i) | HookCall::Before(i) => *i == index,
                HookCall::After(i, _) | HookCall::Error(i, _) => *i == index,
            })
            .collect()
    }

    fn push(&self, call: HookCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ExecutionHooks for RecordingHooks {
    type Storage = usize;

    fn create(&self, _task: &Task, index: usize) -> usize {
        self.push(HookCall::Create(index));
        index
    }

    fn before(&self, index: &mut usize) {
        self.push(HookCall::Before(*index));
    }

    fn after(&self, value: &TaskValue, index: &mut usize) {
        self.push(HookCall::After(*index, value.clone()));
    }

    fn error(&self, error: &TaskError, index: &mut usize) {
        self.push(HookCall::Error(*index, error.clone()));
    }
}
