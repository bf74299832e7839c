// src/watch/debounce.rs

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::types::{ChangeEvent, ChangeKind};

/// Collapse bursts of change events into single triggers.
///
/// Every event whose kind is in `events` (re)starts a `delay` window; when
/// the window passes without another such event, `on_trigger` fires once
/// (trailing edge). Events of other kinds are ignored. A window still open
/// when the channel closes fires before returning.
pub async fn debounce<F>(
    mut rx: mpsc::UnboundedReceiver<ChangeEvent>,
    delay: Duration,
    events: HashSet<ChangeKind>,
    mut on_trigger: F,
) where
    F: FnMut(),
{
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(event) if events.contains(&event.kind) => {
                    debug!(path = %event.path.display(), kind = ?event.kind, "change observed");
                    deadline = Some(Instant::now() + delay);
                }
                Some(_) => {}
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                on_trigger();
            }
        }
    }

    if deadline.is_some() {
        on_trigger();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl FnMut()) {
        let fired = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&fired);
        (fired, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn burst_collapses_into_one_trigger() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (fired, on_trigger) = counter();
        let handle = tokio::spawn(debounce(
            rx,
            Duration::from_millis(40),
            ChangeKind::defaults().into_iter().collect(),
            on_trigger,
        ));

        for i in 0..5 {
            tx.send(ChangeEvent::new(format!("src/{i}.rs"), ChangeKind::Change))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        drop(tx);
        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn uninteresting_kinds_are_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (fired, on_trigger) = counter();
        let handle = tokio::spawn(debounce(
            rx,
            Duration::from_millis(10),
            [ChangeKind::Change].into_iter().collect(),
            on_trigger,
        ));

        tx.send(ChangeEvent::new("new.rs", ChangeKind::Add)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(tx);
        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pending_window_fires_on_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (fired, on_trigger) = counter();
        let handle = tokio::spawn(debounce(
            rx,
            Duration::from_secs(60),
            ChangeKind::defaults().into_iter().collect(),
            on_trigger,
        ));

        tx.send(ChangeEvent::new("a.rs", ChangeKind::Unlink)).unwrap();
        drop(tx);
        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
