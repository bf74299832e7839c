// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::types::{ChangeEvent, ChangeKind};
use crate::watch::patterns::{WatchPatterns, relative_str};

/// Start a recursive `notify` watcher on `root` and forward every change
/// whose path matches `patterns` into `tx`.
///
/// The returned watcher must be kept alive; dropping it stops watching and
/// closes `tx`.
pub fn spawn_watcher(
    root: &Path,
    patterns: WatchPatterns,
    tx: mpsc::UnboundedSender<ChangeEvent>,
) -> Result<RecommendedWatcher> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let callback_root = root.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for (path, kind) in change_kinds(&event) {
                    let Some(rel) = relative_str(&callback_root, &path) else {
                        continue;
                    };
                    if !patterns.matches(&rel) {
                        continue;
                    }
                    if tx.send(ChangeEvent::new(path, kind)).is_err() {
                        debug!("change subscription closed, event dropped");
                    }
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!(root = %root.display(), "file watcher started");
    Ok(watcher)
}

/// Translate a raw `notify` event into change notifications.
///
/// Renames become an unlink of the old path and an add of the new one.
/// Access and metadata-only events produce nothing.
pub fn change_kinds(event: &Event) -> Vec<(PathBuf, ChangeKind)> {
    let all = |kind: ChangeKind| -> Vec<(PathBuf, ChangeKind)> {
        event.paths.iter().map(|p| (p.clone(), kind)).collect()
    };

    match event.kind {
        EventKind::Create(CreateKind::Folder) => all(ChangeKind::AddDir),
        EventKind::Create(_) => all(ChangeKind::Add),
        EventKind::Remove(RemoveKind::Folder) => all(ChangeKind::UnlinkDir),
        EventKind::Remove(_) => all(ChangeKind::Unlink),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => all(ChangeKind::Unlink),
            RenameMode::To => all(ChangeKind::Add),
            RenameMode::Both => {
                let mut out = Vec::with_capacity(2);
                if let Some(from) = event.paths.first() {
                    out.push((from.clone(), ChangeKind::Unlink));
                }
                if let Some(to) = event.paths.get(1) {
                    out.push((to.clone(), ChangeKind::Add));
                }
                out
            }
            _ => event
                .paths
                .iter()
                .map(|p| {
                    let kind = if p.exists() {
                        ChangeKind::Add
                    } else {
                        ChangeKind::Unlink
                    };
                    (p.clone(), kind)
                })
                .collect(),
        },
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => all(ChangeKind::Change),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
