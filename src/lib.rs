// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod logging;
pub mod orchestrator;
pub mod registry;
pub mod task;
pub mod taskfile;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

pub use crate::engine::{
    Composition, CompositionKind, CompositionOutput, Engine, ExecutionHooks, ExecutionResult,
    NoHooks, RunOnceCache, SettledResult,
};
pub use crate::errors::{DeclarationError, ResolutionError, TaskError, TaskmillError};
pub use crate::events::OrchestratorEvent;
pub use crate::orchestrator::{Orchestrator, Settings};
pub use crate::registry::{DefaultRegistry, Registry, TaskOptions, TaskRef};
pub use crate::task::{Done, Task, TaskFn, TaskShape};
pub use crate::types::{ChangeEvent, ChangeKind, QueueMode, TaskValue};
pub use crate::watch::{WatchHandle, WatchOptions};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::events::spawn_event_logger;
use crate::taskfile::{declare_taskfile, watch_taskfile};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - Taskfile loading
/// - task declaration on an orchestrator
/// - lifecycle event logging
/// - the initial run of the requested tasks
/// - (optional) file watching until Ctrl-C
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let taskfile = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let env = Settings::from_env();
    let file = taskfile.settings();
    let settings = Settings {
        settle: args.settle || env.settle || file.settle,
        time_resolution: env.time_resolution.or(file.time_resolution),
    };

    let orchestrator = Orchestrator::with_settings(settings);
    let logger = spawn_event_logger(orchestrator.subscribe());
    declare_taskfile(&orchestrator, &taskfile)?;

    if args.list_tasks {
        print!("{}", orchestrator.tree(args.deep));
        return Ok(());
    }

    let names = if args.tasks.is_empty() {
        vec![taskfile.config.default_task.clone()]
    } else {
        args.tasks.clone()
    };
    info!(tasks = ?names, settle = settings.settle, "running");

    let composition = orchestrator.parallel(&names)?;
    let output = composition.run().await;
    let failure = output.into_task_result().err();
    if let Some(err) = &failure {
        warn!(error = %err, "run failed");
    }

    if args.watch {
        let root = config_root_dir(&config_path);
        let _handles = watch_taskfile(&orchestrator, &taskfile, &root)?;
        info!("watching for changes, press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("listening for Ctrl-C")?;
        info!("shutting down");
        return Ok(());
    }

    // Closing the event channel lets the logger flush and exit.
    drop(composition);
    drop(orchestrator);
    let _ = logger.await;

    match failure {
        Some(err) => Err(TaskmillError::Execution(err).into()),
        None => Ok(()),
    }
}

/// Directory the Taskfile lives in, or the current directory for a bare
/// file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
