// src/exec/mod.rs

//! Process execution layer.
//!
//! Taskfile `cmd` tasks become future-shaped task bodies that run the
//! command through `tokio::process::Command` and resolve once it exits.

pub mod shell;

pub use shell::{run_shell, shell_task};
