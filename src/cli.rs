// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_TASKFILE;

/// Command-line arguments for `taskmill`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskmill",
    version,
    about = "Run tasks from a Taskfile, in series or in parallel, optionally on file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run (in parallel). Defaults to `[config].default_task`.
    #[arg(value_name = "TASKS")]
    pub tasks: Vec<String>,

    /// Path to the Taskfile (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TASKFILE)]
    pub config: String,

    /// After the initial run, re-run tasks with `watch` globs on change.
    #[arg(long)]
    pub watch: bool,

    /// Print the task tree and exit.
    #[arg(long = "tasks")]
    pub list_tasks: bool,

    /// With `--tasks`, print nested compositions too.
    #[arg(long)]
    pub deep: bool,

    /// Continue past failures and report them all at the end.
    #[arg(long)]
    pub settle: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKMILL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_tasks_and_flags() {
        let args = CliArgs::parse_from([
            "taskmill", "lint", "test", "--watch", "--settle", "--log-level", "debug",
        ]);
        assert_eq!(args.tasks, vec!["lint", "test"]);
        assert!(args.watch);
        assert!(args.settle);
        assert!(!args.list_tasks);
        assert_eq!(args.config, DEFAULT_TASKFILE);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }

    #[test]
    fn tree_listing() {
        let args = CliArgs::parse_from(["taskmill", "--tasks", "--deep"]);
        assert!(args.list_tasks);
        assert!(args.deep);
        assert!(args.tasks.is_empty());
    }
}
