// src/exec/shell.rs

//! Shell command tasks.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::TaskError;
use crate::task::TaskFn;

/// A future-shaped task body that runs `cmd` through the platform shell.
pub fn shell_task(cmd: impl Into<String>) -> TaskFn {
    let cmd = cmd.into();
    TaskFn::future(move || {
        let cmd = cmd.clone();
        async move { run_shell(&cmd).await }
    })
}

/// Run `cmd` to completion.
///
/// Stdout is inherited. Stderr lines are forwarded to our stderr and also
/// logged at debug level. A non-zero exit status fails with the exit code.
pub async fn run_shell(cmd: &str) -> Result<(), TaskError> {
    info!(cmd = %cmd, "starting command");

    let mut command = shell_command(cmd);
    command.stdout(Stdio::inherit()).stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|err| TaskError::msg(format!("spawning `{cmd}`: {err}")))?;

    if let Some(stderr) = child.stderr.take() {
        let label = cmd.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{line}");
                debug!(cmd = %label, "stderr: {}", line);
            }
        });
    }

    let status = child
        .wait()
        .await
        .map_err(|err| TaskError::msg(format!("waiting for `{cmd}`: {err}")))?;

    let code = status.code().unwrap_or(-1);
    info!(cmd = %cmd, exit_code = code, success = status.success(), "command exited");

    if status.success() {
        Ok(())
    } else {
        Err(TaskError::msg(format!("command `{cmd}` exited with code {code}")))
    }
}

fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}
