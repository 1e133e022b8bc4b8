// src/exec/process.rs

//! Spawning a child process and tracking its exit.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::errors::{Result, WwatchError};
use crate::exec::command::CommandSpec;
use crate::output::Outlet;

/// Exit state published by the background waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Running,
    /// `None` when the exit status could not be collected.
    Exited(Option<ExitStatus>),
}

/// Handle on a running (or exited) child.
///
/// The `Child` itself lives in a background waiter task that reaps it and
/// publishes the exit; the handle only observes that marker. On Unix the child
/// leads its own process group, whose id equals `pid`.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    exit: watch::Receiver<ExitState>,
    kill_tx: Option<oneshot::Sender<()>>,
}

impl ProcessHandle {
    /// Spawn `spec` (already env-expanded) in `cwd` and start its waiter.
    pub fn spawn(
        task: &str,
        spec: &CommandSpec,
        cwd: &Path,
        stdout: &Outlet,
        stderr: &Outlet,
    ) -> Result<Self> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| WwatchError::Spawn {
            command: spec.to_string(),
            source,
        })?;

        let pid = child.id().ok_or_else(|| {
            WwatchError::Other(anyhow::anyhow!("`{spec}` exited before its pid was read"))
        })?;

        forward_output(child.stdout.take(), stdout.clone());
        forward_output(child.stderr.take(), stderr.clone());

        let (exit_tx, exit_rx) = watch::channel(ExitState::Running);
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let task = task.to_string();

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Ok(()) = kill_rx => {
                    if let Err(e) = child.start_kill() {
                        debug!(task = %task, pid, error = %e, "kill of exiting child failed");
                    }
                    child.wait().await
                }
            };

            match status {
                Ok(status) => {
                    info!(task = %task, pid, code = ?status.code(), success = status.success(), "process exited");
                    exit_tx.send_replace(ExitState::Exited(Some(status)));
                }
                Err(e) => {
                    warn!(task = %task, pid, error = %e, "waiting for process failed");
                    exit_tx.send_replace(ExitState::Exited(None));
                }
            }
        });

        Ok(Self {
            pid,
            exit: exit_rx,
            kill_tx: Some(kill_tx),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn has_exited(&self) -> bool {
        *self.exit.borrow() != ExitState::Running
    }

    /// Wait until the child has been reaped.
    pub async fn wait_exit(&mut self) -> Option<ExitStatus> {
        match self.exit.wait_for(|s| *s != ExitState::Running).await {
            Ok(state) => match *state {
                ExitState::Exited(status) => status,
                ExitState::Running => None,
            },
            // Waiter gone without publishing: nothing left to reap.
            Err(_) => None,
        }
    }

    /// Ask the waiter to kill the child directly (the leader only).
    pub fn request_kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Run `spec` to completion with its output forwarded.
pub async fn run_to_completion(
    spec: &CommandSpec,
    cwd: &Path,
    stdout: &Outlet,
    stderr: &Outlet,
) -> Result<ExitStatus> {
    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| WwatchError::Spawn {
            command: spec.to_string(),
            source,
        })?;

    forward_output(child.stdout.take(), stdout.clone());
    forward_output(child.stderr.take(), stderr.clone());

    Ok(child.wait().await?)
}

/// Copy a child stream into an outlet, line by line.
///
/// Invalid UTF-8 is replaced rather than ending the stream, so a chatty
/// child never blocks on a full pipe.
fn forward_output<R>(reader: Option<R>, outlet: Outlet)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let Some(reader) = reader else {
        return;
    };

    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    outlet.write_line(line.trim_end_matches(['\n', '\r']));
                }
                Err(e) => {
                    debug!(outlet = %outlet.name(), error = %e, "output stream closed");
                    break;
                }
            }
        }
    });
}
