// src/engine/supervisor.rs

//! Runs every task concurrently and coordinates shutdown.
//!
//! Shutdown begins when the external shutdown future completes or when any
//! task fails. Either way every remaining task is told to stop, and `run`
//! returns only after all of them have stopped their children.

use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinSet};
use tracing::{error, info, warn};

use crate::engine::task::Task;
use crate::engine::TaskName;
use crate::errors::{Result, WwatchError};
use crate::exec::ProcessControl;

pub struct Supervisor<P: ProcessControl + 'static> {
    tasks: Vec<Task<P>>,
}

impl<P: ProcessControl + 'static> Supervisor<P> {
    pub fn new(tasks: Vec<Task<P>>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run all tasks until `shutdown` completes or one of them fails.
    ///
    /// Returns the first task error, if any.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut set: JoinSet<(TaskName, Result<()>)> = JoinSet::new();
        let mut stops = Vec::with_capacity(self.tasks.len());

        for task in self.tasks {
            let (tx, rx) = oneshot::channel();
            stops.push(tx);
            let name = task.name().to_string();
            set.spawn(async move {
                let res = task.run(rx).await;
                (name, res)
            });
        }

        tokio::pin!(shutdown);
        let mut first_error: Option<WwatchError> = None;

        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested; stopping all tasks");
            }
            Some(joined) = set.join_next() => {
                first_error = task_outcome(joined);
                if first_error.is_some() {
                    warn!("a task failed; stopping all tasks");
                }
            }
        }

        for tx in stops {
            // A task that already finished dropped its receiver.
            let _ = tx.send(());
        }

        while let Some(joined) = set.join_next().await {
            if let Some(e) = task_outcome(joined) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn task_outcome(joined: std::result::Result<(TaskName, Result<()>), JoinError>) -> Option<WwatchError> {
    match joined {
        Ok((name, Ok(()))) => {
            info!(task = %name, "task finished");
            None
        }
        Ok((name, Err(e))) => {
            error!(task = %name, error = %e, "task exited with error");
            Some(e)
        }
        Err(e) => {
            error!(error = %e, "task panicked or was cancelled");
            Some(WwatchError::Other(anyhow::anyhow!("task join error: {e}")))
        }
    }
}

/// Completes on Ctrl-C, or SIGTERM on Unix.
///
/// If no signal handler can be installed this never completes, so the
/// process keeps running rather than shutting down spuriously.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            warn!(error = %e, "failed to listen for Ctrl+C");
                            term.recv().await;
                        }
                    }
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                wait_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_ctrl_c().await;
}

async fn wait_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
