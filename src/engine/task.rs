// src/engine/task.rs

//! Async control loop of one task.
//!
//! Wires together:
//! - a [`WatchSet`] over the task root, rebuilt after structural changes
//! - the pure [`RestartScheduler`]
//! - a [`ProcessControl`] owning the child process
//!
//! The loop owns a single event channel for its whole lifetime; every
//! rebuilt watch set feeds the same channel.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::TaskConfig;
use crate::engine::debounce::RestartScheduler;
use crate::errors::{Result, WwatchError};
use crate::exec::ProcessControl;
use crate::fs::FileSystem;
use crate::watch::{WalkOptions, WatchEvent, WatchSet};

pub struct Task<P: ProcessControl> {
    config: TaskConfig,
    process: P,
    fs: Arc<dyn FileSystem>,
}

impl<P: ProcessControl> std::fmt::Debug for Task<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.config.name)
            .field("root", &self.config.root)
            .finish_non_exhaustive()
    }
}

impl<P: ProcessControl> Task<P> {
    pub fn new(config: TaskConfig, process: P, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config,
            process,
            fs,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    /// Run until `shutdown` fires (or its sender is dropped) or a fatal error
    /// occurs.
    ///
    /// Fatal errors are a watch walk that fails (at startup or on rebuild)
    /// and a stop that fails, e.g. because the PID file is unusable. The
    /// child is stopped before any fatal error is returned.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        let name = self.config.name.clone();
        info!(task = %name, root = ?self.config.root, "task started");

        self.process.run_on_start().await;

        if self.config.after {
            info!(task = %name, "waiting for the first change before starting");
        } else {
            self.start_logged().await;
        }

        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<WatchEvent>();

        let mut watch_set = match self.open_watch(&events_tx) {
            Ok(set) => Some(set),
            Err(e) => return self.abort(e).await,
        };

        let mut scheduler = RestartScheduler::from_config(&self.config);

        loop {
            let deadline = scheduler.deadline();

            tokio::select! {
                _ = &mut shutdown => {
                    debug!(task = %name, "shutdown received");
                    break;
                }

                Some(event) = events_rx.recv() => {
                    let mut rebuild = scheduler.on_event(&event, Instant::now()).rebuild;

                    // Drain what is already queued so a burst costs one rebuild.
                    while let Ok(event) = events_rx.try_recv() {
                        rebuild |= scheduler.on_event(&event, Instant::now()).rebuild;
                    }

                    if rebuild {
                        debug!(task = %name, "directory structure changed; rebuilding watches");
                        if let Some(old) = watch_set.take() {
                            old.close();
                        }
                        match self.open_watch(&events_tx) {
                            Ok(set) => watch_set = Some(set),
                            Err(e) => return self.abort(e).await,
                        }
                    }
                }

                _ = sleep_until_deadline(deadline) => {
                    if scheduler.poll_restart(Instant::now()) {
                        self.restart().await?;
                    }
                }
            }
        }

        if let Some(set) = watch_set.take() {
            set.close();
        }
        self.process.stop().await?;
        info!(task = %name, "task stopped");
        Ok(())
    }

    fn open_watch(&self, events_tx: &mpsc::UnboundedSender<WatchEvent>) -> Result<WatchSet> {
        let opts = WalkOptions {
            recursive: self.config.recursive,
            dotfiles: self.config.dotfiles,
            ignore: self.config.ignore_pattern.as_ref(),
        };
        WatchSet::open(self.fs.as_ref(), &self.config.root, opts, events_tx.clone())
    }

    async fn restart(&self) -> Result<()> {
        info!(task = %self.config.name, "restarting");
        self.process.stop().await?;
        self.start_logged().await;
        Ok(())
    }

    /// A failed start leaves the task waiting for the next change.
    async fn start_logged(&self) {
        if let Err(e) = self.process.start().await {
            error!(task = %self.config.name, error = %e, "failed to start process");
        }
    }

    async fn abort(&self, err: WwatchError) -> Result<()> {
        error!(task = %self.config.name, error = %err, "task failed");
        if let Err(stop_err) = self.process.stop().await {
            warn!(task = %self.config.name, error = %stop_err, "stopping process after failure");
        }
        Err(err)
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
