// src/exec/lifecycle.rs

//! Owner of one task's child process.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::TaskConfig;
use crate::engine::TaskName;
use crate::errors::{Result, WwatchError};
use crate::exec::backend::{BoxFuture, ProcessControl};
use crate::exec::command::CommandSpec;
use crate::exec::process::{run_to_completion, ProcessHandle};
use crate::exec::terminate::{read_pid_file, terminate, KILL_TIMEOUT};
use crate::fs::FileSystem;
use crate::output::{Outlet, OutletFactory};

/// What the controller is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Default)]
struct Slot {
    child: Option<ProcessHandle>,
    on_start_done: bool,
}

/// Starts and stops the child of one task.
///
/// A single lock is held across each whole start or stop, so the two never
/// overlap and a task never has two live children.
pub struct LifecycleController {
    name: TaskName,
    command: CommandSpec,
    on_start: Option<CommandSpec>,
    cwd: PathBuf,
    pid_file: Option<PathBuf>,
    stdout: Outlet,
    stderr: Outlet,
    fs: Arc<dyn FileSystem>,
    kill_timeout: Duration,
    slot: Mutex<Slot>,
    state: watch::Sender<LifecycleState>,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl LifecycleController {
    /// Build the controller for `cfg`; `index` picks the output colour.
    pub fn new(
        cfg: &TaskConfig,
        outlets: &OutletFactory,
        index: usize,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            name: cfg.name.clone(),
            command: cfg.command.clone(),
            on_start: cfg.on_start.clone(),
            cwd: cfg.cwd.clone(),
            pid_file: cfg.pid_file.clone(),
            stdout: outlets.outlet(&cfg.name, index, false),
            stderr: outlets.outlet(&cfg.name, index, true),
            fs,
            kill_timeout: KILL_TIMEOUT,
            slot: Mutex::new(Slot::default()),
            state,
        }
    }

    /// Override the force-kill watchdog window.
    pub fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// True while a child exists and has not been reaped.
    pub async fn is_running(&self) -> bool {
        let slot = self.slot.lock().await;
        slot.child.as_ref().is_some_and(|c| !c.has_exited())
    }

    /// Pid of the live child, if any.
    pub async fn pid(&self) -> Option<u32> {
        let slot = self.slot.lock().await;
        slot.child
            .as_ref()
            .filter(|c| !c.has_exited())
            .map(ProcessHandle::pid)
    }

    fn set_state(&self, state: LifecycleState) {
        let prev = self.state.send_replace(state);
        if prev != state {
            debug!(task = %self.name, from = ?prev, to = ?state, "lifecycle transition");
        }
    }

    async fn run_on_start_locked(&self, slot: &mut Slot) {
        if slot.on_start_done {
            return;
        }
        slot.on_start_done = true;

        let Some(spec) = &self.on_start else {
            return;
        };
        let spec = spec.expanded();
        info!(task = %self.name, cmd = %spec, "running on-start command");

        match run_to_completion(&spec, &self.cwd, &self.stdout, &self.stderr).await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                warn!(task = %self.name, code = ?status.code(), "on-start command failed");
            }
            Err(e) => {
                error!(task = %self.name, error = %e, "on-start command could not run");
            }
        }
    }

    /// Run the on-start command if it has not run yet.
    pub async fn run_on_start_once(&self) {
        let mut slot = self.slot.lock().await;
        self.run_on_start_locked(&mut slot).await;
    }

    /// Start the main command.
    ///
    /// Runs the on-start command first if that has not happened yet. Fails
    /// with `AlreadyRunning` rather than leaving two live children.
    pub async fn start_process(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        self.run_on_start_locked(&mut slot).await;

        if slot.child.as_ref().is_some_and(|c| !c.has_exited()) {
            return Err(WwatchError::AlreadyRunning(self.name.clone()));
        }
        // An exited child is just discarded.
        slot.child = None;

        self.set_state(LifecycleState::Starting);
        let spec = self.command.expanded();
        info!(task = %self.name, cwd = ?self.cwd, cmd = %spec, "starting process");

        match ProcessHandle::spawn(&self.name, &spec, &self.cwd, &self.stdout, &self.stderr) {
            Ok(handle) => {
                debug!(task = %self.name, pid = handle.pid(), "process started");
                slot.child = Some(handle);
                self.set_state(LifecycleState::Running);
                Ok(())
            }
            Err(e) => {
                self.set_state(LifecycleState::Idle);
                Err(e)
            }
        }
    }

    /// Stop the main command with the termination protocol.
    ///
    /// No child, or a child that already exited, makes this a no-op. A bad
    /// PID file is reported as an error, but only after the process group has
    /// been terminated.
    pub async fn stop_process(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;

        let Some(mut child) = slot.child.take() else {
            debug!(task = %self.name, "stop requested with no process");
            return Ok(());
        };

        if child.has_exited() {
            debug!(task = %self.name, pid = child.pid(), "process already exited");
            self.set_state(LifecycleState::Idle);
            return Ok(());
        }

        self.set_state(LifecycleState::Stopping);

        let (pid_target, pid_error) = match &self.pid_file {
            Some(path) => match read_pid_file(self.fs.as_ref(), path) {
                Ok(pid) => (Some(pid), None),
                Err(e) => (None, Some(e)),
            },
            None => (None, None),
        };

        info!(task = %self.name, pid = child.pid(), ?pid_target, "stopping process");
        terminate(&self.name, &mut child, pid_target, self.kill_timeout).await;
        self.set_state(LifecycleState::Idle);

        match pid_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl ProcessControl for LifecycleController {
    fn run_on_start(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.run_on_start_once())
    }

    fn start(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.start_process())
    }

    fn stop(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.stop_process())
    }
}
