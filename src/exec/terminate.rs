// src/exec/terminate.rs

//! Termination protocol.
//!
//! 1. The child's process group gets a graceful terminate signal; if the child
//!    has not been reaped, or any other group member is still running, within
//!    [`KILL_TIMEOUT`], the group is force-killed.
//! 2. When a PID-file target is configured, that pid concurrently gets an
//!    interrupt, its own watchdog of the same length, and is waited for.
//! 3. `terminate` returns once the child is reaped and the pid target is gone
//!    (or given up on after its force-kill window).
//!
//! Signal delivery failures are logged, never returned: the watchdog still
//! gets its chance to clean up.

use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{Result, WwatchError};
use crate::exec::process::ProcessHandle;
use crate::fs::FileSystem;

/// Grace period between the polite signal and the forced kill.
pub const KILL_TIMEOUT: Duration = Duration::from_secs(1);

#[cfg(unix)]
const PID_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Read the pid of an externally managed process.
///
/// The file must hold a single positive integer (surrounding whitespace is
/// ignored). Anything else is an error.
pub fn read_pid_file(fs: &dyn FileSystem, path: &Path) -> Result<i32> {
    let contents = fs.read_to_string(path).map_err(|e| WwatchError::PidFile {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })?;

    let trimmed = contents.trim();
    match trimmed.parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        Ok(pid) => Err(WwatchError::PidFile {
            path: path.to_path_buf(),
            reason: format!("pid must be positive, got {pid}"),
        }),
        Err(e) => Err(WwatchError::PidFile {
            path: path.to_path_buf(),
            reason: format!("invalid pid '{trimmed}': {e}"),
        }),
    }
}

/// Run the full protocol against `handle` and the optional pid target.
///
/// Both watchdogs run concurrently.
pub async fn terminate(
    task: &str,
    handle: &mut ProcessHandle,
    pid_target: Option<i32>,
    timeout: Duration,
) {
    match pid_target {
        Some(pid) => {
            tokio::join!(
                terminate_group(task, handle, timeout),
                terminate_pid(task, pid, timeout)
            );
        }
        None => terminate_group(task, handle, timeout).await,
    }
}

/// Graceful-then-forced stop of the child's process group.
///
/// Returns once the child is reaped and no other member of its group is
/// left running. Members that outlive the leader share its deadline.
pub async fn terminate_group(task: &str, handle: &mut ProcessHandle, timeout: Duration) {
    let pid = handle.pid();
    debug!(task = %task, pid, "sending terminate to process group");
    let deadline = Instant::now() + timeout;
    graceful_group(task, handle);

    let leader_exited = tokio::time::timeout_at(deadline, handle.wait_exit())
        .await
        .is_ok();
    if leader_exited && wait_group_gone(pid, deadline).await {
        return;
    }

    warn!(task = %task, pid, leader_exited, ?timeout, "process group still running; killing it");
    force_kill_group(task, handle);
    handle.wait_exit().await;

    if !wait_group_gone(pid, Instant::now() + timeout).await {
        warn!(task = %task, pid, "process group survived SIGKILL; giving up on it");
    }
}

#[cfg(unix)]
fn graceful_group(task: &str, handle: &mut ProcessHandle) {
    if let Err(e) = unix::signal_group(handle.pid(), libc::SIGTERM) {
        log_signal_error(task, handle.pid(), "terminate group", &e);
    }
}

#[cfg(not(unix))]
fn graceful_group(_task: &str, handle: &mut ProcessHandle) {
    // No process groups or soft signals here.
    handle.request_kill();
}

#[cfg(unix)]
fn force_kill_group(task: &str, handle: &mut ProcessHandle) {
    if let Err(e) = unix::signal_group(handle.pid(), libc::SIGKILL) {
        log_signal_error(task, handle.pid(), "kill group", &e);
    }
    handle.request_kill();
}

#[cfg(not(unix))]
fn force_kill_group(_task: &str, handle: &mut ProcessHandle) {
    handle.request_kill();
}

/// Interrupt the pid target, force-kill it after `timeout`, and wait for it
/// to disappear.
#[cfg(unix)]
pub async fn terminate_pid(task: &str, pid: i32, timeout: Duration) {
    info!(task = %task, pid, "sending interrupt to pid from PID file");
    if let Err(e) = unix::signal_pid(pid, libc::SIGINT) {
        if unix::is_no_such_process(&e) {
            debug!(task = %task, pid, "pid target already gone");
            return;
        }
        log_signal_error(task, pid as u32, "interrupt pid", &e);
    }

    if wait_gone(Instant::now() + timeout, || unix::pid_alive(pid)).await {
        return;
    }

    warn!(task = %task, pid, ?timeout, "pid target still running; killing it");
    if let Err(e) = unix::signal_pid(pid, libc::SIGKILL) {
        log_signal_error(task, pid as u32, "kill pid", &e);
    }

    if !wait_gone(Instant::now() + timeout, || unix::pid_alive(pid)).await {
        warn!(task = %task, pid, "pid target survived SIGKILL; giving up on it");
    }
}

#[cfg(not(unix))]
pub async fn terminate_pid(task: &str, pid: i32, _timeout: Duration) {
    warn!(task = %task, pid, "signalling a PID-file target is only supported on Unix");
}

/// Poll `alive` until it reports false or `deadline` passes.
#[cfg(unix)]
async fn wait_gone(deadline: Instant, alive: impl Fn() -> bool) -> bool {
    loop {
        if !alive() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(PID_POLL_INTERVAL).await;
    }
}

#[cfg(unix)]
async fn wait_group_gone(pgid: u32, deadline: Instant) -> bool {
    wait_gone(deadline, || unix::group_alive(pgid)).await
}

/// Without process groups only the child itself is tracked.
#[cfg(not(unix))]
async fn wait_group_gone(_pgid: u32, _deadline: Instant) -> bool {
    true
}

#[cfg(unix)]
fn log_signal_error(task: &str, pid: u32, what: &str, e: &std::io::Error) {
    if unix::is_no_such_process(e) {
        debug!(task = %task, pid, what, "signal target already gone");
    } else {
        warn!(task = %task, pid, what, error = %e, "signal delivery failed");
    }
}

#[cfg(unix)]
mod unix {
    use std::io;

    pub fn signal_group(pgid: u32, sig: libc::c_int) -> io::Result<()> {
        // SAFETY: killpg has no memory-safety preconditions.
        let rc = unsafe { libc::killpg(pgid as libc::pid_t, sig) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    pub fn signal_pid(pid: i32, sig: libc::c_int) -> io::Result<()> {
        // SAFETY: kill has no memory-safety preconditions; pid is positive.
        let rc = unsafe { libc::kill(pid as libc::pid_t, sig) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    /// Signal 0 probes existence; EPERM still means "exists". A zombie
    /// counts as gone: nobody may ever reap it.
    pub fn pid_alive(pid: i32) -> bool {
        match signal_pid(pid, 0) {
            Ok(()) => !procfs::is_zombie(pid),
            Err(e) => e.raw_os_error() == Some(libc::EPERM),
        }
    }

    /// Whether any member of the group is still running.
    pub fn group_alive(pgid: u32) -> bool {
        match signal_group(pgid, 0) {
            Ok(()) => !procfs::only_zombies_in_group(pgid as i32),
            Err(e) => e.raw_os_error() == Some(libc::EPERM),
        }
    }

    pub fn is_no_such_process(e: &io::Error) -> bool {
        e.raw_os_error() == Some(libc::ESRCH)
    }

    #[cfg(target_os = "linux")]
    mod procfs {
        use std::fs;

        /// State letter and process group from `/proc/<pid>/stat`.
        fn stat(pid: i32) -> Option<(char, i32)> {
            let raw = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
            // comm may itself contain ')' or spaces.
            let rest = &raw[raw.rfind(')')? + 1..];
            let mut fields = rest.split_whitespace();
            let state = fields.next()?.chars().next()?;
            let _ppid = fields.next()?;
            let pgrp = fields.next()?.parse().ok()?;
            Some((state, pgrp))
        }

        pub fn is_zombie(pid: i32) -> bool {
            matches!(stat(pid), Some(('Z', _)))
        }

        /// True when every member of `pgid` still in the process table is a
        /// zombie. An unreadable `/proc` answers false.
        pub fn only_zombies_in_group(pgid: i32) -> bool {
            let Ok(entries) = fs::read_dir("/proc") else {
                return false;
            };
            !entries
                .flatten()
                .filter_map(|entry| entry.file_name().to_str()?.parse::<i32>().ok())
                .filter_map(stat)
                .any(|(state, pgrp)| pgrp == pgid && state != 'Z')
        }
    }

    #[cfg(not(target_os = "linux"))]
    mod procfs {
        pub fn is_zombie(_pid: i32) -> bool {
            false
        }

        pub fn only_zombies_in_group(_pgid: i32) -> bool {
            false
        }
    }
}
