// src/exec/mod.rs

//! Process execution layer.
//!
//! This module owns the supervised child process of a task, using
//! `tokio::process::Command`:
//!
//! - [`command`] holds `CommandSpec` and environment expansion.
//! - [`process`] spawns a child, forwards its output and tracks its exit.
//! - [`terminate`] implements the graceful-then-forced termination protocol,
//!   including the optional PID-file target.
//! - [`lifecycle`] serializes start/stop of one task's child.
//! - [`backend`] provides the `ProcessControl` trait the task loop talks to,
//!   so tests can swap in a fake that spawns nothing.

pub mod backend;
pub mod command;
pub mod lifecycle;
pub mod process;
pub mod terminate;

pub use backend::{BoxFuture, ProcessControl};
pub use command::{expand_env, expand_with, CommandSpec};
pub use lifecycle::{LifecycleController, LifecycleState};
pub use process::ProcessHandle;
pub use terminate::{read_pid_file, KILL_TIMEOUT};
