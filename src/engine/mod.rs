// src/engine/mod.rs

//! Task supervision engine.
//!
//! - [`debounce`] is the pure restart scheduler: it turns watch events into
//!   "rebuild the watch set" and "restart now" decisions, without Tokio
//!   tasks, channels or processes.
//! - [`task`] is the async control loop of one task around that core.
//! - [`supervisor`] runs all tasks concurrently and drives shutdown.

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

pub mod debounce;
pub mod supervisor;
pub mod task;

pub use debounce::{RestartScheduler, SchedulerStep};
pub use supervisor::{shutdown_signal, Supervisor};
pub use task::Task;
