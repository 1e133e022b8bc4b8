// src/engine/debounce.rs

//! Pure debounced restart scheduler.
//!
//! The scheduler consumes `WatchEvent`s with the time they were observed and
//! produces:
//! - whether the watch set has to be rebuilt (any create/delete/rename,
//!   regardless of filtering)
//! - an armed restart deadline, pushed back by every event that passes the
//!   trigger filter
//!
//! At most one deadline exists at a time. Events that fail the filter never
//! touch it. The async task loop sleeps until [`RestartScheduler::deadline`]
//! and then asks [`RestartScheduler::poll_restart`].

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, trace};

use crate::config::TaskConfig;
use crate::engine::TaskName;
use crate::watch::{FilterVerdict, TriggerFilter, WatchEvent};

/// Delays at or above this are announced when a restart gets armed.
const ANNOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Decision returned for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStep {
    /// The watch set is stale and must be rebuilt.
    pub rebuild: bool,
    /// The event passed the filter and (re)armed the restart deadline.
    pub armed: bool,
}

#[derive(Debug)]
pub struct RestartScheduler {
    task: TaskName,
    filter: TriggerFilter,
    delay: Duration,
    deadline: Option<Instant>,
    last_trigger: Option<PathBuf>,
}

impl RestartScheduler {
    pub fn new(task: impl Into<TaskName>, filter: TriggerFilter, delay: Duration) -> Self {
        Self {
            task: task.into(),
            filter,
            delay,
            deadline: None,
            last_trigger: None,
        }
    }

    pub fn from_config(cfg: &TaskConfig) -> Self {
        Self::new(cfg.name.clone(), TriggerFilter::from_config(cfg), cfg.delay)
    }

    /// Handle one event observed at `now`.
    pub fn on_event(&mut self, event: &WatchEvent, now: Instant) -> SchedulerStep {
        let rebuild = event.kind.is_structural();

        let verdict = self.filter.verdict(&event.path);
        if verdict != FilterVerdict::Pass {
            trace!(task = %self.task, path = ?event.path, ?verdict, "event filtered out");
            return SchedulerStep {
                rebuild,
                armed: false,
            };
        }

        // Repeated events on one file are logged once.
        if self.last_trigger.as_deref() != Some(event.path.as_path()) {
            info!(task = %self.task, path = ?event.path, kind = ?event.kind, "file changed");
            if self.delay >= ANNOUNCE_DELAY {
                info!(task = %self.task, delay = ?self.delay, "waiting before restart");
            }
            self.last_trigger = Some(event.path.clone());
        }

        self.deadline = Some(now + self.delay);

        SchedulerStep {
            rebuild,
            armed: true,
        }
    }

    /// When the pending restart is due, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the pending restart if it is due at `now`.
    ///
    /// Returns true exactly once per armed deadline.
    pub fn poll_restart(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending restart.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
