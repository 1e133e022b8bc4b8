use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wwatch::errors::{Result, WwatchError};
use wwatch::exec::{BoxFuture, ProcessControl};

/// One recorded call on a [`FakeProcess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessCall {
    OnStart,
    Start,
    Stop,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<ProcessCall>,
    running: bool,
    in_flight: usize,
    max_in_flight: usize,
    fail_stop: bool,
}

/// A fake process controller that:
/// - records every call in order
/// - tracks whether a "child" is live
/// - tracks how many start/stop calls overlapped
///
/// Clones share state, so a test keeps one clone and hands another to the
/// task under test.
#[derive(Debug, Clone, Default)]
pub struct FakeProcess {
    state: Arc<Mutex<FakeState>>,
    op_delay: Duration,
}

impl FakeProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every start/stop take `delay`, to expose overlap.
    pub fn with_op_delay(mut self, delay: Duration) -> Self {
        self.op_delay = delay;
        self
    }

    /// Make every stop fail like an unreadable PID file does.
    pub fn failing_stop(self) -> Self {
        self.state.lock().unwrap().fail_stop = true;
        self
    }

    pub fn calls(&self) -> Vec<ProcessCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: ProcessCall) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| **c == call)
            .count()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    fn enter(&self, call: ProcessCall) {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
    }

    fn leave(&self) {
        self.state.lock().unwrap().in_flight -= 1;
    }

    async fn pause(&self) {
        if !self.op_delay.is_zero() {
            tokio::time::sleep(self.op_delay).await;
        }
    }
}

impl ProcessControl for FakeProcess {
    fn run_on_start(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if !state.calls.contains(&ProcessCall::OnStart) {
                state.calls.push(ProcessCall::OnStart);
            }
        })
    }

    fn start(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.enter(ProcessCall::Start);
            self.pause().await;

            let res = {
                let mut state = self.state.lock().unwrap();
                if state.running {
                    Err(WwatchError::AlreadyRunning("fake".to_string()))
                } else {
                    state.running = true;
                    Ok(())
                }
            };

            self.leave();
            res
        })
    }

    fn stop(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.enter(ProcessCall::Stop);
            self.pause().await;

            let res = {
                let mut state = self.state.lock().unwrap();
                let was_running = std::mem::replace(&mut state.running, false);
                if state.fail_stop && was_running {
                    Err(WwatchError::PidFile {
                        path: PathBuf::from("fake.pid"),
                        reason: "unreadable".to_string(),
                    })
                } else {
                    Ok(())
                }
            };

            self.leave();
            res
        })
    }
}
