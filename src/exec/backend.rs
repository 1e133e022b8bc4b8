// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The task loop talks to a `ProcessControl` instead of a concrete process
//! controller. Production code uses [`LifecycleController`]; tests provide an
//! implementation that records calls without spawning anything.
//!
//! [`LifecycleController`]: crate::exec::LifecycleController

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Start/stop operations on the single child of one task.
///
/// Implementations must serialize `start` and `stop`: at most one of them is
/// in flight at any time, and `start` never leaves two live children.
pub trait ProcessControl: Send + Sync {
    /// Run the on-start command, once; later calls do nothing.
    ///
    /// Its failure is logged and never aborts the task.
    fn run_on_start(&self) -> BoxFuture<'_, ()>;

    /// Start the main command.
    fn start(&self) -> BoxFuture<'_, Result<()>>;

    /// Stop the main command with the termination protocol.
    ///
    /// A no-op when nothing is running.
    fn stop(&self) -> BoxFuture<'_, Result<()>>;
}

impl<P: ProcessControl + ?Sized> ProcessControl for std::sync::Arc<P> {
    fn run_on_start(&self) -> BoxFuture<'_, ()> {
        (**self).run_on_start()
    }

    fn start(&self) -> BoxFuture<'_, Result<()>> {
        (**self).start()
    }

    fn stop(&self) -> BoxFuture<'_, Result<()>> {
        (**self).stop()
    }
}
