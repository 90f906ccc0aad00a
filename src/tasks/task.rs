//! # Task abstraction.
//!
//! This module defines the [`Task`] trait (named, cooperatively cancelable unit of work).
//! The common handle type is [`TaskRef`](crate::TaskRef), an `Arc<dyn Task>` suitable for
//! sharing across the runtime.
//!
//! A task receives a [`CancelSignal`] and must either poll it or await it, and return
//! promptly once it fires. The coordinator never aborts a task: a task that ignores
//! the signal is reported by name when the shutdown timeout elapses.

use std::future::Future;
use std::pin::Pin;

use crate::core::CancelSignal;
use crate::error::TaskError;

/// Boxed future returned by [`Task::spawn`].
pub type BoxTaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// # Asynchronous, cancelable unit.
///
/// # Example
/// ```
/// use quitter::{BoxTaskFuture, CancelSignal, Task};
///
/// struct Heartbeat;
///
/// impl Task for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     fn spawn(&self, signal: CancelSignal) -> BoxTaskFuture {
///         Box::pin(async move {
///             signal.cancelled().await;
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable task name (used in timeout reports).
    fn name(&self) -> &str;

    /// Creates the future that runs this task until completion or cancellation.
    fn spawn(&self, signal: CancelSignal) -> BoxTaskFuture;
}
