//! # Function-backed task (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: Fn(CancelSignal) -> Fut`, producing a fresh
//! future per spawn. Shared state, if any, goes into an explicit `Arc<...>`
//! captured by the closure.
//!
//! ## Example
//! ```rust
//! use quitter::{CancelSignal, TaskError, TaskFn, TaskRef};
//!
//! let t: TaskRef = TaskFn::arc("worker", |signal: CancelSignal| async move {
//!     while !signal.is_cancelled() {
//!         // do a slice of work...
//!         tokio::task::yield_now().await;
//!     }
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(t.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::core::CancelSignal;
use crate::error::TaskError;
use crate::tasks::task::{BoxTaskFuture, Task};

/// Shared handle to a task object.
pub type TaskRef = Arc<dyn Task>;

/// Function-backed task implementation.
///
/// Wraps a closure that *creates* a new future per spawn.
#[derive(Debug)]
pub struct TaskFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TaskFn<F> {
    /// Creates a new function-backed task.
    ///
    /// Prefer [`TaskFn::arc`] when you immediately need a [`TaskRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the task and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Task for TaskFn<F>
where
    F: Fn(CancelSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, signal: CancelSignal) -> BoxTaskFuture {
        Box::pin((self.f)(signal))
    }
}
