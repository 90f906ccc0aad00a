//! # Task abstractions.
//!
//! - [`Task`] - trait for implementing cooperatively cancelable tasks
//! - [`TaskFn`] - function-backed task implementation
//! - [`TaskRef`] - shared reference to a task (`Arc<dyn Task>`)

mod task;
mod task_fn;

pub use task::{BoxTaskFuture, Task};
pub use task_fn::{TaskFn, TaskRef};
