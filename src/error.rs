//! Error types used by the quitter runtime and tasks.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`]: errors raised by the coordinator itself (root construction, shutdown timeout).
//! - [`TaskError`]: errors returned by individual task executions.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//!
//! Registration after cancellation is **not** an error: [`Quitter::add_task`](crate::Quitter::add_task)
//! returns `false` and the caller abandons the unit.

use std::time::Duration;
use thiserror::Error;

use crate::core::{Signal, TimeoutReport};

/// Boxed error payload carried by error triggers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the quitter runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// An OS signal listener could not be registered while building the root.
    #[error("failed to register {signal:?} listener: {source}")]
    SignalSetup {
        /// The signal that failed to register.
        signal: Signal,
        /// Underlying I/O error from the runtime.
        #[source]
        source: std::io::Error,
    },

    /// Shutdown timeout elapsed while some tasks were still running.
    ///
    /// Produced only by [`ShutdownOutcome::into_result`](crate::ShutdownOutcome::into_result);
    /// the exit function itself reports timeouts through its return value.
    #[error("shutdown timeout {timeout:?} exceeded; stuck: {stuck:?}")]
    TimeoutExceeded {
        /// The configured shutdown timeout.
        timeout: Duration,
        /// Coordinators with tasks that did not finish in time.
        stuck: Vec<TimeoutReport>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use quitter::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::TimeoutExceeded { timeout: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_timeout_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::SignalSetup { .. } => "runtime_signal_setup",
            RuntimeError::TimeoutExceeded { .. } => "runtime_timeout_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::SignalSetup { signal, source } => {
                format!("signal {signal:?} setup failed: {source}")
            }
            RuntimeError::TimeoutExceeded { timeout, stuck } => {
                let names: Vec<String> = stuck
                    .iter()
                    .flat_map(|r| r.tasks.iter().map(move |t| format!("{}/{t}", r.coordinator)))
                    .collect();
                format!("timeout exceeded after {timeout:?}; stuck tasks={names:?}")
            }
        }
    }
}

/// # Errors produced by task execution.
///
/// The coordinator has no opinion on these: they are published as
/// [`EventKind::TaskFailed`](crate::EventKind::TaskFailed) and otherwise ignored.
/// A task that wants its failure to start shutdown feeds it into an
/// [`ErrorReporter`](crate::ErrorReporter) instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Non-recoverable error.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Task execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Task observed cancellation and gave up its work.
    #[error("context cancelled")]
    Canceled,
}

impl TaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use quitter::TaskError;
    ///
    /// let err = TaskError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fatal { error } => format!("fatal: {error}"),
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "context cancelled".to_string(),
        }
    }

    /// True for [`TaskError::Canceled`], which counts as a graceful exit.
    pub fn is_canceled(&self) -> bool {
        matches!(self, TaskError::Canceled)
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_every_stuck_task() {
        let err = RuntimeError::TimeoutExceeded {
            timeout: Duration::from_secs(2),
            stuck: vec![
                TimeoutReport {
                    coordinator: "root".into(),
                    tasks: vec!["db".into()],
                },
                TimeoutReport {
                    coordinator: "root/heartbeat".into(),
                    tasks: vec!["ping".into(), "pong".into()],
                },
            ],
        };
        let msg = err.as_message();
        assert!(msg.contains("root/db"));
        assert!(msg.contains("root/heartbeat/ping"));
        assert!(msg.contains("root/heartbeat/pong"));
    }

    #[test]
    fn panic_payloads_render_as_text() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u8), "unknown panic");
    }

    #[test]
    fn canceled_is_graceful() {
        assert!(TaskError::Canceled.is_canceled());
        assert!(!TaskError::Fatal { error: "x".into() }.is_canceled());
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    }
}
