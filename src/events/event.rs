//! # Runtime events emitted by coordinators, tasks and the exit function.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Tree events**: coordinator creation and cancellation
//! - **Task events**: registration, rejection and completion
//! - **Shutdown events**: trigger fired, drained in time, timeout exceeded
//!
//! The [`Event`] struct carries metadata such as timestamps, coordinator path,
//! task name, trigger index and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use quitter::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_coordinator("root/heartbeat")
//!     .with_task("ping")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("ping"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Tree events ===
    /// A coordinator node was created (root or child).
    ///
    /// Sets:
    /// - `coordinator`: node path
    CoordinatorCreated,

    /// A coordinator moved from `Active` to `Cancelling`.
    ///
    /// Sets:
    /// - `coordinator`: node path
    CoordinatorCancelled,

    // === Task events ===
    /// Task was registered and started.
    ///
    /// Sets:
    /// - `coordinator`: owning node path
    /// - `task`: task name
    TaskAdded,

    /// Registration refused because the coordinator is no longer `Active`.
    ///
    /// Sets:
    /// - `coordinator`: owning node path
    /// - `task`: task name
    TaskRejected,

    /// Task returned `Ok(())` or `Err(TaskError::Canceled)`.
    ///
    /// Sets:
    /// - `coordinator`: owning node path
    /// - `task`: task name
    TaskStopped,

    /// Task returned an error or panicked. It still counts as completed.
    ///
    /// Sets:
    /// - `coordinator`: owning node path
    /// - `task`: task name
    /// - `reason`: failure message
    TaskFailed,

    // === Shutdown events ===
    /// One of the root's trigger sources fired.
    ///
    /// Sets:
    /// - `coordinator`: root path
    /// - `trigger`: index of the winning source
    /// - `reason`: embedded error, if any
    TriggerFired,

    /// Every task in the tree completed before the timeout.
    ///
    /// Sets:
    /// - `coordinator`: root path
    /// - `timeout_ms`: configured timeout
    AllStoppedWithin,

    /// Timeout elapsed with tasks still running.
    ///
    /// Sets:
    /// - `coordinator`: root path
    /// - `timeout_ms`: configured timeout
    /// - `reason`: stuck tasks, `path/name` separated by commas
    TimeoutExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Path of the coordinator the event belongs to.
    pub coordinator: Option<Arc<str>>,
    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Index of the trigger source that fired.
    pub trigger: Option<usize>,
    /// Shutdown timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            coordinator: None,
            task: None,
            trigger: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches a coordinator path.
    #[inline]
    pub fn with_coordinator(mut self, path: impl Into<Arc<str>>) -> Self {
        self.coordinator = Some(path.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches the index of the trigger source that fired.
    #[inline]
    pub fn with_trigger(mut self, index: usize) -> Self {
        self.trigger = Some(index);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::TaskAdded);
        let b = Event::new(EventKind::TaskAdded);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn timeout_is_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::TimeoutExceeded).with_timeout(Duration::MAX);
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
