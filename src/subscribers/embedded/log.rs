//! # LogWriter: renders events through `tracing`
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` records.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output
//! ```text
//! INFO coordinator-created coordinator="root/heartbeat"
//! INFO task-added coordinator="root" task="db"
//! INFO trigger-fired coordinator="root" trigger=1 reason="db connection lost"
//! INFO coordinator-cancelled coordinator="root"
//! WARN task-failed coordinator="root" task="db" reason="execution failed: eof"
//! WARN timeout-exceeded coordinator="root" timeout_ms=2000 stuck="root/ping"
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;
use tracing::{info, warn};

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let coordinator = e.coordinator.as_deref().unwrap_or("-");
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::CoordinatorCreated => info!(coordinator, "coordinator-created"),
            EventKind::CoordinatorCancelled => info!(coordinator, "coordinator-cancelled"),
            EventKind::TaskAdded => info!(coordinator, task, "task-added"),
            EventKind::TaskRejected => info!(coordinator, task, "task-rejected"),
            EventKind::TaskStopped => info!(coordinator, task, "task-stopped"),
            EventKind::TaskFailed => warn!(coordinator, task, reason, "task-failed"),
            EventKind::TriggerFired => {
                info!(coordinator, trigger = ?e.trigger, reason, "trigger-fired")
            }
            EventKind::AllStoppedWithin => {
                info!(coordinator, timeout_ms = ?e.timeout_ms, "all-stopped-within-timeout")
            }
            EventKind::TimeoutExceeded => warn!(
                coordinator,
                timeout_ms = ?e.timeout_ms,
                stuck = reason,
                "timeout-exceeded"
            ),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = task, reason, "subscriber-overflow")
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = task, reason, "subscriber-panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
