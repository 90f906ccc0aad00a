//! # Exit function: trigger wait, cancellation and bounded drain.
//!
//! [`ExitFn`] is handed out together with the root [`Quitter`]. Awaiting
//! [`ExitFn::wait`] runs the whole shutdown sequence exactly once (it consumes `self`).
//!
//! ## Shutdown path
//! ```text
//! ExitFn::wait()
//!   ├─► Multiplexer::first()          (blocks until one trigger fires)
//!   │     └─► Bus.publish(TriggerFired{ index })
//!   ├─► root.begin_shutdown()         (tree-wide cancellation, depth-first)
//!   ├─► timeout(cfg.timeout, tracker.wait()):
//!   │     ├─ Ok  (all tasks done) → exit code 0, Bus.publish(AllStoppedWithin)
//!   │     └─ Err (timeout)        → walk tree for unfinished tasks
//!   │                               → exit code 1, Bus.publish(TimeoutExceeded)
//!   └─► root: Cancelling → Done
//! ```
//!
//! The drain wait is a passive wait on the tree-wide task tracker; no coordinator
//! lock is held while waiting, so completing tasks are never blocked by it.

use std::time::Duration;

use tokio::time::Instant;

use crate::{
    core::{Fired, Quitter, triggers::Multiplexer},
    error::RuntimeError,
    events::{Event, EventKind},
};

/// Process-style exit code of a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Every task finished within the timeout.
    Clean = 0,
    /// The timeout elapsed with tasks still running.
    TimedOut = 1,
}

impl ExitCode {
    /// Numeric value (`0` or `1`).
    #[inline]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// True for [`ExitCode::Clean`].
    #[inline]
    pub fn is_clean(self) -> bool {
        self == ExitCode::Clean
    }
}

/// Unfinished tasks of one coordinator at the moment the timeout elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutReport {
    /// Coordinator path, e.g. `root/heartbeat`.
    pub coordinator: String,
    /// Names of its unfinished tasks, in registration order.
    pub tasks: Vec<String>,
}

/// Result of [`ExitFn::wait`].
#[derive(Debug)]
pub struct ShutdownOutcome {
    /// `0` when the tree drained in time, `1` otherwise.
    pub exit_code: ExitCode,
    /// The trigger that started the shutdown.
    pub fired: Fired,
    /// Coordinators with stragglers; empty unless `exit_code` is [`ExitCode::TimedOut`].
    pub reports: Vec<TimeoutReport>,
    /// Time from cancellation to the end of the drain wait.
    pub elapsed: Duration,
    /// The configured timeout.
    pub timeout: Duration,
}

impl ShutdownOutcome {
    /// Index of the trigger that fired.
    #[inline]
    pub fn selected_source(&self) -> usize {
        self.fired.index
    }

    /// Converts a timeout into [`RuntimeError::TimeoutExceeded`]; a clean exit yields the trigger.
    pub fn into_result(self) -> Result<Fired, RuntimeError> {
        match self.exit_code {
            ExitCode::Clean => Ok(self.fired),
            ExitCode::TimedOut => Err(RuntimeError::TimeoutExceeded {
                timeout: self.timeout,
                stuck: self.reports,
            }),
        }
    }
}

/// Runs the root's shutdown sequence. Obtained from [`Quitter::new_root`] or the builder.
#[must_use = "the exit function must be awaited to run the shutdown"]
pub struct ExitFn {
    root: Quitter,
    triggers: Multiplexer,
    timeout: Duration,
}

impl ExitFn {
    pub(crate) fn new(root: Quitter, triggers: Multiplexer, timeout: Duration) -> Self {
        Self {
            root,
            triggers,
            timeout,
        }
    }

    /// Number of trigger sources the root listens on.
    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    /// Waits for the first trigger, cancels the tree and waits for it to drain,
    /// bounded by the configured timeout.
    ///
    /// Blocks forever if the root has no triggers.
    pub async fn wait(self) -> ShutdownOutcome {
        let ExitFn {
            root,
            triggers,
            timeout,
        } = self;

        let fired = triggers.first().await;
        let mut ev = Event::new(EventKind::TriggerFired)
            .with_trigger(fired.index)
            .with_reason(fired.source);
        if let Some(err) = &fired.error {
            ev = ev.with_reason(format!("{}: {err}", fired.source));
        }
        root.publish(ev);

        let started = Instant::now();
        root.begin_shutdown();
        tracing::debug!(
            trigger = fired.index,
            source = fired.source,
            running = root.running(),
            ?timeout,
            "shutdown started"
        );

        let tracker = root.shared_tracker();
        let drained = tokio::time::timeout(timeout, tracker.wait()).await.is_ok();
        let elapsed = started.elapsed();

        // A task may finish between the deadline and the walk; an empty walk is a clean exit.
        let reports = if drained {
            Vec::new()
        } else {
            root.timeout_reports()
        };

        let exit_code = if reports.is_empty() {
            root.publish(Event::new(EventKind::AllStoppedWithin).with_timeout(timeout));
            ExitCode::Clean
        } else {
            let stuck = reports
                .iter()
                .flat_map(|r| r.tasks.iter().map(move |t| format!("{}/{t}", r.coordinator)))
                .collect::<Vec<_>>()
                .join(",");
            root.publish(
                Event::new(EventKind::TimeoutExceeded)
                    .with_timeout(timeout)
                    .with_reason(stuck),
            );
            ExitCode::TimedOut
        };

        root.finish();
        ShutdownOutcome {
            exit_code,
            fired,
            reports,
            elapsed,
            timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CancelSignal, State, Trigger};
    use crate::error::TaskError;

    #[tokio::test(start_paused = true)]
    async fn clean_exit_finishes_the_root() {
        let (root, exit) = Quitter::new_root(
            Duration::from_secs(5),
            vec![Trigger::Timer(Duration::from_secs(1))],
        )
        .unwrap();
        let child = root.new_child("c");
        child.add_task("t", |s: CancelSignal| async move {
            s.cancelled().await;
            Ok::<_, TaskError>(())
        });
        assert_eq!(exit.trigger_count(), 1);

        let outcome = exit.wait().await;
        assert!(outcome.exit_code.is_clean());
        assert_eq!(outcome.exit_code.as_i32(), 0);
        assert!(outcome.reports.is_empty());
        assert_eq!(root.state(), State::Done);
        assert_eq!(child.state(), State::Cancelling);
        assert!(outcome.into_result().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_converts_into_runtime_error() {
        let (root, exit) = Quitter::new_root(
            Duration::from_secs(1),
            vec![Trigger::Timer(Duration::ZERO)],
        )
        .unwrap();
        root.add_task("stubborn", |_s: CancelSignal| {
            std::future::pending::<Result<(), TaskError>>()
        });

        let outcome = exit.wait().await;
        assert_eq!(outcome.exit_code.as_i32(), 1);
        match outcome.into_result() {
            Err(RuntimeError::TimeoutExceeded { timeout, stuck }) => {
                assert_eq!(timeout, Duration::from_secs(1));
                assert_eq!(stuck[0].tasks, vec!["stubborn".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn root_with_no_tasks_exits_immediately() {
        let (_root, exit) = Quitter::new_root(
            Duration::from_secs(30),
            vec![Trigger::Timer(Duration::from_millis(1))],
        )
        .unwrap();
        let outcome = exit.wait().await;
        assert!(outcome.exit_code.is_clean());
        assert_eq!(outcome.elapsed, Duration::ZERO);
    }
}
