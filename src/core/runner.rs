//! # Run one registered task to completion.
//!
//! Executes a [`Task`](crate::Task) exactly once with its coordinator's [`CancelSignal`],
//! marks its completion flag and publishes the terminal event to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success / graceful cancellation:
//!   task.spawn() → Ok(()) | Err(Canceled) → mark done → publish TaskStopped
//!
//! Failure:
//!   task.spawn() → Err(Fail/Fatal)        → mark done → publish TaskFailed
//!
//! Panic:
//!   task.spawn() panics (caught)          → mark done → publish TaskFailed("panicked: ..")
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event
//! - The completion flag is set **before** the future returns, so it is visible
//!   by the time the task tracker counts the task as finished
//! - Errors never start shutdown; feed them to an `ErrorReporter` for that

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::{
    core::{CancelSignal, registry::Completion},
    error::{TaskError, panic_message},
    events::{Bus, Event, EventKind},
    tasks::TaskRef,
};

/// Runs `task` once and reports its completion.
pub(crate) async fn run_tracked(
    task: TaskRef,
    signal: CancelSignal,
    done: Completion,
    bus: Bus,
    coordinator: Arc<str>,
) {
    let res = AssertUnwindSafe(async { task.spawn(signal).await })
        .catch_unwind()
        .await;
    done.mark();

    let ev = match res {
        Ok(Ok(())) | Ok(Err(TaskError::Canceled)) => Event::new(EventKind::TaskStopped),
        Ok(Err(err)) => Event::new(EventKind::TaskFailed).with_reason(err.to_string()),
        Err(panic) => Event::new(EventKind::TaskFailed)
            .with_reason(format!("panicked: {}", panic_message(&*panic))),
    };
    bus.publish(ev.with_coordinator(coordinator).with_task(task.name()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Registry;
    use crate::tasks::TaskFn;
    use tokio_util::sync::CancellationToken;

    async fn run(task: TaskRef) -> (Event, Registry) {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let mut reg = Registry::default();
        let done = reg.register(task.name());
        let signal = CancelSignal::new(CancellationToken::new());

        run_tracked(task, signal, done, bus, Arc::from("root")).await;
        (rx.recv().await.unwrap(), reg)
    }

    #[tokio::test]
    async fn ok_publishes_stopped_and_marks_done() {
        let (ev, reg) = run(TaskFn::arc("ok", |_s: CancelSignal| async {
            Ok::<_, TaskError>(())
        }))
        .await;
        assert_eq!(ev.kind, EventKind::TaskStopped);
        assert_eq!(ev.coordinator.as_deref(), Some("root"));
        assert_eq!(ev.task.as_deref(), Some("ok"));
        assert!(reg.pending().is_empty());
    }

    #[tokio::test]
    async fn canceled_counts_as_graceful() {
        let (ev, _) = run(TaskFn::arc("c", |_s: CancelSignal| async {
            Err(TaskError::Canceled)
        }))
        .await;
        assert_eq!(ev.kind, EventKind::TaskStopped);
    }

    #[tokio::test]
    async fn failure_publishes_reason() {
        let (ev, reg) = run(TaskFn::arc("f", |_s: CancelSignal| async {
            Err(TaskError::Fail {
                error: "eof".into(),
            })
        }))
        .await;
        assert_eq!(ev.kind, EventKind::TaskFailed);
        assert_eq!(ev.reason.as_deref(), Some("execution failed: eof"));
        assert!(reg.pending().is_empty());
    }

    #[tokio::test]
    async fn panic_is_caught_and_marks_done() {
        let (ev, reg) = run(TaskFn::arc("p", |_s: CancelSignal| async {
            let fail = true;
            if fail {
                panic!("kaboom");
            }
            Ok::<_, TaskError>(())
        }))
        .await;
        assert_eq!(ev.kind, EventKind::TaskFailed);
        assert_eq!(ev.reason.as_deref(), Some("panicked: kaboom"));
        assert!(reg.pending().is_empty());
    }
}
