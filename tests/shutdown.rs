use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use quitter::{
    BoxTaskFuture, CancelSignal, ExitCode, Quitter, State, Task, TaskError, TimeoutReport,
    Trigger,
};
use tokio::time::Instant;

const UNIT: Duration = Duration::from_secs(1);

fn cooperative(signal: CancelSignal) -> impl Future<Output = Result<(), TaskError>> {
    async move {
        signal.cancelled().await;
        Ok(())
    }
}

fn ignores_cancellation(
    for_units: u32,
) -> impl Fn(CancelSignal) -> BoxTaskFuture + Send + Sync + 'static {
    move |_signal: CancelSignal| -> BoxTaskFuture {
        Box::pin(async move {
            tokio::time::sleep(UNIT * for_units).await;
            Ok::<_, TaskError>(())
        })
    }
}

#[tokio::test(start_paused = true)]
async fn all_cooperative_tasks_exit_clean() {
    let (root, exit) = Quitter::new_root(5 * UNIT, vec![Trigger::Timer(UNIT)]).unwrap();
    let child = root.new_child("workers");
    for i in 0..8 {
        assert!(root.add_task(format!("r{i}"), cooperative));
        assert!(child.add_task(format!("c{i}"), cooperative));
    }

    let outcome = exit.wait().await;
    assert_eq!(outcome.exit_code, ExitCode::Clean);
    assert!(outcome.reports.is_empty());
    assert_eq!(outcome.selected_source(), 0);
    assert!(root.pending().is_empty());
    assert!(child.pending().is_empty());
}

#[tokio::test(start_paused = true)]
async fn one_straggler_is_reported_once_under_its_owner() {
    let (root, exit) = Quitter::new_root(2 * UNIT, vec![Trigger::Timer(Duration::ZERO)]).unwrap();
    let hb = root.new_child("heartbeat");
    root.add_task("api", cooperative);
    hb.add_task("ping", cooperative);
    hb.add_task("stuck", ignores_cancellation(10));

    let outcome = exit.wait().await;
    assert_eq!(outcome.exit_code, ExitCode::TimedOut);
    assert_eq!(
        outcome.reports,
        vec![TimeoutReport {
            coordinator: "root/heartbeat".into(),
            tasks: vec!["stuck".into()],
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn timeout_returns_at_the_deadline_not_when_the_straggler_ends() {
    let (root, exit) = Quitter::new_root(2 * UNIT, vec![Trigger::Timer(Duration::ZERO)]).unwrap();
    root.add_task("fast-1", cooperative);
    root.add_task("fast-2", cooperative);
    root.add_task("sleeper", ignores_cancellation(10));

    let start = Instant::now();
    let outcome = exit.wait().await;
    let waited = start.elapsed();

    assert_eq!(outcome.exit_code.as_i32(), 1);
    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.reports[0].tasks, vec!["sleeper".to_string()]);
    assert!(waited >= 2 * UNIT && waited < 3 * UNIT, "waited {waited:?}");
    assert_eq!(root.state(), State::Done);
}

#[tokio::test(start_paused = true)]
async fn clean_exit_returns_when_tasks_finish_not_at_the_deadline() {
    let (root, exit) = Quitter::new_root(5 * UNIT, vec![Trigger::Timer(Duration::ZERO)]).unwrap();
    for i in 0..5 {
        root.add_task(format!("t{i}"), |signal: CancelSignal| async move {
            signal.cancelled().await;
            tokio::time::sleep(UNIT).await;
            Ok::<_, TaskError>(())
        });
    }

    let start = Instant::now();
    let outcome = exit.wait().await;
    let waited = start.elapsed();

    assert_eq!(outcome.exit_code, ExitCode::Clean);
    assert!(outcome.reports.is_empty());
    assert!(waited >= UNIT && waited < 2 * UNIT, "waited {waited:?}");
    assert!(outcome.elapsed < 2 * UNIT);
}

#[tokio::test(start_paused = true)]
async fn registration_after_cancellation_never_starts_the_unit() {
    let (root, exit) = Quitter::new_root(UNIT, vec![Trigger::Timer(Duration::ZERO)]).unwrap();
    let child = root.new_child("sub");
    let started = Arc::new(AtomicUsize::new(0));
    let late_accepted = Arc::new(AtomicUsize::new(0));
    let late_tried = Arc::new(AtomicUsize::new(0));

    {
        let started = started.clone();
        let counted = move |_s: CancelSignal| {
            let started = started.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TaskError>(())
            }
        };
        let (watch_root, watch_child) = (root.clone(), child.clone());
        let (accepted, tried) = (late_accepted.clone(), late_tried.clone());
        root.add_task("watcher", move |signal: CancelSignal| {
            let (watch_root, watch_child) = (watch_root.clone(), watch_child.clone());
            let (accepted, tried) = (accepted.clone(), tried.clone());
            let counted = counted.clone();
            async move {
                signal.cancelled().await;
                for q in [&watch_root, &watch_child] {
                    if q.add_task("late", counted.clone()) {
                        accepted.fetch_add(1, Ordering::SeqCst);
                    }
                    tried.fetch_add(1, Ordering::SeqCst);
                }
                Ok::<_, TaskError>(())
            }
        });
    }

    let outcome = exit.wait().await;
    assert_eq!(outcome.exit_code, ExitCode::Clean);
    assert_eq!(late_tried.load(Ordering::SeqCst), 2);
    assert_eq!(late_accepted.load(Ordering::SeqCst), 0);
    assert!(!root.add_task("after-done", cooperative));
    assert!(!child.add_task("after-done", cooperative));

    tokio::time::sleep(UNIT).await;
    assert_eq!(started.load(Ordering::SeqCst), 0);
    assert_eq!(root.tasks(), vec!["watcher".to_string()]);
    assert!(child.tasks().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn accepted_task_racing_a_trigger_is_always_awaited() {
    let timeout = Duration::from_millis(20);
    for run in 0..200 {
        let (reporter, on_error) = Trigger::error_channel(1);
        let (root, exit) = Quitter::new_root(timeout, vec![on_error]).unwrap();

        let registrar = {
            let root = root.clone();
            tokio::spawn(async move {
                root.add_task("stuck", |_s: CancelSignal| {
                    std::future::pending::<Result<(), TaskError>>()
                })
            })
        };
        let waiter = tokio::spawn(exit.wait());
        reporter.report("stop");

        let accepted = registrar.await.unwrap();
        let outcome = waiter.await.unwrap();

        if accepted {
            assert_eq!(outcome.exit_code, ExitCode::TimedOut, "run {run}");
            assert_eq!(
                outcome.reports,
                vec![TimeoutReport {
                    coordinator: "root".into(),
                    tasks: vec!["stuck".into()],
                }],
                "run {run}"
            );
        } else {
            assert_eq!(outcome.exit_code, ExitCode::Clean, "run {run}");
            assert!(root.tasks().is_empty(), "run {run}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_triggers_select_one_source_and_cancel_once() {
    let (first, t0) = Trigger::error_channel(1);
    let (second, t1) = Trigger::error_channel(1);
    let (root, exit) = Quitter::new_root(UNIT, vec![t0, t1]).unwrap();
    let child = root.new_child("c");

    let fired = Arc::new(AtomicUsize::new(0));
    for q in [&root, &child] {
        let fired = fired.clone();
        q.add_task("observer", move |signal: CancelSignal| {
            let fired = fired.clone();
            async move {
                signal.cancelled().await;
                fired.fetch_add(1, Ordering::SeqCst);
                Ok::<_, TaskError>(())
            }
        });
    }

    assert!(second.report("second"));
    assert!(first.report("first"));

    let outcome = exit.wait().await;
    assert_eq!(outcome.selected_source(), 0);
    assert_eq!(
        outcome.fired.error.as_ref().map(|e| e.to_string()).as_deref(),
        Some("first")
    );
    assert_eq!(fired.load(Ordering::SeqCst), 2);
    assert!(!first.report("again"));
    assert!(!second.report("again"));
}

#[tokio::test(start_paused = true)]
async fn children_cancel_if_and_only_if_an_ancestor_did() {
    let (root, exit) = Quitter::new_root(UNIT, vec![Trigger::Timer(3 * UNIT)]).unwrap();
    let a = root.new_child("a");
    let b = a.new_child("b");
    let c = b.new_child("c");

    tokio::time::sleep(2 * UNIT).await;
    for q in [&root, &a, &b, &c] {
        assert!(!q.is_cancelled(), "{} cancelled early", q.path());
        assert_eq!(q.state(), State::Active);
    }

    let signal = c.cancel_signal();
    let outcome = exit.wait().await;
    assert!(outcome.exit_code.is_clean());
    assert!(signal.is_cancelled());
    for q in [&a, &b, &c] {
        assert_eq!(q.state(), State::Cancelling);
    }
    assert_eq!(root.state(), State::Done);
    assert_eq!(c.path(), "root/a/b/c");
}

struct Stubborn;

impl Task for Stubborn {
    fn name(&self) -> &str {
        "stubborn"
    }

    fn spawn(&self, _signal: CancelSignal) -> BoxTaskFuture {
        Box::pin(std::future::pending::<Result<(), TaskError>>())
    }
}

#[tokio::test(start_paused = true)]
async fn task_objects_are_reported_in_registration_order() {
    let (root, exit) = Quitter::new_root(UNIT, vec![Trigger::Timer(Duration::ZERO)]).unwrap();
    let pool = root.new_child("pool");
    assert!(pool.add(Arc::new(Stubborn)));
    assert!(pool.add_task("ok", cooperative));
    assert!(pool.add_task("slow", ignores_cancellation(5)));
    assert!(root.add(Arc::new(Stubborn)));

    let outcome = exit.wait().await;
    assert_eq!(outcome.exit_code, ExitCode::TimedOut);
    assert_eq!(
        outcome.reports,
        vec![
            TimeoutReport {
                coordinator: "root".into(),
                tasks: vec!["stubborn".into()],
            },
            TimeoutReport {
                coordinator: "root/pool".into(),
                tasks: vec!["stubborn".into(), "slow".into()],
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failing_and_panicking_tasks_still_count_as_finished() {
    let (root, exit) = Quitter::new_root(UNIT, vec![Trigger::Timer(UNIT)]).unwrap();
    root.add_task("fails", |_s: CancelSignal| async {
        Err(TaskError::Fail {
            error: "disk full".into(),
        })
    });
    root.add_task("panics", |signal: CancelSignal| async move {
        signal.cancelled().await;
        let boom = true;
        if boom {
            panic!("handler bug");
        }
        Ok::<_, TaskError>(())
    });

    let outcome = exit.wait().await;
    assert_eq!(outcome.exit_code, ExitCode::Clean);
    assert!(root.pending().is_empty());
}
