//! # quitter
//!
//! **Quitter** is a graceful-shutdown coordinator for tokio programs made of many
//! background tasks.
//!
//! When one of the root's triggers fires (OS signal, application error, timer) it
//! broadcasts a single cancellation to every registered task across a tree of
//! coordinators, waits (bounded by a timeout) for all of them to finish, and reports
//! by name the tasks that did not.
//!
//! ## Architecture
//! ```text
//!                 ┌──────────────────────── triggers ────────────────────────┐
//!                 │ Signal(Terminate)   Error(ErrorSource)   Timer(Duration) │
//!                 └──────────────┬───────────────────────────────────────────┘
//!                                ▼  first event wins (left-biased)
//!  ExitFn::wait() ───────► Multiplexer ───► root.begin_shutdown()
//!                                                 │ depth-first
//!        ┌───────────────────────────┬────────────┴──────────────┐
//!        ▼                           ▼                           ▼
//!   Quitter "root"            Quitter "root/hb"          Quitter "root/hb/workers"
//!   CancelSignal ─► tasks     CancelSignal ─► tasks      CancelSignal ─► tasks
//!        │                           │                           │
//!        └──────── completion ───────┴──────── TaskTracker ──────┘
//!                                                 │
//!                     timeout(cfg.timeout, tracker.wait())
//!                        ├─ Ok  → ExitCode::Clean,    no reports
//!                        └─ Err → ExitCode::TimedOut, Vec<TimeoutReport>
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types                                   |
//! |-------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Coordinators**  | Tree of nodes; registration rejected once cancelling.         | [`Quitter`], [`State`]                      |
//! | **Triggers**      | Closed set of shutdown sources, first one wins.               | [`Trigger`], [`ErrorReporter`], [`Fired`]   |
//! | **Shutdown**      | Bounded drain with per-coordinator straggler reports.         | [`ExitFn`], [`ShutdownOutcome`], [`TimeoutReport`] |
//! | **Tasks**         | Cooperative, never force-killed.                              | [`Task`], [`TaskFn`], [`CancelSignal`]      |
//! | **Events**        | Lifecycle events fanned out to subscribers.                   | [`Subscribe`], [`Event`], [`EventKind`]     |
//! | **Errors**        | Typed runtime and task errors.                                | [`RuntimeError`], [`TaskError`]             |
//! | **Configuration** | Root name, timeout, bus capacity.                             | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use quitter::{CancelSignal, Quitter, TaskError, Trigger};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (reporter, on_error) = Trigger::error_channel(1);
//!     let mut triggers = Trigger::os_signals();
//!     triggers.push(on_error);
//!
//!     let (root, exit) = Quitter::new_root(Duration::from_secs(5), triggers)?;
//!
//!     root.add_task("db", move |signal: CancelSignal| {
//!         let reporter = reporter.clone();
//!         async move {
//!             // the connection drops: ask for shutdown instead of failing silently
//!             reporter.report("db connection lost");
//!             signal.cancelled().await;
//!             Ok::<_, TaskError>(())
//!         }
//!     });
//!
//!     let heartbeat = root.new_child("heartbeat");
//!     heartbeat.add_task("ping", |signal: CancelSignal| async move {
//!         while !signal.is_cancelled() {
//!             tokio::time::sleep(Duration::from_millis(10)).await;
//!         }
//!         Ok::<_, TaskError>(())
//!     });
//!
//!     let outcome = exit.wait().await;
//!     println!("exit={} trigger={}", outcome.exit_code.as_i32(), outcome.selected_source());
//!     for report in &outcome.reports {
//!         eprintln!("{} did not stop: {:?}", report.coordinator, report.tasks);
//!     }
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use self::core::{
    CancelSignal, Config, ErrorReporter, ErrorSource, ExitCode, ExitFn, Fired, Quitter,
    QuitterBuilder, ShutdownOutcome, Signal, State, TimeoutReport, Trigger,
};
pub use error::{BoxError, RuntimeError, TaskError};
pub use events::{Event, EventKind};
pub use subscribers::Subscribe;
pub use tasks::{BoxTaskFuture, Task, TaskFn, TaskRef};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
