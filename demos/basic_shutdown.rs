//! # Example: basic_shutdown
//!
//! A small service with a coordinator tree that stops on Ctrl-C, SIGTERM, or
//! the first fatal error reported by one of its tasks.
//!
//! Shows how to:
//! - Combine [`Trigger::os_signals`] with an error trigger
//! - Register tasks on the root and on a child coordinator
//! - Watch lifecycle events through [`LogWriter`] and `tracing_subscriber`
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► builder: triggers = [Interrupt, Terminate, Quit, Error]
//!   ├─► root.add_task("api")            waits for cancellation
//!   ├─► heartbeat = root.new_child("heartbeat")
//!   │     └─► add_task("ping")          ticks until cancelled
//!   ├─► root.add_task("db")             reports an error after 3s
//!   │
//!   └─► exit.wait()
//!         ├─► Error trigger fires (index 3)
//!         ├─► root, root/heartbeat cancelled depth-first
//!         └─► all tasks stop within 5s → exit code 0
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example basic_shutdown --features logging
//! ```

use std::{sync::Arc, time::Duration};

use quitter::{CancelSignal, Config, LogWriter, Quitter, Subscribe, TaskError, Trigger};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // 1. Triggers: OS signals first, then the application error channel.
    let (reporter, on_error) = Trigger::error_channel(4);
    let mut triggers = Trigger::os_signals();
    triggers.push(on_error);

    // 2. Root coordinator with a log subscriber.
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let (root, exit) = Quitter::builder(
        Config::default()
            .with_name("svc")
            .with_timeout(Duration::from_secs(5)),
    )
    .with_triggers(triggers)
    .with_subscribers(subs)
    .build()?;

    // 3. Root tasks.
    root.add_task("api", |signal: CancelSignal| async move {
        signal.cancelled().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok::<_, TaskError>(())
    });

    root.add_task("db", move |signal: CancelSignal| {
        let reporter = reporter.clone();
        async move {
            tokio::select! {
                _ = signal.cancelled() => Ok(()),
                _ = tokio::time::sleep(Duration::from_secs(3)) => {
                    reporter.report("db connection lost");
                    Err(TaskError::Fatal { error: "db connection lost".into() })
                }
            }
        }
    });

    // 4. A child coordinator for the heartbeat.
    let heartbeat = root.new_child("heartbeat");
    heartbeat.add_task("ping", |signal: CancelSignal| async move {
        let mut tick = tokio::time::interval(Duration::from_millis(500));
        loop {
            tokio::select! {
                _ = signal.cancelled() => return Ok::<_, TaskError>(()),
                _ = tick.tick() => println!("[ping] alive"),
            }
        }
    });

    // 5. Block until shutdown completes.
    let outcome = exit.wait().await;
    println!(
        "stopped by {} (index {}) in {:?}, exit code {}",
        outcome.fired.source,
        outcome.selected_source(),
        outcome.elapsed,
        outcome.exit_code.as_i32(),
    );

    // Give the log subscriber a moment to drain.
    tokio::time::sleep(Duration::from_millis(50)).await;
    std::process::exit(outcome.exit_code.as_i32());
}
