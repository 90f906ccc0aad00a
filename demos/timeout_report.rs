//! # Example: timeout_report
//!
//! Shows what happens when a task ignores cancellation: the exit function
//! returns at the deadline and names the straggler under its coordinator.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► new_root(timeout = 2s, [Timer(1s)])
//!   ├─► root.add_task("fast")          stops on cancellation
//!   ├─► workers = root.new_child("workers")
//!   │     ├─► add_task("polite")       stops on cancellation
//!   │     └─► add_task("stubborn")     sleeps 10s regardless
//!   │
//!   └─► exit.wait()
//!         ├─► Timer fires after 1s
//!         ├─► 2s later: timeout, report root/workers: [stubborn]
//!         └─► exit code 1
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example timeout_report
//! ```

use std::time::Duration;

use quitter::{CancelSignal, Quitter, TaskError, Trigger};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let (root, exit) = Quitter::new_root(
        Duration::from_secs(2),
        vec![Trigger::Timer(Duration::from_secs(1))],
    )?;

    root.add_task("fast", |signal: CancelSignal| async move {
        signal.cancelled().await;
        Ok::<_, TaskError>(())
    });

    let workers = root.new_child("workers");
    workers.add_task("polite", |signal: CancelSignal| async move {
        signal.cancelled().await;
        println!("[polite] cancelled, exiting");
        Ok::<_, TaskError>(())
    });
    workers.add_task("stubborn", |_signal: CancelSignal| async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok::<_, TaskError>(())
    });

    println!("tasks: root={:?} workers={:?}", root.tasks(), workers.tasks());

    match exit.wait().await.into_result() {
        Ok(fired) => println!("clean shutdown after trigger #{}", fired.index),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
    Ok(())
}
