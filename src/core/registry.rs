//! # Task registry - ordered per-coordinator record of registered tasks.
//!
//! Each coordinator node owns one [`Registry`] behind its node lock. The registry
//! only records names and completion flags; execution and tree-wide counting
//! belong to the runner and the shared task tracker.
//!
//! ## Rules
//! - Registration order is preserved (timeout reports list tasks in that order)
//! - Names need not be unique; duplicates are reported individually
//! - A completion flag is set exactly once, by the task's own runner, and read
//!   without the node lock being required by the writer

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Completion flag handed to the runner of one task.
#[derive(Clone, Debug)]
pub(crate) struct Completion(Arc<AtomicBool>);

impl Completion {
    /// Marks the task as finished. Called once, by the task's runner.
    pub(crate) fn mark(&self) {
        let was = self.0.swap(true, Ordering::AcqRel);
        debug_assert!(!was, "task completion marked twice");
    }

    fn is_done(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One registered task.
#[derive(Debug)]
struct Entry {
    name: Arc<str>,
    done: Completion,
}

/// Ordered registry of the tasks a single coordinator directly owns.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    /// Appends a task and returns its completion flag.
    pub(crate) fn register(&mut self, name: &str) -> Completion {
        let done = Completion(Arc::new(AtomicBool::new(false)));
        self.entries.push(Entry {
            name: Arc::from(name),
            done: done.clone(),
        });
        done
    }

    /// Names of all registered tasks, in registration order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.to_string()).collect()
    }

    /// Names of tasks that have not completed yet, in registration order.
    pub(crate) fn pending(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.done.is_done())
            .map(|e| e.name.to_string())
            .collect()
    }
}
