//! # Quitter: a node in the shutdown hierarchy.
//!
//! A [`Quitter`] owns a one-shot cancellation, an ordered [`Registry`] of the tasks it
//! directly owns, and its child coordinators. The root additionally owns the trigger
//! list and the timeout (held by its [`ExitFn`](crate::ExitFn)).
//!
//! ## State machine
//! ```text
//!   Active ──(root trigger fired | parent cancelled)──► Cancelling ──(root only, exit fn done)──► Done
//!     │
//!     └─ add_task() accepted only here; otherwise returns false and nothing starts
//! ```
//!
//! ## Propagation
//! ```text
//! begin_shutdown(root)
//!   ├─► shutdown_started = true      (tree-wide; later registrations are rejected)
//!   ├─► tracker.close()              (completion wait may now finish)
//!   └─► cancel_tree(root)
//!         ├─► lock: Active → Cancelling, snapshot children, unlock
//!         ├─► token.cancel()         (tasks of this node observe it)
//!         └─► cancel_tree(child) for each child, in creation order (depth-first)
//! ```
//!
//! ## Rules
//! - The node lock is never held across an `.await` or while firing a token
//! - An accepted task is spawned on the tree's tracker before the node lock is released
//! - A child created under a parent that is no longer `Active` is born `Cancelling`
//! - Cancellation never un-fires; firing twice is a no-op

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::{
    core::{
        CancelSignal, Config, ExitFn, QuitterBuilder, TimeoutReport, Trigger, registry::Registry,
        runner,
    },
    error::{RuntimeError, TaskError},
    events::{Bus, Event, EventKind},
    tasks::{TaskFn, TaskRef},
};

/// Lifecycle state of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Accepting task registrations; cancellation not fired.
    Active,
    /// Cancellation fired; tasks draining.
    Cancelling,
    /// Terminal; reached only by the root once the exit function concludes.
    Done,
}

/// State shared by every node of one tree.
pub(crate) struct Shared {
    pub(crate) bus: Bus,
    pub(crate) tracker: TaskTracker,
    shutdown_started: AtomicBool,
}

impl Shared {
    pub(crate) fn new(bus: Bus) -> Self {
        Self {
            bus,
            tracker: TaskTracker::new(),
            shutdown_started: AtomicBool::new(false),
        }
    }
}

struct Node {
    name: Arc<str>,
    path: Arc<str>,
    token: CancellationToken,
    shared: Arc<Shared>,
    inner: Mutex<NodeInner>,
}

struct NodeInner {
    state: State,
    tasks: Registry,
    children: Vec<Arc<Node>>,
}

impl Node {
    fn lock(&self) -> MutexGuard<'_, NodeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, ev: Event) {
        self.shared.bus.publish(ev.with_coordinator(self.path.clone()));
    }
}

/// Handle to a coordinator node. Cheap to clone; clones refer to the same node.
#[derive(Clone)]
pub struct Quitter {
    node: Arc<Node>,
}

impl Quitter {
    /// Builds a root coordinator listening on `triggers`, with the given shutdown timeout.
    ///
    /// Shorthand for `Quitter::builder(Config::default().with_timeout(timeout)).with_triggers(triggers).build()`.
    /// Must be called inside a tokio runtime (signal listeners are registered here).
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use quitter::{CancelSignal, ExitCode, Quitter, TaskError, Trigger};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), quitter::RuntimeError> {
    /// let (root, exit) = Quitter::new_root(
    ///     Duration::from_secs(5),
    ///     vec![Trigger::Timer(Duration::from_millis(10))],
    /// )?;
    ///
    /// root.add_task("worker", |signal: CancelSignal| async move {
    ///     signal.cancelled().await;
    ///     Ok::<_, TaskError>(())
    /// });
    ///
    /// let outcome = exit.wait().await;
    /// assert_eq!(outcome.exit_code, ExitCode::Clean);
    /// assert_eq!(outcome.fired.index, 0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new_root(
        timeout: Duration,
        triggers: Vec<Trigger>,
    ) -> Result<(Quitter, ExitFn), RuntimeError> {
        Self::builder(Config::default().with_timeout(timeout))
            .with_triggers(triggers)
            .build()
    }

    /// Starts building a root coordinator from a [`Config`].
    pub fn builder(cfg: Config) -> QuitterBuilder {
        QuitterBuilder::new(cfg)
    }

    pub(crate) fn root(name: &str, shared: Arc<Shared>) -> Self {
        let node = Arc::new(Node {
            name: Arc::from(name),
            path: Arc::from(name),
            token: CancellationToken::new(),
            shared,
            inner: Mutex::new(NodeInner {
                state: State::Active,
                tasks: Registry::default(),
                children: Vec::new(),
            }),
        });
        node.publish(Event::new(EventKind::CoordinatorCreated));
        Self { node }
    }

    /// Creates a child coordinator named `name` under this one.
    ///
    /// The child has no triggers of its own: it is cancelled only when this
    /// coordinator is. Created under a coordinator that is already cancelling,
    /// it starts out cancelled (and therefore rejects registrations).
    pub fn new_child(&self, name: impl Into<String>) -> Quitter {
        let name: String = name.into();
        let path = format!("{}/{}", self.node.path, name);

        let child = {
            let mut inner = self.node.lock();
            let state = match inner.state {
                State::Active => State::Active,
                State::Cancelling | State::Done => State::Cancelling,
            };
            let token = CancellationToken::new();
            if state == State::Cancelling {
                token.cancel();
            }
            let child = Arc::new(Node {
                name: Arc::from(name),
                path: Arc::from(path),
                token,
                shared: Arc::clone(&self.node.shared),
                inner: Mutex::new(NodeInner {
                    state,
                    tasks: Registry::default(),
                    children: Vec::new(),
                }),
            });
            inner.children.push(Arc::clone(&child));
            child
        };

        child.publish(Event::new(EventKind::CoordinatorCreated));
        Quitter { node: child }
    }

    /// Registers and starts a function-backed task.
    ///
    /// Returns `false` if this coordinator (or the tree) has already begun
    /// cancellation; `f` is then never called. Must be called inside a tokio runtime.
    pub fn add_task<F, Fut>(&self, name: impl Into<String>, f: F) -> bool
    where
        F: Fn(CancelSignal) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        let name: String = name.into();
        self.add(TaskFn::arc(name, f))
    }

    /// Registers and starts a [`Task`](crate::Task) object.
    ///
    /// Same contract as [`add_task`](Self::add_task).
    pub fn add(&self, task: TaskRef) -> bool {
        let mut inner = self.node.lock();
        let started = self.node.shared.shutdown_started.load(Ordering::Acquire);
        if inner.state != State::Active || started {
            drop(inner);
            self.node
                .publish(Event::new(EventKind::TaskRejected).with_task(task.name()));
            return false;
        }
        let done = inner.tasks.register(task.name());
        self.node
            .publish(Event::new(EventKind::TaskAdded).with_task(task.name()));

        // Spawned under the node lock: `cancel_tree` takes this lock before the
        // exit function starts waiting, so the tracker already counts the task.
        let fut = runner::run_tracked(
            task,
            self.cancel_signal(),
            done,
            self.node.shared.bus.clone(),
            self.node.path.clone(),
        );
        self.node.shared.tracker.spawn(fut);
        drop(inner);
        true
    }

    /// Read-only view of this coordinator's cancellation.
    pub fn cancel_signal(&self) -> CancelSignal {
        CancelSignal::new(self.node.token.clone())
    }

    /// True once this coordinator has started cancelling.
    pub fn is_cancelled(&self) -> bool {
        self.node.token.is_cancelled()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.node.lock().state
    }

    /// The name this coordinator was created with.
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Slash-separated path from the root, e.g. `root/heartbeat`.
    pub fn path(&self) -> &str {
        &self.node.path
    }

    /// Names of the tasks registered directly with this coordinator, in registration order.
    pub fn tasks(&self) -> Vec<String> {
        self.node.lock().tasks.names()
    }

    /// Names of this coordinator's tasks that have not completed, in registration order.
    pub fn pending(&self) -> Vec<String> {
        self.node.lock().tasks.pending()
    }

    /// Handles to the direct children, in creation order.
    pub fn children(&self) -> Vec<Quitter> {
        self.node
            .lock()
            .children
            .iter()
            .map(|node| Quitter {
                node: Arc::clone(node),
            })
            .collect()
    }

    /// Starts tree-wide cancellation. Returns `false` if it had already started.
    pub(crate) fn begin_shutdown(&self) -> bool {
        let shared = &self.node.shared;
        if shared.shutdown_started.swap(true, Ordering::AcqRel) {
            return false;
        }
        shared.tracker.close();
        cancel_tree(&self.node);
        true
    }

    /// Root only: `Cancelling → Done`.
    pub(crate) fn finish(&self) {
        self.node.lock().state = State::Done;
    }

    /// Depth-first collection of coordinators with unfinished tasks.
    pub(crate) fn timeout_reports(&self) -> Vec<TimeoutReport> {
        let mut out = Vec::new();
        collect_reports(&self.node, &mut out);
        out
    }

    /// Number of tasks still running anywhere in the tree.
    pub(crate) fn running(&self) -> usize {
        self.node.shared.tracker.len()
    }

    pub(crate) fn shared_tracker(&self) -> TaskTracker {
        self.node.shared.tracker.clone()
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.node.publish(ev);
    }
}

impl fmt::Debug for Quitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quitter")
            .field("path", &self.node.path)
            .field("state", &self.state())
            .finish()
    }
}

fn cancel_tree(node: &Arc<Node>) {
    let children = {
        let mut inner = node.lock();
        if inner.state != State::Active {
            return;
        }
        inner.state = State::Cancelling;
        inner.children.clone()
    };

    node.token.cancel();
    node.publish(Event::new(EventKind::CoordinatorCancelled));
    tracing::debug!(coordinator = %node.path, children = children.len(), "coordinator cancelled");

    for child in &children {
        cancel_tree(child);
    }
}

fn collect_reports(node: &Arc<Node>, out: &mut Vec<TimeoutReport>) {
    let (pending, children) = {
        let inner = node.lock();
        (inner.tasks.pending(), inner.children.clone())
    };
    if !pending.is_empty() {
        out.push(TimeoutReport {
            coordinator: node.path.to_string(),
            tasks: pending,
        });
    }
    for child in &children {
        collect_reports(child, out);
    }
}
