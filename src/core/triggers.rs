//! # Trigger sources and the trigger multiplexer.
//!
//! The root coordinator listens on an ordered list of [`Trigger`]s. The first one
//! to fire decides the shutdown; its index is reported back by the exit function.
//!
//! ## Sources
//! - [`Trigger::Signal`]: OS termination signals.
//!   **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`, registered eagerly when the root is built
//!   so a signal arriving before the exit function runs is not lost.
//!   **Other platforms:** only `Interrupt` (Ctrl-C via [`tokio::signal::ctrl_c`]); the rest never fire.
//! - [`Trigger::Error`]: application errors fed through an [`ErrorReporter`].
//!   A source whose reporters are all dropped without reporting never fires.
//! - [`Trigger::Timer`]: fires once the duration elapses, counted from the start of the wait.
//!
//! ## Tie-break
//! Sources are polled in list order and the first ready one wins, so when two fire
//! within the same scheduling instant the lower index is selected. Exactly one event
//! is consumed; every other source is dropped unread.

use std::fmt;
use std::time::Duration;

use futures::future::{BoxFuture, select_all};
use tokio::sync::mpsc;

use crate::error::{BoxError, RuntimeError};

/// OS signals a root can listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `SIGINT` / Ctrl-C.
    Interrupt,
    /// `SIGTERM` (systemd, Kubernetes).
    Terminate,
    /// `SIGQUIT`.
    Quit,
}

impl Signal {
    fn label(self) -> &'static str {
        match self {
            Signal::Interrupt => "signal:interrupt",
            Signal::Terminate => "signal:terminate",
            Signal::Quit => "signal:quit",
        }
    }
}

/// An event source the root coordinator listens on.
pub enum Trigger {
    /// Operating-system signal.
    Signal(Signal),
    /// Application error channel; see [`Trigger::error_channel`].
    Error(ErrorSource),
    /// One-shot timer.
    Timer(Duration),
}

impl Trigger {
    /// Default termination signals for the current platform.
    ///
    /// `Interrupt`, `Terminate` and `Quit` on unix; `Interrupt` elsewhere.
    pub fn os_signals() -> Vec<Trigger> {
        if cfg!(unix) {
            vec![
                Trigger::Signal(Signal::Interrupt),
                Trigger::Signal(Signal::Terminate),
                Trigger::Signal(Signal::Quit),
            ]
        } else {
            vec![Trigger::Signal(Signal::Interrupt)]
        }
    }

    /// Creates an error source and the reporter that feeds it.
    ///
    /// `capacity` is clamped to a minimum of 1.
    pub fn error_channel(capacity: usize) -> (ErrorReporter, Trigger) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (ErrorReporter { tx }, Trigger::Error(ErrorSource { rx }))
    }

    fn label(&self) -> &'static str {
        match self {
            Trigger::Signal(sig) => sig.label(),
            Trigger::Error(_) => "error",
            Trigger::Timer(_) => "timer",
        }
    }

    /// Registers the underlying listener and returns the future that completes on first event.
    fn arm(self) -> Result<Armed, RuntimeError> {
        let label = self.label();
        let fut: BoxFuture<'static, Option<BoxError>> = match self {
            Trigger::Signal(sig) => arm_signal(sig)?,
            Trigger::Error(ErrorSource { mut rx }) => Box::pin(async move {
                match rx.recv().await {
                    Some(err) => Some(err),
                    None => std::future::pending().await,
                }
            }),
            Trigger::Timer(dur) => Box::pin(async move {
                tokio::time::sleep(dur).await;
                None
            }),
        };
        Ok(Armed { label, fut })
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Signal(sig) => f.debug_tuple("Signal").field(sig).finish(),
            Trigger::Error(_) => f.write_str("Error(..)"),
            Trigger::Timer(d) => f.debug_tuple("Timer").field(d).finish(),
        }
    }
}

#[cfg(unix)]
fn arm_signal(sig: Signal) -> Result<BoxFuture<'static, Option<BoxError>>, RuntimeError> {
    use tokio::signal::unix::{SignalKind, signal};

    let kind = match sig {
        Signal::Interrupt => SignalKind::interrupt(),
        Signal::Terminate => SignalKind::terminate(),
        Signal::Quit => SignalKind::quit(),
    };
    let mut stream = signal(kind).map_err(|source| RuntimeError::SignalSetup {
        signal: sig,
        source,
    })?;
    Ok(Box::pin(async move {
        match stream.recv().await {
            Some(()) => None,
            None => std::future::pending().await,
        }
    }))
}

#[cfg(not(unix))]
fn arm_signal(sig: Signal) -> Result<BoxFuture<'static, Option<BoxError>>, RuntimeError> {
    match sig {
        Signal::Interrupt => Ok(Box::pin(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(%err, "ctrl-c listener failed; source disabled");
                std::future::pending::<()>().await;
            }
            None
        })),
        other => {
            tracing::debug!(signal = ?other, "signal unsupported on this platform; never fires");
            Ok(Box::pin(std::future::pending()))
        }
    }
}

/// Receiving half of an error trigger. Owned by the root once passed in.
pub struct ErrorSource {
    rx: mpsc::Receiver<BoxError>,
}

/// Sending half of an error trigger. Clone it into every task that may fail.
#[derive(Clone, Debug)]
pub struct ErrorReporter {
    tx: mpsc::Sender<BoxError>,
}

impl ErrorReporter {
    /// Feeds an error into the root's trigger set.
    ///
    /// Never blocks. Returns `false` once the root is no longer listening (a trigger
    /// already fired, or the root was dropped). A full channel still returns `true`:
    /// an earlier error on this source is pending and will fire the trigger.
    pub fn report(&self, err: impl Into<BoxError>) -> bool {
        match self.tx.try_send(err.into()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// True once the root stopped listening on this source.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// The winning trigger event.
#[derive(Debug)]
pub struct Fired {
    /// Index of the source in the root's trigger list.
    pub index: usize,
    /// Source kind (`"signal:terminate"`, `"error"`, `"timer"`, ...).
    pub source: &'static str,
    /// Error carried by an [`Trigger::Error`] source.
    pub error: Option<BoxError>,
}

/// A registered source waiting for its first event.
struct Armed {
    label: &'static str,
    fut: BoxFuture<'static, Option<BoxError>>,
}

/// Listens on all armed sources and yields the first event.
pub(crate) struct Multiplexer {
    sources: Vec<Armed>,
}

impl Multiplexer {
    /// Arms every trigger in order. Fails on the first signal that cannot be registered.
    pub(crate) fn arm(triggers: Vec<Trigger>) -> Result<Self, RuntimeError> {
        let sources = triggers
            .into_iter()
            .map(Trigger::arm)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { sources })
    }

    pub(crate) fn len(&self) -> usize {
        self.sources.len()
    }

    /// Blocks until exactly one source fires. With no sources this never completes.
    pub(crate) async fn first(self) -> Fired {
        if self.sources.is_empty() {
            return std::future::pending().await;
        }
        let (labels, futs): (Vec<_>, Vec<_>) =
            self.sources.into_iter().map(|a| (a.label, a.fut)).unzip();

        let (error, index, _rest) = select_all(futs).await;
        Fired {
            index,
            source: labels[index],
            error,
        }
    }
}
