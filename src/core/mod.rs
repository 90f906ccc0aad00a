//! Runtime core: coordinator tree, triggers and shutdown.
//!
//! Internal modules:
//! - [`quitter`]: coordinator node, hierarchy and depth-first cancellation;
//! - [`registry`]: ordered per-node task records with completion flags;
//! - [`runner`]: runs one task, catches panics, publishes its terminal event;
//! - [`signal`]: read-only cancellation view handed to tasks;
//! - [`triggers`]: trigger sources and the first-event multiplexer;
//! - [`exit`]: exit function, bounded drain and timeout reports;
//! - [`builder`]: assembles a root from [`Config`], triggers and subscribers.

mod builder;
mod config;
mod exit;
mod quitter;
mod registry;
mod runner;
mod signal;
mod triggers;

pub use builder::QuitterBuilder;
pub use config::Config;
pub use exit::{ExitCode, ExitFn, ShutdownOutcome, TimeoutReport};
pub use quitter::{Quitter, State};
pub use signal::CancelSignal;
pub use triggers::{ErrorReporter, ErrorSource, Fired, Signal, Trigger};
