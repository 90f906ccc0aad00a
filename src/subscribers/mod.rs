//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and (with the `logging` feature) the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Quitter / runner / ExitFn ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                                                                  ┌─────────┼─────────┐
//!                                                                  ▼         ▼         ▼
//!                                                              LogWriter  Metrics   Custom
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub(crate) use set::SubscriberSet;
pub use subscribe::Subscribe;
