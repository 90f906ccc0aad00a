//! # Root configuration.
//!
//! Provides [`Config`], the settings of a coordinator tree. Only the root owns a
//! config; children inherit the root's timeout and event bus.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1
//! - `timeout = 0s` → stragglers are reported immediately after cancellation

use std::time::Duration;

/// Configuration of a coordinator tree.
///
/// ## Field semantics
/// - `name`: human-readable root name, first segment of every coordinator path
/// - `timeout`: maximum wait for the whole tree to drain after cancellation
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the root coordinator.
    pub name: String,

    /// Maximum time to wait for every task in the tree after cancellation.
    ///
    /// When a trigger fires:
    /// - Every coordinator's signal fires (root first, then children depth-first)
    /// - The exit function waits up to `timeout` for every registered task
    /// - If the timeout elapses, it returns exit code `1` and a report of stragglers
    pub timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns a copy with the given shutdown timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a copy with the given root name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `name = "root"`
    /// - `timeout = 60s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            name: "root".to_string(),
            timeout: Duration::from_secs(60),
            bus_capacity: 1024,
        }
    }
}
