//! # Read-only cancellation signal.
//!
//! [`CancelSignal`] is the view of a coordinator's one-shot cancellation that tasks
//! receive. It can be observed any number of times, before or after it fires,
//! but never fired from the outside: only the coordinator tree does that.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Read-only handle to a coordinator's cancellation.
///
/// Cheap to clone. Once fired it stays fired.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    token: CancellationToken,
}

impl CancelSignal {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Returns `true` once the owning coordinator has started cancelling.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the owning coordinator starts cancelling.
    ///
    /// Completes immediately if that already happened. Cancellation safe.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Owned variant of [`cancelled`](Self::cancelled), for moving into `select!` arms or tasks.
    pub async fn cancelled_owned(self) {
        self.token.cancelled_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn observable_many_times_after_firing() {
        let token = CancellationToken::new();
        let signal = CancelSignal::new(token.clone());
        let clone = signal.clone();
        assert!(!signal.is_cancelled());

        token.cancel();
        token.cancel();

        for _ in 0..3 {
            tokio::time::timeout(Duration::from_millis(10), signal.cancelled())
                .await
                .unwrap();
        }
        assert!(clone.is_cancelled());
        clone.cancelled_owned().await;
    }
}
