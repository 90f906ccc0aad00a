use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::{
    core::{Config, ExitFn, Quitter, Trigger, quitter::Shared, triggers::Multiplexer},
    error::RuntimeError,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a root coordinator and its exit function.
pub struct QuitterBuilder {
    cfg: Config,
    triggers: Vec<Trigger>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl QuitterBuilder {
    /// Creates a new builder with the given configuration and no triggers.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            triggers: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    /// Replaces the trigger list. Order matters: it defines reported indices and the tie-break.
    pub fn with_triggers(mut self, triggers: Vec<Trigger>) -> Self {
        self.triggers = triggers;
        self
    }

    /// Appends one trigger; its index is the current trigger count.
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (tree, task and shutdown lifecycle)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the root coordinator and its exit function.
    ///
    /// Must be called inside a tokio runtime: OS signal listeners are registered
    /// and subscriber workers are spawned here.
    ///
    /// # Errors
    /// [`RuntimeError::SignalSetup`] if a signal listener cannot be registered.
    pub fn build(self) -> Result<(Quitter, ExitFn), RuntimeError> {
        let triggers = Multiplexer::arm(self.triggers)?;
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            tracing::debug!(subscribers = set.len(), "subscriber set ready");
            subscriber_listener(&bus, set);
        }

        let root = Quitter::root(&self.cfg.name, Arc::new(Shared::new(bus)));
        let exit = ExitFn::new(root.clone(), triggers, self.cfg.timeout);
        Ok((root, exit))
    }
}

/// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
///
/// Ends when every handle to the tree is dropped and the bus closes.
fn subscriber_listener(bus: &Bus, set: SubscriberSet) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "subscriber listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CancelSignal;
    use crate::error::TaskError;
    use crate::events::{Event, EventKind};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(EventKind, Option<String>)>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            let mut seen = self.0.lock().unwrap();
            seen.push((ev.kind, ev.coordinator.as_deref().map(str::to_string)));
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_the_shutdown_lifecycle() {
        let rec = Arc::new(Recorder::default());
        let (root, exit) = Quitter::builder(
            Config::default()
                .with_name("app")
                .with_timeout(Duration::from_secs(1)),
        )
        .with_trigger(Trigger::Timer(Duration::from_millis(5)))
        .with_subscribers(vec![rec.clone()])
        .build()
        .unwrap();

        let child = root.new_child("hb");
        child.add_task("beat", |s: CancelSignal| async move {
            s.cancelled().await;
            Ok::<_, TaskError>(())
        });

        let outcome = exit.wait().await;
        assert!(outcome.exit_code.is_clean());
        tokio::time::sleep(Duration::from_millis(50)).await;

        let seen = rec.0.lock().unwrap().clone();
        let kinds: Vec<EventKind> = seen.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::CoordinatorCreated,
                EventKind::CoordinatorCreated,
                EventKind::TaskAdded,
                EventKind::TriggerFired,
                EventKind::CoordinatorCancelled,
                EventKind::CoordinatorCancelled,
                EventKind::TaskStopped,
                EventKind::AllStoppedWithin,
            ]
        );
        assert_eq!(seen[1].1.as_deref(), Some("app/hb"));
        assert_eq!(seen[5].1.as_deref(), Some("app/hb"));
    }
}
