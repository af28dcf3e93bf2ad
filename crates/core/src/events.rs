//! Operation-level event fan-out.
//!
//! One `EventEmitter` is constructed at the composition root and injected
//! into the orchestration layer; there is deliberately no process-wide
//! singleton. Consumers either take a broadcast receiver (streaming) or
//! register an [`EventSubscriber`] (callback style). A failing subscriber is
//! logged and skipped; it never affects delivery to the others.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

/// Lifecycle events for one user-invoked operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OperationEvent {
    /// A command process has been spawned
    CommandStarted {
        log_name: String,
        execution_id: String,
    },
    /// The process reached its terminal exit event
    CommandFinished {
        log_name: String,
        execution_id: String,
        exit_code: Option<i32>,
        duration_ms: u64,
    },
    /// The process could not be spawned
    CommandSpawnFailed {
        log_name: String,
        execution_id: String,
        error: String,
    },
    /// The operation was cancelled by the user
    CommandCancelled {
        log_name: String,
        execution_id: String,
    },
    /// Sync-state cache entries were updated after a push or pull
    CacheUpdated { log_name: String, entries: usize },
    /// The parsed result reported source conflicts
    ConflictsDetected { log_name: String, files: usize },
}

/// Callback-style consumer of operation events.
#[async_trait::async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handle one event. Errors are logged by the emitter, not propagated.
    async fn handle_event(
        &self,
        event: &OperationEvent,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Subscriber name for diagnostics
    fn name(&self) -> &'static str;

    /// Filter hook; defaults to interested in everything
    fn is_interested(&self, event: &OperationEvent) -> bool {
        let _ = event;
        true
    }
}

/// Multi-subscriber emitter over [`OperationEvent`]s.
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<OperationEvent>,
    subscribers: Arc<RwLock<Vec<Arc<dyn EventSubscriber>>>>,
}

impl EventEmitter {
    /// Create an emitter with the given broadcast capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Publish an event to channel receivers and registered subscribers
    pub async fn publish(&self, event: OperationEvent) {
        // A send error only means there are no channel receivers right now.
        let _ = self.sender.send(event.clone());

        let subscribers = self.subscribers.read().await;
        for subscriber in subscribers.iter() {
            if !subscriber.is_interested(&event) {
                continue;
            }
            if let Err(e) = subscriber.handle_event(&event).await {
                warn!(
                    subscriber = subscriber.name(),
                    error = %e,
                    "event subscriber failed; continuing with remaining subscribers"
                );
            }
        }
    }

    /// Register a callback-style subscriber
    pub async fn register_subscriber(&self, subscriber: Arc<dyn EventSubscriber>) {
        let mut subscribers = self.subscribers.write().await;
        debug!(
            subscriber = subscriber.name(),
            total = subscribers.len() + 1,
            "registered event subscriber"
        );
        subscribers.push(subscriber);
    }

    /// Remove a subscriber by name
    pub async fn unregister_subscriber(&self, name: &str) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.retain(|s| s.name() != name);
    }

    /// Subscribe as a broadcast receiver
    pub fn subscribe(&self) -> broadcast::Receiver<OperationEvent> {
        self.sender.subscribe()
    }

    /// Number of live broadcast receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(crate::constants::OPERATION_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        seen: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl EventSubscriber for Counting {
        async fn handle_event(
            &self,
            _event: &OperationEvent,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct Failing;

    #[async_trait::async_trait]
    impl EventSubscriber for Failing {
        async fn handle_event(
            &self,
            _event: &OperationEvent,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("boom".into())
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn started() -> OperationEvent {
        OperationEvent::CommandStarted {
            log_name: "project_deploy_start".to_string(),
            execution_id: "e1".to_string(),
        }
    }

    #[tokio::test]
    async fn failing_subscriber_does_not_block_others() {
        let emitter = EventEmitter::new(16);
        let counting = Arc::new(Counting {
            seen: AtomicUsize::new(0),
        });
        emitter.register_subscriber(Arc::new(Failing)).await;
        emitter.register_subscriber(counting.clone()).await;

        emitter.publish(started()).await;
        emitter.publish(started()).await;

        assert_eq!(counting.seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn broadcast_receivers_observe_published_events() {
        let emitter = EventEmitter::new(16);
        let mut rx = emitter.subscribe();
        emitter.publish(started()).await;

        match rx.recv().await.unwrap() {
            OperationEvent::CommandStarted { log_name, .. } => {
                assert_eq!(log_name, "project_deploy_start");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unregister_removes_by_name() {
        let emitter = EventEmitter::new(16);
        let counting = Arc::new(Counting {
            seen: AtomicUsize::new(0),
        });
        emitter.register_subscriber(counting.clone()).await;
        emitter.unregister_subscriber("counting").await;

        emitter.publish(started()).await;
        assert_eq!(counting.seen.load(Ordering::SeqCst), 0);
    }
}
