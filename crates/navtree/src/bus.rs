//! In-process event bus.
//!
//! A `tokio::sync::broadcast` channel of [`EventEnvelope`]s. The repository
//! publishes after an append is durable; read-side components each hold
//! their own [`Subscription`] and run in their own task.
//!
//! Delivery is at-most-once. A subscriber that falls more than the bus
//! capacity behind loses the oldest envelopes and is told how many.

use crate::config::{NavConfig, DEFAULT_BUS_CAPACITY};
use crate::error::ProjectionError;
use crate::event::{EventEnvelope, EventFilter};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

pub use tokio::sync::broadcast::error::RecvError;

/// Error channel of a background component. Callers must drain it; a full
/// channel stalls the component.
pub type ErrorStream = mpsc::Receiver<ProjectionError>;

/// Broadcast bus for Nav envelopes.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// A bus buffering `config.bus_capacity` envelopes per subscriber.
    pub fn from_config(config: &NavConfig) -> Self {
        Self::with_capacity(config.bus_capacity)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an envelope and returns how many subscribers received it.
    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        trace!(
            nav_id = %envelope.aggregate_id,
            event = envelope.name(),
            version = envelope.version,
            "publishing"
        );
        // No subscribers is not an error for a fire-and-forget bus.
        self.sender.send(envelope).unwrap_or(0)
    }

    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A filtered view of the bus.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<EventEnvelope>,
    filter: EventFilter,
}

impl Subscription {
    /// Next matching envelope.
    pub async fn recv(&mut self) -> Result<EventEnvelope, RecvError> {
        loop {
            let envelope = self.receiver.recv().await?;
            if self.filter.matches(&envelope) {
                return Ok(envelope);
            }
        }
    }
}

/// Feeds `subscription` into `handle` until `cancel` fires or the bus
/// closes. Errors from `handle` and lag notices go to `errors`.
pub(crate) async fn run_subscriber<F>(
    component: &'static str,
    mut subscription: Subscription,
    cancel: CancellationToken,
    errors: mpsc::Sender<ProjectionError>,
    mut handle: F,
) where
    F: FnMut(EventEnvelope) -> Option<ProjectionError>,
{
    debug!(component, "subscriber started");
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = subscription.recv() => received,
        };

        let error = match received {
            Ok(envelope) => handle(envelope),
            Err(RecvError::Lagged(skipped)) => {
                warn!(component, skipped, "subscriber lagged");
                Some(ProjectionError::Lagged { component, skipped })
            }
            Err(RecvError::Closed) => break,
        };

        if let Some(error) = error {
            tokio::select! {
                _ = cancel.cancelled() => break,
                sent = errors.send(error) => {
                    if sent.is_err() {
                        trace!(component, "error receiver dropped");
                    }
                }
            }
        }
    }
    debug!(component, "subscriber stopped");
}
