use std::sync::Arc;

use domain::common::error::DomainError;
use domain::ratelimit::event::RateLimitEvent;
use ports::secondary::event_sink::EventSink;
use ports::secondary::read_model_store::ReadModelStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sink that folds events into the read model on the write path, then
/// forwards them to the bus.
///
/// The inline fold makes the status projection consistent with the event
/// store at the moment a command returns; bus subscribers remain
/// best-effort. The read model dedups by `(aggregate_id, version)`, so an
/// event also delivered through a bus-driven projection is folded once.
pub struct ProjectionSink {
    read_model: Arc<dyn ReadModelStore>,
    downstream: Arc<dyn EventSink>,
}

impl ProjectionSink {
    pub fn new(read_model: Arc<dyn ReadModelStore>, downstream: Arc<dyn EventSink>) -> Self {
        Self {
            read_model,
            downstream,
        }
    }
}

impl EventSink for ProjectionSink {
    fn publish(&self, event: &RateLimitEvent) -> Result<(), DomainError> {
        if let Err(err) = self.read_model.apply_event(event) {
            tracing::warn!(
                event_id = %event.meta().id,
                error = %err,
                "read model projection failed"
            );
        }
        self.downstream.publish(event)
    }
}

/// Consume a bus subscription into the read model until the channel closes
/// or shutdown is requested.
pub fn spawn_projection(
    mut events: mpsc::Receiver<RateLimitEvent>,
    read_model: Arc<dyn ReadModelStore>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::debug!("projection shutting down");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        tracing::debug!("projection channel closed");
                        break;
                    };
                    if let Err(err) = read_model.apply_event(&event) {
                        tracing::warn!(
                            event_id = %event.meta().id,
                            error = %err,
                            "read model projection failed"
                        );
                    }
                }
            }
        }
    })
}
