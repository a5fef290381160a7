//! Event channel between the API process and prediction workers (queue mode).
//!
//! The API side publishes through [`QueueEventPublisher`]; each worker runs an
//! [`AbortEventPoller`] that reads new events and signals its own [`ExecutionRegistry`].

use std::time::Duration;

use async_trait::async_trait;
use db::{DBService, models::queue_event::QueueEvent};
use thiserror::Error;
use tokio::task::JoinHandle;

use super::execution_registry::ExecutionRegistry;

pub const ABORT_EVENT: &str = "abort";

const POLL_BATCH_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum QueueEventError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionQueueEvent {
    Abort { execution_id: String },
}

impl PredictionQueueEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            PredictionQueueEvent::Abort { .. } => ABORT_EVENT,
        }
    }

    pub fn execution_id(&self) -> &str {
        match self {
            PredictionQueueEvent::Abort { execution_id } => execution_id,
        }
    }
}

/// Fire-and-forget publication onto the worker event channel.
#[async_trait]
pub trait QueueEventPublisher: Send + Sync {
    /// Returns once the event is enqueued; delivery to a worker is not awaited.
    async fn publish(&self, event: PredictionQueueEvent) -> Result<(), QueueEventError>;
}

/// Publisher backed by the shared `queue_events` table.
#[derive(Clone)]
pub struct DbQueuePublisher {
    db: DBService,
}

impl DbQueuePublisher {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QueueEventPublisher for DbQueuePublisher {
    async fn publish(&self, event: PredictionQueueEvent) -> Result<(), QueueEventError> {
        let stored =
            QueueEvent::create(&self.db.pool, event.event_name(), event.execution_id()).await?;
        tracing::debug!(
            event_id = stored.id,
            event_name = %stored.event_name,
            execution_id = %stored.execution_id,
            "Published queue event"
        );
        Ok(())
    }
}

/// Worker-side consumer that turns `abort` events into local cancellations.
pub struct AbortEventPoller {
    db: DBService,
    registry: ExecutionRegistry,
    cursor: i64,
}

impl AbortEventPoller {
    /// Start reading after the newest existing event; history is never replayed.
    pub async fn new(db: DBService, registry: ExecutionRegistry) -> Result<Self, QueueEventError> {
        let cursor = QueueEvent::latest_id(&db.pool).await?;
        Ok(Self {
            db,
            registry,
            cursor,
        })
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Consume every event published since the last poll. Returns how many runs were cancelled.
    pub async fn poll_once(&mut self) -> Result<usize, QueueEventError> {
        let mut cancelled = 0;

        loop {
            let events = QueueEvent::find_after(&self.db.pool, self.cursor, POLL_BATCH_SIZE).await?;
            let batch_len = events.len();

            for event in events {
                self.cursor = event.id;
                if event.event_name != ABORT_EVENT {
                    tracing::debug!(event_name = %event.event_name, "Ignoring queue event");
                    continue;
                }
                if self.registry.abort(&event.execution_id) {
                    tracing::info!(execution_id = %event.execution_id, "Aborted execution from queue event");
                    cancelled += 1;
                } else {
                    tracing::debug!(
                        execution_id = %event.execution_id,
                        "Abort event for execution not running on this worker"
                    );
                }
            }

            if (batch_len as i64) < POLL_BATCH_SIZE {
                break;
            }
        }

        Ok(cancelled)
    }

    pub fn spawn(mut self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.poll_once().await {
                    tracing::warn!("Failed to poll queue events: {}", e);
                }
            }
        })
    }
}

/// Periodically delete events older than `retention`. Runs on the publishing side in queue mode.
pub fn spawn_event_pruner(db: DBService, retention: Duration, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match QueueEvent::prune_older_than(&db.pool, retention).await {
                Ok(0) => {}
                Ok(pruned) => tracing::debug!(pruned, "Pruned queue events"),
                Err(e) => tracing::warn!("Failed to prune queue events: {}", e),
            }
        }
    })
}
