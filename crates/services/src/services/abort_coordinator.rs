use std::sync::Arc;

use thiserror::Error;

use super::{
    config::ExecutionMode,
    execution_registry::ExecutionRegistry,
    queue_events::{PredictionQueueEvent, QueueEventError, QueueEventPublisher},
};

#[derive(Debug, Error)]
pub enum AbortError {
    #[error("Failed to publish abort event: {0}")]
    Publish(#[from] QueueEventError),
}

/// Cancels prediction runs by execution id. The variant is picked once at startup from
/// [`ExecutionMode`] and never changes for the lifetime of the process.
#[derive(Clone)]
pub enum AbortCoordinator {
    /// Runs live in this process; abort cancels their registry entry.
    Local(ExecutionRegistry),
    /// Runs live on queue workers; abort publishes an event they consume.
    Queued(Arc<dyn QueueEventPublisher>),
}

impl AbortCoordinator {
    pub fn local(registry: ExecutionRegistry) -> Self {
        AbortCoordinator::Local(registry)
    }

    pub fn queued(publisher: Arc<dyn QueueEventPublisher>) -> Self {
        AbortCoordinator::Queued(publisher)
    }

    pub fn mode(&self) -> ExecutionMode {
        match self {
            AbortCoordinator::Local(_) => ExecutionMode::Main,
            AbortCoordinator::Queued(_) => ExecutionMode::Queue,
        }
    }

    /// Registry for runs started in this process, if runs execute here at all.
    pub fn local_registry(&self) -> Option<&ExecutionRegistry> {
        match self {
            AbortCoordinator::Local(registry) => Some(registry),
            AbortCoordinator::Queued(_) => None,
        }
    }

    /// Best-effort abort. Sends at most one signal and never retries; an id with no running
    /// execution is not an error.
    pub async fn abort(&self, execution_id: &str) -> Result<(), AbortError> {
        match self {
            AbortCoordinator::Queued(publisher) => {
                publisher
                    .publish(PredictionQueueEvent::Abort {
                        execution_id: execution_id.to_string(),
                    })
                    .await?;
                tracing::info!(execution_id = %execution_id, "Published abort to prediction queue");
            }
            AbortCoordinator::Local(registry) => {
                if registry.abort(execution_id) {
                    tracing::info!(execution_id = %execution_id, "Aborted local execution");
                } else {
                    tracing::debug!(execution_id = %execution_id, "No running execution to abort");
                }
            }
        }
        Ok(())
    }
}
