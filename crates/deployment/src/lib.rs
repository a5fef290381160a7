use anyhow::Error as AnyhowError;
use async_trait::async_trait;
use db::DBService;
use services::services::{
    abort_coordinator::AbortCoordinator,
    config::{ConfigError, ExecutionMode, RuntimeConfig},
    execution_registry::ExecutionRegistry,
    queue_events::{AbortEventPoller, QueueEventError, spawn_event_pruner},
    workspace_copy::WorkspaceCopyService,
};
use sqlx::Error as SqlxError;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    QueueEvent(#[from] QueueEventError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &RuntimeConfig;

    fn db(&self) -> &DBService;

    fn abort_coordinator(&self) -> &AbortCoordinator;

    fn workspace_copy(&self) -> &WorkspaceCopyService;

    /// Queue mode only: keep the event table from growing without bound.
    async fn spawn_queue_event_pruner(&self) -> Option<JoinHandle<()>> {
        if self.config().mode != ExecutionMode::Queue {
            return None;
        }
        let retention = self.config().queue_event_retention;
        tracing::info!(retention_secs = retention.as_secs(), "Starting queue event pruner");
        Some(spawn_event_pruner(self.db().clone(), retention, retention / 4))
    }

    /// Worker side of queue mode: cancel runs in `registry` when abort events arrive.
    async fn spawn_abort_event_poller(
        &self,
        registry: ExecutionRegistry,
    ) -> Result<JoinHandle<()>, DeploymentError> {
        let poller = AbortEventPoller::new(self.db().clone(), registry).await?;
        tracing::info!(
            cursor = poller.cursor(),
            interval_ms = self.config().queue_poll_interval.as_millis() as u64,
            "Starting abort event poller"
        );
        Ok(poller.spawn(self.config().queue_poll_interval))
    }
}
