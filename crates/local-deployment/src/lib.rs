use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    abort_coordinator::AbortCoordinator,
    config::{ExecutionMode, RuntimeConfig},
    execution_registry::ExecutionRegistry,
    queue_events::DbQueuePublisher,
    workspace_copy::WorkspaceCopyService,
};

/// Single-node deployment backed by a local SQLite file.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<RuntimeConfig>,
    db: DBService,
    abort_coordinator: AbortCoordinator,
    workspace_copy: WorkspaceCopyService,
}

impl LocalDeployment {
    /// Wire the services around an already opened database.
    pub fn from_parts(config: RuntimeConfig, db: DBService) -> Self {
        let abort_coordinator = match config.mode {
            ExecutionMode::Main => AbortCoordinator::local(ExecutionRegistry::new()),
            ExecutionMode::Queue => {
                AbortCoordinator::queued(Arc::new(DbQueuePublisher::new(db.clone())))
            }
        };
        let workspace_copy = WorkspaceCopyService::new(db.clone());

        Self {
            config: Arc::new(config),
            db,
            abort_coordinator,
            workspace_copy,
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = RuntimeConfig::from_env()?;
        let db = DBService::new_with_path(&config.database_path).await?;

        tracing::info!(
            mode = %config.mode,
            database = %config.database_path.display(),
            "Local deployment initialised"
        );

        Ok(Self::from_parts(config, db))
    }

    fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn abort_coordinator(&self) -> &AbortCoordinator {
        &self.abort_coordinator
    }

    fn workspace_copy(&self) -> &WorkspaceCopyService {
        &self.workspace_copy
    }
}
