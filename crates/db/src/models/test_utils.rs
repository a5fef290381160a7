use sqlx::SqlitePool;
use uuid::Uuid;

use super::workspace::{CreateWorkspace, Workspace};
use crate::DBService;

pub(crate) async fn setup_test_pool() -> SqlitePool {
    DBService::new_in_memory()
        .await
        .expect("failed to open sqlite memory db")
        .pool
}

pub(crate) async fn create_test_workspace(pool: &SqlitePool) -> Uuid {
    Workspace::create(
        pool,
        &CreateWorkspace {
            name: format!("Test Workspace {}", Uuid::new_v4()),
        },
    )
    .await
    .expect("failed to create test workspace")
    .id
}
