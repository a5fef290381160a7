use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;
use uuid::Uuid;

/// Tenant namespace owning flows, tools, variables and assistants.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CreateWorkspace {
    pub name: String,
}

impl Workspace {
    pub async fn create<'e, E>(executor: E, data: &CreateWorkspace) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let id = Uuid::new_v4();
        sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (id, name)
            VALUES (?1, ?2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Workspace>(r#"SELECT * FROM workspaces WHERE id = ?1"#)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}
