use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};
use ts_rs::TS;

/// One message on the event channel shared by the API process and the prediction workers.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct QueueEvent {
    pub id: i64,
    pub event_name: String,
    pub execution_id: String,
    pub created_at: DateTime<Utc>,
}

impl QueueEvent {
    pub async fn create<'e, E>(
        executor: E,
        event_name: &str,
        execution_id: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, QueueEvent>(
            r#"
            INSERT INTO queue_events (event_name, execution_id)
            VALUES (?1, ?2)
            RETURNING *
            "#,
        )
        .bind(event_name)
        .bind(execution_id)
        .fetch_one(executor)
        .await
    }

    /// Events with an id strictly greater than `after_id`, oldest first.
    pub async fn find_after<'e, E>(
        executor: E,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, QueueEvent>(
            r#"
            SELECT * FROM queue_events
            WHERE id > ?1
            ORDER BY id ASC
            LIMIT ?2
            "#,
        )
        .bind(after_id)
        .bind(limit)
        .fetch_all(executor)
        .await
    }

    /// Highest event id so far, 0 on an empty channel.
    pub async fn latest_id<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let (latest,): (Option<i64>,) = sqlx::query_as(r#"SELECT MAX(id) FROM queue_events"#)
            .fetch_one(executor)
            .await?;
        Ok(latest.unwrap_or(0))
    }

    pub async fn prune_older_than<'e, E>(executor: E, age: Duration) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let modifier = format!("-{} seconds", age.as_secs());
        let result = sqlx::query(
            r#"DELETE FROM queue_events WHERE created_at < datetime('now', 'subsec', ?1)"#,
        )
        .bind(modifier)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
