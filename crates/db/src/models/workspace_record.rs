use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqliteConnection};
use ts_rs::TS;
use uuid::Uuid;

/// Rows per multi-row INSERT. Six binds per row keeps a chunk far below SQLite's
/// host parameter limit.
const BULK_INSERT_CHUNK: usize = 500;

/// The workspace-scoped entity collections that can be copied between workspaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Tool,
    Variable,
    Assistant,
    Flow,
}

impl RecordKind {
    /// Independent kinds first; flows last because their payloads may embed tool ids.
    pub const COPY_ORDER: [RecordKind; 4] = [
        RecordKind::Tool,
        RecordKind::Variable,
        RecordKind::Assistant,
        RecordKind::Flow,
    ];

    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Tool => "tools",
            RecordKind::Variable => "variables",
            RecordKind::Assistant => "assistants",
            RecordKind::Flow => "chat_flows",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Tool => write!(f, "tool"),
            RecordKind::Variable => write!(f, "variable"),
            RecordKind::Assistant => write!(f, "assistant"),
            RecordKind::Flow => write!(f, "flow"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WorkspaceRecord {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub payload: String, // JSON
    pub imported_from_id: Option<Uuid>,
    pub imported_from_workspace_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row to insert. Timestamps are assigned by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWorkspaceRecord {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub payload: String,
    pub imported_from_id: Option<Uuid>,
    pub imported_from_workspace_id: Option<Uuid>,
}

/// Fields overwritten on an existing row. `id`, `workspace_id` and `created_at` never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRecordUpdate {
    pub name: String,
    pub payload: String,
    pub imported_from_id: Option<Uuid>,
    pub imported_from_workspace_id: Option<Uuid>,
}

impl WorkspaceRecord {
    pub async fn find_by_workspace<'e, E>(
        executor: E,
        kind: RecordKind,
        workspace_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!(
            "SELECT * FROM {} WHERE workspace_id = ?1 ORDER BY created_at ASC",
            kind.table()
        );
        sqlx::query_as::<_, WorkspaceRecord>(&query)
            .bind(workspace_id)
            .fetch_all(executor)
            .await
    }

    pub async fn create<'e, E>(
        executor: E,
        kind: RecordKind,
        data: &NewWorkspaceRecord,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!(
            r#"
            INSERT INTO {} (
                id, workspace_id, name, payload,
                imported_from_id, imported_from_workspace_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *
            "#,
            kind.table()
        );
        sqlx::query_as::<_, WorkspaceRecord>(&query)
            .bind(data.id)
            .bind(data.workspace_id)
            .bind(&data.name)
            .bind(&data.payload)
            .bind(data.imported_from_id)
            .bind(data.imported_from_workspace_id)
            .fetch_one(executor)
            .await
    }

    /// Insert many rows with multi-row INSERTs on one connection, typically a transaction.
    pub async fn bulk_insert(
        conn: &mut SqliteConnection,
        kind: RecordKind,
        records: &[NewWorkspaceRecord],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut inserted = Vec::with_capacity(records.len());

        for chunk in records.chunks(BULK_INSERT_CHUNK) {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "INSERT INTO {} (id, workspace_id, name, payload, imported_from_id, imported_from_workspace_id) ",
                kind.table()
            ));
            builder.push_values(chunk, |mut b, record| {
                b.push_bind(record.id)
                    .push_bind(record.workspace_id)
                    .push_bind(record.name.as_str())
                    .push_bind(record.payload.as_str())
                    .push_bind(record.imported_from_id)
                    .push_bind(record.imported_from_workspace_id);
            });
            builder.push(" RETURNING *");

            let rows = builder
                .build_query_as::<WorkspaceRecord>()
                .fetch_all(&mut *conn)
                .await?;
            inserted.extend(rows);
        }

        Ok(inserted)
    }

    /// Overwrite the mutable fields of one row. Returns the number of rows touched.
    pub async fn update_by_id<'e, E>(
        executor: E,
        kind: RecordKind,
        id: Uuid,
        data: &WorkspaceRecordUpdate,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!(
            r#"
            UPDATE {}
            SET name = ?2,
                payload = ?3,
                imported_from_id = ?4,
                imported_from_workspace_id = ?5,
                updated_at = datetime('now', 'subsec')
            WHERE id = ?1
            "#,
            kind.table()
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(&data.name)
            .bind(&data.payload)
            .bind(data.imported_from_id)
            .bind(data.imported_from_workspace_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
