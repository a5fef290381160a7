//! Workspace-to-workspace copy.
//!
//! Records of every kind are copied from a source workspace into a destination workspace.
//! Records copied by an earlier run are found again through their `imported_from_*` stamp and
//! updated in place, so repeating a copy never duplicates them. Tool ids change on the way;
//! flows embed tool ids in their payloads, so those are rewritten before flows are planned.
//! Everything is written in one transaction.

use std::collections::{BTreeMap, HashMap};

use db::{
    DBService,
    models::{
        workspace::Workspace,
        workspace_record::{
            NewWorkspaceRecord, RecordKind, WorkspaceRecord, WorkspaceRecordUpdate,
        },
    },
};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WorkspaceCopyError {
    #[error("Source and destination workspace are the same: {0}")]
    SameWorkspace(Uuid),
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(Uuid),
    #[error("Failed to load {kind} records of workspace {workspace_id}: {source}")]
    Fetch {
        kind: RecordKind,
        workspace_id: Uuid,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to write {kind} records: {source}")]
    Write {
        kind: RecordKind,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to look up workspace {workspace_id}: {source}")]
    WorkspaceLookup {
        workspace_id: Uuid,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to start workspace copy: {0}")]
    Begin(#[source] sqlx::Error),
    #[error("Failed to commit workspace copy: {0}")]
    Commit(#[source] sqlx::Error),
}

/// Old-id → new-id substitutions applied to serialized payloads.
#[derive(Debug, Clone, Default)]
pub struct IdRemap {
    ids: BTreeMap<Uuid, Uuid>,
}

impl IdRemap {
    pub fn insert(&mut self, from: Uuid, to: Uuid) {
        self.ids.insert(from, to);
    }

    pub fn get(&self, from: &Uuid) -> Option<Uuid> {
        self.ids.get(from).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Replace every textual occurrence of each old id. This is plain substring replacement:
    /// an old id appearing outside an actual reference is rewritten as well.
    pub fn apply(&self, text: &str) -> String {
        let mut rewritten = text.to_string();
        for (from, to) in &self.ids {
            if from == to {
                continue;
            }
            let from = from.to_string();
            if rewritten.contains(&from) {
                rewritten = rewritten.replace(&from, &to.to_string());
            }
        }
        rewritten
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub id: Uuid,
    pub fields: WorkspaceRecordUpdate,
}

/// Writes needed to bring one record kind of the destination up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    pub kind: RecordKind,
    pub to_create: Vec<NewWorkspaceRecord>,
    pub to_update: Vec<PlannedUpdate>,
    /// Source record id → id the record has in the destination after the copy.
    pub assigned_ids: Vec<(Uuid, Uuid)>,
}

impl CopyPlan {
    /// Separate the source records into creates and updates against the destination's
    /// existing records.
    pub fn build(
        kind: RecordKind,
        from: Vec<WorkspaceRecord>,
        to: &[WorkspaceRecord],
        source_workspace_id: Uuid,
        destination_workspace_id: Uuid,
    ) -> Self {
        // First match wins if the destination somehow holds duplicates.
        let mut existing: HashMap<(Uuid, Uuid), Uuid> = HashMap::new();
        for record in to {
            if let (Some(from_id), Some(from_workspace)) =
                (record.imported_from_id, record.imported_from_workspace_id)
            {
                existing.entry((from_id, from_workspace)).or_insert(record.id);
            }
        }

        let mut plan = CopyPlan {
            kind,
            to_create: Vec::new(),
            to_update: Vec::new(),
            assigned_ids: Vec::with_capacity(from.len()),
        };

        for record in from {
            let source_id = record.id;
            match existing.get(&(source_id, source_workspace_id)) {
                Some(&existing_id) => {
                    plan.to_update.push(PlannedUpdate {
                        id: existing_id,
                        fields: WorkspaceRecordUpdate {
                            name: record.name,
                            payload: record.payload,
                            imported_from_id: Some(source_id),
                            imported_from_workspace_id: Some(source_workspace_id),
                        },
                    });
                    plan.assigned_ids.push((source_id, existing_id));
                }
                None => {
                    let new_id = Uuid::new_v4();
                    plan.to_create.push(NewWorkspaceRecord {
                        id: new_id,
                        workspace_id: destination_workspace_id,
                        name: record.name,
                        payload: record.payload,
                        imported_from_id: Some(source_id),
                        imported_from_workspace_id: Some(source_workspace_id),
                    });
                    plan.assigned_ids.push((source_id, new_id));
                }
            }
        }

        plan
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
pub struct KindCopySummary {
    pub kind: RecordKind,
    pub created: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CopySummary {
    pub source_workspace_id: Uuid,
    pub destination_workspace_id: Uuid,
    pub kinds: Vec<KindCopySummary>,
}

impl CopySummary {
    pub fn for_kind(&self, kind: RecordKind) -> Option<&KindCopySummary> {
        self.kinds.iter().find(|k| k.kind == kind)
    }

    pub fn total_created(&self) -> usize {
        self.kinds.iter().map(|k| k.created).sum()
    }

    pub fn total_updated(&self) -> usize {
        self.kinds.iter().map(|k| k.updated).sum()
    }
}

#[derive(Clone)]
pub struct WorkspaceCopyService {
    db: DBService,
}

impl WorkspaceCopyService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// Copy flows, tools, variables and assistants of `source_workspace_id` into
    /// `destination_workspace_id`. Nothing in the destination is ever deleted.
    ///
    /// The transaction takes SQLite's write lock before reading, so copies running at the same
    /// time queue on the busy timeout instead of failing on a stale snapshot.
    pub async fn copy_workspace(
        &self,
        source_workspace_id: Uuid,
        destination_workspace_id: Uuid,
    ) -> Result<CopySummary, WorkspaceCopyError> {
        if source_workspace_id == destination_workspace_id {
            return Err(WorkspaceCopyError::SameWorkspace(source_workspace_id));
        }

        tracing::info!(
            source = %source_workspace_id,
            destination = %destination_workspace_id,
            "Copying workspace"
        );

        let mut tx = self
            .db
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(WorkspaceCopyError::Begin)?;

        for workspace_id in [source_workspace_id, destination_workspace_id] {
            let workspace = Workspace::find_by_id(&mut *tx, workspace_id)
                .await
                .map_err(|source| WorkspaceCopyError::WorkspaceLookup {
                    workspace_id,
                    source,
                })?;
            if workspace.is_none() {
                return Err(WorkspaceCopyError::WorkspaceNotFound(workspace_id));
            }
        }

        // Every set is loaded before the first write.
        let mut sets = Vec::with_capacity(RecordKind::COPY_ORDER.len());
        for kind in RecordKind::COPY_ORDER {
            let from = fetch(&mut tx, kind, source_workspace_id).await?;
            let to = fetch(&mut tx, kind, destination_workspace_id).await?;
            sets.push((kind, from, to));
        }

        let mut tool_ids = IdRemap::default();
        let mut plans = Vec::with_capacity(sets.len());
        for (kind, mut from, to) in sets {
            if kind == RecordKind::Flow && !tool_ids.is_empty() {
                for record in &mut from {
                    record.payload = tool_ids.apply(&record.payload);
                }
            }

            let plan = CopyPlan::build(
                kind,
                from,
                &to,
                source_workspace_id,
                destination_workspace_id,
            );

            tracing::debug!(
                kind = %kind,
                create = plan.to_create.len(),
                update = plan.to_update.len(),
                "Planned workspace copy"
            );

            if kind == RecordKind::Tool {
                for &(source_id, destination_id) in &plan.assigned_ids {
                    tool_ids.insert(source_id, destination_id);
                }
            }
            plans.push(plan);
        }

        if let Err(e) = apply_plans(&mut tx, &plans).await {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("Failed to roll back workspace copy: {}", rollback_err);
            }
            return Err(e);
        }
        tx.commit().await.map_err(WorkspaceCopyError::Commit)?;

        let summary = CopySummary {
            source_workspace_id,
            destination_workspace_id,
            kinds: plans
                .iter()
                .map(|plan| KindCopySummary {
                    kind: plan.kind,
                    created: plan.to_create.len(),
                    updated: plan.to_update.len(),
                })
                .collect(),
        };

        tracing::info!(
            source = %source_workspace_id,
            destination = %destination_workspace_id,
            created = summary.total_created(),
            updated = summary.total_updated(),
            remapped_tools = tool_ids.len(),
            "Workspace copy committed"
        );

        Ok(summary)
    }
}

async fn fetch(
    conn: &mut SqliteConnection,
    kind: RecordKind,
    workspace_id: Uuid,
) -> Result<Vec<WorkspaceRecord>, WorkspaceCopyError> {
    WorkspaceRecord::find_by_workspace(&mut *conn, kind, workspace_id)
        .await
        .map_err(|source| WorkspaceCopyError::Fetch {
            kind,
            workspace_id,
            source,
        })
}

/// All creates of every kind first, then the updates one row at a time.
async fn apply_plans(
    conn: &mut SqliteConnection,
    plans: &[CopyPlan],
) -> Result<(), WorkspaceCopyError> {
    for plan in plans {
        if plan.to_create.is_empty() {
            continue;
        }
        WorkspaceRecord::bulk_insert(&mut *conn, plan.kind, &plan.to_create)
            .await
            .map_err(|source| WorkspaceCopyError::Write {
                kind: plan.kind,
                source,
            })?;
    }

    for plan in plans {
        for update in &plan.to_update {
            let touched =
                WorkspaceRecord::update_by_id(&mut *conn, plan.kind, update.id, &update.fields)
                    .await
                    .map_err(|source| WorkspaceCopyError::Write {
                        kind: plan.kind,
                        source,
                    })?;
            if touched == 0 {
                return Err(WorkspaceCopyError::Write {
                    kind: plan.kind,
                    source: sqlx::Error::RowNotFound,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::workspace::CreateWorkspace;
    use sqlx::SqlitePool;

    use super::*;

    async fn setup() -> (WorkspaceCopyService, SqlitePool) {
        let db = DBService::new_in_memory()
            .await
            .expect("failed to open sqlite memory db");
        let pool = db.pool.clone();
        (WorkspaceCopyService::new(db), pool)
    }

    async fn create_workspace(pool: &SqlitePool, name: &str) -> Uuid {
        Workspace::create(pool, &CreateWorkspace { name: name.into() })
            .await
            .expect("failed to create workspace")
            .id
    }

    async fn create_record(
        pool: &SqlitePool,
        kind: RecordKind,
        workspace_id: Uuid,
        name: &str,
        payload: &str,
    ) -> WorkspaceRecord {
        WorkspaceRecord::create(
            pool,
            kind,
            &NewWorkspaceRecord {
                id: Uuid::new_v4(),
                workspace_id,
                name: name.into(),
                payload: payload.into(),
                imported_from_id: None,
                imported_from_workspace_id: None,
            },
        )
        .await
        .expect("failed to create record")
    }

    async fn records(pool: &SqlitePool, kind: RecordKind, workspace_id: Uuid) -> Vec<WorkspaceRecord> {
        WorkspaceRecord::find_by_workspace(pool, kind, workspace_id)
            .await
            .expect("failed to fetch records")
    }

    fn record(id: Uuid, workspace_id: Uuid, imported_from: Option<(Uuid, Uuid)>) -> WorkspaceRecord {
        WorkspaceRecord {
            id,
            workspace_id,
            name: "record".into(),
            payload: "{}".into(),
            imported_from_id: imported_from.map(|(id, _)| id),
            imported_from_workspace_id: imported_from.map(|(_, ws)| ws),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn plan_separates_creates_from_updates() {
        let source = Uuid::new_v4();
        let destination = Uuid::new_v4();
        let already_copied = record(Uuid::new_v4(), source, None);
        let fresh = record(Uuid::new_v4(), source, None);
        let existing = record(
            Uuid::new_v4(),
            destination,
            Some((already_copied.id, source)),
        );
        // Same source id but copied from another workspace: not a match.
        let unrelated = record(
            Uuid::new_v4(),
            destination,
            Some((fresh.id, Uuid::new_v4())),
        );

        let plan = CopyPlan::build(
            RecordKind::Tool,
            vec![already_copied.clone(), fresh.clone()],
            &[existing.clone(), unrelated],
            source,
            destination,
        );

        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].id, existing.id);
        assert_eq!(plan.to_update[0].fields.imported_from_id, Some(already_copied.id));
        assert_eq!(plan.to_create.len(), 1);
        let created = &plan.to_create[0];
        assert_ne!(created.id, fresh.id);
        assert_eq!(created.workspace_id, destination);
        assert_eq!(created.imported_from_id, Some(fresh.id));
        assert_eq!(created.imported_from_workspace_id, Some(source));
        assert_eq!(
            plan.assigned_ids,
            vec![(already_copied.id, existing.id), (fresh.id, created.id)]
        );
    }

    #[test]
    fn remap_rewrites_every_occurrence() {
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();
        let untouched = Uuid::new_v4();
        let mut remap = IdRemap::default();
        remap.insert(old, new);

        let payload = format!(r#"{{"nodes":[{{"tool":"{old}"}},{{"tool":"{old}"}}],"label":"{old}-{untouched}"}}"#);
        let rewritten = remap.apply(&payload);

        assert!(!rewritten.contains(&old.to_string()));
        assert_eq!(rewritten.matches(&new.to_string()).count(), 3);
        assert!(rewritten.contains(&untouched.to_string()));
        assert_eq!(remap.get(&old), Some(new));
    }

    #[tokio::test]
    async fn copy_then_recopy_updates_in_place() {
        let (service, pool) = setup().await;
        let source = create_workspace(&pool, "source").await;
        let destination = create_workspace(&pool, "destination").await;
        let tool = create_record(&pool, RecordKind::Tool, source, "search", r#"{"fn":"search"}"#).await;
        let flow = create_record(
            &pool,
            RecordKind::Flow,
            source,
            "support bot",
            &format!(r#"{{"nodes":"...tool={}..."}}"#, tool.id),
        )
        .await;

        let first = service.copy_workspace(source, destination).await.unwrap();
        assert_eq!(first.total_created(), 2);
        assert_eq!(first.total_updated(), 0);

        let copied_tools = records(&pool, RecordKind::Tool, destination).await;
        let copied_flows = records(&pool, RecordKind::Flow, destination).await;
        assert_eq!(copied_tools.len(), 1);
        assert_eq!(copied_flows.len(), 1);
        let copied_tool = &copied_tools[0];
        let copied_flow = &copied_flows[0];
        assert_ne!(copied_tool.id, tool.id);
        assert_eq!(copied_tool.imported_from_id, Some(tool.id));
        assert_eq!(copied_tool.imported_from_workspace_id, Some(source));
        assert_ne!(copied_flow.id, flow.id);
        assert_eq!(copied_flow.imported_from_id, Some(flow.id));
        assert!(copied_flow.payload.contains(&format!("tool={}", copied_tool.id)));
        assert!(!copied_flow.payload.contains(&tool.id.to_string()));

        let second = service.copy_workspace(source, destination).await.unwrap();
        assert_eq!(second.total_created(), 0);
        assert_eq!(second.for_kind(RecordKind::Tool).unwrap().updated, 1);
        assert_eq!(second.for_kind(RecordKind::Flow).unwrap().updated, 1);

        let tools_after = records(&pool, RecordKind::Tool, destination).await;
        let flows_after = records(&pool, RecordKind::Flow, destination).await;
        assert_eq!(tools_after.len(), 1);
        assert_eq!(flows_after.len(), 1);
        assert_eq!(tools_after[0].id, copied_tool.id);
        assert_eq!(tools_after[0].created_at, copied_tool.created_at);
        assert_eq!(flows_after[0].id, copied_flow.id);
        assert!(flows_after[0].payload.contains(&format!("tool={}", copied_tool.id)));
    }

    #[tokio::test]
    async fn recopy_picks_up_source_changes_and_new_records() {
        let (service, pool) = setup().await;
        let source = create_workspace(&pool, "source").await;
        let destination = create_workspace(&pool, "destination").await;
        let variable =
            create_record(&pool, RecordKind::Variable, source, "region", r#"{"value":"eu"}"#).await;
        service.copy_workspace(source, destination).await.unwrap();

        WorkspaceRecord::update_by_id(
            &pool,
            RecordKind::Variable,
            variable.id,
            &WorkspaceRecordUpdate {
                name: "region".into(),
                payload: r#"{"value":"us"}"#.into(),
                imported_from_id: None,
                imported_from_workspace_id: None,
            },
        )
        .await
        .unwrap();
        create_record(&pool, RecordKind::Assistant, source, "helper", "{}").await;

        let summary = service.copy_workspace(source, destination).await.unwrap();
        assert_eq!(
            summary.for_kind(RecordKind::Variable),
            Some(&KindCopySummary {
                kind: RecordKind::Variable,
                created: 0,
                updated: 1,
            })
        );
        assert_eq!(summary.for_kind(RecordKind::Assistant).unwrap().created, 1);

        let variables = records(&pool, RecordKind::Variable, destination).await;
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].payload, r#"{"value":"us"}"#);
    }

    #[tokio::test]
    async fn copy_leaves_unrelated_destination_records_alone() {
        let (service, pool) = setup().await;
        let source = create_workspace(&pool, "source").await;
        let destination = create_workspace(&pool, "destination").await;
        create_record(&pool, RecordKind::Tool, source, "search", "{}").await;
        let local_tool = create_record(&pool, RecordKind::Tool, destination, "local", r#"{"v":1}"#).await;
        let local_flow = create_record(&pool, RecordKind::Flow, destination, "local flow", "{}").await;

        service.copy_workspace(source, destination).await.unwrap();
        service.copy_workspace(source, destination).await.unwrap();

        let tools = records(&pool, RecordKind::Tool, destination).await;
        assert_eq!(tools.len(), 2);
        let kept = tools.iter().find(|t| t.id == local_tool.id).unwrap();
        assert_eq!(kept.payload, r#"{"v":1}"#);
        assert_eq!(kept.updated_at, local_tool.updated_at);

        let flows = records(&pool, RecordKind::Flow, destination).await;
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].id, local_flow.id);

        // The source is read, never written.
        assert_eq!(records(&pool, RecordKind::Tool, source).await.len(), 1);
    }

    #[tokio::test]
    async fn failed_assistant_write_rolls_back_everything() {
        let (service, pool) = setup().await;
        let source = create_workspace(&pool, "source").await;
        let destination = create_workspace(&pool, "destination").await;
        for kind in RecordKind::COPY_ORDER {
            create_record(&pool, kind, source, &format!("{kind} one"), "{}").await;
        }
        sqlx::query(
            r#"
            CREATE TRIGGER fail_assistant_insert BEFORE INSERT ON assistants
            BEGIN
                SELECT RAISE(ABORT, 'assistant writes disabled');
            END
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = service.copy_workspace(source, destination).await.unwrap_err();

        assert!(matches!(
            err,
            WorkspaceCopyError::Write {
                kind: RecordKind::Assistant,
                ..
            }
        ));
        for kind in RecordKind::COPY_ORDER {
            assert!(
                records(&pool, kind, destination).await.is_empty(),
                "{kind} records leaked out of a rolled back copy"
            );
        }
    }

    /// Destination holding one copied tool and one copied variable, with a fresh tool added to the
    /// source afterwards: the next copy has one create and two updates.
    async fn seed_for_recopy(pool: &SqlitePool) -> (Uuid, Uuid) {
        let source = create_workspace(pool, "source").await;
        let destination = create_workspace(pool, "destination").await;
        create_record(pool, RecordKind::Tool, source, "search", r#"{"v":1}"#).await;
        create_record(pool, RecordKind::Variable, source, "region", r#"{"v":1}"#).await;
        WorkspaceCopyService::new(DBService { pool: pool.clone() })
            .copy_workspace(source, destination)
            .await
            .unwrap();
        create_record(pool, RecordKind::Tool, source, "fetch", "{}").await;
        (source, destination)
    }

    #[tokio::test]
    async fn failed_update_rolls_back_creates_and_earlier_updates() {
        let (service, pool) = setup().await;
        let (source, destination) = seed_for_recopy(&pool).await;
        let tools_before = records(&pool, RecordKind::Tool, destination).await;
        sqlx::query(
            r#"
            CREATE TRIGGER fail_variable_update BEFORE UPDATE ON variables
            BEGIN
                SELECT RAISE(ABORT, 'variable updates disabled');
            END
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = service.copy_workspace(source, destination).await.unwrap_err();

        assert!(matches!(
            err,
            WorkspaceCopyError::Write {
                kind: RecordKind::Variable,
                ..
            }
        ));
        let tools_after = records(&pool, RecordKind::Tool, destination).await;
        assert_eq!(tools_after.len(), 1, "created tool survived a rolled back copy");
        assert_eq!(tools_after[0].updated_at, tools_before[0].updated_at);
    }

    #[tokio::test]
    async fn update_touching_no_row_fails_the_copy() {
        let (service, pool) = setup().await;
        let (source, destination) = seed_for_recopy(&pool).await;
        // Silently skips the row, as if it vanished between fetch and write.
        sqlx::query(
            r#"
            CREATE TRIGGER skip_tool_update BEFORE UPDATE ON tools
            BEGIN
                SELECT RAISE(IGNORE);
            END
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let err = service.copy_workspace(source, destination).await.unwrap_err();

        assert!(matches!(
            err,
            WorkspaceCopyError::Write {
                kind: RecordKind::Tool,
                source: sqlx::Error::RowNotFound,
            }
        ));
        assert_eq!(records(&pool, RecordKind::Tool, destination).await.len(), 1);
    }

    #[tokio::test]
    async fn workspace_lookup_failure_is_reported_as_such() {
        let (service, pool) = setup().await;
        sqlx::query("DROP TABLE workspaces").execute(&pool).await.unwrap();
        let source = Uuid::new_v4();

        let err = service
            .copy_workspace(source, Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkspaceCopyError::WorkspaceLookup { workspace_id, .. } if workspace_id == source
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_copies_into_distinct_destinations_all_commit() {
        let dir = tempfile::tempdir().unwrap();
        let db = DBService::new_with_path(&dir.path().join("db.sqlite"))
            .await
            .unwrap();
        let service = WorkspaceCopyService::new(db.clone());
        let source = create_workspace(&db.pool, "source").await;
        for kind in RecordKind::COPY_ORDER {
            for i in 0..5 {
                create_record(&db.pool, kind, source, &format!("{kind} {i}"), "{}").await;
            }
        }

        let mut destinations = Vec::new();
        for i in 0..8 {
            destinations.push(create_workspace(&db.pool, &format!("destination {i}")).await);
        }

        let copies: Vec<_> = destinations
            .iter()
            .map(|&destination| {
                let service = service.clone();
                tokio::spawn(async move { service.copy_workspace(source, destination).await })
            })
            .collect();
        for copy in copies {
            let summary = copy.await.unwrap().expect("concurrent copy failed");
            assert_eq!(summary.total_created(), 20);
        }

        for destination in destinations {
            for kind in RecordKind::COPY_ORDER {
                assert_eq!(records(&db.pool, kind, destination).await.len(), 5);
            }
        }
    }

    #[tokio::test]
    async fn fetch_failure_aborts_before_writing() {
        let (service, pool) = setup().await;
        let source = create_workspace(&pool, "source").await;
        let destination = create_workspace(&pool, "destination").await;
        create_record(&pool, RecordKind::Tool, source, "search", "{}").await;
        sqlx::query("DROP TABLE chat_flows").execute(&pool).await.unwrap();

        let err = service.copy_workspace(source, destination).await.unwrap_err();

        assert!(matches!(
            err,
            WorkspaceCopyError::Fetch {
                kind: RecordKind::Flow,
                workspace_id,
                ..
            } if workspace_id == source
        ));
        assert!(records(&pool, RecordKind::Tool, destination).await.is_empty());
    }

    #[tokio::test]
    async fn rejects_same_or_missing_workspace() {
        let (service, pool) = setup().await;
        let workspace = create_workspace(&pool, "only").await;
        let missing = Uuid::new_v4();

        assert!(matches!(
            service.copy_workspace(workspace, workspace).await,
            Err(WorkspaceCopyError::SameWorkspace(id)) if id == workspace
        ));
        assert!(matches!(
            service.copy_workspace(workspace, missing).await,
            Err(WorkspaceCopyError::WorkspaceNotFound(id)) if id == missing
        ));
    }
}
