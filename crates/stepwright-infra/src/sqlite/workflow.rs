//! SQLite workflow repository implementation.
//!
//! Implements `WorkflowRepository` from `stepwright-core` using sqlx with split
//! read/write pools. A step mutation rewrites the workflow's full step set in a
//! single transaction; the `version` column on the header row is the
//! optimistic-concurrency guard.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, Transaction};
use stepwright_core::repository::workflow::WorkflowRepository;
use stepwright_types::error::RepositoryError;
use stepwright_types::workflow::{StepId, StepType, Workflow, WorkflowId, WorkflowStep};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `WorkflowRepository`.
pub struct SqliteWorkflowRepository {
    pool: DatabasePool,
}

impl SqliteWorkflowRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

/// Internal row type for mapping a `workflows` header row.
struct WorkflowRow {
    id: String,
    name: String,
    description: Option<String>,
    entity_type: String,
    is_active: bool,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl WorkflowRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            entity_type: row.try_get("entity_type")?,
            is_active: row.try_get("is_active")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_workflow(self, steps: Vec<WorkflowStep>) -> Result<Workflow, RepositoryError> {
        Ok(Workflow {
            id: self
                .id
                .parse::<WorkflowId>()
                .map_err(|e| RepositoryError::Query(format!("invalid workflow id: {e}")))?,
            name: self.name,
            description: self.description,
            entity_type: self.entity_type,
            is_active: self.is_active,
            version: self.version,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            steps,
        })
    }
}

/// Internal row type for mapping a `workflow_steps` row.
struct StepRow {
    id: String,
    workflow_id: String,
    name: String,
    description: Option<String>,
    step_order: i64,
    step_type: String,
    approver_role: Option<String>,
    approver_users: String,
    is_required: bool,
    days_to_complete: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl StepRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            workflow_id: row.try_get("workflow_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            step_order: row.try_get("step_order")?,
            step_type: row.try_get("step_type")?,
            approver_role: row.try_get("approver_role")?,
            approver_users: row.try_get("approver_users")?,
            is_required: row.try_get("is_required")?,
            days_to_complete: row.try_get("days_to_complete")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_step(self) -> Result<WorkflowStep, RepositoryError> {
        let step_order = u32::try_from(self.step_order)
            .map_err(|_| RepositoryError::Query(format!("invalid step order: {}", self.step_order)))?;
        let days_to_complete = self
            .days_to_complete
            .map(u32::try_from)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid days to complete: {e}")))?;

        Ok(WorkflowStep {
            id: self
                .id
                .parse::<StepId>()
                .map_err(|e| RepositoryError::Query(format!("invalid step id: {e}")))?,
            workflow_id: self
                .workflow_id
                .parse::<WorkflowId>()
                .map_err(|e| RepositoryError::Query(format!("invalid workflow id: {e}")))?,
            name: self.name,
            description: self.description,
            step_order,
            step_type: self
                .step_type
                .parse::<StepType>()
                .map_err(RepositoryError::Query)?,
            approver_role: self.approver_role,
            approver_users: serde_json::from_str(&self.approver_users)
                .map_err(|e| RepositoryError::Query(format!("invalid approver users: {e}")))?,
            is_required: self.is_required,
            days_to_complete,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

async fn insert_step(
    tx: &mut Transaction<'_, Sqlite>,
    step: &WorkflowStep,
) -> Result<(), RepositoryError> {
    let approver_users = serde_json::to_string(&step.approver_users)
        .map_err(|e| RepositoryError::Query(format!("failed to encode approver users: {e}")))?;

    sqlx::query(
        "INSERT INTO workflow_steps (id, workflow_id, name, description, step_order, step_type,
                                     approver_role, approver_users, is_required, days_to_complete,
                                     created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(step.id.to_string())
    .bind(step.workflow_id.to_string())
    .bind(&step.name)
    .bind(&step.description)
    .bind(i64::from(step.step_order))
    .bind(step.step_type.as_str())
    .bind(&step.approver_role)
    .bind(approver_users)
    .bind(step.is_required)
    .bind(step.days_to_complete.map(i64::from))
    .bind(format_datetime(&step.created_at))
    .bind(format_datetime(&step.updated_at))
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.message().contains("UNIQUE") {
                return RepositoryError::Conflict(format!(
                    "step order {} already taken in workflow {}",
                    step.step_order, step.workflow_id
                ));
            }
        }
        query_err(e)
    })?;

    Ok(())
}

/// Bump the version, then rewrite the step rows. Runs inside the caller's
/// transaction; nothing here commits.
async fn replace_steps(
    tx: &mut Transaction<'_, Sqlite>,
    workflow_id: &WorkflowId,
    steps: &[WorkflowStep],
    expected_version: i64,
) -> Result<i64, RepositoryError> {
    let id = workflow_id.to_string();

    let bumped = sqlx::query(
        "UPDATE workflows SET version = version + 1, updated_at = ? WHERE id = ? AND version = ?",
    )
    .bind(format_datetime(&Utc::now()))
    .bind(&id)
    .bind(expected_version)
    .execute(&mut **tx)
    .await
    .map_err(query_err)?;

    if bumped.rows_affected() == 0 {
        let current: Option<(i64,)> = sqlx::query_as("SELECT version FROM workflows WHERE id = ?")
            .bind(&id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(query_err)?;
        return Err(match current {
            None => RepositoryError::NotFound,
            Some((version,)) => RepositoryError::Conflict(format!(
                "workflow {workflow_id} is at version {version}, expected {expected_version}"
            )),
        });
    }

    sqlx::query("DELETE FROM workflow_steps WHERE workflow_id = ?")
        .bind(&id)
        .execute(&mut **tx)
        .await
        .map_err(query_err)?;

    for step in steps {
        if step.workflow_id != *workflow_id {
            return Err(RepositoryError::Query(format!(
                "step {} belongs to workflow {}, not {workflow_id}",
                step.id, step.workflow_id
            )));
        }
        insert_step(tx, step).await?;
    }

    Ok(expected_version + 1)
}

async fn fetch_steps(
    pool: &sqlx::SqlitePool,
    workflow_id: &WorkflowId,
) -> Result<Vec<WorkflowStep>, RepositoryError> {
    let rows = sqlx::query("SELECT * FROM workflow_steps WHERE workflow_id = ? ORDER BY step_order")
        .bind(workflow_id.to_string())
        .fetch_all(pool)
        .await
        .map_err(query_err)?;

    rows.iter()
        .map(|row| StepRow::from_row(row).map_err(query_err)?.into_step())
        .collect()
}

impl WorkflowRepository for SqliteWorkflowRepository {
    async fn create_workflow(&self, workflow: &Workflow) -> Result<Workflow, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query(
            "INSERT INTO workflows (id, name, description, entity_type, is_active, version, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(workflow.id.to_string())
        .bind(&workflow.name)
        .bind(&workflow.description)
        .bind(&workflow.entity_type)
        .bind(workflow.is_active)
        .bind(workflow.version)
        .bind(format_datetime(&workflow.created_at))
        .bind(format_datetime(&workflow.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.message().contains("UNIQUE") {
                    return RepositoryError::Conflict(format!(
                        "workflow {} already exists",
                        workflow.id
                    ));
                }
            }
            query_err(e)
        })?;

        for step in &workflow.steps {
            insert_step(&mut tx, step).await?;
        }

        tx.commit().await.map_err(query_err)?;
        Ok(workflow.clone())
    }

    async fn get_workflow(&self, id: &WorkflowId) -> Result<Option<Workflow>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let header = WorkflowRow::from_row(&row).map_err(query_err)?;
        let steps = fetch_steps(&self.pool.reader, id).await?;
        header.into_workflow(steps).map(Some)
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, RepositoryError> {
        let headers = sqlx::query("SELECT * FROM workflows ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let step_rows =
            sqlx::query("SELECT * FROM workflow_steps ORDER BY workflow_id, step_order")
                .fetch_all(&self.pool.reader)
                .await
                .map_err(query_err)?;

        let mut steps_by_workflow: HashMap<WorkflowId, Vec<WorkflowStep>> = HashMap::new();
        for row in &step_rows {
            let step = StepRow::from_row(row).map_err(query_err)?.into_step()?;
            steps_by_workflow.entry(step.workflow_id).or_default().push(step);
        }

        headers
            .iter()
            .map(|row| {
                let header = WorkflowRow::from_row(row).map_err(query_err)?;
                let id = header
                    .id
                    .parse::<WorkflowId>()
                    .map_err(|e| RepositoryError::Query(format!("invalid workflow id: {e}")))?;
                let steps = steps_by_workflow.remove(&id).unwrap_or_default();
                header.into_workflow(steps)
            })
            .collect()
    }

    async fn delete_workflow(&self, id: &WorkflowId) -> Result<bool, RepositoryError> {
        // Steps go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_workflow_id_for_step(
        &self,
        step_id: &StepId,
    ) -> Result<Option<WorkflowId>, RepositoryError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT workflow_id FROM workflow_steps WHERE id = ?")
                .bind(step_id.to_string())
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(query_err)?;

        row.map(|(id,)| {
            id.parse::<WorkflowId>()
                .map_err(|e| RepositoryError::Query(format!("invalid workflow id: {e}")))
        })
        .transpose()
    }

    async fn save_steps(
        &self,
        workflow_id: &WorkflowId,
        steps: &[WorkflowStep],
        expected_version: i64,
    ) -> Result<i64, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        match replace_steps(&mut tx, workflow_id, steps, expected_version).await {
            Ok(version) => {
                tx.commit().await.map_err(query_err)?;
                tracing::debug!(%workflow_id, steps = steps.len(), version, "steps saved");
                Ok(version)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(%workflow_id, error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwright_types::workflow::StepDraft;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let url = super::super::pool::database_url_for(dir.path());
        // Keep the tempdir alive for the test's duration.
        let pool = DatabasePool::new(&url).await.unwrap();
        std::mem::forget(dir);
        pool
    }

    fn make_workflow(name: &str) -> Workflow {
        let now = Utc::now();
        Workflow {
            id: WorkflowId::new(),
            name: name.to_string(),
            description: Some("test workflow".to_string()),
            entity_type: "Risk".to_string(),
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
            steps: Vec::new(),
        }
    }

    fn make_step(workflow_id: WorkflowId, name: &str, order: u32) -> WorkflowStep {
        WorkflowStep::from_draft(
            workflow_id,
            StepDraft {
                name: name.to_string(),
                description: None,
                step_type: StepType::Approval,
                approver_role: Some("ROLE_MANAGER".to_string()),
                approver_users: vec![7, 3],
                is_required: true,
                days_to_complete: Some(5),
            },
            order,
        )
    }

    #[tokio::test]
    async fn test_create_and_get_workflow() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let wf = make_workflow("Risk Review");

        repo.create_workflow(&wf).await.unwrap();

        let loaded = repo.get_workflow(&wf.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, wf.id);
        assert_eq!(loaded.name, "Risk Review");
        assert_eq!(loaded.description.as_deref(), Some("test workflow"));
        assert_eq!(loaded.version, 0);
        assert!(loaded.steps.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_workflow_returns_none() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        assert!(repo.get_workflow(&WorkflowId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_steps_round_trips_fields() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let wf = make_workflow("wf");
        repo.create_workflow(&wf).await.unwrap();

        let mut second = make_step(wf.id, "Second", 2);
        second.step_type = StepType::AutoAction;
        second.days_to_complete = None;
        second.is_required = false;
        let steps = vec![make_step(wf.id, "First", 1), second];

        let version = repo.save_steps(&wf.id, &steps, 0).await.unwrap();
        assert_eq!(version, 1);

        let loaded = repo.get_workflow(&wf.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.steps.len(), 2);
        assert_eq!(loaded.steps[0].name, "First");
        assert_eq!(loaded.steps[0].approver_users, vec![7, 3]);
        assert_eq!(loaded.steps[0].days_to_complete, Some(5));
        assert_eq!(loaded.steps[1].step_type, StepType::AutoAction);
        assert_eq!(loaded.steps[1].days_to_complete, None);
        assert!(!loaded.steps[1].is_required);
    }

    #[tokio::test]
    async fn test_save_steps_returns_steps_sorted_by_order() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let wf = make_workflow("wf");
        repo.create_workflow(&wf).await.unwrap();

        let steps = vec![
            make_step(wf.id, "C", 3),
            make_step(wf.id, "A", 1),
            make_step(wf.id, "B", 2),
        ];
        repo.save_steps(&wf.id, &steps, 0).await.unwrap();

        let loaded = repo.get_workflow(&wf.id).await.unwrap().unwrap();
        let names: Vec<&str> = loaded.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_save_steps_replaces_previous_set() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let wf = make_workflow("wf");
        repo.create_workflow(&wf).await.unwrap();

        let first = make_step(wf.id, "Keep", 1);
        let gone = make_step(wf.id, "Gone", 2);
        repo.save_steps(&wf.id, &[first.clone(), gone.clone()], 0)
            .await
            .unwrap();

        repo.save_steps(&wf.id, &[first.clone()], 1).await.unwrap();

        let loaded = repo.get_workflow(&wf.id).await.unwrap().unwrap();
        assert_eq!(loaded.steps.len(), 1);
        assert_eq!(loaded.steps[0].id, first.id);
        assert!(repo.find_workflow_id_for_step(&gone.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_steps_version_mismatch_is_conflict_and_writes_nothing() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let wf = make_workflow("wf");
        repo.create_workflow(&wf).await.unwrap();
        repo.save_steps(&wf.id, &[make_step(wf.id, "Original", 1)], 0)
            .await
            .unwrap();

        // A writer still holding version 0 loses.
        let stale = repo
            .save_steps(&wf.id, &[make_step(wf.id, "Stale", 1)], 0)
            .await;
        assert!(matches!(stale, Err(RepositoryError::Conflict(_))));

        let loaded = repo.get_workflow(&wf.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.steps.len(), 1);
        assert_eq!(loaded.steps[0].name, "Original");
    }

    #[tokio::test]
    async fn test_save_steps_duplicate_order_rolls_back() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let wf = make_workflow("wf");
        repo.create_workflow(&wf).await.unwrap();
        let original = make_step(wf.id, "Original", 1);
        repo.save_steps(&wf.id, &[original.clone()], 0).await.unwrap();

        let clash = vec![make_step(wf.id, "A", 1), make_step(wf.id, "B", 1)];
        let result = repo.save_steps(&wf.id, &clash, 1).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));

        let loaded = repo.get_workflow(&wf.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1, "version bump must roll back");
        assert_eq!(loaded.steps.len(), 1);
        assert_eq!(loaded.steps[0].id, original.id);
    }

    #[tokio::test]
    async fn test_save_steps_missing_workflow_is_not_found() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let id = WorkflowId::new();
        let result = repo.save_steps(&id, &[], 0).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_find_workflow_id_for_step() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let wf = make_workflow("wf");
        repo.create_workflow(&wf).await.unwrap();
        let step = make_step(wf.id, "A", 1);
        repo.save_steps(&wf.id, &[step.clone()], 0).await.unwrap();

        assert_eq!(repo.find_workflow_id_for_step(&step.id).await.unwrap(), Some(wf.id));
        assert_eq!(repo.find_workflow_id_for_step(&StepId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_workflow_cascades_to_steps() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let wf = make_workflow("wf");
        repo.create_workflow(&wf).await.unwrap();
        let step = make_step(wf.id, "A", 1);
        repo.save_steps(&wf.id, &[step.clone()], 0).await.unwrap();

        assert!(repo.delete_workflow(&wf.id).await.unwrap());
        assert!(!repo.delete_workflow(&wf.id).await.unwrap());
        assert!(repo.get_workflow(&wf.id).await.unwrap().is_none());
        assert!(repo.find_workflow_id_for_step(&step.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_workflows_groups_steps() {
        let repo = SqliteWorkflowRepository::new(test_pool().await);
        let a = make_workflow("A");
        repo.create_workflow(&a).await.unwrap();
        let b = make_workflow("B");
        repo.create_workflow(&b).await.unwrap();

        repo.save_steps(&a.id, &[make_step(a.id, "a1", 1), make_step(a.id, "a2", 2)], 0)
            .await
            .unwrap();
        repo.save_steps(&b.id, &[make_step(b.id, "b1", 1)], 0)
            .await
            .unwrap();

        let all = repo.list_workflows().await.unwrap();
        assert_eq!(all.len(), 2);
        let a_loaded = all.iter().find(|w| w.id == a.id).unwrap();
        let b_loaded = all.iter().find(|w| w.id == b.id).unwrap();
        assert_eq!(a_loaded.steps.len(), 2);
        assert_eq!(b_loaded.steps.len(), 1);
        assert_eq!(b_loaded.steps[0].name, "b1");
    }
}
