//! Workflow repository trait definition.
//!
//! The workflow is stored as an aggregate: the header row plus every step it
//! owns. Step mutations are persisted by replacing the full step set in one
//! transaction, guarded by the workflow's version counter.

use stepwright_types::error::RepositoryError;
use stepwright_types::workflow::{StepId, Workflow, WorkflowId, WorkflowStep};

/// Repository trait for workflow persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait WorkflowRepository: Send + Sync {
    /// Insert a new workflow header (and any steps it already carries).
    fn create_workflow(
        &self,
        workflow: &Workflow,
    ) -> impl std::future::Future<Output = Result<Workflow, RepositoryError>> + Send;

    /// Load a workflow with its steps sorted by `step_order`.
    fn get_workflow(
        &self,
        id: &WorkflowId,
    ) -> impl std::future::Future<Output = Result<Option<Workflow>, RepositoryError>> + Send;

    /// List all workflows (with steps), most recently created first.
    fn list_workflows(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Workflow>, RepositoryError>> + Send;

    /// Delete a workflow and its steps. Returns `true` if it existed.
    fn delete_workflow(
        &self,
        id: &WorkflowId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Resolve the workflow that owns a step.
    fn find_workflow_id_for_step(
        &self,
        step_id: &StepId,
    ) -> impl std::future::Future<Output = Result<Option<WorkflowId>, RepositoryError>> + Send;

    /// Replace the workflow's steps with `steps` atomically.
    ///
    /// Succeeds only if the stored version still equals `expected_version`;
    /// otherwise returns `RepositoryError::Conflict` and writes nothing. Any
    /// failure after the transaction begins rolls it back. Returns the new
    /// version.
    fn save_steps(
        &self,
        workflow_id: &WorkflowId,
        steps: &[WorkflowStep],
        expected_version: i64,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;
}
