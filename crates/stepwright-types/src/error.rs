use thiserror::Error;

use crate::workflow::{StepId, WorkflowId};

/// Errors related to workflow and step operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow not found")]
    NotFound,

    #[error("step not found")]
    StepNotFound,

    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    #[error("step {step_id} does not belong to workflow {workflow_id}")]
    OwnershipMismatch {
        step_id: StepId,
        workflow_id: WorkflowId,
    },

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    InvalidReorder(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl WorkflowError {
    /// True for the errors a caller sees as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkflowError::NotFound
                | WorkflowError::StepNotFound
                | WorkflowError::TemplateNotFound(_)
                | WorkflowError::OwnershipMismatch { .. }
        )
    }
}

/// Errors from repository operations (used by trait definitions in stepwright-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for WorkflowError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => WorkflowError::NotFound,
            RepositoryError::Conflict(msg) => WorkflowError::Conflict(msg),
            other => WorkflowError::StorageError(other.to_string()),
        }
    }
}
