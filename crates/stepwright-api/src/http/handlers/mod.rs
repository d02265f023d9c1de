//! HTTP request handlers for the REST API.

pub mod step;
pub mod template;
pub mod workflow;

use stepwright_types::error::WorkflowError;
use stepwright_types::workflow::{StepId, WorkflowId};

use crate::http::error::AppError;

/// An id that does not parse cannot name an existing workflow.
pub(crate) fn parse_workflow_id(raw: &str) -> Result<WorkflowId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Workflow(WorkflowError::NotFound))
}

pub(crate) fn parse_step_id(raw: &str) -> Result<StepId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Workflow(WorkflowError::StepNotFound))
}
