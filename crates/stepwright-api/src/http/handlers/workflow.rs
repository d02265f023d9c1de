//! Workflow CRUD handlers for the REST API.

use axum::extract::{Path, State};
use serde::Serialize;

use stepwright_types::workflow::{NewWorkflowRequest, Workflow};

use super::parse_workflow_id;
use crate::http::error::AppError;
use crate::http::extractors::body::JsonObject;
use crate::http::extractors::csrf::CsrfVerified;
use crate::http::response::{ApiResponse, Empty, RequestClock};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WorkflowsPayload {
    pub workflows: Vec<Workflow>,
}

#[derive(Debug, Serialize)]
pub struct WorkflowPayload {
    pub workflow: Workflow,
}

/// GET /api/v1/workflows - List workflows with their steps.
pub async fn list_workflows(
    State(state): State<AppState>,
) -> Result<ApiResponse<WorkflowsPayload>, AppError> {
    let clock = RequestClock::start();
    let workflows = state.workflow_service.list_workflows().await?;
    Ok(clock.ok(WorkflowsPayload { workflows }))
}

/// POST /api/v1/workflows - Create an empty workflow.
pub async fn create_workflow(
    State(state): State<AppState>,
    _csrf: CsrfVerified,
    body: JsonObject,
) -> Result<ApiResponse<WorkflowPayload>, AppError> {
    let clock = RequestClock::start();
    let request: NewWorkflowRequest = body.decode()?;

    let workflow = state.workflow_service.create_workflow(request).await?;
    Ok(clock
        .created(WorkflowPayload { workflow })
        .with_message("Workflow created successfully"))
}

/// GET /api/v1/workflows/{id} - Get a workflow with its ordered steps.
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<WorkflowPayload>, AppError> {
    let clock = RequestClock::start();
    let id = parse_workflow_id(&id)?;

    let workflow = state.workflow_service.get_workflow(&id).await?;
    Ok(clock.ok(WorkflowPayload { workflow }))
}

/// DELETE /api/v1/workflows/{id} - Delete a workflow and all its steps.
pub async fn delete_workflow(
    State(state): State<AppState>,
    _csrf: CsrfVerified,
    Path(id): Path<String>,
) -> Result<ApiResponse<Empty>, AppError> {
    let clock = RequestClock::start();
    let id = parse_workflow_id(&id)?;

    state.workflow_service.delete_workflow(&id).await?;
    Ok(clock.ok(Empty {}).with_message("Workflow deleted successfully"))
}
