//! Step handlers: list, add, update, delete, reorder, duplicate.
//!
//! Each mutating handler performs exactly one service call; the service
//! loads the workflow, runs one ordering operation and commits it in a
//! single transaction.

use axum::extract::{Path, State};
use serde::Serialize;
use serde_json::{Map, Value};

use stepwright_types::workflow::{ReorderRequest, StepPayload, WorkflowStep};

use super::{parse_step_id, parse_workflow_id};
use crate::http::error::AppError;
use crate::http::extractors::body::JsonObject;
use crate::http::extractors::csrf::CsrfVerified;
use crate::http::response::{ApiResponse, Empty, RequestClock};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StepsPayload {
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Serialize)]
pub struct StepPayloadOut {
    pub step: WorkflowStep,
}

/// GET /api/v1/workflows/{id}/steps - Steps in order.
pub async fn list_steps(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<StepsPayload>, AppError> {
    let clock = RequestClock::start();
    let id = parse_workflow_id(&id)?;

    let steps = state.workflow_service.list_steps(&id).await?;
    Ok(clock.ok(StepsPayload { steps }))
}

/// POST /api/v1/workflows/{id}/steps - Append a step.
pub async fn add_step(
    State(state): State<AppState>,
    _csrf: CsrfVerified,
    Path(id): Path<String>,
    body: JsonObject,
) -> Result<ApiResponse<StepPayloadOut>, AppError> {
    let clock = RequestClock::start();
    let id = parse_workflow_id(&id)?;
    let payload: StepPayload = body.decode()?;

    let step = state.workflow_service.add_step(&id, &payload).await?;
    Ok(clock
        .created(StepPayloadOut { step })
        .with_message("Step added successfully"))
}

/// PUT|PATCH /api/v1/steps/{id} - Update descriptive fields.
pub async fn update_step(
    State(state): State<AppState>,
    _csrf: CsrfVerified,
    Path(id): Path<String>,
    body: JsonObject,
) -> Result<ApiResponse<StepPayloadOut>, AppError> {
    let clock = RequestClock::start();
    let id = parse_step_id(&id)?;
    let payload: StepPayload = body.decode()?;

    let step = state.workflow_service.update_step(&id, &payload).await?;
    Ok(clock
        .ok(StepPayloadOut { step })
        .with_message("Step updated successfully"))
}

/// DELETE /api/v1/steps/{id} - Delete a step and close the gap.
pub async fn delete_step(
    State(state): State<AppState>,
    _csrf: CsrfVerified,
    Path(id): Path<String>,
) -> Result<ApiResponse<Empty>, AppError> {
    let clock = RequestClock::start();
    let id = parse_step_id(&id)?;

    state.workflow_service.delete_step(&id).await?;
    Ok(clock.ok(Empty {}).with_message("Step deleted successfully"))
}

/// POST /api/v1/workflows/{id}/steps/reorder - Replace the full order.
pub async fn reorder_steps(
    State(state): State<AppState>,
    _csrf: CsrfVerified,
    Path(id): Path<String>,
    JsonObject(body): JsonObject,
) -> Result<ApiResponse<StepsPayload>, AppError> {
    let clock = RequestClock::start();
    let id = parse_workflow_id(&id)?;
    let request = reorder_request(body)?;

    let steps = state
        .workflow_service
        .reorder_steps(&id, &request.step_ids)
        .await?;
    Ok(clock
        .ok(StepsPayload { steps })
        .with_message("Steps reordered successfully"))
}

/// POST /api/v1/steps/{id}/duplicate - Copy a step directly after itself.
pub async fn duplicate_step(
    State(state): State<AppState>,
    _csrf: CsrfVerified,
    Path(id): Path<String>,
) -> Result<ApiResponse<StepPayloadOut>, AppError> {
    let clock = RequestClock::start();
    let id = parse_step_id(&id)?;

    let step = state.workflow_service.duplicate_step(&id).await?;
    Ok(clock
        .created(StepPayloadOut { step })
        .with_message("Step duplicated successfully"))
}

/// `stepIds` must be an array. Elements are kept as text so that a bad
/// entry can be reported back verbatim.
fn reorder_request(mut body: Map<String, Value>) -> Result<ReorderRequest, AppError> {
    match body.remove("stepIds") {
        Some(Value::Array(items)) => Ok(ReorderRequest {
            step_ids: items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        }),
        _ => Err(AppError::MalformedRequest("stepIds array required".to_string())),
    }
}
