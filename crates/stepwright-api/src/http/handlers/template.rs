//! Template catalog handlers.

use axum::extract::{Path, State};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use stepwright_types::template::WorkflowTemplate;
use stepwright_types::workflow::ApplyTemplateRequest;

use super::parse_workflow_id;
use crate::http::error::AppError;
use crate::http::extractors::body::JsonObject;
use crate::http::extractors::csrf::CsrfVerified;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// Catalog serialized as `{ key: template, ... }` in declaration order.
#[derive(Debug)]
pub struct TemplateCatalog(pub &'static [WorkflowTemplate]);

impl Serialize for TemplateCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|t| (t.key, t)))
    }
}

#[derive(Debug, Serialize)]
pub struct TemplatesPayload {
    pub templates: TemplateCatalog,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedPayload {
    pub steps_added: usize,
}

/// GET /api/v1/templates - The built-in template catalog.
pub async fn list_templates(State(state): State<AppState>) -> ApiResponse<TemplatesPayload> {
    let clock = RequestClock::start();
    let templates = TemplateCatalog(state.workflow_service.list_templates());
    clock.ok(TemplatesPayload { templates })
}

/// POST /api/v1/workflows/{id}/apply-template - Materialize a template.
pub async fn apply_template(
    State(state): State<AppState>,
    _csrf: CsrfVerified,
    Path(id): Path<String>,
    JsonObject(body): JsonObject,
) -> Result<ApiResponse<AppliedPayload>, AppError> {
    let clock = RequestClock::start();
    let id = parse_workflow_id(&id)?;
    let request = apply_request(body)?;

    let steps_added = state
        .workflow_service
        .apply_template(&id, &request.template_key, request.clear_existing)
        .await?;
    Ok(clock
        .ok(AppliedPayload { steps_added })
        .with_message("Template applied successfully"))
}

/// Both fields are mandatory: whether existing steps are wiped is never
/// inferred.
fn apply_request(body: Map<String, Value>) -> Result<ApplyTemplateRequest, AppError> {
    let template_key = match body.get("templateKey") {
        Some(Value::String(key)) => key.clone(),
        _ => return Err(AppError::MalformedRequest("templateKey required".to_string())),
    };
    let clear_existing = match body.get("clearExisting") {
        Some(Value::Bool(flag)) => *flag,
        _ => {
            return Err(AppError::MalformedRequest(
                "clearExisting boolean required".to_string(),
            ));
        }
    };
    Ok(ApplyTemplateRequest {
        template_key,
        clear_existing,
    })
}
