//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use stepwright_types::error::WorkflowError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Workflow and step errors from the service layer.
    Workflow(WorkflowError),
    /// Body was not a usable JSON object.
    MalformedRequest(String),
    /// Anti-forgery check failed.
    Forbidden(String),
    /// Generic internal error.
    Internal(String),
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        AppError::Workflow(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Workflow(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::Workflow(WorkflowError::Validation(_) | WorkflowError::InvalidReorder(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Workflow(WorkflowError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Workflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let AppError::Workflow(WorkflowError::Validation(errors)) = &self {
            let body = json!({
                "success": false,
                "code": "VALIDATION_ERROR",
                "errors": errors,
            });
            return (status, axum::Json(body)).into_response();
        }

        let (code, message) = match &self {
            AppError::Workflow(WorkflowError::NotFound) => {
                ("WORKFLOW_NOT_FOUND", "Workflow not found".to_string())
            }
            AppError::Workflow(WorkflowError::StepNotFound) => {
                ("STEP_NOT_FOUND", "Step not found".to_string())
            }
            AppError::Workflow(WorkflowError::TemplateNotFound(_)) => {
                ("TEMPLATE_NOT_FOUND", "Template not found".to_string())
            }
            AppError::Workflow(WorkflowError::OwnershipMismatch { .. }) => {
                ("STEP_NOT_FOUND", "Step does not belong to this workflow".to_string())
            }
            AppError::Workflow(WorkflowError::InvalidReorder(msg)) => ("INVALID_REORDER", msg.clone()),
            AppError::Workflow(WorkflowError::Conflict(_)) => (
                "CONFLICT",
                "Workflow was modified by another request; reload and retry".to_string(),
            ),
            AppError::Workflow(WorkflowError::StorageError(msg)) => {
                ("DATABASE_ERROR", format!("Database error: {msg}"))
            }
            AppError::Workflow(WorkflowError::Validation(_)) => {
                ("VALIDATION_ERROR", "Validation failed".to_string())
            }
            AppError::MalformedRequest(msg) => ("BAD_REQUEST", msg.clone()),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg.clone()),
            AppError::Internal(msg) => ("INTERNAL_ERROR", format!("Server error: {msg}")),
        };

        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }

        let body = json!({
            "success": false,
            "code": code,
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwright_types::workflow::{StepId, WorkflowId};

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_render_as_list() {
        let (status, json) = body_json(AppError::Workflow(WorkflowError::Validation(vec![
            "Step name is required".to_string(),
            "Invalid step type".to_string(),
        ])))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["errors"][1], "Invalid step type");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn storage_error_is_database_error() {
        let (status, json) =
            body_json(AppError::Workflow(WorkflowError::StorageError("disk I/O".to_string()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Database error: disk I/O");
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (AppError::Workflow(WorkflowError::NotFound), StatusCode::NOT_FOUND),
            (AppError::Workflow(WorkflowError::StepNotFound), StatusCode::NOT_FOUND),
            (
                AppError::Workflow(WorkflowError::TemplateNotFound("x".to_string())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Workflow(WorkflowError::OwnershipMismatch {
                    step_id: StepId::new(),
                    workflow_id: WorkflowId::new(),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Workflow(WorkflowError::InvalidReorder("Invalid step ID: 9".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Workflow(WorkflowError::Conflict("stale".to_string())),
                StatusCode::CONFLICT,
            ),
            (AppError::MalformedRequest("x".to_string()), StatusCode::BAD_REQUEST),
            (AppError::Forbidden("x".to_string()), StatusCode::FORBIDDEN),
            (AppError::Internal("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err:?}");
        }
    }
}
