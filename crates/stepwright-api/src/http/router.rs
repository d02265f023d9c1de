//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Workflows
        .route(
            "/workflows",
            get(handlers::workflow::list_workflows).post(handlers::workflow::create_workflow),
        )
        .route(
            "/workflows/{id}",
            get(handlers::workflow::get_workflow).delete(handlers::workflow::delete_workflow),
        )
        // Steps (workflow-scoped)
        .route(
            "/workflows/{id}/steps",
            get(handlers::step::list_steps).post(handlers::step::add_step),
        )
        .route(
            "/workflows/{id}/steps/reorder",
            post(handlers::step::reorder_steps),
        )
        // Steps (top-level)
        .route(
            "/steps/{id}",
            axum::routing::put(handlers::step::update_step)
                .patch(handlers::step::update_step)
                .delete(handlers::step::delete_step),
        )
        .route("/steps/{id}/duplicate", post(handlers::step::duplicate_step))
        // Templates
        .route("/templates", get(handlers::template::list_templates))
        .route(
            "/workflows/{id}/apply-template",
            post(handlers::template::apply_template),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness plus a database round trip.
async fn health_check(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let database = match stepwright_infra::sqlite::pool::ping(&state.db_pool).await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "health check database ping failed");
            "unavailable"
        }
    };

    axum::Json(serde_json::json!({
        "status": "ok",
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
