//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! `WorkflowService` is generic over its repository trait; AppState pins it to
//! the SQLite implementation.

use std::path::PathBuf;
use std::sync::Arc;

use stepwright_core::service::workflow::WorkflowService;
use stepwright_infra::csrf::CsrfTokenManager;
use stepwright_infra::sqlite::pool::{DatabasePool, database_url_for};
use stepwright_infra::sqlite::workflow::SqliteWorkflowRepository;
use stepwright_types::config::GlobalConfig;

/// Concrete type alias for the service generic pinned to the infra implementation.
pub type ConcreteWorkflowService = WorkflowService<SqliteWorkflowRepository>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflow_service: Arc<ConcreteWorkflowService>,
    pub csrf: Arc<CsrfTokenManager>,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to DB, load the
    /// anti-forgery secret, wire services.
    pub async fn init(data_dir: PathBuf, config: GlobalConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_pool = DatabasePool::new(&database_url_for(&data_dir)).await?;
        let csrf = CsrfTokenManager::load(config.csrf_secret.as_deref(), &data_dir).await?;

        let workflow_service = WorkflowService::new(SqliteWorkflowRepository::new(db_pool.clone()));

        tracing::debug!(data_dir = %data_dir.display(), "application state initialized");

        Ok(Self {
            workflow_service: Arc::new(workflow_service),
            csrf: Arc::new(csrf),
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }
}
