use std::sync::Arc;
use std::time::Duration;

use common::ArtifactStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::upload::WorkflowClient;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub workflow: Arc<WorkflowClient>,
    pub config: AppConfig,
}

impl AppState {
    /// Lifetime of signed artifact read URLs handed to clients.
    pub fn artifact_url_ttl(&self) -> Duration {
        Duration::from_secs(self.config.storage.signed_url_ttl_secs)
    }
}
