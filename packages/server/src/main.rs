use std::net::SocketAddr;
use std::sync::Arc;

use common::storage::{UrlSigner, filesystem::FilesystemArtifactStore};
use tracing::{Level, info};

use server::config::AppConfig;
use server::state::AppState;
use server::upload::WorkflowClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = server::database::init_db(&config.database.url).await?;

    let signer = UrlSigner::new(
        config.storage.public_base_url.clone(),
        config.storage.url_secret.clone().into_bytes(),
    );
    let artifacts = FilesystemArtifactStore::new(
        config.storage.root.clone().into(),
        config.storage.max_blob_size,
        signer,
    )
    .await?;

    let workflow = WorkflowClient::new(&config.workflow);

    let state = AppState {
        db,
        artifacts: Arc::new(artifacts),
        workflow: Arc::new(workflow),
        config: config.clone(),
    };

    let app = server::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
