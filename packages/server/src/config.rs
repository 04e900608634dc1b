use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory for the filesystem artifact store.
    pub root: String,
    /// Base URL under which signed artifact read URLs are minted.
    pub public_base_url: String,
    /// HMAC secret for signed read URLs.
    pub url_secret: String,
    /// Maximum artifact size in bytes.
    pub max_blob_size: u64,
    /// Lifetime of signed read URLs in seconds.
    pub signed_url_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    /// Base URL of the external workflow system.
    pub base_url: String,
    /// Workflow step new uploads are registered against.
    pub step: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub workflow: WorkflowConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.root", "./artifacts")?
            .set_default("storage.public_base_url", "http://127.0.0.1:3000/artifacts")?
            .set_default("storage.max_blob_size", 32 * 1024 * 1024)?
            .set_default("storage.signed_url_ttl_secs", 900)?
            .set_default("workflow.step", "Intake")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., FORMDESK__DATABASE__URL)
            .add_source(Environment::with_prefix("FORMDESK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
