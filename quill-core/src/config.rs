use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct QuillConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            cors_enabled: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub provider_url: String,
    /// Gate PUT/DELETE on the resource services behind token validation.
    pub protect_mutations: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider_url: "http://localhost:8080".to_string(),
            protect_mutations: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub todo_service_url: String,
    pub notes_service_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            todo_service_url: "http://localhost:8001".to_string(),
            notes_service_url: "http://localhost:8002".to_string(),
        }
    }
}

impl QuillConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        let mut cfg: QuillConfig = s.try_deserialize()?;

        // DATABASE_URL wins over the file value when set.
        if let Ok(url) = std::env::var("DATABASE_URL") {
            cfg.database.url = url;
        }

        Ok(cfg)
    }
}
