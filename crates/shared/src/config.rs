//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Short-code generation settings.
    #[serde(default)]
    pub identifiers: IdentifierConfig,
    /// Invoice settings.
    #[serde(default)]
    pub invoices: InvoiceConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Which document store backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL with JSONB documents.
    #[default]
    Postgres,
    /// Process-local store, contents are lost on restart.
    Memory,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    #[serde(default)]
    pub url: String,
    /// Store backend.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration as read from config sources.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Range and retry budget for organisation-scoped short codes.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdentifierConfig {
    /// Smallest code drawn (inclusive).
    #[serde(default = "default_code_min")]
    pub min: u64,
    /// Largest code drawn (inclusive).
    #[serde(default = "default_code_max")]
    pub max: u64,
    /// Draws attempted before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            min: default_code_min(),
            max: default_code_max(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_code_min() -> u64 {
    100_000
}

fn default_code_max() -> u64 {
    999_999
}

fn default_max_attempts() -> u32 {
    64
}

/// Invoice settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InvoiceConfig {
    /// Lifetime of an invoice share code.
    #[serde(default = "default_share_code_ttl_hours")]
    pub share_code_ttl_hours: i64,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            share_code_ttl_hours: default_share_code_ttl_hours(),
        }
    }
}

fn default_share_code_ttl_hours() -> i64 {
    72
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("HAULAGE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
