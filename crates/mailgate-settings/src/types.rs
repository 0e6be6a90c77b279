//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a
//! partial JSON file is valid — missing fields get their compiled
//! default during deserialization.

use mailgate_core::usage::TokenPricing;
use serde::{Deserialize, Serialize};

/// Root settings type for the control plane process.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MailgateSettings {
    /// HTTP server network settings.
    pub server: ServerSettings,
    /// SQLite database settings.
    pub database: DatabaseSettings,
    /// Admin API bearer tokens.
    pub auth: AuthSettings,
    /// External pipeline endpoint settings.
    pub pipeline: PipelineSettings,
    /// Token unit prices and exchange rate for the usage ledger.
    pub pricing: TokenPricing,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// HTTP bind settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// SQLite database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Database file path. `:memory:` is honored for local smoke runs.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "mailgate.db".to_string(),
        }
    }
}

/// One named admin token. The name becomes the audit actor identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminToken {
    /// Actor name recorded in audit entries.
    pub name: String,
    /// Bearer token value.
    pub token: String,
}

/// Admin API auth settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Accepted bearer tokens. Empty means every request is rejected —
    /// the API never runs open.
    pub tokens: Vec<AdminToken>,
}

/// External pipeline endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Base URL of the pipeline service.
    pub base_url: String,
    /// Request timeout in seconds for pipeline calls.
    pub timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl MailgateSettings {
    /// Apply `MAILGATE_*` environment overrides (highest priority).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("MAILGATE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MAILGATE_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "ignoring non-numeric MAILGATE_PORT"),
            }
        }
        if let Ok(path) = std::env::var("MAILGATE_DB") {
            self.database.path = path;
        }
        if let Ok(url) = std::env::var("MAILGATE_PIPELINE_URL") {
            self.pipeline.base_url = url;
        }
        if let Ok(token) = std::env::var("MAILGATE_ADMIN_TOKEN") {
            self.auth.tokens.push(AdminToken {
                name: "admin".to_string(),
                token,
            });
        }
        if let Ok(filter) = std::env::var("MAILGATE_LOG") {
            self.logging.filter = filter;
        }
        self
    }

    /// Resolve a bearer token to its actor name.
    pub fn actor_for_token(&self, presented: &str) -> Option<&str> {
        self.auth
            .tokens
            .iter()
            .find(|t| t.token == presented)
            .map(|t| t.name.as_str())
    }
}
