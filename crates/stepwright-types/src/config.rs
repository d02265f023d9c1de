//! Global configuration types for Stepwright.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! HTTP listener, the anti-forgery secret and trace export.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.stepwright/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Secret used to verify anti-forgery tokens. When absent, a random key
    /// is generated once and kept in `{data_dir}/csrf.key`.
    #[serde(default)]
    pub csrf_secret: Option<String>,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub enable_otel: bool,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
