//! Configuration management for the gateway.
//!
//! This module provides a centralized configuration structure populated from
//! environment variables (optionally loaded from a `.env` file) on top of
//! fixed defaults.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Tool store connection settings.
    pub store: StoreConfig,

    /// Outbound tool call settings.
    pub invoker: InvokerConfig,

    /// Audit log settings.
    pub audit: AuditConfig,

    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Connection settings for the MySQL tool store.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Upper bound on pooled connections.
    pub max_connections: u32,

    /// How long a read waits for a free connection before giving up.
    pub acquire_timeout_secs: u64,
}

/// Custom Debug implementation to redact the password from logs.
impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

/// Settings for outbound tool calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokerConfig {
    /// Whole-request deadline. `None` leaves calls unbounded.
    pub timeout_secs: Option<u64>,

    /// Idle connections kept per upstream host.
    pub pool_max_idle_per_host: usize,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` for upstream calls.
    pub use_env_proxy: bool,
}

/// Settings for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Header names (case-insensitive) whose values are masked in the audit log.
    pub redact_headers: Vec<String>,

    /// Extra file receiving audit records only.
    pub log_file: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "admin".to_string(),
            password: "123".to_string(),
            database: "tool".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            pool_max_idle_per_host: 8,
            use_env_proxy: true,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            redact_headers: ["authorization", "proxy-authorization", "cookie", "x-api-key"]
                .into_iter()
                .map(String::from)
                .collect(),
            log_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig::default(),
            store: StoreConfig::default(),
            invoker: InvokerConfig::default(),
            audit: AuditConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are expected to be prefixed with `MCP_`.
    /// For example: `MCP_SERVER_NAME`, `MCP_DB_HOST`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        config.logging = LoggingConfig::from_env();
        config.store = StoreConfig::from_env();
        config.invoker = InvokerConfig::from_env();
        config.audit = AuditConfig::from_env();

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        config
    }
}

impl LoggingConfig {
    /// Read `MCP_LOG_LEVEL`. Never logs, so it can run before a subscriber
    /// exists.
    pub fn from_env() -> Self {
        std::env::var("MCP_LOG_LEVEL")
            .map(|level| Self { level })
            .unwrap_or_default()
    }
}

impl StoreConfig {
    /// Read `MCP_DB_*` variables over the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("MCP_DB_HOST").unwrap_or(defaults.host),
            port: env_parse("MCP_DB_PORT", defaults.port),
            user: std::env::var("MCP_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("MCP_DB_PASSWORD").unwrap_or(defaults.password),
            database: std::env::var("MCP_DB_NAME").unwrap_or(defaults.database),
            max_connections: env_parse("MCP_DB_MAX_CONNECTIONS", defaults.max_connections).max(1),
            acquire_timeout_secs: env_parse(
                "MCP_DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout_secs,
            ),
        }
    }
}

impl InvokerConfig {
    /// Read `MCP_TOOL_*` variables over the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let timeout_secs = match std::env::var("MCP_TOOL_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => {
                    info!("Upstream tool calls time out after {}s", secs);
                    Some(secs)
                }
                Err(_) => {
                    warn!("Ignoring invalid MCP_TOOL_TIMEOUT_SECS={:?}", raw);
                    defaults.timeout_secs
                }
            },
            Err(_) => defaults.timeout_secs,
        };

        Self {
            timeout_secs,
            pool_max_idle_per_host: env_parse(
                "MCP_TOOL_POOL_MAX_IDLE",
                defaults.pool_max_idle_per_host,
            ),
            use_env_proxy: std::env::var("MCP_TOOL_USE_ENV_PROXY")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.use_env_proxy),
        }
    }
}

impl AuditConfig {
    /// `MCP_AUDIT_LOG_FILE`, if set. Never logs.
    pub fn log_file_from_env() -> Option<PathBuf> {
        std::env::var_os("MCP_AUDIT_LOG_FILE").map(PathBuf::from)
    }

    /// Read `MCP_AUDIT_*` variables over the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(list) = std::env::var("MCP_AUDIT_REDACT_HEADERS") {
            config.redact_headers = list
                .split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect();
            if config.redact_headers.is_empty() {
                warn!(
                    "MCP_AUDIT_REDACT_HEADERS is empty - tool request headers \
                     are written to the audit log verbatim"
                );
            }
        }

        config.log_file = Self::log_file_from_env();

        config
    }
}

/// Parse an environment variable, keeping `default` when unset or invalid.
fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}
