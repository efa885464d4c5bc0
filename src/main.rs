//! Tool Gateway Entry Point
//!
//! Initializes logging, loads configuration, and starts the gateway with the
//! configured transport.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use tool_gateway::core::audit::AUDIT_TARGET;
use tool_gateway::core::config::{AuditConfig, LoggingConfig};
use tool_gateway::core::{Config, GatewayServer, TransportService};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging first, so warnings about the remaining settings are seen.
    let logging = LoggingConfig::from_env();
    init_logging(&logging.level, AuditConfig::log_file_from_env().as_deref())?;

    let config = Config::from_env();

    info!("Starting {} v{}", config.server.name, config.server.version);
    info!("Tool store: {:?}", config.store);

    let server = GatewayServer::new(config.clone()).context("failed to build gateway")?;

    info!("Gateway initialized");

    let transport = TransportService::new(config.transport);
    transport.run(server).await?;

    info!("Gateway shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Everything goes to stderr. When `audit_file` is set, audit records are
/// additionally appended to that file, and only they are.
fn init_logging(level: &str, audit_file: Option<&Path>) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let audit_layer = match audit_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open audit log {}", path.display()))?;

            // Audit records are kept even when the console level is quieter.
            env_filter = env_filter.add_directive(format!("{AUDIT_TARGET}=info").parse()?);

            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(filter::filter_fn(|meta| meta.target() == AUDIT_TARGET)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(audit_layer)
        .init();

    Ok(())
}
