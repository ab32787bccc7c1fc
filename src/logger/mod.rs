//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - Subscriber setup from the logging configuration
//! - Server lifecycle logging
//! - Access logging with multiple formats

mod format;

pub use format::{level_for_status, new_request_id, AccessLogEntry};

use std::net::SocketAddr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

/// Target used for access log events, so they can be filtered separately
pub const ACCESS_TARGET: &str = "serv::access";

/// Initialize the global subscriber
///
/// Should be called once at application startup. `RUST_LOG` takes
/// precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::Config(format!("invalid log level '{}': {e}", config.level)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = if config.json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| Error::Config(format!("logger already initialised: {e}")))
}

pub fn log_server_start(addr: &SocketAddr, config: &Config, root: &std::path::Path) {
    let scheme = if config.tls.secure { "https" } else { "http" };
    tracing::info!("Serving {} at {scheme}://{addr}", root.display());
    tracing::info!(
        listing = config.serve.listing,
        compress = config.serve.compress,
        http2 = config.tls.http2,
        dotfiles = ?config.serve.dotfiles,
        access_log = config.logging.access_log,
        "server options"
    );
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
}

pub fn log_shutdown_requested(signal: &str) {
    tracing::info!("{signal} received, shutting down");
}

pub fn log_shutdown_complete(drained: bool) {
    if drained {
        tracing::info!("All connections closed");
    } else {
        tracing::warn!("Shutdown timed out with connections still open");
    }
}

pub fn log_connection_error(peer: &SocketAddr, err: &dyn std::fmt::Display) {
    tracing::debug!(%peer, "connection closed with error: {err}");
}

/// Incoming request line, `dev` format only
pub fn log_request(request_id: &str, method: &str, uri: &str, format: &str) {
    if format == "dev" {
        tracing::info!(target: ACCESS_TARGET, "[{request_id}] --> {method} {uri}");
    }
}

/// Log formatted access log entry at the level its status calls for
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    let level = level_for_status(entry.status);
    if level == Level::ERROR {
        tracing::error!(target: ACCESS_TARGET, "{line}");
    } else if level == Level::WARN {
        tracing::warn!(target: ACCESS_TARGET, "{line}");
    } else {
        tracing::info!(target: ACCESS_TARGET, "{line}");
    }
}

/// Body stream ended early (client went away or a read failed)
pub fn log_body_error(request_id: &str, err: &std::io::Error) {
    if err.kind() == std::io::ErrorKind::BrokenPipe
        || err.kind() == std::io::ErrorKind::ConnectionReset
    {
        tracing::warn!(target: ACCESS_TARGET, "[{request_id}] <-- Request aborted by client");
    } else {
        tracing::error!(target: ACCESS_TARGET, "[{request_id}] <-- Response stream error: {err}");
    }
}
