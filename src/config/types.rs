// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure, as merged from file, environment and CLI
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ListenConfig,
    pub serve: ServeConfig,
    pub tls: TlsConfig,
    pub logging: LoggingConfig,
}

/// Where to listen
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ListenConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads (defaults to the number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,
}

/// What to serve and how
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServeConfig {
    /// Directory to serve, relative to the working directory or absolute
    pub dir: String,
    pub listing: bool,
    pub compress: bool,
    #[serde(default)]
    pub dotfiles: DotfilePolicy,
    /// Serve `<root>/404.html` for missing paths when it exists
    #[serde(default)]
    pub custom_404: bool,
}

/// Transport security and protocol selection
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TlsConfig {
    pub secure: bool,
    pub http2: bool,
    /// PEM certificate chain; a self-signed certificate is generated when unset
    #[serde(default)]
    pub cert: Option<String>,
    /// PEM private key matching `cert`
    #[serde(default)]
    pub key: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (dev, combined, common, json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Emit all log lines as JSON objects
    #[serde(default)]
    pub json: bool,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "dev".to_string()
}

/// Treatment of path segments starting with `.`
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DotfilePolicy {
    /// Serve dotfiles; listings hide only `.DS_Store` and `.git`
    #[default]
    Allow,
    /// Treat dotfiles as missing and hide every dot-entry from listings
    Deny,
}

impl DotfilePolicy {
    /// Platform artifacts never shown in listings
    pub const SYSTEM_ARTIFACTS: [&'static str; 2] = [".DS_Store", ".git"];

    /// Whether a directory entry with this name is left out of a listing
    pub fn hides_in_listing(self, name: &str) -> bool {
        match self {
            Self::Allow => Self::SYSTEM_ARTIFACTS.contains(&name),
            Self::Deny => name.starts_with('.'),
        }
    }

    /// Whether a decoded URL segment must be answered as not found
    pub fn denies_segment(self, segment: &str) -> bool {
        match self {
            Self::Allow => false,
            Self::Deny => segment.starts_with('.') && segment != "." && segment != "..",
        }
    }
}

impl std::str::FromStr for DotfilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(format!("unknown dotfile policy '{other}' (expected allow or deny)")),
        }
    }
}

/// Resolved, immutable settings the static handler runs with
///
/// Built once per server start by [`Config::server_config`](super::Config::server_config);
/// the root is absolute and canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub root: PathBuf,
    pub listing: bool,
    pub compress: bool,
    pub dotfiles: DotfilePolicy,
    pub custom_404: bool,
}

impl ServerConfig {
    /// Settings for `root` with listing, compression and custom 404 off
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            listing: false,
            compress: false,
            dotfiles: DotfilePolicy::default(),
            custom_404: false,
        }
    }

    #[must_use]
    pub const fn with_listing(mut self, enable: bool) -> Self {
        self.listing = enable;
        self
    }

    #[must_use]
    pub const fn with_compression(mut self, enable: bool) -> Self {
        self.compress = enable;
        self
    }

    #[must_use]
    pub const fn with_dotfiles(mut self, policy: DotfilePolicy) -> Self {
        self.dotfiles = policy;
        self
    }

    #[must_use]
    pub const fn with_custom_404(mut self, enable: bool) -> Self {
        self.custom_404 = enable;
        self
    }
}
