//! Command line interface
//!
//! Flags override values loaded from the configuration file and environment.

use clap::Parser;

use crate::config::{Config, DotfilePolicy, DEFAULT_CONFIG_FILE};

/// Static file server for local development
#[derive(Parser, Debug, Default)]
#[command(name = "serv", version, about)]
pub struct Cli {
    /// Configuration file (without extension)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Directory to serve
    #[arg(short, long)]
    pub dir: Option<String>,

    /// Enable compression
    #[arg(short, long, overrides_with = "no_compress")]
    pub compress: bool,

    /// Disable compression
    #[arg(long)]
    pub no_compress: bool,

    /// Use https
    #[arg(short, long)]
    pub secure: bool,

    /// Enable HTTP/2
    #[arg(long = "http2", visible_alias = "h2")]
    pub http2: bool,

    /// Enable directory listing
    #[arg(short, long)]
    pub listing: bool,

    /// Fast mode: no compression, no access log
    #[arg(short, long)]
    pub fast: bool,

    /// Dotfile policy (allow or deny)
    #[arg(long)]
    pub dotfiles: Option<DotfilePolicy>,

    /// Serve <dir>/404.html for missing paths
    #[arg(long = "custom-404")]
    pub custom_404: bool,

    /// PEM certificate for https
    #[arg(long, requires = "ssl_key")]
    pub ssl_cert: Option<String>,

    /// PEM private key for https
    #[arg(long, requires = "ssl_cert")]
    pub ssl_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Apply flags that were given on the command line
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(ref host) = self.host {
            config.server.host.clone_from(host);
        }
        if let Some(ref dir) = self.dir {
            config.serve.dir.clone_from(dir);
        }
        if self.compress {
            config.serve.compress = true;
        }
        if self.no_compress {
            config.serve.compress = false;
        }
        if self.listing {
            config.serve.listing = true;
        }
        if let Some(policy) = self.dotfiles {
            config.serve.dotfiles = policy;
        }
        if self.custom_404 {
            config.serve.custom_404 = true;
        }
        if self.secure {
            config.tls.secure = true;
        }
        if self.http2 {
            config.tls.http2 = true;
        }
        if let (Some(cert), Some(key)) = (&self.ssl_cert, &self.ssl_key) {
            config.tls.cert = Some(cert.clone());
            config.tls.key = Some(key.clone());
            config.tls.secure = true;
        }
        if let Some(ref level) = self.log_level {
            config.logging.level.clone_from(level);
        }
        if self.fast {
            config.serve.compress = false;
            config.logging.access_log = false;
        }
    }
}
