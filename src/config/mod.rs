// Configuration module entry point
// Loads layered configuration and resolves the handler's ServerConfig

mod types;

use std::net::SocketAddr;
use std::path::Path;

use crate::error::{Error, Result};

// Re-export public types
pub use types::{
    Config, DotfilePolicy, ListenConfig, LoggingConfig, ServeConfig, ServerConfig, TlsConfig,
};

/// Default configuration file name (without extension)
pub const DEFAULT_CONFIG_FILE: &str = "serv";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; `SERV__<SECTION>__<KEY>` environment variables
    /// override it, and built-in defaults fill the rest.
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERV")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("serve.dir", ".")?
            .set_default("serve.listing", false)?
            .set_default("serve.compress", true)?
            .set_default("serve.dotfiles", "allow")?
            .set_default("serve.custom_404", false)?
            .set_default("tls.secure", false)?
            .set_default("tls.http2", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "dev")?
            .set_default("logging.json", false)?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr> {
        let host = self.server.host.trim_start_matches('[').trim_end_matches(']');
        let addr = if host.contains(':') {
            format!("[{host}]:{}", self.server.port)
        } else {
            format!("{host}:{}", self.server.port)
        };
        addr.parse()
            .map_err(|e| Error::Config(format!("Invalid address '{addr}': {e}")))
    }

    /// Resolve the settings the static handler needs
    ///
    /// Fails when the serve directory does not exist or is not a directory.
    pub fn server_config(&self) -> Result<ServerConfig> {
        let root = resolve_root(Path::new(&self.serve.dir))?;

        Ok(ServerConfig::new(root)
            .with_listing(self.serve.listing)
            .with_compression(self.serve.compress)
            .with_dotfiles(self.serve.dotfiles)
            .with_custom_404(self.serve.custom_404))
    }
}

/// Canonicalize the serve directory
fn resolve_root(dir: &Path) -> Result<std::path::PathBuf> {
    let root = dir.canonicalize().map_err(|e| {
        Error::Config(format!("Cannot access the provided path '{}': {e}", dir.display()))
    })?;

    if !root.is_dir() {
        return Err(Error::Config(format!(
            "Serve path '{}' is not a directory",
            root.display()
        )));
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Config {
        // A file name that does not exist, so only defaults apply
        Config::load_from("serv-test-missing-config").unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = defaults();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.serve.dir, ".");
        assert!(!cfg.serve.listing);
        assert!(cfg.serve.compress);
        assert_eq!(cfg.serve.dotfiles, DotfilePolicy::Allow);
        assert!(!cfg.tls.secure);
        assert_eq!(cfg.logging.access_log_format, "dev");
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = defaults();
        cfg.server.host = "127.0.0.1".to_string();
        cfg.server.port = 9000;
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "127.0.0.1:9000");

        cfg.server.host = "::".to_string();
        assert_eq!(cfg.get_socket_addr().unwrap().to_string(), "[::]:9000");

        cfg.server.host = "not an address".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }

    #[test]
    fn test_server_config_resolves_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = defaults();
        cfg.serve.dir = dir.path().to_string_lossy().into_owned();
        cfg.serve.listing = true;

        let server = cfg.server_config().unwrap();
        assert!(server.root.is_absolute());
        assert_eq!(server.root, dir.path().canonicalize().unwrap());
        assert!(server.listing);
        assert!(server.compress);
    }

    #[test]
    fn test_server_config_rejects_bad_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        let mut cfg = defaults();
        cfg.serve.dir = file.to_string_lossy().into_owned();
        assert!(matches!(cfg.server_config(), Err(Error::Config(_))));

        cfg.serve.dir = dir.path().join("missing").to_string_lossy().into_owned();
        assert!(matches!(cfg.server_config(), Err(Error::Config(_))));
    }
}
