//! Error types
//!
//! `Error` covers startup failures (configuration, TLS material, binding).
//! `ServeError` is the request-scoped taxonomy the static handler maps to
//! status codes before any response header is written.

use hyper::StatusCode;
use thiserror::Error;

/// Result type for server setup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or starting the server
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// TLS material could not be loaded or generated
    #[error("TLS error: {0}")]
    Tls(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Failures that end a request before its response has started
#[derive(Error, Debug)]
pub enum ServeError {
    /// Missing path, traversal attempt, denied dotfile or unlisted directory
    #[error("not found")]
    NotFound,

    /// Anything other than GET or HEAD
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Unexpected filesystem failure (permission denied, disk error)
    #[error("internal error: {0}")]
    Internal(#[source] std::io::Error),
}

impl ServeError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify an IO error: "does not exist" flavours are 404, the rest 500
    pub fn from_io(err: std::io::Error) -> Self {
        if is_not_found(&err) {
            Self::NotFound
        } else {
            Self::Internal(err)
        }
    }
}

/// Whether an IO error means the path simply is not there
///
/// `ENOTDIR` (a file used as a directory) counts as not-found too.
pub fn is_not_found(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_classification() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(matches!(ServeError::from_io(missing), ServeError::NotFound));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err = ServeError::from_io(denied);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServeError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServeError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
