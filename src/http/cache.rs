//! HTTP cache validators module
//!
//! Computes the `ETag` and `Last-Modified` validators for a file from its
//! metadata, and the `Cache-Control` policies the server emits.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Validators for one representation of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Quoted strong entity tag, e.g. `"404-18c3f0a1b2c"`
    pub etag: String,
    /// Modification time truncated to whole seconds (HTTP date resolution)
    pub last_modified: Option<SystemTime>,
}

impl Validators {
    /// Derive validators from file size and modification time
    ///
    /// The tag is `"<size hex>-<mtime millis hex>"`, so it is stable across
    /// requests and changes whenever the file is rewritten or resized.
    pub fn from_metadata(size: u64, modified: Option<SystemTime>) -> Self {
        let mtime_ms = modified
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_millis());

        Self {
            etag: format!("\"{size:x}-{mtime_ms:x}\""),
            last_modified: modified.map(truncate_to_secs),
        }
    }

    /// `Last-Modified` header value
    pub fn last_modified_header(&self) -> Option<String> {
        self.last_modified.map(httpdate::fmt_http_date)
    }

    /// Weak form of the tag, used when the body is content-encoded
    pub fn weak_etag(&self) -> String {
        format!("W/{}", self.etag)
    }
}

/// Drop sub-second precision
pub fn truncate_to_secs(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map_or(time, |d| UNIX_EPOCH + Duration::from_secs(d.as_secs()))
}

/// Cache control policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with specified max-age (seconds)
    Public(u32),
    /// Revalidate on every use (listings, errors)
    NoCache,
}

impl CachePolicy {
    /// Policy for files served from the root: one year
    pub const STATIC_FILES: Self = Self::Public(31_536_000);

    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::NoCache => "no-cache".to_string(),
        }
    }
}
