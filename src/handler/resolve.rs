//! Path resolution module
//!
//! Maps a request path onto the served root. The path is percent-decoded
//! once, normalised lexically, and the target is canonicalised so neither
//! `..` segments nor symlinks can reach outside the root.

use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::config::DotfilePolicy;
use crate::error::is_not_found;

/// Reasons a request path cannot be mapped to a location under the root
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The path leaves the root, lexically or through a symlink
    #[error("path escapes the served root")]
    Traversal,

    /// Not valid UTF-8 after decoding, or contains a NUL byte
    #[error("malformed request path")]
    Malformed,

    /// Filesystem failure other than "not found"
    #[error("stat failed: {0}")]
    Io(#[from] io::Error),
}

/// What the resolved path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    File,
    Directory,
    Missing,
}

/// Metadata the handler needs from a stat call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

impl From<&std::fs::Metadata> for FileStat {
    fn from(meta: &std::fs::Metadata) -> Self {
        Self {
            size: meta.len(),
            modified: meta.modified().ok(),
            is_dir: meta.is_dir(),
        }
    }
}

/// A request path mapped onto the filesystem
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// Absolute path under the root (not necessarily existing)
    pub path: PathBuf,
    /// Decoded, normalised URL path starting with `/`
    pub url_path: String,
    pub kind: TargetKind,
    /// Present unless `kind` is `Missing`
    pub stat: Option<FileStat>,
}

impl ResolvedTarget {
    fn missing(path: PathBuf, url_path: String) -> Self {
        Self {
            path,
            url_path,
            kind: TargetKind::Missing,
            stat: None,
        }
    }
}

/// Resolve `url_path` against `root`
///
/// `root` must be canonical. Query strings and fragments are ignored.
/// Dotfiles denied by `dotfiles` resolve as missing.
pub async fn resolve(
    root: &Path,
    url_path: &str,
    dotfiles: DotfilePolicy,
) -> Result<ResolvedTarget, ResolveError> {
    let raw = url_path.split(['?', '#']).next().unwrap_or_default();

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| ResolveError::Malformed)?;
    if decoded.contains('\0') {
        return Err(ResolveError::Malformed);
    }

    let segments = normalize(&decoded)?;
    let normalized = format!("/{}", segments.join("/"));

    let mut path = root.to_path_buf();
    path.extend(&segments);

    if segments.iter().any(|s| dotfiles.denies_segment(s)) {
        return Ok(ResolvedTarget::missing(path, normalized));
    }

    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if is_not_found(&e) => return Ok(ResolvedTarget::missing(path, normalized)),
        Err(e) => return Err(ResolveError::Io(e)),
    };

    ensure_contained(root, &path).await?;

    let stat = FileStat::from(&meta);
    Ok(ResolvedTarget {
        path,
        url_path: normalized,
        kind: if stat.is_dir {
            TargetKind::Directory
        } else {
            TargetKind::File
        },
        stat: Some(stat),
    })
}

/// Canonicalise `path` and check it is still below `root`
///
/// Symlinks are followed, but only while they stay inside the root.
pub async fn ensure_contained(root: &Path, path: &Path) -> Result<PathBuf, ResolveError> {
    let canonical = tokio::fs::canonicalize(path).await?;
    if !canonical.starts_with(root) {
        tracing::warn!(path = %path.display(), target = %canonical.display(), "path traversal attempt blocked");
        return Err(ResolveError::Traversal);
    }
    Ok(canonical)
}

/// Split a decoded path into segments, collapsing `.` and `..`
///
/// A `..` that would climb above the root is a traversal attempt.
fn normalize(decoded: &str) -> Result<Vec<&str>, ResolveError> {
    let mut segments = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ResolveError::Traversal);
                }
            }
            s => segments.push(s),
        }
    }
    Ok(segments)
}
