//! Static file serving module
//!
//! The request state machine: method check, path resolution, index lookup
//! or listing for directories, conditional evaluation, ranges, and
//! streaming the file body. Errors raised before the response starts are
//! mapped to 404 or 500 in one place.

use hyper::header::{HeaderMap, ACCEPT_ENCODING, RANGE};
use hyper::{Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::listing;
use super::resolve::{ensure_contained, resolve, FileStat, ResolveError, TargetKind};
use crate::config::ServerConfig;
use crate::error::{is_not_found, ServeError};
use crate::http::body::{self, ResponseBody};
use crate::http::compress;
use crate::http::conditional::{self, Condition};
use crate::http::mime;
use crate::http::range::{parse_range_header, RangeParseResult};
use crate::http::response::{self, FileHeaders};
use crate::http::Validators;

/// Index documents tried, in order, when a directory is requested
pub const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// Page served for missing paths when custom 404 pages are enabled
pub const CUSTOM_404_FILE: &str = "404.html";

/// Serves files below one root directory
///
/// Cheap to clone; every connection task holds one.
#[derive(Debug, Clone)]
pub struct StaticHandler {
    config: Arc<ServerConfig>,
}

impl StaticHandler {
    /// Create a handler for `config`
    ///
    /// The root is canonicalised here if it is not already, so containment
    /// checks compare like with like.
    pub fn new(mut config: ServerConfig) -> Self {
        if let Ok(root) = std::fs::canonicalize(&config.root) {
            config.root = root;
        }
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Produce the response for one request
    ///
    /// The request body is never read. HEAD responses carry the same
    /// headers as the equivalent GET with an empty body.
    pub async fn handle<B>(&self, req: &Request<B>) -> Response<ResponseBody> {
        let is_head = req.method() == Method::HEAD;

        let response = match self.dispatch(req).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(path = %req.uri().path(), status = %err.status(), "{err}");
                self.error_response(req.uri().path(), &err).await
            }
        };

        if is_head {
            response::strip_body(response)
        } else {
            response
        }
    }

    async fn dispatch<B>(&self, req: &Request<B>) -> Result<Response<ResponseBody>, ServeError> {
        if req.method() != Method::GET && req.method() != Method::HEAD {
            return Err(ServeError::MethodNotAllowed);
        }

        let target = match resolve(&self.config.root, req.uri().path(), self.config.dotfiles).await {
            Ok(target) => target,
            Err(ResolveError::Traversal | ResolveError::Malformed) => {
                return Err(ServeError::NotFound)
            }
            Err(ResolveError::Io(e)) => return Err(ServeError::from_io(e)),
        };

        match (target.kind, target.stat) {
            (TargetKind::File, Some(stat)) => self.serve_file(req, &target.path, stat).await,
            (TargetKind::Directory, _) => {
                if let Some((index, stat)) = find_index(&self.config.root, &target.path).await? {
                    return self.serve_file(req, &index, stat).await;
                }
                if !self.config.listing {
                    tracing::debug!(path = %target.url_path, "directory without index, listing disabled");
                    return Err(ServeError::NotFound);
                }
                self.serve_listing(req, &target.url_path, &target.path).await
            }
            _ => Err(ServeError::NotFound),
        }
    }

    async fn serve_file<B>(
        &self,
        req: &Request<B>,
        path: &Path,
        stat: FileStat,
    ) -> Result<Response<ResponseBody>, ServeError> {
        let headers = req.headers();
        let validators = Validators::from_metadata(stat.size, stat.modified);
        let content_type = mime::get_content_type(path);
        let candidate = self.config.compress && compress::is_candidate(&content_type, stat.size);

        match conditional::evaluate(headers, &validators) {
            Condition::PreconditionFailed => {
                return Ok(response::build_412_response(&validators));
            }
            Condition::Fresh => return Ok(response::build_304_response(&validators, candidate)),
            Condition::Proceed => {}
        }

        let gzip = candidate && compress::accepts_gzip(header_str(headers, &ACCEPT_ENCODING));

        let mut file_headers = FileHeaders {
            content_type: &content_type,
            validators: &validators,
            content_length: Some(stat.size),
            content_range: None,
            gzip: false,
            vary: candidate,
        };

        if req.method() == Method::HEAD {
            file_headers.gzip = gzip;
            file_headers.content_length = (!gzip).then_some(stat.size);
            return Ok(file_headers.build(StatusCode::OK, body::empty()));
        }

        let range = if conditional::if_range_allows(headers, &validators) {
            parse_range_header(header_str(headers, &RANGE), stat.size)
        } else {
            RangeParseResult::None
        };

        let file = tokio::fs::File::open(path)
            .await
            .map_err(ServeError::from_io)?;

        match range {
            RangeParseResult::Valid(range) => {
                tracing::debug!(path = %path.display(), start = range.start, end = range.end, "serving range");
                file_headers.content_length = Some(range.content_length());
                file_headers.content_range = Some(range.content_range(stat.size));
                let body = body::file_stream(file, Some(range))
                    .await
                    .map_err(ServeError::Internal)?;
                Ok(file_headers.build(StatusCode::PARTIAL_CONTENT, body))
            }
            RangeParseResult::NotSatisfiable => {
                let body = body::file_stream(file, None)
                    .await
                    .map_err(ServeError::Internal)?;
                Ok(file_headers.build_416(stat.size, body))
            }
            RangeParseResult::None if gzip => {
                file_headers.gzip = true;
                file_headers.content_length = None;
                let body = body::from_reader(compress::gzip_reader(file));
                Ok(file_headers.build(StatusCode::OK, body))
            }
            RangeParseResult::None => {
                let body = body::file_stream(file, None)
                    .await
                    .map_err(ServeError::Internal)?;
                Ok(file_headers.build(StatusCode::OK, body))
            }
        }
    }

    async fn serve_listing<B>(
        &self,
        req: &Request<B>,
        url_path: &str,
        dir: &Path,
    ) -> Result<Response<ResponseBody>, ServeError> {
        let page = listing::render(url_path, dir, self.config.dotfiles)
            .await
            .map_err(ServeError::from_io)?;

        let gzip = self.config.compress
            && page.len() as u64 >= compress::MIN_COMPRESS_SIZE
            && compress::accepts_gzip(header_str(req.headers(), &ACCEPT_ENCODING));

        if gzip {
            let encoded = compress::gzip_bytes(page.as_bytes())
                .await
                .map_err(ServeError::Internal)?;
            return Ok(response::build_html_response(StatusCode::OK, encoded, true));
        }

        Ok(response::build_html_response(StatusCode::OK, page.into(), false))
    }

    async fn error_response(&self, raw_path: &str, err: &ServeError) -> Response<ResponseBody> {
        match err {
            ServeError::NotFound => self.not_found(raw_path).await,
            ServeError::MethodNotAllowed => response::build_405_response(),
            ServeError::Internal(source) => {
                tracing::error!(path = %raw_path, error = %source, "failed to serve request");
                response::build_500_response()
            }
        }
    }

    async fn not_found(&self, raw_path: &str) -> Response<ResponseBody> {
        if self.config.custom_404 {
            let page_path = self.config.root.join(CUSTOM_404_FILE);
            let page = match ensure_contained(&self.config.root, &page_path).await {
                Ok(canonical) => tokio::fs::read(canonical).await.map_err(ResolveError::Io),
                Err(e) => Err(e),
            };
            match page {
                Ok(page) => {
                    return response::build_html_response(StatusCode::NOT_FOUND, page.into(), false)
                }
                Err(ResolveError::Io(e)) if is_not_found(&e) => {}
                Err(e) => tracing::warn!(error = %e, "custom 404 page unusable"),
            }
        }

        let display = percent_decode_str(raw_path).decode_utf8_lossy();
        response::build_404_response(&display)
    }
}

/// First index document present in `dir` that stays inside `root`
async fn find_index(
    root: &Path,
    dir: &Path,
) -> Result<Option<(PathBuf, FileStat)>, ServeError> {
    for name in INDEX_FILES {
        let candidate = dir.join(name);
        match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => match ensure_contained(root, &candidate).await {
                Ok(_) => return Ok(Some((candidate, FileStat::from(&meta)))),
                Err(ResolveError::Io(e)) => return Err(ServeError::from_io(e)),
                Err(_) => {}
            },
            Ok(_) => {}
            Err(e) if is_not_found(&e) => {}
            Err(e) => return Err(ServeError::Internal(e)),
        }
    }
    Ok(None)
}

/// Header value as text
fn header_str<'a>(headers: &'a HeaderMap, name: &hyper::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn handler(root: &Path) -> StaticHandler {
        StaticHandler::new(ServerConfig::new(root))
    }

    fn get(path: &str) -> Request<()> {
        Request::get(path).body(()).unwrap()
    }

    #[tokio::test]
    async fn test_index_htm_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("old")).unwrap();
        std::fs::write(dir.path().join("old/index.htm"), "legacy").unwrap();

        let res = handler(dir.path()).handle(&get("/old/")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"legacy");
    }

    #[tokio::test]
    async fn test_index_html_preferred_over_htm() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "html").unwrap();
        std::fs::write(dir.path().join("index.htm"), "htm").unwrap();

        let res = handler(dir.path()).handle(&get("/")).await;
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"html");
    }

    #[tokio::test]
    async fn test_directory_named_index_html_is_not_an_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("index.html")).unwrap();

        let res = handler(dir.path()).handle(&get("/")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_index_symlink_outside_root_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "TOP-SECRET").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("sub/index.html"),
        )
        .unwrap();
        std::fs::write(dir.path().join("sub/index.htm"), "inside").unwrap();

        let handler = handler(dir.path());
        let res = handler.handle(&get("/sub/index.html")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = handler.handle(&get("/sub/")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"inside");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_index_symlink_outside_root_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "TOP-SECRET").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("index.html"))
            .unwrap();

        let res = handler(dir.path()).handle(&get("/")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert!(!String::from_utf8_lossy(&body).contains("TOP-SECRET"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_custom_404_symlink_outside_root_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.html"), "TOP-SECRET").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret.html"), dir.path().join("404.html"))
            .unwrap();

        let handler = StaticHandler::new(ServerConfig::new(dir.path()).with_custom_404(true));
        let res = handler.handle(&get("/missing")).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"<em><code>/missing</code></em> not found");
    }

    #[tokio::test]
    async fn test_find_index_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_index(dir.path(), dir.path()).await.unwrap().is_none());
    }
}
