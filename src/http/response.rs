//! HTTP response building module
//!
//! Provides builders for the status codes the static handler emits. Builders
//! never fail: a header value that cannot be encoded is logged and the
//! response falls back to a bare one with the same status.

use hyper::header::{
    HeaderValue, ACCEPT_RANGES, ALLOW, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED, VARY,
};
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};

use super::body::{self, ResponseBody};
use super::cache::{CachePolicy, Validators};
use super::mime::HTML;
use super::range::unsatisfied_range;

/// Headers describing one file representation
///
/// Built once per request and applied to 200, 206 and 416 responses so
/// they all carry the same validators.
#[derive(Debug, Clone)]
pub struct FileHeaders<'a> {
    pub content_type: &'a str,
    pub validators: &'a Validators,
    /// Omitted when the body is content-encoded on the fly
    pub content_length: Option<u64>,
    pub content_range: Option<String>,
    /// Body is gzip encoded
    pub gzip: bool,
    /// Representation may be encoded, so caches must key on `Accept-Encoding`
    pub vary: bool,
}

impl FileHeaders<'_> {
    /// Build the response with the given status and body
    pub fn build(&self, status: StatusCode, body: ResponseBody) -> Response<ResponseBody> {
        let builder = Response::builder().status(status);
        let mut builder = with_validators(builder, self.validators, self.gzip)
            .header(CONTENT_TYPE, self.content_type)
            .header(ACCEPT_RANGES, "bytes")
            .header(CACHE_CONTROL, CachePolicy::STATIC_FILES.to_header_value());

        if let Some(length) = self.content_length {
            builder = builder.header(CONTENT_LENGTH, length);
        }
        if let Some(ref range) = self.content_range {
            builder = builder.header(CONTENT_RANGE, range);
        }
        if self.gzip {
            builder = builder.header(CONTENT_ENCODING, "gzip");
        }
        if self.vary {
            builder = builder.header(VARY, "Accept-Encoding");
        }

        finish(builder, body, status)
    }

    /// 416 Range Not Satisfiable
    ///
    /// Carries `Content-Range: bytes */<size>` and the full `Content-Length`.
    pub fn build_416(&self, file_size: u64, body: ResponseBody) -> Response<ResponseBody> {
        let headers = FileHeaders {
            content_length: Some(file_size),
            content_range: Some(unsatisfied_range(file_size)),
            gzip: false,
            ..self.clone()
        };
        headers.build(StatusCode::RANGE_NOT_SATISFIABLE, body)
    }
}

/// Attach `ETag` and `Last-Modified`
fn with_validators(builder: Builder, validators: &Validators, weak: bool) -> Builder {
    let etag = if weak {
        validators.weak_etag()
    } else {
        validators.etag.clone()
    };

    let builder = builder.header(ETAG, etag);
    match validators.last_modified_header() {
        Some(date) => builder.header(LAST_MODIFIED, date),
        None => builder,
    }
}

/// Build 304 Not Modified response
///
/// `vary` repeats the `Vary` header of the 200 being revalidated.
pub fn build_304_response(validators: &Validators, vary: bool) -> Response<ResponseBody> {
    let mut builder = with_validators(
        Response::builder().status(StatusCode::NOT_MODIFIED),
        validators,
        false,
    )
    .header(CACHE_CONTROL, CachePolicy::STATIC_FILES.to_header_value());

    if vary {
        builder = builder.header(VARY, "Accept-Encoding");
    }

    finish(builder, body::empty(), StatusCode::NOT_MODIFIED)
}

/// Build 412 Precondition Failed response
pub fn build_412_response(validators: &Validators) -> Response<ResponseBody> {
    let builder = with_validators(
        Response::builder().status(StatusCode::PRECONDITION_FAILED),
        validators,
        false,
    )
    .header(CONTENT_LENGTH, 0);

    finish(builder, body::empty(), StatusCode::PRECONDITION_FAILED)
}

/// Build 404 Not Found response naming the requested path
pub fn build_404_response(path: &str) -> Response<ResponseBody> {
    let page = format!("<em><code>{}</code></em> not found", escape_html(path));
    build_html_response(StatusCode::NOT_FOUND, page.into(), false)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    let builder = Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(ALLOW, "GET, HEAD")
        .header(CONTENT_LENGTH, 0);

    finish(builder, body::empty(), StatusCode::METHOD_NOT_ALLOWED)
}

/// Build 500 Internal Server Error response
///
/// Always starts from a fresh builder so no header staged for the failed
/// response survives.
pub fn build_500_response() -> Response<ResponseBody> {
    const BODY: &str = "Internal Server Error";

    let builder = Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, BODY.len())
        .header(CACHE_CONTROL, CachePolicy::NoCache.to_header_value());

    finish(builder, body::full(BODY), StatusCode::INTERNAL_SERVER_ERROR)
}

/// Build an uncacheable HTML page (listings, error pages)
///
/// `gzip` marks `content` as already encoded.
pub fn build_html_response(
    status: StatusCode,
    content: hyper::body::Bytes,
    gzip: bool,
) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HTML)
        .header(CONTENT_LENGTH, content.len())
        .header(CACHE_CONTROL, CachePolicy::NoCache.to_header_value());

    if gzip {
        builder = builder
            .header(CONTENT_ENCODING, "gzip")
            .header(VARY, "Accept-Encoding");
    }

    finish(builder, body::full(content), status)
}

/// Replace the body of a response, keeping status and headers
///
/// Used for HEAD, where `Content-Length` must still describe the GET body.
pub fn strip_body(response: Response<ResponseBody>) -> Response<ResponseBody> {
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, body::empty())
}

/// Minimal HTML escaping (sufficient for paths and filenames)
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn finish(builder: Builder, body: ResponseBody, status: StatusCode) -> Response<ResponseBody> {
    builder.body(body).unwrap_or_else(|e| {
        tracing::error!(status = status.as_u16(), error = %e, "failed to build response");
        let mut fallback = Response::new(body::empty());
        *fallback.status_mut() = status;
        fallback
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::{Duration, UNIX_EPOCH};

    fn validators() -> Validators {
        Validators::from_metadata(1028, Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000)))
    }

    async fn body_text(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_file_headers() {
        let v = validators();
        let headers = FileHeaders {
            content_type: "text/plain; charset=utf-8",
            validators: &v,
            content_length: Some(222),
            content_range: Some("bytes 540-761/1028".to_string()),
            gzip: false,
            vary: false,
        };
        let res = headers.build(StatusCode::PARTIAL_CONTENT, body::empty());

        assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(res.headers()[CONTENT_LENGTH], "222");
        assert_eq!(res.headers()[CONTENT_RANGE], "bytes 540-761/1028");
        assert_eq!(res.headers()[ETAG], v.etag.as_str());
        assert_eq!(res.headers()[ACCEPT_RANGES], "bytes");
        assert_eq!(res.headers()[CACHE_CONTROL], "public, max-age=31536000");
        assert!(res.headers().contains_key(LAST_MODIFIED));
        assert!(!res.headers().contains_key(VARY));
    }

    #[test]
    fn test_gzip_file_headers_weaken_etag() {
        let v = validators();
        let headers = FileHeaders {
            content_type: "text/plain; charset=utf-8",
            validators: &v,
            content_length: None,
            content_range: None,
            gzip: true,
            vary: true,
        };
        let res = headers.build(StatusCode::OK, body::empty());

        assert_eq!(res.headers()[ETAG], v.weak_etag().as_str());
        assert_eq!(res.headers()[CONTENT_ENCODING], "gzip");
        assert_eq!(res.headers()[VARY], "Accept-Encoding");
        assert!(!res.headers().contains_key(CONTENT_LENGTH));
    }

    #[test]
    fn test_416_carries_full_length() {
        let v = validators();
        let headers = FileHeaders {
            content_type: "text/plain",
            validators: &v,
            content_length: None,
            content_range: None,
            gzip: true,
            vary: false,
        };
        let res = headers.build_416(1028, body::empty());

        assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(res.headers()[CONTENT_RANGE], "bytes */1028");
        assert_eq!(res.headers()[CONTENT_LENGTH], "1028");
        assert!(!res.headers().contains_key(CONTENT_ENCODING));
    }

    #[test]
    fn test_conditional_responses_keep_validators() {
        let v = validators();
        for res in [build_304_response(&v, false), build_412_response(&v)] {
            assert_eq!(res.headers()[ETAG], v.etag.as_str());
            assert!(res.headers().contains_key(LAST_MODIFIED));
            assert!(!res.headers().contains_key(VARY));
        }
    }

    #[test]
    fn test_304_repeats_vary() {
        let res = build_304_response(&validators(), true);
        assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(res.headers()[VARY], "Accept-Encoding");
    }

    #[tokio::test]
    async fn test_405_response() {
        let res = build_405_response();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers()[ALLOW], "GET, HEAD");
        assert!(body_text(res).await.is_empty());
    }

    #[tokio::test]
    async fn test_404_escapes_path() {
        let res = build_404_response("/<script>");
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.headers()[CACHE_CONTROL], "no-cache");
        assert_eq!(
            body_text(res).await,
            "<em><code>/&lt;script&gt;</code></em> not found"
        );
    }

    #[tokio::test]
    async fn test_500_response() {
        let res = build_500_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!res.headers().contains_key(ETAG));
        assert_eq!(body_text(res).await, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_strip_body_keeps_headers() {
        let res = strip_body(build_404_response("/x"));
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.headers().contains_key(CONTENT_LENGTH));
        assert!(body_text(res).await.is_empty());
    }
}
