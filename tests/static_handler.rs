//! Request-level behaviour of the static handler against a temporary root

use http_body_util::BodyExt;
use hyper::header::{
    HeaderName, ACCEPT_ENCODING, ALLOW, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, ETAG, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE,
    LAST_MODIFIED, RANGE, VARY,
};
use hyper::{Method, Request, Response, StatusCode};
use serv::http::ResponseBody;
use serv::{DotfilePolicy, ServerConfig, StaticHandler};
use std::path::Path;

const INDEX_LEN: usize = 219;
const GARBLE_LEN: usize = 1028;

struct Fixture {
    _dir: tempfile::TempDir,
    handler: StaticHandler,
}

fn garble() -> Vec<u8> {
    (0..GARBLE_LEN).map(|i| b'a' + (i % 26) as u8).collect()
}

fn write_tree(root: &Path) {
    let index = format!("<!DOCTYPE html><title>fixture</title>{}", "x".repeat(INDEX_LEN - 37));
    assert_eq!(index.len(), INDEX_LEN);
    std::fs::write(root.join("index.html"), index).unwrap();
    std::fs::create_dir(root.join("subdir")).unwrap();
    std::fs::write(root.join("subdir/garble.txt"), garble()).unwrap();
    std::fs::write(root.join(".secret"), "hidden").unwrap();
    std::fs::write(root.join("empty.txt"), "").unwrap();
}

fn fixture(configure: impl FnOnce(ServerConfig) -> ServerConfig) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path());
    let handler = StaticHandler::new(configure(ServerConfig::new(dir.path())));
    Fixture { _dir: dir, handler }
}

fn request(method: Method, path: &str, headers: &[(HeaderName, &str)]) -> Request<()> {
    let mut builder = Request::builder().method(method).uri(path);
    for (name, value) in headers {
        builder = builder.header(name, *value);
    }
    builder.body(()).unwrap()
}

async fn send(
    fx: &Fixture,
    method: Method,
    path: &str,
    headers: &[(HeaderName, &str)],
) -> Response<ResponseBody> {
    fx.handler.handle(&request(method, path, headers)).await
}

async fn body(res: Response<ResponseBody>) -> Vec<u8> {
    res.into_body().collect().await.unwrap().to_bytes().to_vec()
}

fn header<'a>(res: &'a Response<ResponseBody>, name: &HeaderName) -> &'a str {
    res.headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing {name}"))
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_get_root_serves_index() {
    let fx = fixture(|c| c);
    let res = send(&fx, Method::GET, "/", &[]).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, &CONTENT_LENGTH), "219");
    assert_eq!(header(&res, &CONTENT_TYPE), "text/html; charset=utf-8");
    assert_eq!(header(&res, &CACHE_CONTROL), "public, max-age=31536000");
    assert!(res.headers().contains_key(ETAG));
    assert!(res.headers().contains_key(LAST_MODIFIED));
    assert_eq!(body(res).await.len(), INDEX_LEN);
}

#[tokio::test]
async fn test_range_request_returns_partial_content() {
    let fx = fixture(|c| c);
    let res = send(&fx, Method::GET, "/subdir/garble.txt", &[(RANGE, "bytes=540-761")]).await;

    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&res, &CONTENT_LENGTH), "222");
    assert_eq!(header(&res, &CONTENT_RANGE), "bytes 540-761/1028");
    assert_eq!(body(res).await, garble()[540..=761].to_vec());
}

#[tokio::test]
async fn test_whole_file_range() {
    let fx = fixture(|c| c);
    let res = send(&fx, Method::GET, "/subdir/garble.txt", &[(RANGE, "bytes=0-1027")]).await;

    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header(&res, &CONTENT_RANGE), "bytes 0-1027/1028");
    assert_eq!(body(res).await.len(), GARBLE_LEN);
}

#[tokio::test]
async fn test_inverted_range_is_not_satisfiable() {
    let fx = fixture(|c| c);
    let res = send(&fx, Method::GET, "/subdir/garble.txt", &[(RANGE, "bytes=761-540")]).await;

    assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(header(&res, &CONTENT_LENGTH), "1028");
    assert_eq!(header(&res, &CONTENT_RANGE), "bytes */1028");
}

#[tokio::test]
async fn test_range_on_empty_file_is_ignored() {
    let fx = fixture(|c| c);
    let res = send(&fx, Method::GET, "/empty.txt", &[(RANGE, "bytes=0-10")]).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, &CONTENT_LENGTH), "0");
}

#[tokio::test]
async fn test_stale_if_range_serves_full_body() {
    let fx = fixture(|c| c);
    let res = send(
        &fx,
        Method::GET,
        "/subdir/garble.txt",
        &[(RANGE, "bytes=0-9"), (IF_RANGE, "\"stale\"")],
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, &CONTENT_LENGTH), "1028");
}

#[tokio::test]
async fn test_directory_without_index_and_listing_off_is_not_found() {
    let fx = fixture(|c| c);
    let res = send(&fx, Method::GET, "/subdir/", &[]).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(!res.headers().contains_key(ETAG));
}

#[tokio::test]
async fn test_directory_listing() {
    let fx = fixture(|c| c.with_listing(true));
    let res = send(&fx, Method::GET, "/subdir/", &[]).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(header(&res, &CONTENT_TYPE).starts_with("text/html"));
    assert_eq!(header(&res, &CACHE_CONTROL), "no-cache");
    assert!(!res.headers().contains_key(ETAG));

    let page = String::from_utf8(body(res).await).unwrap();
    assert!(page.contains("<a href=\"/subdir/garble.txt\">garble.txt</a>"));
    assert!(page.contains("<a href=\"/\">..</a>"));
}

#[tokio::test]
async fn test_head_matches_get_headers_without_body() {
    let fx = fixture(|c| c);
    let get = send(&fx, Method::GET, "/index.html", &[]).await;
    let head = send(&fx, Method::HEAD, "/index.html", &[]).await;

    assert_eq!(head.status(), StatusCode::OK);
    for name in [CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED, CACHE_CONTROL] {
        assert_eq!(get.headers().get(&name), head.headers().get(&name), "{name}");
    }
    assert!(body(head).await.is_empty());
}

#[tokio::test]
async fn test_head_ignores_range() {
    let fx = fixture(|c| c);
    let res = send(&fx, Method::HEAD, "/subdir/garble.txt", &[(RANGE, "bytes=0-9")]).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, &CONTENT_LENGTH), "1028");
    assert!(!res.headers().contains_key(CONTENT_RANGE));
}

#[tokio::test]
async fn test_matching_if_none_match_is_not_modified() {
    let fx = fixture(|c| c);
    let first = send(&fx, Method::GET, "/index.html", &[]).await;
    let etag = header(&first, &ETAG).to_string();

    let res = send(&fx, Method::GET, "/index.html", &[(IF_NONE_MATCH, &etag)]).await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header(&res, &ETAG), etag);
    assert!(body(res).await.is_empty());
}

#[tokio::test]
async fn test_if_modified_since_last_modified_is_not_modified() {
    let fx = fixture(|c| c);
    let first = send(&fx, Method::GET, "/index.html", &[]).await;
    let last_modified = header(&first, &LAST_MODIFIED).to_string();

    let res = send(&fx, Method::GET, "/index.html", &[(IF_MODIFIED_SINCE, &last_modified)]).await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_failed_if_match_is_precondition_failed() {
    let fx = fixture(|c| c);
    let res = send(&fx, Method::GET, "/index.html", &[(IF_MATCH, "\"nope\"")]).await;

    assert_eq!(res.status(), StatusCode::PRECONDITION_FAILED);
    assert!(res.headers().contains_key(ETAG));
    assert!(body(res).await.is_empty());
}

#[tokio::test]
async fn test_other_methods_are_not_allowed() {
    let fx = fixture(|c| c);
    for method in [Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS] {
        let res = send(&fx, method.clone(), "/index.html", &[]).await;
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(header(&res, &ALLOW), "GET, HEAD");
        assert!(body(res).await.is_empty());
    }
}

#[tokio::test]
async fn test_missing_file_names_path() {
    let fx = fixture(|c| c);
    let res = send(&fx, Method::GET, "/nope%20here.txt", &[]).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(header(&res, &CACHE_CONTROL), "no-cache");
    let page = String::from_utf8(body(res).await).unwrap();
    assert_eq!(page, "<em><code>/nope here.txt</code></em> not found");
}

#[tokio::test]
async fn test_traversal_is_not_found() {
    let fx = fixture(|c| c);
    for path in ["/../Cargo.toml", "/subdir/../../etc/passwd", "/%2e%2e/%2e%2e/etc/passwd"] {
        let res = send(&fx, Method::GET, path, &[]).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn test_dotfiles_follow_policy() {
    let allow = fixture(|c| c);
    let res = send(&allow, Method::GET, "/.secret", &[]).await;
    assert_eq!(res.status(), StatusCode::OK);

    let deny = fixture(|c| c.with_dotfiles(DotfilePolicy::Deny));
    let res = send(&deny, Method::GET, "/.secret", &[]).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_custom_not_found_page() {
    let fx = fixture(|c| c.with_custom_404(true));
    std::fs::write(fx.handler.config().root.join("404.html"), "<h1>gone</h1>").unwrap();

    let res = send(&fx, Method::GET, "/missing", &[]).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(res).await, b"<h1>gone</h1>".to_vec());
}

#[tokio::test]
async fn test_gzip_when_accepted() {
    let fx = fixture(|c| c.with_compression(true));
    let res = send(&fx, Method::GET, "/subdir/garble.txt", &[(ACCEPT_ENCODING, "gzip, br")]).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(header(&res, &CONTENT_ENCODING), "gzip");
    assert_eq!(header(&res, &VARY), "Accept-Encoding");
    assert!(header(&res, &ETAG).starts_with("W/"));
    assert!(!res.headers().contains_key(CONTENT_LENGTH));

    let encoded = body(res).await;
    assert_eq!(&encoded[..2], &[0x1f, 0x8b]);
}

#[tokio::test]
async fn test_no_gzip_without_accept_encoding_or_for_ranges() {
    let fx = fixture(|c| c.with_compression(true));

    let plain = send(&fx, Method::GET, "/subdir/garble.txt", &[]).await;
    assert!(!plain.headers().contains_key(CONTENT_ENCODING));
    assert_eq!(header(&plain, &VARY), "Accept-Encoding");
    assert_eq!(header(&plain, &CONTENT_LENGTH), "1028");

    let ranged = send(
        &fx,
        Method::GET,
        "/subdir/garble.txt",
        &[(ACCEPT_ENCODING, "gzip"), (RANGE, "bytes=0-9")],
    )
    .await;
    assert_eq!(ranged.status(), StatusCode::PARTIAL_CONTENT);
    assert!(!ranged.headers().contains_key(CONTENT_ENCODING));

    // Below the size threshold
    let small = send(&fx, Method::GET, "/index.html", &[(ACCEPT_ENCODING, "gzip")]).await;
    assert!(!small.headers().contains_key(CONTENT_ENCODING));
}

#[tokio::test]
async fn test_not_modified_repeats_vary_for_compressible_files() {
    let fx = fixture(|c| c.with_compression(true));
    let first = send(&fx, Method::GET, "/subdir/garble.txt", &[]).await;
    let etag = header(&first, &ETAG).to_string();

    let res = send(&fx, Method::GET, "/subdir/garble.txt", &[(IF_NONE_MATCH, &etag)]).await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header(&res, &VARY), "Accept-Encoding");
}

#[cfg(unix)]
#[tokio::test]
async fn test_io_failure_is_internal_error_with_clean_headers() {
    let fx = fixture(|c| c);
    let root = fx.handler.config().root.clone();
    std::os::unix::fs::symlink(root.join("loop"), root.join("loop")).unwrap();

    let res = send(&fx, Method::GET, "/loop", &[(RANGE, "bytes=0-9")]).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header(&res, &CACHE_CONTROL), "no-cache");
    assert_eq!(header(&res, &CONTENT_TYPE), "text/plain; charset=utf-8");
    assert!(!res.headers().contains_key(ETAG));
    assert!(!res.headers().contains_key(LAST_MODIFIED));
    assert!(!res.headers().contains_key(CONTENT_RANGE));
    assert_eq!(body(res).await, b"Internal Server Error".to_vec());
}
