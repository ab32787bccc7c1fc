// Connection handling module
// Serves requests on accepted connections and writes the access log

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::header::{CONTENT_LENGTH, REFERER, USER_AGENT};
use hyper::service::service_fn;
use hyper::{Request, Response, Version};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::handler::StaticHandler;
use crate::http::ResponseBody;
use crate::logger::{self, AccessLogEntry};

/// Per-request options shared by every connection
#[derive(Debug, Clone)]
pub struct AccessLogOptions {
    pub enabled: bool,
    /// dev, combined, common, json or a custom pattern
    pub format: String,
}

impl Default for AccessLogOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            format: "dev".to_string(),
        }
    }
}

/// HTTP/1.1 only, or HTTP/1.1 and HTTP/2 negotiated per connection
pub fn builder(http2: bool) -> auto::Builder<TokioExecutor> {
    let builder = auto::Builder::new(TokioExecutor::new());
    if http2 {
        builder
    } else {
        builder.http1_only()
    }
}

/// Serve one connection in a spawned task, tracked by `graceful`
pub fn spawn_connection<I>(
    io: I,
    peer_addr: SocketAddr,
    builder: &auto::Builder<TokioExecutor>,
    graceful: &GracefulShutdown,
    handler: StaticHandler,
    access_log: Arc<AccessLogOptions>,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req: Request<Incoming>| {
        let handler = handler.clone();
        let access_log = Arc::clone(&access_log);
        async move {
            Ok::<_, Infallible>(serve_request(req, &handler, &access_log, peer_addr).await)
        }
    });

    let conn = builder
        .serve_connection(TokioIo::new(io), service)
        .into_owned();
    let conn = graceful.watch(conn);

    tokio::spawn(async move {
        if let Err(err) = conn.await {
            logger::log_connection_error(&peer_addr, &err);
        }
    });
}

/// Run the handler for one request and record it in the access log
///
/// The request body is dropped unread.
pub async fn serve_request<B>(
    req: Request<B>,
    handler: &StaticHandler,
    access_log: &AccessLogOptions,
    peer_addr: SocketAddr,
) -> Response<ResponseBody> {
    let (parts, _) = req.into_parts();
    let req = Request::from_parts(parts, ());

    if !access_log.enabled {
        return handler.handle(&req).await;
    }

    let started = Instant::now();
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(str::to_string);
    entry.http_version = version_str(req.version()).to_string();
    entry.referer = header_string(&req, &REFERER);
    entry.user_agent = header_string(&req, &USER_AGENT);

    logger::log_request(
        &entry.request_id,
        &entry.method,
        &req.uri().to_string(),
        &access_log.format,
    );

    let response = handler.handle(&req).await;

    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    logger::log_access(&entry, &access_log.format);

    let request_id = entry.request_id;
    response.map(move |body| {
        body.map_err(move |err| {
            logger::log_body_error(&request_id, &err);
            err
        })
        .boxed_unsync()
    })
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

fn header_string(req: &Request<()>, name: &hyper::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
