// Server loop module
// Accepts connections until shutdown, then drains in-flight requests

use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;

use super::connection::{self, AccessLogOptions};
use crate::handler::StaticHandler;
use crate::logger;

/// Upper bound on waiting for open connections after shutdown starts
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a TLS handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport options for the server loop
#[derive(Clone, Default)]
pub struct ServeOptions {
    /// Offer HTTP/2 next to HTTP/1.1
    pub http2: bool,
    /// Terminate TLS on accepted connections
    pub tls: Option<TlsAcceptor>,
    pub access_log: AccessLogOptions,
}

/// Accept connections on `listener` until `shutdown` resolves
///
/// Each connection is served on its own task. After shutdown the listener
/// is closed and open connections get [`SHUTDOWN_TIMEOUT`] to finish.
pub async fn run<F>(
    listener: TcpListener,
    handler: StaticHandler,
    options: ServeOptions,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let builder = connection::builder(options.http2);
    let graceful = GracefulShutdown::new();
    let access_log = Arc::new(options.access_log);

    // TLS handshakes run off the accept loop and hand finished streams back
    let (tls_tx, mut tls_rx) = mpsc::unbounded_channel::<(TlsStream<TcpStream>, SocketAddr)>();

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {e}");
                        continue;
                    }
                };
                tracing::trace!(%peer_addr, "connection accepted");

                match options.tls {
                    Some(ref acceptor) => {
                        spawn_handshake(acceptor.clone(), stream, peer_addr, tls_tx.clone());
                    }
                    None => connection::spawn_connection(
                        stream,
                        peer_addr,
                        &builder,
                        &graceful,
                        handler.clone(),
                        Arc::clone(&access_log),
                    ),
                }
            }

            Some((stream, peer_addr)) = tls_rx.recv() => {
                connection::spawn_connection(
                    stream,
                    peer_addr,
                    &builder,
                    &graceful,
                    handler.clone(),
                    Arc::clone(&access_log),
                );
            }

            () = &mut shutdown => break,
        }
    }

    drop(listener);

    tokio::select! {
        () = graceful.shutdown() => logger::log_shutdown_complete(true),
        () = tokio::time::sleep(SHUTDOWN_TIMEOUT) => logger::log_shutdown_complete(false),
    }

    Ok(())
}

fn spawn_handshake(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    peer_addr: SocketAddr,
    done: mpsc::UnboundedSender<(TlsStream<TcpStream>, SocketAddr)>,
) {
    tokio::spawn(async move {
        match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
            Ok(Ok(tls_stream)) => {
                // The loop is gone once shutdown started; the stream is dropped
                let _ = done.send((tls_stream, peer_addr));
            }
            Ok(Err(e)) => tracing::debug!(%peer_addr, "TLS handshake failed: {e}"),
            Err(_) => tracing::debug!(%peer_addr, "TLS handshake timed out"),
        }
    });
}
