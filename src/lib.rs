//! Static file server for local development
//!
//! Serves a directory over HTTP/1.1, HTTPS and HTTP/2 with strong validators,
//! conditional requests, single byte ranges, optional directory listings and
//! on-the-fly gzip.
//!
//! The request path lives in [`handler::StaticHandler`]; [`server`] wires
//! it to sockets.

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use config::{Config, DotfilePolicy, ServerConfig};
pub use error::{Error, Result, ServeError};
pub use handler::StaticHandler;
