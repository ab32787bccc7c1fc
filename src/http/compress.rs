//! Response compression module
//!
//! On-the-fly gzip for compressible content types. Files are compressed as
//! they stream; generated pages are compressed in memory.

use async_compression::tokio::bufread::GzipEncoder;
use hyper::body::Bytes;
use std::io;
use tokio::io::{AsyncRead, AsyncWriteExt, BufReader};

use super::mime::is_compressible;

/// Bodies smaller than this are sent as-is
pub const MIN_COMPRESS_SIZE: u64 = 1024;

/// Parse quality value from Accept-Encoding part (e.g., "gzip;q=0.5" -> 0.5)
fn parse_quality(part: &str) -> f32 {
    part.split(';')
        .skip(1)
        .find_map(|param| param.trim().strip_prefix("q="))
        .and_then(|q| q.trim().parse::<f32>().ok())
        .unwrap_or(1.0)
}

/// Whether the client accepts gzip (`gzip` or `*` with a non-zero quality)
pub fn accepts_gzip(accept_encoding: Option<&str>) -> bool {
    let Some(header) = accept_encoding else {
        return false;
    };

    let mut wildcard = None;
    for part in header.split(',') {
        let coding = part.split(';').next().unwrap_or_default().trim();
        if coding.eq_ignore_ascii_case("gzip") || coding.eq_ignore_ascii_case("x-gzip") {
            return parse_quality(part) > 0.0;
        }
        if coding == "*" {
            wildcard = Some(parse_quality(part) > 0.0);
        }
    }

    wildcard.unwrap_or(false)
}

/// Whether a body of this type and size is worth compressing at all
///
/// Responses for which this holds vary by `Accept-Encoding`.
pub fn is_candidate(content_type: &str, size: u64) -> bool {
    size >= MIN_COMPRESS_SIZE && is_compressible(content_type)
}

/// Wrap a reader so it yields gzip output
pub fn gzip_reader<R>(reader: R) -> impl AsyncRead + Send + Unpin
where
    R: AsyncRead + Send + Unpin,
{
    GzipEncoder::new(BufReader::new(reader))
}

/// Compress a buffered body
pub async fn gzip_bytes(input: &[u8]) -> io::Result<Bytes> {
    let mut encoder = async_compression::tokio::write::GzipEncoder::new(Vec::new());
    encoder.write_all(input).await?;
    encoder.shutdown().await?;
    Ok(Bytes::from(encoder.into_inner()))
}
