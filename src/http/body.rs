//! Response body types
//!
//! Every response carries a [`ResponseBody`]: small generated pages are
//! buffered, files are streamed from disk in chunks so memory stays flat
//! regardless of file size.

use futures_util::TryStreamExt;
use http_body_util::{combinators::UnsyncBoxBody, BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::range::ByteRange;

/// Boxed body shared by every response the server produces
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

/// Read buffer size for streamed files
const CHUNK_SIZE: usize = 64 * 1024;

/// Body with no content
pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Fully buffered body
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Stream any async reader as a body
///
/// The reader is dropped, and with it the file descriptor, as soon as the
/// body is dropped, which hyper does when the client disconnects.
pub fn from_reader<R>(reader: R) -> ResponseBody
where
    R: AsyncRead + Send + 'static,
{
    let stream = ReaderStream::with_capacity(reader, CHUNK_SIZE).map_ok(Frame::data);
    StreamBody::new(stream).boxed_unsync()
}

/// Stream `range` (or the whole file) from an open file
pub async fn file_stream(
    mut file: tokio::fs::File,
    range: Option<ByteRange>,
) -> io::Result<ResponseBody> {
    match range {
        Some(range) => {
            file.seek(io::SeekFrom::Start(range.start)).await?;
            Ok(from_reader(file.take(range.content_length())))
        }
        None => Ok(from_reader(file)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect(body: ResponseBody) -> Bytes {
        body.collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_buffered_bodies() {
        assert!(collect(empty()).await.is_empty());
        assert_eq!(collect(full("hello")).await, Bytes::from("hello"));
    }

    #[tokio::test]
    async fn test_file_stream_range() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();

        let file = tokio::fs::File::open(tmp.path()).await.unwrap();
        let body = file_stream(file, Some(ByteRange { start: 2, end: 5 }))
            .await
            .unwrap();
        assert_eq!(collect(body).await, Bytes::from("2345"));

        let file = tokio::fs::File::open(tmp.path()).await.unwrap();
        let body = file_stream(file, None).await.unwrap();
        assert_eq!(collect(body).await, Bytes::from("0123456789"));
    }
}
