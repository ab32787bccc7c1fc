//! HTTP Range request parsing module
//!
//! Range header parsing for resumable downloads, compliant with RFC 7233.
//! Only the `bytes` unit is understood and one range is served per response.

/// A satisfiable byte range, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start byte position
    pub start: u64,
    /// End byte position, always `< file_size`
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the range
    #[inline]
    pub const fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for this range
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{file_size}", self.start, self.end)
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Serve this part with 206
    Valid(ByteRange),
    /// Malformed, wrong unit, or out of bounds - should return 416
    NotSatisfiable,
    /// No Range header, or an empty file: serve everything with 200
    None,
}

/// `Content-Range` value for a 416 response
pub fn unsatisfied_range(file_size: u64) -> String {
    format!("bytes */{file_size}")
}

/// Parse HTTP Range header
///
/// Supported forms, comma separated:
/// - `bytes=start-end` - Specific range, `end` clamped to the last byte
/// - `bytes=start-` - From start to end of file
/// - `bytes=-suffix` - Last suffix bytes
///
/// When several ranges are listed, the first satisfiable one wins.
///
/// # Examples
/// ```
/// use serv::http::range::{parse_range_header, ByteRange, RangeParseResult};
///
/// let result = parse_range_header(Some("bytes=540-761"), 1028);
/// assert_eq!(result, RangeParseResult::Valid(ByteRange { start: 540, end: 761 }));
///
/// let result = parse_range_header(Some("bytes=761-540"), 1028);
/// assert_eq!(result, RangeParseResult::NotSatisfiable);
///
/// assert_eq!(parse_range_header(None, 1028), RangeParseResult::None);
/// ```
pub fn parse_range_header(range_header: Option<&str>, file_size: u64) -> RangeParseResult {
    let Some(header) = range_header else {
        return RangeParseResult::None;
    };

    if file_size == 0 {
        return RangeParseResult::None;
    }

    let Some((unit, ranges)) = header.trim().split_once('=') else {
        return RangeParseResult::NotSatisfiable;
    };

    if unit.trim() != "bytes" {
        return RangeParseResult::NotSatisfiable;
    }

    ranges
        .split(',')
        .find_map(|spec| parse_range_spec(spec.trim(), file_size))
        .map_or(RangeParseResult::NotSatisfiable, RangeParseResult::Valid)
}

/// Parse one `first-last` element, `None` if malformed or unsatisfiable
fn parse_range_spec(spec: &str, file_size: u64) -> Option<ByteRange> {
    let (start_str, end_str) = spec.split_once('-')?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());
    let last = file_size - 1;

    // Suffix range: "-500" means last 500 bytes
    if start_str.is_empty() {
        let suffix = parse_offset(end_str)?;
        if suffix == 0 {
            return None;
        }
        return Some(ByteRange {
            start: file_size.saturating_sub(suffix),
            end: last,
        });
    }

    let start = parse_offset(start_str)?;
    let end = if end_str.is_empty() {
        last
    } else {
        parse_offset(end_str)?.min(last)
    };

    // Covers start beyond the file too, since end <= last
    if start > end {
        return None;
    }

    Some(ByteRange { start, end })
}

/// Decimal byte offset; values past `u64::MAX` saturate
fn parse_offset(digits: &str) -> Option<u64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}
