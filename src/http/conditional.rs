//! Conditional request evaluation module
//!
//! Decides between 412 Precondition Failed, 304 Not Modified and a normal
//! response from the `If-*` request headers and the file's validators.
//! Preconditions (`If-Match`, `If-Unmodified-Since`) are evaluated before
//! freshness (`If-None-Match`, `If-Modified-Since`), as RFC 7232 section 6
//! orders them.

use hyper::header::{
    HeaderMap, HeaderName, CACHE_CONTROL, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE,
    IF_UNMODIFIED_SINCE,
};
use std::time::SystemTime;

use super::cache::Validators;

/// Outcome of conditional evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Client copy is current: answer 304 with no body
    Fresh,
    /// A precondition does not hold: answer 412 with no body
    PreconditionFailed,
    /// Serve the representation
    Proceed,
}

/// Evaluate the conditional headers of a GET/HEAD request
pub fn evaluate(headers: &HeaderMap, validators: &Validators) -> Condition {
    if is_precondition_failure(headers, validators) {
        return Condition::PreconditionFailed;
    }

    if is_fresh(headers, validators) {
        return Condition::Fresh;
    }

    Condition::Proceed
}

/// `If-Match`, or failing that `If-Unmodified-Since`
fn is_precondition_failure(headers: &HeaderMap, validators: &Validators) -> bool {
    if let Some(if_match) = header_str(headers, &IF_MATCH) {
        if if_match.trim() == "*" {
            return false;
        }
        return !parse_token_list(if_match)
            .iter()
            .any(|tag| etags_match(tag, &validators.etag));
    }

    // Unparseable dates are ignored
    if let Some(since) = header_date(headers, &IF_UNMODIFIED_SINCE) {
        return validators
            .last_modified
            .is_none_or(|modified| modified > since);
    }

    false
}

/// `If-None-Match`, or when absent `If-Modified-Since`
fn is_fresh(headers: &HeaderMap, validators: &Validators) -> bool {
    let if_none_match = header_str(headers, &IF_NONE_MATCH);
    let if_modified_since = header_str(headers, &IF_MODIFIED_SINCE);

    if if_none_match.is_none() && if_modified_since.is_none() {
        return false;
    }

    // End-to-end reload requested by the client
    if has_no_cache(headers) {
        return false;
    }

    if let Some(if_none_match) = if_none_match {
        if if_none_match.trim() == "*" {
            return true;
        }
        return parse_token_list(if_none_match)
            .iter()
            .any(|tag| etags_match(tag, &validators.etag));
    }

    match (
        if_modified_since.and_then(|v| httpdate::parse_http_date(v).ok()),
        validators.last_modified,
    ) {
        (Some(since), Some(modified)) => modified <= since,
        _ => false,
    }
}

/// Whether a `Range` header may be honoured given `If-Range`
///
/// An entity tag must match exactly (strong comparison); a date must not be
/// older than the file's modification time. Without `If-Range` ranges
/// always apply.
pub fn if_range_allows(headers: &HeaderMap, validators: &Validators) -> bool {
    let Some(if_range) = header_str(headers, &IF_RANGE) else {
        return true;
    };

    if if_range.contains('"') {
        return !if_range.trim_start().starts_with("W/") && if_range.trim() == validators.etag;
    }

    match (
        httpdate::parse_http_date(if_range).ok(),
        validators.last_modified,
    ) {
        (Some(date), Some(modified)) => modified <= date,
        _ => false,
    }
}

/// Parse an HTTP token list
///
/// Splits on `,`, drops spaces around each element and keeps empty
/// elements, so `"a,,b"` yields `["a", "", "b"]` and `""` yields `[""]`.
pub fn parse_token_list(value: &str) -> Vec<&str> {
    let mut list = Vec::new();
    let mut start = 0;
    let mut end = 0;

    for (i, byte) in value.bytes().enumerate() {
        match byte {
            b' ' => {
                if start == end {
                    start = i + 1;
                    end = i + 1;
                }
            }
            b',' => {
                list.push(&value[start..end]);
                start = i + 1;
                end = i + 1;
            }
            _ => end = i + 1,
        }
    }

    list.push(&value[start..end]);
    list
}

/// Entity tag comparison where `W/"x"` and `"x"` are equivalent
fn etags_match(candidate: &str, etag: &str) -> bool {
    let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    !candidate.is_empty() && candidate == etag
}

fn has_no_cache(headers: &HeaderMap) -> bool {
    header_str(headers, &CACHE_CONTROL).is_some_and(|value| {
        parse_token_list(value)
            .iter()
            .any(|directive| directive.eq_ignore_ascii_case("no-cache"))
    })
}

/// Non-empty header value as text
fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
}

fn header_date(headers: &HeaderMap, name: &HeaderName) -> Option<SystemTime> {
    header_str(headers, name).and_then(|v| httpdate::parse_http_date(v).ok())
}
