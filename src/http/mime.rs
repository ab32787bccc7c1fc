//! MIME type detection module
//!
//! Returns the corresponding Content-Type based on file extension, with a
//! UTF-8 charset for textual types.

use std::path::Path;

/// Content type for generated HTML (listings, error pages)
pub const HTML: &str = "text/html; charset=utf-8";

/// Get MIME Content-Type for a path
///
/// # Examples
/// ```
/// use serv::http::mime::get_content_type;
/// assert_eq!(get_content_type("index.html".as_ref()), "text/html; charset=utf-8");
/// assert_eq!(get_content_type("clip.mp4".as_ref()), "video/mp4");
/// assert_eq!(get_content_type("blob".as_ref()), "application/octet-stream");
/// ```
pub fn get_content_type(path: &Path) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if needs_charset(&mime) {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    }
}

fn needs_charset(mime: &mime_guess::Mime) -> bool {
    mime.type_() == "text"
        || matches!(
            mime.essence_str(),
            "application/javascript" | "application/json" | "application/manifest+json"
        )
}

/// Check if a MIME type is worth compressing (text-based or common web formats)
pub fn is_compressible(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();

    if essence.starts_with("text/") {
        return true;
    }

    matches!(
        essence,
        "application/json"
            | "application/javascript"
            | "application/x-javascript"
            | "application/xml"
            | "application/xhtml+xml"
            | "application/rss+xml"
            | "application/atom+xml"
            | "application/manifest+json"
            | "application/wasm"
            | "image/svg+xml"
    )
}
