//! Directory listing module
//!
//! Renders a minimal HTML index of a directory. Links are absolute so the
//! page works whether or not the request path ended in `/`.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::fmt::Write as _;
use std::io;
use std::path::Path;

use crate::config::DotfilePolicy;
use crate::http::response::escape_html;

/// Characters escaped in a single href path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'%')
    .add(b'/')
    .add(b'\'');

struct Entry {
    name: String,
    is_dir: bool,
}

/// Render the listing page for `dir`, requested as `url_path`
///
/// Entries are sorted by name. Entries that vanish or cannot be stat'ed
/// while reading are skipped; failing to open the directory is an error.
pub async fn render(url_path: &str, dir: &Path, dotfiles: DotfilePolicy) -> io::Result<String> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if dotfiles.hides_in_listing(&name) {
            continue;
        }
        // Follows symlinks so linked directories render as directories
        let Ok(meta) = tokio::fs::metadata(entry.path()).await else {
            continue;
        };
        entries.push(Entry {
            name,
            is_dir: meta.is_dir(),
        });
    }

    entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

    Ok(render_page(url_path, &entries))
}

fn render_page(url_path: &str, entries: &[Entry]) -> String {
    let base = if url_path.ends_with('/') {
        url_path.to_string()
    } else {
        format!("{url_path}/")
    };
    let base_href = encode_path(&base);
    let title = escape_html(&base);

    let mut html = String::with_capacity(1024 + entries.len() * 64);
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Index of {title}</title>\n\
         <style>\n\
         body {{ margin: 0; padding: 16px; font-family: Menlo, Monaco, Consolas, monospace; line-height: 1.5; }}\n\
         h1 {{ margin: 0; font-size: 1.25em; }}\n\
         ul {{ list-style: none; padding-left: 1em; }}\n\
         a {{ text-decoration: none; word-wrap: break-word; }}\n\
         a:hover {{ text-decoration: underline; }}\n\
         </style>\n</head>\n<body>\n<h1>Index of {title}</h1>\n<ul>\n"
    );

    if base != "/" {
        let _ = writeln!(
            html,
            "<li><a href=\"{}\">..</a></li>",
            encode_path(&parent_of(&base))
        );
    }

    for entry in entries {
        let slash = if entry.is_dir { "/" } else { "" };
        let _ = writeln!(
            html,
            "<li><a href=\"{base_href}{}{slash}\">{}{slash}</a></li>",
            utf8_percent_encode(&entry.name, SEGMENT),
            escape_html(&entry.name),
        );
    }

    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

/// Parent of a `/`-terminated path, itself `/`-terminated
fn parent_of(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => trimmed[..=idx].to_string(),
        None => "/".to_string(),
    }
}

/// Percent-encode every segment of an absolute path
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}
