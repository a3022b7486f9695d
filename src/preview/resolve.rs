//! Pure path resolution for references found in HTML, CSS and JS.
//!
//! Nothing here touches the file tree: callers resolve first, then look the
//! result up in the [`FileIndex`](crate::vfs::FileIndex).

use once_cell::sync::Lazy;
use regex::Regex;

static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// Resolves `reference` against the path of the file that contains it.
///
/// - A reference starting with `/` is already absolute and is returned as is.
/// - A reference with a URL scheme (`https:`, `data:`, `blob:` ...) is
///   returned as is; callers must skip local lookup for it.
/// - Anything else is applied segment by segment to the directory of
///   `base`: the last segment of `base` is dropped when it looks like a file
///   name (contains a `.`), `..` pops, `.` is ignored.
///
/// # Examples
///
/// - `resolve_path("/a/b/c.css", "./d.css")` → `"/a/b/d.css"`
/// - `resolve_path("/a/b/c.css", "../d.css")` → `"/a/d.css"`
/// - `resolve_path("/a/b/c.css", "/x/y.css")` → `"/x/y.css"`
pub fn resolve_path(base: &str, reference: &str) -> String {
    if reference.starts_with('/') || has_scheme(reference) {
        return reference.to_string();
    }
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    if segments.last().map_or(false, |last| last.contains('.')) {
        segments.pop();
    }
    join_segments(segments, reference)
}

/// Resolves `reference` found inside the file at `file_path`. The file's
/// last segment is always dropped, so extensionless files (`./lib`) and
/// folders with dots in their names (`v1.2/`) both resolve correctly.
///
/// - `resolve_from_file("/site/lib", "./b.js")` → `"/site/b.js"`
/// - `resolve_from_file("/site/v1.2/a.css", "b.css")` → `"/site/v1.2/b.css"`
pub fn resolve_from_file(file_path: &str, reference: &str) -> String {
    if reference.starts_with('/') || has_scheme(reference) {
        return reference.to_string();
    }
    let mut segments: Vec<&str> = file_path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    join_segments(segments, reference)
}

fn join_segments<'a>(mut segments: Vec<&'a str>, reference: &'a str) -> String {
    for part in reference.split('/').filter(|s| !s.is_empty()) {
        match part {
            ".." => {
                segments.pop();
            }
            "." => {}
            _ => segments.push(part),
        }
    }
    format!("/{}", segments.join("/"))
}

pub fn has_scheme(reference: &str) -> bool {
    SCHEME.is_match(reference)
}

/// True for references that point outside the file tree: anything with a
/// URL scheme and protocol-relative `//host/...` URLs.
pub fn is_external(reference: &str) -> bool {
    has_scheme(reference) || reference.starts_with("//")
}

/// A JS module specifier that names a package rather than a file.
pub fn is_bare_specifier(specifier: &str) -> bool {
    !specifier.starts_with('.') && !specifier.starts_with('/') && !has_scheme(specifier)
}

/// Drops a `?query` or `#fragment` suffix before looking a reference up.
pub fn strip_query(reference: &str) -> &str {
    match reference.find(|c| c == '?' || c == '#') {
        Some(pos) => &reference[..pos],
        None => reference,
    }
}

/// Directory part of an absolute path; `/` for top-level entries.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(pos) => &path[..pos],
    }
}
