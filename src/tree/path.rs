//! Helpers for slash-separated node paths.

/// Non-empty segments of `path`; leading, trailing and doubled slashes are ignored.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Canonical form of `path`: segments joined by single slashes.
pub fn normalize(path: &str) -> String {
    segments(path).collect::<Vec<_>>().join("/")
}

pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Split a path into its parent path and terminal segment.
/// Returns None for the empty (root) path.
pub fn split_last(path: &str) -> Option<(String, String)> {
    let normalized = normalize(path);
    if normalized.is_empty() {
        return None;
    }
    match normalized.rsplit_once('/') {
        Some((parent, last)) => Some((parent.to_string(), last.to_string())),
        None => Some((String::new(), normalized)),
    }
}

/// Drop a leading `<project>/` from a path that was written relative to the
/// host rather than to the project root.
pub fn strip_project_prefix<'a>(project_name: &str, path: &'a str) -> &'a str {
    let trimmed = path.trim_start_matches('/');
    match trimmed.strip_prefix(project_name) {
        Some(rest) if rest.is_empty() => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => trimmed,
    }
}
