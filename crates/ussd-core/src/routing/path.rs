//! Screen path helpers

use std::collections::HashMap;

/// Prefix marking a parameter segment, e.g. `:idx`.
pub const PARAM_PREFIX: char = ':';

/// Split a path into its `/`-delimited segments, ignoring one leading `/`.
/// The root path `/` is a single empty segment; an empty path has none.
pub fn segments(path: &str) -> Vec<&str> {
    let path = path.trim();
    if path.is_empty() {
        return Vec::new();
    }
    let path = path.strip_prefix('/').unwrap_or(path);
    path.split('/').collect()
}

/// Whether a pattern contains at least one parameter segment.
pub fn is_parametrized(pattern: &str) -> bool {
    segments(pattern)
        .iter()
        .any(|segment| segment.starts_with(PARAM_PREFIX))
}

/// Match `path` against a parametrized `pattern`.
///
/// Both must have the same number of segments and every literal segment must
/// be byte-identical. Parameter segments bind to the path segment in the
/// same position.
pub fn match_params(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_segments = segments(pattern);
    let path_segments = segments(path);
    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (want, got) in pattern_segments.iter().zip(path_segments.iter()) {
        if let Some(name) = want.strip_prefix(PARAM_PREFIX) {
            params.insert(name.to_string(), got.to_string());
        } else if want != got {
            return None;
        }
    }
    Some(params)
}

/// Normalize a group prefix: leading `/`, no trailing `/`, and `""` for root.
pub fn clean_prefix(prefix: &str) -> String {
    let prefix = prefix.trim();
    if prefix.is_empty() || prefix == "/" {
        return String::new();
    }
    let mut cleaned = if prefix.starts_with('/') {
        prefix.to_string()
    } else {
        format!("/{}", prefix)
    };
    while cleaned.len() > 1 && cleaned.ends_with('/') {
        cleaned.pop();
    }
    cleaned
}

/// Join a cleaned prefix and a path with exactly one `/` between them.
pub fn join(prefix: &str, path: &str) -> String {
    let path = clean_prefix(path);
    if prefix.is_empty() {
        return if path.is_empty() { "/".to_string() } else { path };
    }
    format!("{}{}", prefix.trim_end_matches('/'), path)
}
