//! Path classification helpers shared by the cache and timeout policies.
//!
//! Prefixes compare case-sensitively against the path. Extensions are
//! lowercased and taken from the last segment only. When several prefixes
//! match, the longest one decides.

use std::collections::HashMap;

/// Returns true if `path` starts with any of `prefixes`.
pub fn matches_any_prefix<S: AsRef<str>>(path: &str, prefixes: &[S]) -> bool {
    prefixes.iter().any(|p| path.starts_with(p.as_ref()))
}

/// Look up the value registered under the longest prefix of `path`.
pub fn longest_prefix<'a, V>(table: &'a HashMap<String, V>, path: &str) -> Option<&'a V> {
    table
        .iter()
        .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, value)| value)
}

/// Lowercased file extension of the last path segment, if any.
pub fn extension(path: &str) -> Option<String> {
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Returns true if the extension of `path` is in `extensions`.
pub fn has_extension<S: AsRef<str>>(path: &str, extensions: &[S]) -> bool {
    match extension(path) {
        Some(ext) => extensions.iter().any(|e| e.as_ref().eq_ignore_ascii_case(&ext)),
        None => false,
    }
}
