//! Dot-separated item paths.
//!
//! A path like `"bar.baz.foo"` names `foo` inside `baz` inside the root item
//! `bar`. The empty path names the root level.

use smallvec::SmallVec;

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Path segments, inline for the shallow trees navigations usually are.
pub type Segments<'a> = SmallVec<[&'a str; 4]>;

/// Splits a path into its segments. Returns `None` for the empty path or a
/// path with an empty segment (`"a..b"`, `".a"`, `"a."`).
pub fn segments(path: &str) -> Option<Segments<'_>> {
    if path.is_empty() {
        return None;
    }
    let segments: Segments<'_> = path.split(SEPARATOR).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some(segments)
}

/// Splits a path into its parent path and last segment.
///
/// The parent of a single-segment path is the root level (`""`).
pub fn split_last(path: &str) -> (&str, &str) {
    match path.rfind(SEPARATOR) {
        Some(at) => (&path[..at], &path[at + 1..]),
        None => ("", path),
    }
}

/// Joins a parent path and an item ID.
pub fn join(parent: &str, id: &str) -> String {
    if parent.is_empty() {
        id.to_string()
    } else {
        format!("{parent}{SEPARATOR}{id}")
    }
}

/// Whether `id` can be addressed by a path.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_rejects_empty_parts() {
        assert!(segments("").is_none());
        assert!(segments("a..b").is_none());
        assert!(segments(".a").is_none());
        assert!(segments("a.").is_none());
        assert_eq!(segments("a.b.c").unwrap().as_slice(), &["a", "b", "c"]);
    }

    #[test]
    fn parent_of_single_segment_is_root() {
        assert_eq!(split_last("foo"), ("", "foo"));
        assert_eq!(split_last("bar.baz.foo"), ("bar.baz", "foo"));
    }

    #[test]
    fn join_root() {
        assert_eq!(join("", "foo"), "foo");
        assert_eq!(join("bar", "foo"), "bar.foo");
    }
}
