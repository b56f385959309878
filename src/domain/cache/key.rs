//! Cache key construction with a separator convention
//!
//! Prefix invalidation is a plain string-prefix test, so `user:1` would also
//! match `user:10`. Keys built here always close every scope segment with the
//! separator: the scope for user 1 is `user:1:` and can never be a prefix of
//! anything under `user:10:`.

use std::fmt;

/// Default segment separator
pub const DEFAULT_SEPARATOR: char = ':';

/// Builds scoped cache keys and the prefixes used to invalidate them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyBuilder {
    separator: char,
    segments: Vec<String>,
}

impl Default for CacheKeyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheKeyBuilder {
    /// Creates an empty builder using `:` as separator
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_SEPARATOR)
    }

    /// Creates an empty builder using a custom separator
    pub fn with_separator(separator: char) -> Self {
        Self {
            separator,
            segments: Vec::new(),
        }
    }

    /// Creates a builder scoped to a namespace, e.g. a table name
    pub fn namespace(namespace: impl fmt::Display) -> Self {
        Self::new().segment(namespace)
    }

    /// Appends a scope segment. Separator characters inside the segment are escaped.
    pub fn segment(mut self, segment: impl fmt::Display) -> Self {
        let raw = segment.to_string();
        let escaped = raw.replace(self.separator, &format!("\\{}", self.separator));
        self.segments.push(escaped);
        self
    }

    /// The scope prefix, always terminated by the separator
    pub fn prefix(&self) -> String {
        let mut prefix = String::new();

        for segment in &self.segments {
            prefix.push_str(segment);
            prefix.push(self.separator);
        }

        prefix
    }

    /// A full key inside this scope
    pub fn key(&self, leaf: impl fmt::Display) -> String {
        format!("{}{}", self.prefix(), leaf)
    }

    /// The scope itself used as a key (same text as [`CacheKeyBuilder::prefix`])
    pub fn build(&self) -> String {
        self.prefix()
    }

    pub fn separator(&self) -> char {
        self.separator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_separator_terminated() {
        let scope = CacheKeyBuilder::namespace("user").segment(1);
        assert_eq!(scope.prefix(), "user:1:");
    }

    #[test]
    fn test_sibling_ids_do_not_collide() {
        let one = CacheKeyBuilder::namespace("user").segment(1);
        let ten = CacheKeyBuilder::namespace("user").segment(10);

        assert!(!ten.key("profile").starts_with(&one.prefix()));
        assert!(one.key("profile").starts_with(&one.prefix()));
    }

    #[test]
    fn test_namespace_prefix_covers_all_children() {
        let users = CacheKeyBuilder::namespace("user");
        let key = CacheKeyBuilder::namespace("user").segment(42).key("orders");

        assert_eq!(key, "user:42:orders");
        assert!(key.starts_with(&users.prefix()));
    }

    #[test]
    fn test_separator_in_segment_is_escaped() {
        let scope = CacheKeyBuilder::namespace("tenant").segment("a:b");
        assert_eq!(scope.prefix(), "tenant:a\\:b:");
    }

    #[test]
    fn test_custom_separator() {
        let scope = CacheKeyBuilder::with_separator('/').segment("blogs").segment(3);
        assert_eq!(scope.key("list"), "blogs/3/list");
        assert_eq!(scope.separator(), '/');
    }

    #[test]
    fn test_empty_builder() {
        let builder = CacheKeyBuilder::new();
        assert_eq!(builder.prefix(), "");
        assert_eq!(builder.key("all"), "all");
    }
}
