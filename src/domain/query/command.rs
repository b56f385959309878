use std::time::Duration;

use super::metadata;
use super::parameters::CacheParameters;
use super::value::DbValue;

/// A query command: SQL text plus positional parameters
///
/// The text may carry cache annotations; see [`Command::cacheable`].
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    text: String,
    params: Vec<DbValue>,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Binds the next positional parameter
    pub fn bind(mut self, value: impl Into<DbValue>) -> Self {
        self.params.push(value.into());
        self
    }

    /// Tags the command so its result is cached under `cache_key` for `ttl`
    ///
    /// Parameter values are not part of the key; put them in `cache_key`
    /// when they change the result.
    pub fn cacheable(mut self, cache_key: &str, ttl: Duration) -> Self {
        self.text = format!("{}\n{}", metadata::encode(cache_key, ttl), self.text);
        self
    }

    /// Adds a key suffix so this materialization gets its own entry
    pub fn with_modifier(mut self, suffix: &str) -> Self {
        self.text = format!("{}\n{}", metadata::encode_modifier(suffix), self.text);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[DbValue] {
        &self.params
    }

    /// Cache hints decoded from the text, if any
    pub fn cache_parameters(&self) -> Option<CacheParameters> {
        metadata::decode(&self.text)
    }

    /// The text without cache annotations
    pub fn statement(&self) -> String {
        metadata::strip(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command_has_no_cache_parameters() {
        let command = Command::new("SELECT * FROM blogs").bind(1);

        assert!(command.cache_parameters().is_none());
        assert_eq!(command.params(), &[DbValue::Int(1)]);
    }

    #[test]
    fn test_cacheable_command() {
        let command = Command::new("SELECT * FROM blogs")
            .cacheable("blogs:", Duration::from_secs(10))
            .with_modifier("list");

        let params = command.cache_parameters().unwrap();
        assert_eq!(params.effective_key(), "blogs:list");
        assert_eq!(params.ttl, Duration::from_secs(10));
        assert_eq!(command.statement(), "SELECT * FROM blogs");
    }
}
