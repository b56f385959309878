use std::time::Duration;

/// Cache hints carried inside a query's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheParameters {
    pub cache_key: String,
    /// Absolute expiration relative to the moment the result is stored
    pub ttl: Duration,
    /// Suffix distinguishing materializations of one tagged query (list, count, page...)
    pub modifier: Option<String>,
}

impl CacheParameters {
    pub fn new(cache_key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache_key: cache_key.into(),
            ttl,
            modifier: None,
        }
    }

    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = Some(modifier.into());
        self
    }

    /// The key the result is stored under: cache key followed by the modifier
    pub fn effective_key(&self) -> String {
        match &self.modifier {
            Some(modifier) => format!("{}{}", self.cache_key, modifier),
            None => self.cache_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_key_without_modifier() {
        let params = CacheParameters::new("blogs:", Duration::from_secs(10));
        assert_eq!(params.effective_key(), "blogs:");
    }

    #[test]
    fn test_effective_key_appends_modifier() {
        let params = CacheParameters::new("blogs:", Duration::from_secs(10)).with_modifier("count");
        assert_eq!(params.effective_key(), "blogs:count");
    }
}
