use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Cache metadata error: {message}")]
    Metadata { message: String },

    #[error("Execution error: {message}")]
    Execution { message: String },

    #[error("Cursor error: {message}")]
    Cursor { message: String },

    #[error("Cached result shape mismatch for '{key}': expected {expected}, found {found}")]
    ShapeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata {
            message: message.into(),
        }
    }

    /// Error raised by a query executor. The caching layer passes these through untouched.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    pub fn cursor(message: impl Into<String>) -> Self {
        Self::Cursor {
            message: message.into(),
        }
    }

    pub fn shape_mismatch(
        key: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Self::ShapeMismatch {
            key: key.into(),
            expected,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Column 'email' not found");
        assert_eq!(error.to_string(), "Not found: Column 'email' not found");
    }

    #[test]
    fn test_execution_error() {
        let error = DomainError::execution("deadlock detected");
        assert_eq!(error.to_string(), "Execution error: deadlock detected");
    }

    #[test]
    fn test_shape_mismatch_error() {
        let error = DomainError::shape_mismatch("blogs:list:", "rows", "scalar");
        assert_eq!(
            error.to_string(),
            "Cached result shape mismatch for 'blogs:list:': expected rows, found scalar"
        );
    }
}
