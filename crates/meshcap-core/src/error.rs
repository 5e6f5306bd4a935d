//! Platform error type.
//!
//! Component crates define their own error enums and convert into this type
//! at the boundary where results cross crates.

/// Top-level error for meshcap components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error at {location}: {message}")]
    Parse { location: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = Error::Parse {
            location: "rules".to_string(),
            message: "unexpected token".to_string(),
        };
        assert_eq!(err.to_string(), "Parse error at rules: unexpected token");
    }

    #[test]
    fn test_validation_error_display() {
        let err = Error::Validation("empty ruleset name".to_string());
        assert!(err.to_string().contains("empty ruleset name"));
    }
}
