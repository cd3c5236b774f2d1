//! Error types for revalidation operations

use thiserror::Error;

/// Revalidation event errors
#[derive(Error, Debug)]
pub enum RevalidateError {
    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Message serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid message format received
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RevalidateError::InvalidMessage("bad payload".to_string());
        assert_eq!(err.to_string(), "Invalid message format: bad payload");

        let err = RevalidateError::Configuration("missing channel".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing channel");
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err: RevalidateError = json_err.into();
        assert!(matches!(err, RevalidateError::Serialization(_)));
    }
}
