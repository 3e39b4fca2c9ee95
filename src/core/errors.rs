use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    #[error("Other error: {0}")]
    Other(String),
}

impl ExchangeError {
    /// Per-message failures that must not tear down a streaming connection.
    /// Everything else on the stream path triggers a reconnect cycle.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::DeserializationError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigError;

    #[test]
    fn test_config_error_display_keeps_the_cause() {
        let err: ExchangeError =
            ConfigError::InvalidConfiguration("API key must not be empty".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid configuration: API key must not be empty"
        );
    }

    #[test]
    fn test_only_deserialization_is_a_decode_error() {
        assert!(ExchangeError::DeserializationError("bad frame".to_string()).is_decode_error());
        assert!(!ExchangeError::NetworkError("reset".to_string()).is_decode_error());
        assert!(!ExchangeError::ConnectionTimeout("10s".to_string()).is_decode_error());
    }
}
