use thiserror::Error;

/// Curio errors
#[derive(Error, Debug)]
pub enum CurioError {
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Configuration Error: no API key configured")]
    MissingApiKey,

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Stream Error: {0}")]
    StreamError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    TomlError(#[from] toml::de::Error),
}

impl CurioError {
    /// Errors raised while talking to the remote API: connection failures,
    /// timeouts, non-2xx statuses and broken response bodies.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CurioError::RequestError(_)
                | CurioError::HttpError { .. }
                | CurioError::Timeout(_)
                | CurioError::StreamError(_)
                | CurioError::ReqwestError(_)
        )
    }
}

/// Result type for Curio operations
pub type CurioResult<T> = Result<T, CurioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(CurioError::Timeout(300).is_transport());
        assert!(CurioError::HttpError {
            status_code: 502,
            message: "bad gateway".to_string()
        }
        .is_transport());
        assert!(CurioError::StreamError("reset".to_string()).is_transport());
        assert!(!CurioError::MissingApiKey.is_transport());
        assert!(!CurioError::ConfigError("bad".to_string()).is_transport());
    }

    #[test]
    fn test_http_error_display() {
        let err = CurioError::HttpError {
            status_code: 401,
            message: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP Error: 401 - unauthorized");
    }
}
