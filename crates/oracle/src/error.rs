//! Oracle error type.

/// Failure talking to a geocoding or analysis backend.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Transport-level failure: connection refused, timeout, non-2xx.
    #[error("oracle fetch failed: {message}")]
    Fetch { message: String },

    /// The backend answered, but not in the shape we expect.
    #[error("oracle returned an invalid response: {message}")]
    Decode { message: String },

    /// The adapter itself is misconfigured (bad URL, missing key).
    #[error("oracle configuration error: {message}")]
    Config { message: String },
}

impl OracleError {
    pub fn fetch(message: impl Into<String>) -> Self {
        OracleError::Fetch {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        OracleError::Decode {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        OracleError::Config {
            message: message.into(),
        }
    }
}
