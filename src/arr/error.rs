use thiserror::Error;

/// Errors talking to the media server.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authorization invalid")]
    Unauthorized,

    /// The request URL carries the API key, so it is stripped on conversion.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("{operation} failed with status {status}")]
    Status { operation: String, status: u16 },

    #[error("Invalid response for {operation}: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} is not supported by {flavor} servers")]
    Unsupported {
        operation: &'static str,
        flavor: &'static str,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Http(e.without_url())
    }
}

impl ApiError {
    /// Whether repeating the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiError::Unauthorized | ApiError::Unsupported { .. })
    }
}
