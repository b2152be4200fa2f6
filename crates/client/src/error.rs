use portal_core::DomainError;
use portal_navigation::SourceError;

/// API client error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The API answered 401. The session has already been torn down.
    #[error("unauthorized")]
    Unauthorized,
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("API error ({0}): {1}")]
    Api(u16, String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else if err.is_builder() {
            ClientError::Config(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<ClientError> for SourceError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized => SourceError::Unauthorized,
            ClientError::Timeout => SourceError::Timeout,
            ClientError::Api(status, body) => SourceError::Api(status, body),
            ClientError::Parse(msg) => SourceError::Parse(msg),
            ClientError::Network(msg) | ClientError::Config(msg) => SourceError::Network(msg),
            ClientError::Domain(err) => SourceError::Parse(err.to_string()),
        }
    }
}
