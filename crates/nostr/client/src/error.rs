//! Client error types

use thiserror::Error;

/// Client error type
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Event publish failed
    #[error("Event publish failed: {0}")]
    PublishFailed(String),
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;
