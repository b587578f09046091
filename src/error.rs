//! Error types for the preview generator

use thiserror::Error;

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing a preview image
#[derive(Error, Debug)]
pub enum Error {
    /// The requested path was missing or did not start with `/`
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),

    /// The upstream site answered 404
    #[error("Upstream page not found")]
    UpstreamNotFound,

    /// The upstream site answered with something other than 200
    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    /// The upstream site answered 200 with an empty body
    #[error("Upstream returned an empty body")]
    EmptyBody,

    /// No usable `<title>` in the upstream document
    #[error("No title found")]
    NoTitle,

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Static asset could not be read
    #[error("Asset error: {0}")]
    AssetError(String),

    /// Failed to render content
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to start the browser
    #[error("Browser initialization failed: {0}")]
    InitializationError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP status reported to the caller for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidPath(_) => 400,
            Error::UpstreamNotFound => 404,
            _ => 500,
        }
    }

    /// The fixed response body. Details stay in the log.
    pub fn public_body(&self) -> &'static str {
        match self {
            Error::UpstreamNotFound => "404",
            _ => "Error",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::RenderError(err.to_string())
    }
}
