//! Error handling and custom error types
//!
//! Provides unified error handling across the adapter using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by the provider.
    #[error("Gemini API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Gemini provider error: {0}")]
    AiProvider(String),

    /// Request content that cannot be sent, such as an unparseable data URL.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a retry wrapper may attempt the call again.
    ///
    /// Network failures, rate limits and server-side errors are transient;
    /// everything else fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
