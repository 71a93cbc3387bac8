//! Error types for exchcal.

use thiserror::Error;

/// Errors that can occur while configuring, authenticating or talking to the calendar.
#[derive(Error, Debug)]
pub enum ExchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Netrc error: {0}")]
    Netrc(String),

    #[error("Invalid regex for class '{label}': {source}")]
    Regex {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("Token error: {0}")]
    Token(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("OAuth state mismatch: the redirect does not belong to this login attempt")]
    StateMismatch,

    #[error("Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Time error: {0}")]
    Time(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ExchError {
    fn from(e: serde_json::Error) -> Self {
        ExchError::Serialization(e.to_string())
    }
}

impl From<config::ConfigError> for ExchError {
    fn from(e: config::ConfigError) -> Self {
        ExchError::Config(e.to_string())
    }
}

/// Result type alias for exchcal operations.
pub type ExchResult<T> = Result<T, ExchError>;
