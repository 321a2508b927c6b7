//! Error types for the dashboard core.

use thiserror::Error;

/// Crate error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Durable storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Live channel transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// A user name was empty.
    #[error("user name must not be empty")]
    EmptyUserName,

    /// No access token is stored.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The stored access token is past its expiration time.
    #[error("session expired at {0}")]
    SessionExpired(chrono::DateTime<chrono::Utc>),

    /// A token lifetime does not fit the calendar.
    #[error("token lifetime of {0} seconds is out of range")]
    ExpiryOutOfRange(i64),

    /// The session store was used before being provided to the application context.
    #[error("session store is not available; provide it to AppContext before use")]
    SessionStoreMissing,

    /// Live channel endpoint uses an unsupported scheme.
    #[error("unsupported channel scheme '{0}', expected ws or wss")]
    UnsupportedScheme(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

/// Result type alias for dashboard operations.
pub type Result<T> = std::result::Result<T, Error>;
