//! Error types for the search library.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A source's fetch failed. Terminal for the whole search.
    #[error("error getting '{url}' from {adapter}: {cause}")]
    Transport {
        /// Name of the failing adapter.
        adapter: String,
        /// URL that was requested.
        url: String,
        /// Underlying failure reported by the fetcher.
        #[source]
        cause: Box<SearchError>,
    },

    /// A source's worker panicked. Terminal for the whole search.
    #[error("worker for {adapter} panicked: {message}")]
    WorkerPanicked {
        /// Name of the adapter whose worker died.
        adapter: String,
        /// Panic description.
        message: String,
    },

    /// The search deadline elapsed before every source finished.
    #[error("timeout of {0:?} exceeded, aborting search")]
    Timeout(Duration),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected HTTP status {status} for '{url}'")]
    Status {
        /// URL that was requested.
        url: String,
        /// Status code returned.
        status: u16,
    },

    /// No adapters configured.
    #[error("No search adapters configured")]
    NoAdapters,

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// An adapter definition was rejected at construction time.
    #[error("Invalid adapter '{name}': {reason}")]
    InvalidAdapter {
        /// Adapter name as configured.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration could not be decoded.
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl SearchError {
    /// Wraps a fetcher failure as a hard error of the given adapter.
    pub fn transport(adapter: impl Into<String>, url: impl Into<String>, cause: SearchError) -> Self {
        Self::Transport {
            adapter: adapter.into(),
            url: url.into(),
            cause: Box::new(cause),
        }
    }

    /// Returns `true` for the deadline kind.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Name of the adapter a hard error is attributed to.
    pub fn adapter(&self) -> Option<&str> {
        match self {
            Self::Transport { adapter, .. } | Self::WorkerPanicked { adapter, .. } => Some(adapter),
            _ => None,
        }
    }
}
