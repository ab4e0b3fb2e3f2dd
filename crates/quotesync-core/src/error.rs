//! Error types for quotesync-core

use thiserror::Error;

use crate::models::Quote;
use crate::state::SyncState;

/// Result type alias using quotesync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quotesync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("Remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote responded with a non-success status or an undecodable payload
    #[error("Remote API error: {message} ({status})")]
    Api { status: u16, message: String },

    /// A push run was aborted part way; `completed` holds the echoed records
    /// of the pushes that went through before the failure.
    #[error("Push aborted after {} record(s): {source}", completed.len())]
    Push {
        completed: Vec<Quote>,
        #[source]
        source: Box<Error>,
    },

    /// A remote item could not be adapted to a quote
    #[error("Malformed remote item: {0}")]
    MalformedData(String),

    /// A quote is missing required fields
    #[error("Invalid quote: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// A resolution was requested while no conflict is pending
    #[error("No sync conflict is pending")]
    NoPendingConflict,

    /// A resolution was requested while a sync cycle is in flight
    #[error("A sync cycle is already in progress")]
    SyncInProgress,

    /// The engine was asked to move between states that are not connected
    #[error("Invalid sync state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: SyncState, to: SyncState },
}

impl Error {
    /// Whether this error came from talking to the remote.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. } | Self::Push { .. })
    }
}
