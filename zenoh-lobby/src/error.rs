/// Error types for the zenoh-lobby library
use thiserror::Error;

/// Result type alias for lobby operations
pub type Result<T> = std::result::Result<T, LobbyError>;

/// Errors that can occur in zenoh-lobby operations
#[derive(Debug, Error)]
pub enum LobbyError {
    /// Zenoh-related errors
    #[error("Zenoh error: {0}")]
    Zenoh(#[from] zenoh::Error),

    /// The online services provider has no session interface
    #[error("No online subsystem found")]
    ProviderUnavailable,

    /// The host game has no local player to own the request
    #[error("No local player available")]
    NoLocalPlayer,

    /// Join index does not address the last result list
    #[error("Search result index {index} out of range (last search returned {len} result(s))")]
    InvalidResultIndex {
        /// Requested index
        index: usize,
        /// Length of the live result list
        len: usize,
    },

    /// Join index addresses an invalid entry of the last result list
    #[error("Search result at index {0} is not valid")]
    InvalidSearchResult(usize),

    /// Search must ask for at least one result
    #[error("Invalid max results: {0}. Must be at least 1")]
    InvalidMaxResults(usize),

    /// The provider refused to start the request
    #[error("Request rejected by provider: {0}")]
    RequestRejected(String),

    /// Invalid session name provided
    #[error("Invalid session name: {0}")]
    InvalidSessionName(String),

    /// Invalid keyexpr pattern
    #[error("Invalid keyexpr: {0}")]
    InvalidKeyexpr(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
