//! Error types for the sync core.

use thiserror::Error;

/// Main error type for sync operations.
///
/// A dropped transport is deliberately absent from this taxonomy: it is
/// retried internally and only observable through `is_connected`.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The server rejected the handshake credentials. Terminal; not retried.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// `connect()` was called without a session token.
    #[error("No session token present")]
    NoSession,

    /// An intent was issued while no connection is established.
    #[error("Not connected")]
    NotConnected,

    /// The transport refused a send or an initial open for a non-auth reason.
    #[error("Transport closed: {0}")]
    TransportClosed(String),

    /// A REST call failed; the associated optimistic mutation is rolled back.
    #[error("REST call failed: {0}")]
    RestCall(String),

    /// A REST call timed out. Treated identically to `RestCall`.
    #[error("REST call timed out")]
    Timeout,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Whether this error rolls back an optimistic mutation.
    pub fn is_rest_failure(&self) -> bool {
        matches!(self, SyncError::RestCall(_) | SyncError::Timeout)
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
