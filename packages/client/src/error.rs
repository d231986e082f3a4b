//! Error types for the line client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection broke while the session was running
    #[error("Connection lost: {0}")]
    ConnectionLost(#[source] std::io::Error),
}
