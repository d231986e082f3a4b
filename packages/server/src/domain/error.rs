//! Domain errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// The room was emptied and closed under the evict-when-empty policy.
    #[error("Chatroom '{0}' is closed")]
    Closed(String),
}

/// History sink failure. Logged by callers, never fatal.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to write history for room '{room}': {source}")]
    Io {
        room: String,
        #[source]
        source: std::io::Error,
    },
}
