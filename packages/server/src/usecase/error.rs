//! UseCase errors.

use thiserror::Error;

/// Joining a room failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// Every resolved instance of the room was closed before the join landed.
    #[error("Chatroom '{0}' is unavailable")]
    RoomUnavailable(String),
}
