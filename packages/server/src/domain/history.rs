//! History sink seam.
//!
//! A sink receives one record per relayed chat line. Implementations live in
//! `infrastructure::history`.

use async_trait::async_trait;

use super::HistoryError;

/// Append-only history collaborator.
///
/// Records are appended after the broadcast, outside the room lock. Lines
/// from concurrent senders may land in a different order than members
/// received them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Append one record (a formatted chat line, newline included) for `room`.
    async fn append(&self, room: &str, record: &str) -> Result<(), HistoryError>;
}
