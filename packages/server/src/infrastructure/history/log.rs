//! History records routed through `tracing`.

use async_trait::async_trait;

use crate::domain::{HistoryError, HistorySink};

/// Emits each record as an `info` event on target `hiroba::history`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHistorySink;

#[async_trait]
impl HistorySink for LogHistorySink {
    async fn append(&self, room: &str, record: &str) -> Result<(), HistoryError> {
        tracing::info!(target: "hiroba::history", "[{}] {}", room, record.trim_end());
        Ok(())
    }
}
