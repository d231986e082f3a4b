//! Room member.

use super::{Delivery, Outbox, SessionId};

/// One connected session's entry in a room roster.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: SessionId,
    pub display_name: String,
    outbox: Outbox,
}

impl Member {
    pub fn new(id: SessionId, display_name: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            outbox,
        }
    }

    /// Enqueue a line for this member's writer task.
    pub async fn deliver(&self, line: &str) -> Delivery {
        self.outbox.deliver(line).await
    }
}
