//! Domain model: rooms, members, identities and the seams the rest of the
//! server depends on.

mod chatroom;
mod error;
mod history;
mod member;
pub mod message;
mod outbox;
mod policy;
mod repository;
mod session_id;

pub use chatroom::{BroadcastReport, Chatroom, JoinOutcome};
pub use error::{HistoryError, RoomError};
pub use history::HistorySink;
#[cfg(test)]
pub use history::MockHistorySink;
pub use member::Member;
pub use outbox::{Delivery, Outbox, OutboxReceiver, outbox};
pub use policy::{HistoryBackend, OverflowPolicy, RoomRetention};
pub use repository::ChatroomRegistry;
pub use session_id::{SessionId, SessionIdAllocator};
