//! Chatroom registry trait.
//!
//! The use case layer depends on this trait only; the in-memory
//! implementation lives in `infrastructure::repository`.

use std::sync::Arc;

use async_trait::async_trait;

use super::Chatroom;

/// Directory of rooms by name.
#[async_trait]
pub trait ChatroomRegistry: Send + Sync {
    /// Return the open room named `name`, creating it if absent.
    ///
    /// Concurrent calls with the same name observe the same instance.
    async fn get_or_create(&self, name: &str) -> Arc<Chatroom>;

    /// Drop the registry entry for `room` if it still points at this exact,
    /// closed instance. Returns whether an entry was removed.
    async fn remove_closed(&self, room: &Arc<Chatroom>) -> bool;

    /// Names of all registered rooms, sorted.
    async fn room_names(&self) -> Vec<String>;

    async fn room_count(&self) -> usize;
}
