//! Concrete implementations of the domain seams.

pub mod history;
pub mod message_pusher;
pub mod repository;
