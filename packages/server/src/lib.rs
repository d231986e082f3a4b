//! Hiroba: multi-room line chat relay over TCP.
//!
//! Clients pick (or create) a named room, choose a display name, and every
//! line they send is relayed to the other members of that room.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
