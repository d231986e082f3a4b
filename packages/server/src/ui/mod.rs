//! TCP chat server: connection acceptor and per-connection sessions.

mod error;
mod server;
mod session;
mod signal;
pub mod state;

pub use error::ServerError;
pub use server::{ListeningServer, Server};
pub use session::{ClientSession, DisconnectReason, SessionState};
pub use state::{AppState, SessionSettings};
