//! Line client for the Hiroba chat relay.
//!
//! Everything the server sends is printed as-is (prompts included), and
//! every line typed on stdin is sent to the server.

pub mod error;
pub mod session;

pub use error::ClientError;
pub use session::run_client_session;
