//! UseCase 層
//!
//! セッションはこの層を通してのみルームを操作します。

mod error;
mod join_room;
mod leave_room;
mod send_message;

pub use error::JoinError;
pub use join_room::{JoinRoomUseCase, MAX_JOIN_ATTEMPTS};
pub use leave_room::LeaveRoomUseCase;
pub use send_message::SendMessageUseCase;
