//! Server state shared by every connection.

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{OverflowPolicy, SessionIdAllocator},
    usecase::{JoinRoomUseCase, LeaveRoomUseCase, SendMessageUseCase},
};

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Idle limit for a single read. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Limit for one socket write in the writer task.
    pub write_timeout: Duration,
    pub outbox_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Only used with [`OverflowPolicy::Block`].
    pub enqueue_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            read_timeout: Some(Duration::from_secs(300)),
            write_timeout: Duration::from_secs(10),
            outbox_capacity: 64,
            overflow_policy: OverflowPolicy::DropOldest,
            enqueue_timeout: Duration::from_millis(1000),
        }
    }
}

/// Shared application state
pub struct AppState {
    /// JoinRoomUseCase（ルーム参加のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// LeaveRoomUseCase（ルーム退出のユースケース）
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// 接続ごとの SessionId の払い出し
    pub session_ids: SessionIdAllocator,
    pub settings: SessionSettings,
}
