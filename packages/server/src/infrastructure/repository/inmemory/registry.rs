//! InMemory ChatroomRegistry 実装
//!
//! ドメイン層が定義する `ChatroomRegistry` trait の具体的な実装。
//! HashMap をインメモリのルーム一覧として使用します。
//!
//! ## ロック
//!
//! マップ全体を 1 つの Mutex で保護します。クリティカルセクションは O(1) で、
//! ルーム側のロックを取得することはありません（閉じたかどうかは
//! `Chatroom::is_closed` のアトミックな読み取りで判定）。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Chatroom, ChatroomRegistry, RoomRetention};

/// インメモリ ChatroomRegistry 実装
pub struct InMemoryChatroomRegistry {
    /// ルーム名 → Chatroom
    rooms: Mutex<HashMap<String, Arc<Chatroom>>>,
    /// 新しく作るルームに適用する保持ポリシー
    retention: RoomRetention,
}

impl InMemoryChatroomRegistry {
    /// 新しい InMemoryChatroomRegistry を作成
    pub fn new(retention: RoomRetention) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            retention,
        }
    }
}

impl Default for InMemoryChatroomRegistry {
    fn default() -> Self {
        Self::new(RoomRetention::default())
    }
}

#[async_trait]
impl ChatroomRegistry for InMemoryChatroomRegistry {
    async fn get_or_create(&self, name: &str) -> Arc<Chatroom> {
        let mut rooms = self.rooms.lock().await;

        if let Some(room) = rooms.get(name)
            && !room.is_closed()
        {
            return room.clone();
        }

        let room = Arc::new(Chatroom::new(name, self.retention));
        if rooms.insert(name.to_string(), room.clone()).is_some() {
            tracing::info!("Replaced closed chatroom: '{}'", name);
        } else {
            tracing::info!("Created new chatroom: '{}'", name);
        }
        room
    }

    async fn remove_closed(&self, room: &Arc<Chatroom>) -> bool {
        if !room.is_closed() {
            return false;
        }

        let mut rooms = self.rooms.lock().await;
        let is_same_instance = rooms
            .get(room.name())
            .is_some_and(|registered| Arc::ptr_eq(registered, room));
        if is_same_instance {
            rooms.remove(room.name());
            tracing::info!("Removed empty chatroom: '{}'", room.name());
        }
        is_same_instance
    }

    async fn room_names(&self) -> Vec<String> {
        let rooms = self.rooms.lock().await;
        let mut names: Vec<String> = rooms.keys().cloned().collect();
        names.sort();
        names
    }

    async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}
