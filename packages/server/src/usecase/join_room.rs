//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::open_room() / execute() メソッド
//! - 参加処理（ロスターへの追加、参加通知のブロードキャスト）
//!
//! ### どのような状況を想定しているか
//! - 正常系：新しいルームへの参加と通知
//! - エッジケース：参加直前にルームが閉じられた場合（名前から引き直して再試行）
//! - 異常系：何度引き直しても閉じたルームしか得られない場合

use std::sync::Arc;

use crate::domain::{Chatroom, ChatroomRegistry, JoinOutcome, Member, RoomError, message};

use super::error::JoinError;

/// 閉じたルームに当たったときに名前から引き直す回数の上限
pub const MAX_JOIN_ATTEMPTS: usize = 3;

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    /// Registry（ルーム一覧の抽象化）
    registry: Arc<dyn ChatroomRegistry>,
}

impl JoinRoomUseCase {
    /// 新しい JoinRoomUseCase を作成
    pub fn new(registry: Arc<dyn ChatroomRegistry>) -> Self {
        Self { registry }
    }

    /// ルーム名から参加先のルームを取得（なければ作成）
    pub async fn open_room(&self, name: &str) -> Arc<Chatroom> {
        self.registry.get_or_create(name).await
    }

    /// ルーム参加を実行
    ///
    /// 参加できたら、本人以外に参加通知をブロードキャストする。
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<Chatroom>)` - 実際に参加したルーム（引き直した場合は `room` と別インスタンス）
    /// * `Err(JoinError)` - 参加失敗
    pub async fn execute(
        &self,
        room: Arc<Chatroom>,
        member: Member,
    ) -> Result<Arc<Chatroom>, JoinError> {
        let mut room = room;
        let id = member.id;
        let display_name = member.display_name.clone();

        for attempt in 1..=MAX_JOIN_ATTEMPTS {
            match room.join(member.clone()).await {
                Ok(outcome) => {
                    if let JoinOutcome::Rejoined { previous_name } = outcome {
                        tracing::debug!(
                            "{} rejoined '{}' (was '{}')",
                            id,
                            room.name(),
                            previous_name
                        );
                    }
                    let report = room
                        .broadcast(id, &message::format_joined_notice(&display_name))
                        .await;
                    tracing::info!(
                        "'{}' ({}) joined '{}', notified {} member(s)",
                        display_name,
                        id,
                        room.name(),
                        report.delivered()
                    );
                    return Ok(room);
                }
                Err(RoomError::Closed(name)) => {
                    tracing::debug!(
                        "Chatroom '{}' closed before {} could join (attempt {}/{})",
                        name,
                        id,
                        attempt,
                        MAX_JOIN_ATTEMPTS
                    );
                    room = self.registry.get_or_create(&name).await;
                }
            }
        }

        Err(JoinError::RoomUnavailable(room.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{OutboxReceiver, OverflowPolicy, RoomRetention, SessionId, outbox},
        infrastructure::repository::InMemoryChatroomRegistry,
    };

    fn create_test_member(id: u64, name: &str) -> (Member, OutboxReceiver) {
        let (tx, rx) = outbox(16, OverflowPolicy::DropOldest, Duration::ZERO);
        (Member::new(SessionId::new(id), name, tx), rx)
    }

    /// Always hands out the same (closed) room.
    struct StuckRegistry {
        room: Arc<Chatroom>,
    }

    #[async_trait]
    impl ChatroomRegistry for StuckRegistry {
        async fn get_or_create(&self, _name: &str) -> Arc<Chatroom> {
            self.room.clone()
        }

        async fn remove_closed(&self, _room: &Arc<Chatroom>) -> bool {
            false
        }

        async fn room_names(&self) -> Vec<String> {
            vec![self.room.name().to_string()]
        }

        async fn room_count(&self) -> usize {
            1
        }
    }

    async fn close_room(room: &Chatroom) {
        let (ghost, _rx) = create_test_member(999, "ghost");
        room.join(ghost).await.unwrap();
        room.leave(SessionId::new(999)).await;
        assert!(room.is_closed());
    }

    #[tokio::test]
    async fn test_join_notifies_other_members() {
        // テスト項目: 参加すると既存メンバーにだけ参加通知が届く
        // given (前提条件):
        let usecase = JoinRoomUseCase::new(Arc::new(InMemoryChatroomRegistry::default()));
        let room = usecase.open_room("lobby").await;
        let (alice, mut alice_rx) = create_test_member(1, "alice");
        let (bob, mut bob_rx) = create_test_member(2, "bob");
        usecase.execute(room.clone(), alice).await.unwrap();

        // when (操作):
        let joined = usecase.execute(room.clone(), bob).await.unwrap();

        // then (期待する結果):
        assert!(Arc::ptr_eq(&joined, &room));
        assert_eq!(room.member_count().await, 2);
        assert_eq!(
            alice_rx.try_recv().as_deref(),
            Some("bob has joined the chatroom\n")
        );
        assert_eq!(alice_rx.try_recv(), None);
        assert_eq!(bob_rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_open_room_returns_same_instance_for_same_name() {
        let usecase = JoinRoomUseCase::new(Arc::new(InMemoryChatroomRegistry::default()));

        let first = usecase.open_room("lobby").await;
        let second = usecase.open_room("lobby").await;

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_join_closed_room_resolves_fresh_instance() {
        // テスト項目: 参加直前に閉じられたルームは名前から引き直して参加する
        // given (前提条件):
        let registry = Arc::new(InMemoryChatroomRegistry::new(RoomRetention::EvictWhenEmpty));
        let usecase = JoinRoomUseCase::new(registry.clone());
        let stale = usecase.open_room("lobby").await;
        close_room(&stale).await;
        let (alice, _rx) = create_test_member(1, "alice");

        // when (操作):
        let joined = usecase.execute(stale.clone(), alice).await.unwrap();

        // then (期待する結果):
        assert!(!Arc::ptr_eq(&joined, &stale));
        assert!(joined.contains(SessionId::new(1)).await);
        assert!(!stale.contains(SessionId::new(1)).await);
        assert!(Arc::ptr_eq(&registry.get_or_create("lobby").await, &joined));
    }

    #[tokio::test]
    async fn test_join_gives_up_after_max_attempts() {
        // テスト項目: 閉じたルームしか得られない場合は RoomUnavailable が返される
        // given (前提条件):
        let room = Arc::new(Chatroom::new("lobby", RoomRetention::EvictWhenEmpty));
        close_room(&room).await;
        let usecase = JoinRoomUseCase::new(Arc::new(StuckRegistry { room: room.clone() }));
        let (alice, _rx) = create_test_member(1, "alice");

        // when (操作):
        let result = usecase.execute(room, alice).await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), JoinError::RoomUnavailable("lobby".to_string()));
    }
}
