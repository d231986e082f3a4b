//! UseCase: ルーム退出処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LeaveRoomUseCase::execute() メソッド
//! - 退出処理（ロスターからの削除、退出通知、空になったルームの片付け）
//!
//! ### どのような状況を想定しているか
//! - 正常系：退出と残りのメンバーへの通知
//! - エッジケース：最後のメンバーの退出（evict-when-empty ならルームが消える）
//! - 異常系：存在しないメンバーの退出（何もしない）
//! - エッジケース：ルームを開いたが参加せずに手放した場合（abandon）

use std::sync::Arc;

use crate::domain::{Chatroom, ChatroomRegistry, Member, SessionId, message};

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    /// Registry（ルーム一覧の抽象化）
    registry: Arc<dyn ChatroomRegistry>,
}

impl LeaveRoomUseCase {
    /// 新しい LeaveRoomUseCase を作成
    pub fn new(registry: Arc<dyn ChatroomRegistry>) -> Self {
        Self { registry }
    }

    /// ルーム退出を実行
    ///
    /// # Returns
    ///
    /// * `Some(Member)` - 削除されたメンバー
    /// * `None` - `id` はルームにいなかった
    pub async fn execute(&self, room: &Arc<Chatroom>, id: SessionId) -> Option<Member> {
        let member = room.leave(id).await?;

        let report = room
            .broadcast(id, &message::format_left_notice(&member.display_name))
            .await;
        tracing::info!(
            "'{}' ({}) left '{}', notified {} member(s)",
            member.display_name,
            id,
            room.name(),
            report.delivered()
        );

        if room.is_closed() {
            self.registry.remove_closed(room).await;
        }
        Some(member)
    }

    /// 参加しないまま手放されたルームを片付ける
    ///
    /// evict-when-empty で誰もいなければ閉じて一覧から削除する。
    pub async fn abandon(&self, room: &Arc<Chatroom>) {
        if room.close_if_empty().await {
            self.registry.remove_closed(room).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        domain::{OutboxReceiver, OverflowPolicy, RoomRetention, outbox},
        infrastructure::repository::InMemoryChatroomRegistry,
    };

    fn create_test_member(id: u64, name: &str) -> (Member, OutboxReceiver) {
        let (tx, rx) = outbox(16, OverflowPolicy::DropOldest, Duration::ZERO);
        (Member::new(SessionId::new(id), name, tx), rx)
    }

    #[tokio::test]
    async fn test_leave_notifies_remaining_members() {
        // テスト項目: 退出すると残りのメンバーに退出通知が届く
        // given (前提条件):
        let registry = Arc::new(InMemoryChatroomRegistry::default());
        let usecase = LeaveRoomUseCase::new(registry.clone());
        let room = registry.get_or_create("lobby").await;
        let (alice, mut alice_rx) = create_test_member(1, "alice");
        let (bob, _bob_rx) = create_test_member(2, "bob");
        room.join(alice).await.unwrap();
        room.join(bob).await.unwrap();

        // when (操作):
        let removed = usecase.execute(&room, SessionId::new(2)).await;

        // then (期待する結果):
        assert_eq!(removed.map(|m| m.display_name).as_deref(), Some("bob"));
        assert_eq!(room.member_count().await, 1);
        assert_eq!(
            alice_rx.try_recv().as_deref(),
            Some("bob has left the chatroom\n")
        );
    }

    #[tokio::test]
    async fn test_leave_unknown_member_sends_nothing() {
        // テスト項目: ルームにいない ID の退出は何もせず通知も送らない
        // given (前提条件):
        let registry = Arc::new(InMemoryChatroomRegistry::default());
        let usecase = LeaveRoomUseCase::new(registry.clone());
        let room = registry.get_or_create("lobby").await;
        let (alice, mut alice_rx) = create_test_member(1, "alice");
        room.join(alice).await.unwrap();

        // when (操作):
        let removed = usecase.execute(&room, SessionId::new(42)).await;

        // then (期待する結果):
        assert!(removed.is_none());
        assert_eq!(alice_rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_last_leave_evicts_room() {
        // テスト項目: evict-when-empty では最後の退出でルームが一覧から消える
        // given (前提条件):
        let registry = Arc::new(InMemoryChatroomRegistry::new(RoomRetention::EvictWhenEmpty));
        let usecase = LeaveRoomUseCase::new(registry.clone());
        let room = registry.get_or_create("lobby").await;
        let (alice, _rx) = create_test_member(1, "alice");
        room.join(alice).await.unwrap();

        // when (操作):
        usecase.execute(&room, SessionId::new(1)).await;

        // then (期待する結果):
        assert!(room.is_closed());
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_last_leave_retains_room() {
        // テスト項目: retain では最後の退出後もルームが残る
        // given (前提条件):
        let registry = Arc::new(InMemoryChatroomRegistry::new(RoomRetention::Retain));
        let usecase = LeaveRoomUseCase::new(registry.clone());
        let room = registry.get_or_create("lobby").await;
        let (alice, _rx) = create_test_member(1, "alice");
        room.join(alice).await.unwrap();

        // when (操作):
        usecase.execute(&room, SessionId::new(1)).await;

        // then (期待する結果):
        assert!(!room.is_closed());
        assert_eq!(registry.room_names().await, vec!["lobby".to_string()]);
    }
    #[tokio::test]
    async fn test_abandon_unjoined_room_evicts_it() {
        // テスト項目: 参加されないまま手放された空のルームは evict-when-empty で削除される
        // given (前提条件):
        let registry = Arc::new(InMemoryChatroomRegistry::new(RoomRetention::EvictWhenEmpty));
        let usecase = LeaveRoomUseCase::new(registry.clone());
        let room = registry.get_or_create("ghost").await;

        // when (操作):
        usecase.abandon(&room).await;

        // then (期待する結果):
        assert!(room.is_closed());
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_abandon_keeps_occupied_or_retained_room() {
        // テスト項目: メンバーがいるルームや retain のルームは abandon しても残る
        // given (前提条件):
        let evicting = Arc::new(InMemoryChatroomRegistry::new(RoomRetention::EvictWhenEmpty));
        let retaining = Arc::new(InMemoryChatroomRegistry::new(RoomRetention::Retain));
        let occupied = evicting.get_or_create("lobby").await;
        let (alice, _rx) = create_test_member(1, "alice");
        occupied.join(alice).await.unwrap();
        let retained = retaining.get_or_create("lobby").await;

        // when (操作):
        LeaveRoomUseCase::new(evicting.clone()).abandon(&occupied).await;
        LeaveRoomUseCase::new(retaining.clone()).abandon(&retained).await;

        // then (期待する結果):
        assert_eq!(evicting.room_count().await, 1);
        assert_eq!(retaining.room_count().await, 1);
        assert!(!occupied.is_closed());
        assert!(!retained.is_closed());
    }
}
