//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - メッセージ送信処理（送信者以外へのブロードキャスト、履歴への追記）
//!
//! ### なぜこのテストが必要か
//! - 送信者自身にメッセージが返らないことを保証
//! - 履歴の書き込み失敗が配送に影響しないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信とブロードキャスト、履歴への追記
//! - 異常系：履歴シンクの書き込み失敗
//! - エッジケース：送信者のみが参加している場合（ブロードキャスト対象なし）

use std::sync::Arc;

use crate::domain::{BroadcastReport, Chatroom, HistorySink, SessionId, message};

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// HistorySink（履歴の抽象化、未設定なら履歴を残さない）
    history: Option<Arc<dyn HistorySink>>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(history: Option<Arc<dyn HistorySink>>) -> Self {
        Self { history }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `room` - 送信者が参加しているルーム
    /// * `sender` - 送信者のセッション ID（ブロードキャスト対象から除外）
    /// * `display_name` - 送信者の表示名
    /// * `text` - 本文（トリム済み）
    ///
    /// 履歴への追記はルームのロックを解放した後に行うため、同時に送信された
    /// メッセージ同士では履歴の順序が配送順と異なることがある。
    pub async fn execute(
        &self,
        room: &Chatroom,
        sender: SessionId,
        display_name: &str,
        text: &str,
    ) -> BroadcastReport {
        let line = message::format_chat_message(display_name, text);
        let report = room.broadcast(sender, &line).await;
        tracing::debug!(
            "{} -> '{}': delivered to {}/{} member(s)",
            sender,
            room.name(),
            report.delivered(),
            report.recipients
        );

        if let Some(history) = &self.history
            && let Err(e) = history.append(room.name(), &line).await
        {
            tracing::warn!("{}", e);
        }

        report
    }
}
