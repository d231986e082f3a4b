//! Domain Model: Chatroom（1 つのルームのメンバー一覧とブロードキャスト）
//!
//! ## 概要
//!
//! - `join` / `leave` / `broadcast` はそれぞれルーム自身のロックの下で
//!   1 つのクリティカルセクションとして実行される
//! - `broadcast` はメンバーの `Outbox` に積むだけなので、ロックを保持したまま
//!   ソケット I/O を行うことはない
//! - `RoomRetention::EvictWhenEmpty` のルームは空になった時点で閉じられ、
//!   以後の `join` は `RoomError::Closed` になる

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use tokio::sync::Mutex;

use super::{Delivery, Member, RoomError, RoomRetention, SessionId};

/// Result of [`Chatroom::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// The session was already a member; its entry was overwritten.
    Rejoined { previous_name: String },
}

/// Per-broadcast delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members the line was handed to (sender excluded).
    pub recipients: usize,
    /// Recipients whose outbox was closed or stayed full.
    pub failed: usize,
}

impl BroadcastReport {
    pub fn delivered(&self) -> usize {
        self.recipients - self.failed
    }
}

#[derive(Debug)]
pub struct Chatroom {
    name: String,
    retention: RoomRetention,
    members: Mutex<HashMap<SessionId, Member>>,
    /// Set under the `members` lock when an evict-when-empty room empties.
    closed: AtomicBool,
}

impl Chatroom {
    pub fn new(name: impl Into<String>, retention: RoomRetention) -> Self {
        Self {
            name: name.into(),
            retention,
            members: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn retention(&self) -> RoomRetention {
        self.retention
    }

    /// Whether the room has been closed and must not accept new members.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Add `member` to the roster.
    ///
    /// A repeated join for the same session id replaces the existing entry.
    pub async fn join(&self, member: Member) -> Result<JoinOutcome, RoomError> {
        let mut members = self.members.lock().await;
        if self.is_closed() {
            return Err(RoomError::Closed(self.name.clone()));
        }

        let outcome = match members.insert(member.id, member) {
            Some(previous) => JoinOutcome::Rejoined {
                previous_name: previous.display_name,
            },
            None => JoinOutcome::Joined,
        };
        Ok(outcome)
    }

    /// Remove the member with `id`, returning it if it was present.
    ///
    /// Under [`RoomRetention::EvictWhenEmpty`] the room closes once the last
    /// member is gone.
    pub async fn leave(&self, id: SessionId) -> Option<Member> {
        let mut members = self.members.lock().await;
        let removed = members.remove(&id);

        if removed.is_some()
            && members.is_empty()
            && self.retention == RoomRetention::EvictWhenEmpty
        {
            self.closed.store(true, Ordering::Release);
            tracing::debug!("Chatroom '{}' is empty and now closed", self.name);
        }
        removed
    }

    /// Close an evict-when-empty room that has no members.
    ///
    /// Used when a session opened the room but never joined it. Returns
    /// whether this call closed the room.
    pub async fn close_if_empty(&self) -> bool {
        let members = self.members.lock().await;
        if members.is_empty()
            && self.retention == RoomRetention::EvictWhenEmpty
            && !self.is_closed()
        {
            self.closed.store(true, Ordering::Release);
            tracing::debug!("Chatroom '{}' was never joined and is now closed", self.name);
            return true;
        }
        false
    }

    /// Enqueue `line` for every member except `sender`.
    ///
    /// Delivery is best-effort: a failed recipient is logged and skipped.
    pub async fn broadcast(&self, sender: SessionId, line: &str) -> BroadcastReport {
        let members = self.members.lock().await;
        let mut report = BroadcastReport::default();

        for (id, member) in members.iter() {
            if *id == sender {
                continue;
            }
            report.recipients += 1;
            match member.deliver(line).await {
                Delivery::Queued => {}
                Delivery::TimedOut => {
                    report.failed += 1;
                    tracing::warn!(
                        "Outbox of '{}' ({}) in '{}' stayed full, line dropped",
                        member.display_name,
                        id,
                        self.name
                    );
                }
                Delivery::Closed => {
                    report.failed += 1;
                    tracing::warn!(
                        "Outbox of '{}' ({}) in '{}' is closed, skipping",
                        member.display_name,
                        id,
                        self.name
                    );
                }
            }
        }
        report
    }

    pub async fn member_count(&self) -> usize {
        self.members.lock().await.len()
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.members.lock().await.contains_key(&id)
    }

    /// Display name of a member, if present.
    pub async fn display_name_of(&self, id: SessionId) -> Option<String> {
        self.members
            .lock()
            .await
            .get(&id)
            .map(|member| member.display_name.clone())
    }

    /// Display names of all members, sorted.
    pub async fn display_names(&self) -> Vec<String> {
        let members = self.members.lock().await;
        let mut names: Vec<String> = members
            .values()
            .map(|member| member.display_name.clone())
            .collect();
        names.sort();
        names
    }
}
