//! Per-connection session state machine.
//!
//! ## 状態遷移
//!
//! ```text
//! Connecting -> AwaitingRoomName -> AwaitingUsername -> Active -> Closed
//! ```
//!
//! ソケットを読むのはセッションだけで、書き込みはすべて自分の `Outbox` を
//! 経由して writer タスク（`pusher_loop`）が行います。ルームへの参加前に
//! 読み込みが失敗した場合は、退出処理を行わずに `Closed` へ遷移します。
//! ルーム名だけ送って参加しなかったルームは `LeaveRoomUseCase::abandon` で
//! 手放します。

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader},
    task::JoinHandle,
};

use crate::{
    domain::{
        Chatroom, Member, Outbox, SessionId,
        message::{self, ClientLine},
        outbox,
    },
    infrastructure::message_pusher::{WriterExit, pusher_loop},
    usecase::JoinError,
};

use super::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingRoomName,
    AwaitingUsername,
    Active,
    Closed,
}

/// Why a session ended. Logged only, never sent to peers.
#[derive(Debug, Error)]
pub enum DisconnectReason {
    #[error("client quit")]
    Quit,
    /// The peer closed the stream, possibly mid-line.
    #[error("connection closed by peer")]
    Eof,
    #[error("read failed: {0}")]
    ReadError(#[source] std::io::Error),
    #[error("no input for {0:?}")]
    ReadTimeout(Duration),
    #[error("writer stopped: {0:?}")]
    WriterClosed(WriterExit),
    #[error(transparent)]
    JoinFailed(#[from] JoinError),
}

enum Step {
    Read(Result<String, DisconnectReason>),
    WriterStopped(WriterExit),
}

/// One accepted connection.
pub struct ClientSession<R> {
    id: SessionId,
    state: SessionState,
    reader: BufReader<R>,
    /// Own queue for prompts and the goodbye line. Dropped on close so the
    /// writer can drain and exit.
    outbox: Option<Outbox>,
    writer: Option<JoinHandle<WriterExit>>,
    /// Opened from the room name but not joined yet.
    opened: Option<Arc<Chatroom>>,
    room: Option<Arc<Chatroom>>,
    app: Arc<AppState>,
}

impl<R> ClientSession<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Wrap a connection and start its writer task.
    pub fn new<W>(id: SessionId, reader: R, writer: W, app: Arc<AppState>) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let settings = app.settings;
        let (tx, rx) = outbox(
            settings.outbox_capacity,
            settings.overflow_policy,
            settings.enqueue_timeout,
        );
        let writer = pusher_loop(id, rx, writer, settings.write_timeout);

        Self {
            id,
            state: SessionState::Connecting,
            reader: BufReader::new(reader),
            outbox: Some(tx),
            writer: Some(writer),
            opened: None,
            room: None,
            app,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to completion.
    pub async fn run(mut self) -> DisconnectReason {
        let reason = self.drive().await;
        self.close(&reason).await;
        reason
    }

    async fn drive(&mut self) -> DisconnectReason {
        self.transition(SessionState::AwaitingRoomName);
        self.send(message::ROOM_PROMPT).await;
        let room_name = match self.next_line().await {
            Ok(line) => line.trim().to_string(),
            Err(reason) => return reason,
        };
        let room = self.app.join_room_usecase.open_room(&room_name).await;
        self.opened = Some(room.clone());

        self.transition(SessionState::AwaitingUsername);
        self.send(message::USERNAME_PROMPT).await;
        let display_name = match self.next_line().await {
            Ok(line) => line.trim().to_string(),
            Err(reason) => return reason,
        };

        let Some(outbox) = self.outbox.clone() else {
            return DisconnectReason::WriterClosed(WriterExit::Drained);
        };
        let member = Member::new(self.id, display_name.clone(), outbox);
        match self.app.join_room_usecase.execute(room, member).await {
            Ok(room) => {
                self.opened = None;
                self.room = Some(room);
            }
            Err(e) => return e.into(),
        }
        self.transition(SessionState::Active);

        loop {
            let line = match self.next_line().await {
                Ok(line) => line,
                Err(reason) => return reason,
            };
            match ClientLine::parse(&line) {
                ClientLine::Quit => {
                    self.send(message::GOODBYE).await;
                    return DisconnectReason::Quit;
                }
                ClientLine::Text(text) => {
                    if let Some(room) = &self.room {
                        self.app
                            .send_message_usecase
                            .execute(room, self.id, &display_name, &text)
                            .await;
                    }
                }
            }
        }
    }

    /// Read one full line, racing the read deadline and the writer task.
    async fn next_line(&mut self) -> Result<String, DisconnectReason> {
        let deadline = self.app.settings.read_timeout;
        let read = read_line(&mut self.reader, deadline);

        let step = match self.writer.as_mut() {
            Some(writer) => tokio::select! {
                line = read => Step::Read(line),
                exit = writer => Step::WriterStopped(exit.unwrap_or(WriterExit::WriteFailed)),
            },
            None => Step::Read(read.await),
        };

        match step {
            Step::Read(line) => line,
            Step::WriterStopped(exit) => {
                self.writer = None;
                Err(DisconnectReason::WriterClosed(exit))
            }
        }
    }

    /// Queue a server-originated line on this session's own outbox.
    async fn send(&self, line: &str) {
        if let Some(outbox) = &self.outbox {
            let delivery = outbox.deliver(line).await;
            if !delivery.is_queued() {
                tracing::debug!("Could not queue line for {}: {:?}", self.id, delivery);
            }
        }
    }

    async fn close(&mut self, reason: &DisconnectReason) {
        if let Some(room) = self.room.take() {
            self.app.leave_room_usecase.execute(&room, self.id).await;
        }
        if let Some(room) = self.opened.take() {
            self.app.leave_room_usecase.abandon(&room).await;
        }

        self.outbox = None;
        if let Some(writer) = self.writer.take() {
            let abort = writer.abort_handle();
            match tokio::time::timeout(self.app.settings.write_timeout, writer).await {
                Ok(Ok(exit)) => tracing::debug!("Writer for {} stopped: {:?}", self.id, exit),
                Ok(Err(e)) => tracing::warn!("Writer for {} panicked: {}", self.id, e),
                Err(_) => {
                    tracing::warn!("Writer for {} did not drain in time, aborting", self.id);
                    abort.abort();
                }
            }
        }

        self.transition(SessionState::Closed);
        tracing::info!("{} disconnected: {}", self.id, reason);
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("{}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}

/// A complete `\n`-terminated line. EOF and a truncated final line both
/// count as the peer going away.
async fn read_line<R>(
    reader: &mut BufReader<R>,
    deadline: Option<Duration>,
) -> Result<String, DisconnectReason>
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    let read = reader.read_line(&mut line);
    let result = match deadline {
        Some(limit) => match tokio::time::timeout(limit, read).await {
            Ok(result) => result,
            Err(_) => return Err(DisconnectReason::ReadTimeout(limit)),
        },
        None => read.await,
    };

    match result {
        Ok(0) => Err(DisconnectReason::Eof),
        Ok(_) if !line.ends_with('\n') => Err(DisconnectReason::Eof),
        Ok(_) => Ok(line),
        Err(e) => Err(DisconnectReason::ReadError(e)),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{
        AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf, duplex, split,
    };

    use super::*;
    use crate::{
        domain::{ChatroomRegistry, RoomRetention, SessionIdAllocator},
        infrastructure::repository::InMemoryChatroomRegistry,
        ui::state::SessionSettings,
        usecase::{JoinRoomUseCase, LeaveRoomUseCase, SendMessageUseCase},
    };

    fn create_test_app(
        retention: RoomRetention,
        settings: SessionSettings,
    ) -> (Arc<AppState>, Arc<InMemoryChatroomRegistry>) {
        let registry = Arc::new(InMemoryChatroomRegistry::new(retention));
        let app = Arc::new(AppState {
            join_room_usecase: Arc::new(JoinRoomUseCase::new(registry.clone())),
            send_message_usecase: Arc::new(SendMessageUseCase::new(None)),
            leave_room_usecase: Arc::new(LeaveRoomUseCase::new(registry.clone())),
            session_ids: SessionIdAllocator::new(),
            settings,
        });
        (app, registry)
    }

    struct TestPeer {
        reader: ReadHalf<DuplexStream>,
        writer: WriteHalf<DuplexStream>,
    }

    impl TestPeer {
        async fn expect(&mut self, text: &str) {
            let mut buf = vec![0; text.len()];
            self.reader.read_exact(&mut buf).await.unwrap();
            assert_eq!(String::from_utf8(buf).unwrap(), text);
        }

        async fn send(&mut self, data: &[u8]) {
            self.writer.write_all(data).await.unwrap();
        }

        /// Walk through both prompts.
        async fn enter(&mut self, room: &str, name: &str) {
            self.expect(message::ROOM_PROMPT).await;
            self.send(format!("{}\n", room).as_bytes()).await;
            self.expect(message::USERNAME_PROMPT).await;
            self.send(format!("{}\n", name).as_bytes()).await;
        }

        async fn read_rest(&mut self) -> String {
            let mut rest = String::new();
            self.reader.read_to_string(&mut rest).await.unwrap();
            rest
        }
    }

    fn spawn_session(app: &Arc<AppState>) -> (TestPeer, JoinHandle<DisconnectReason>) {
        let (client, server) = duplex(4096);
        let (server_read, server_write) = split(server);
        let id = app.session_ids.allocate();
        let session = ClientSession::new(id, server_read, server_write, app.clone());
        assert_eq!(session.state(), SessionState::Connecting);
        let handle = tokio::spawn(session.run());

        let (reader, writer) = split(client);
        (TestPeer { reader, writer }, handle)
    }

    async fn wait_for_members(room: &Chatroom, count: usize) {
        for _ in 0..100 {
            if room.member_count().await == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("room never reached {} member(s)", count);
    }

    #[tokio::test]
    async fn test_quit_sends_goodbye_and_leaves() {
        // テスト項目: /quit で Goodbye が送られ、ルームから退出して接続が閉じられる
        // given (前提条件):
        let (app, registry) = create_test_app(RoomRetention::Retain, SessionSettings::default());
        let (mut alice, handle) = spawn_session(&app);
        alice.enter("lobby", "alice").await;
        let room = registry.get_or_create("lobby").await;
        wait_for_members(&room, 1).await;

        // when (操作):
        alice.send(b"/QUIT\n").await;

        // then (期待する結果):
        assert_eq!(alice.read_rest().await, message::GOODBYE);
        assert!(matches!(handle.await.unwrap(), DisconnectReason::Quit));
        assert_eq!(room.member_count().await, 0);
    }

    #[tokio::test]
    async fn test_messages_relay_between_sessions() {
        // テスト項目: 同じルームの別セッションにメッセージと入退室通知が届く
        // given (前提条件):
        let (app, registry) = create_test_app(RoomRetention::Retain, SessionSettings::default());
        let (mut alice, alice_handle) = spawn_session(&app);
        let (mut bob, bob_handle) = spawn_session(&app);
        alice.enter("lobby", "alice").await;
        let room = registry.get_or_create("lobby").await;
        wait_for_members(&room, 1).await;
        bob.enter("  lobby  ", "bob").await;
        alice.expect("bob has joined the chatroom\n").await;

        // when (操作):
        alice.send(b"  hi  \n").await;
        bob.expect("alice: hi\n").await;
        bob.send(b"/exit\n").await;

        // then (期待する結果):
        alice.expect("bob has left the chatroom\n").await;
        assert_eq!(bob.read_rest().await, message::GOODBYE);
        assert!(matches!(bob_handle.await.unwrap(), DisconnectReason::Quit));

        alice.writer.shutdown().await.unwrap();
        assert!(matches!(alice_handle.await.unwrap(), DisconnectReason::Eof));
        assert_eq!(room.member_count().await, 0);
    }

    #[tokio::test]
    async fn test_eof_before_room_name_skips_join() {
        // テスト項目: ルーム名の入力前に切断するとルームは作られない
        // given (前提条件):
        let (app, registry) = create_test_app(RoomRetention::Retain, SessionSettings::default());
        let (mut alice, handle) = spawn_session(&app);
        alice.expect(message::ROOM_PROMPT).await;

        // when (操作):
        alice.writer.shutdown().await.unwrap();

        // then (期待する結果):
        assert!(matches!(handle.await.unwrap(), DisconnectReason::Eof));
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_eof_at_username_prompt_releases_evicting_room() {
        // テスト項目: ユーザー名の入力前に切断すると、evict-when-empty の空ルームは残らない
        // given (前提条件):
        let (app, registry) =
            create_test_app(RoomRetention::EvictWhenEmpty, SessionSettings::default());
        let (mut ghost, handle) = spawn_session(&app);
        ghost.expect(message::ROOM_PROMPT).await;
        ghost.send(b"ghost-room\n").await;
        ghost.expect(message::USERNAME_PROMPT).await;

        // when (操作):
        ghost.writer.shutdown().await.unwrap();

        // then (期待する結果):
        assert!(matches!(handle.await.unwrap(), DisconnectReason::Eof));
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_eof_at_username_prompt_keeps_retained_room() {
        let (app, registry) = create_test_app(RoomRetention::Retain, SessionSettings::default());
        let (mut ghost, handle) = spawn_session(&app);
        ghost.expect(message::ROOM_PROMPT).await;
        ghost.send(b"lobby\n").await;
        ghost.expect(message::USERNAME_PROMPT).await;

        ghost.writer.shutdown().await.unwrap();

        assert!(matches!(handle.await.unwrap(), DisconnectReason::Eof));
        assert_eq!(registry.room_names().await, vec!["lobby".to_string()]);
    }

    #[tokio::test]
    async fn test_truncated_line_is_eof() {
        // テスト項目: 改行のない最終行は EOF として扱われる
        // given (前提条件):
        let (app, registry) = create_test_app(RoomRetention::Retain, SessionSettings::default());
        let (mut alice, handle) = spawn_session(&app);
        alice.expect(message::ROOM_PROMPT).await;

        // when (操作):
        alice.send(b"lob").await;
        alice.writer.shutdown().await.unwrap();

        // then (期待する結果):
        assert!(matches!(handle.await.unwrap(), DisconnectReason::Eof));
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_non_utf8_input_is_read_error() {
        // テスト項目: UTF-8 でない入力は読み込みエラーとして切断される
        // given (前提条件):
        let (app, _registry) = create_test_app(RoomRetention::Retain, SessionSettings::default());
        let (mut alice, handle) = spawn_session(&app);
        alice.expect(message::ROOM_PROMPT).await;

        // when (操作):
        alice.send(&[0xff, 0xfe, b'\n']).await;

        // then (期待する結果):
        assert!(matches!(
            handle.await.unwrap(),
            DisconnectReason::ReadError(_)
        ));
    }

    #[tokio::test]
    async fn test_idle_session_times_out_and_leaves() {
        // テスト項目: 読み込み期限を過ぎると切断され、ルームから退出する
        // given (前提条件):
        let settings = SessionSettings {
            read_timeout: Some(Duration::from_millis(100)),
            ..SessionSettings::default()
        };
        let (app, registry) = create_test_app(RoomRetention::EvictWhenEmpty, settings);
        let (mut alice, handle) = spawn_session(&app);
        alice.enter("lobby", "alice").await;

        // when (操作):
        let reason = handle.await.unwrap();

        // then (期待する結果):
        assert!(matches!(reason, DisconnectReason::ReadTimeout(_)));
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_room_name_is_valid() {
        // テスト項目: 空のルーム名も有効なキーとして扱われる
        // given (前提条件):
        let (app, registry) = create_test_app(RoomRetention::Retain, SessionSettings::default());
        let (mut alice, _handle) = spawn_session(&app);

        // when (操作):
        alice.enter("", "alice").await;

        // then (期待する結果):
        let room = registry.get_or_create("").await;
        wait_for_members(&room, 1).await;
        assert_eq!(room.display_names().await, vec!["alice".to_string()]);
    }
}
