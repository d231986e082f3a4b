//! TCP writer task.
//!
//! ## 責務
//!
//! - `OutboxReceiver` から行を取り出し、ソケットに書き出す
//! - 書き込みごとに期限を設け、期限切れや I/O エラーで終了する
//!
//! ## 設計ノート
//!
//! 既にキューに溜まっている行はまとめて 1 回の書き込みで送ります。
//! すべての `Outbox` が破棄されるとキューを吐き出してから書き込み側を
//! shutdown します。

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::domain::{OutboxReceiver, SessionId};

/// Upper bound on lines coalesced into one write.
const MAX_BATCH_LINES: usize = 64;

/// Why a writer task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterExit {
    /// Every outbox handle was dropped and the queue is drained.
    Drained,
    WriteFailed,
    WriteTimedOut,
}

/// Spawns a task that drains `rx` onto `writer`.
///
/// # Arguments
///
/// * `session_id` - Owning session, for logs
/// * `rx` - Receiving half of the session's outbox
/// * `writer` - Socket write half
/// * `write_timeout` - Deadline for each write + flush
///
/// # Returns
///
/// A `JoinHandle` resolving to the reason the task stopped
pub fn pusher_loop<W>(
    session_id: SessionId,
    mut rx: OutboxReceiver,
    mut writer: W,
    write_timeout: Duration,
) -> tokio::task::JoinHandle<WriterExit>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let exit = loop {
            let Some(first) = rx.recv().await else {
                break WriterExit::Drained;
            };

            let mut batch = first;
            let mut lines = 1;
            while lines < MAX_BATCH_LINES {
                match rx.try_recv() {
                    Some(line) => {
                        batch.push_str(&line);
                        lines += 1;
                    }
                    None => break,
                }
            }

            let write = async {
                writer.write_all(batch.as_bytes()).await?;
                writer.flush().await
            };
            match tokio::time::timeout(write_timeout, write).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!("Write to {} failed: {}", session_id, e);
                    break WriterExit::WriteFailed;
                }
                Err(_) => {
                    tracing::warn!(
                        "Write to {} exceeded {:?}, dropping connection",
                        session_id,
                        write_timeout
                    );
                    break WriterExit::WriteTimedOut;
                }
            }
        };

        if exit == WriterExit::Drained {
            let _ = tokio::time::timeout(write_timeout, writer.shutdown()).await;
        }
        exit
    })
}
