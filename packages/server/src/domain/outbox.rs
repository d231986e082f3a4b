//! Per-member bounded outbound queues.
//!
//! Broadcasting enqueues a line on each recipient's [`Outbox`]; a dedicated
//! writer task drains the matching [`OutboxReceiver`] onto the socket. A slow
//! peer therefore only ever fills its own queue, and what happens when that
//! queue is full is decided by the [`OverflowPolicy`].
//!
//! - `DropOldest` is backed by a single-receiver `tokio::sync::broadcast`
//!   channel: sending never waits, and a lagging receiver skips the oldest
//!   lines.
//! - `Block` is backed by a bounded `tokio::sync::mpsc` channel: sending
//!   waits for space up to the enqueue timeout.

use std::time::Duration;

use tokio::sync::{
    broadcast,
    mpsc::{self, error::SendTimeoutError},
};

use super::OverflowPolicy;

/// Result of handing one line to an outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The queue stayed full for the whole enqueue timeout; the line was dropped.
    TimedOut,
    /// The writer side is gone.
    Closed,
}

impl Delivery {
    pub fn is_queued(&self) -> bool {
        matches!(self, Delivery::Queued)
    }
}

#[derive(Debug, Clone)]
enum Sender {
    DropOldest(broadcast::Sender<String>),
    Block {
        tx: mpsc::Sender<String>,
        timeout: Duration,
    },
}

#[derive(Debug)]
enum Receiver {
    DropOldest(broadcast::Receiver<String>),
    Block(mpsc::Receiver<String>),
}

/// Sending half of a member's queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: Sender,
}

/// Receiving half of a member's queue, owned by the writer task.
#[derive(Debug)]
pub struct OutboxReceiver {
    receiver: Receiver,
}

/// Create a bounded outbox.
///
/// `capacity` is clamped to at least 1. With [`OverflowPolicy::DropOldest`]
/// the `broadcast` channel rounds it up to the next power of two and
/// allocates every slot up front, so capacity 3 holds 4 lines.
/// `enqueue_timeout` only matters for [`OverflowPolicy::Block`].
pub fn outbox(
    capacity: usize,
    policy: OverflowPolicy,
    enqueue_timeout: Duration,
) -> (Outbox, OutboxReceiver) {
    let capacity = capacity.max(1);
    match policy {
        OverflowPolicy::DropOldest => {
            let (tx, rx) = broadcast::channel(capacity);
            (
                Outbox {
                    sender: Sender::DropOldest(tx),
                },
                OutboxReceiver {
                    receiver: Receiver::DropOldest(rx),
                },
            )
        }
        OverflowPolicy::Block => {
            let (tx, rx) = mpsc::channel(capacity);
            (
                Outbox {
                    sender: Sender::Block {
                        tx,
                        timeout: enqueue_timeout,
                    },
                },
                OutboxReceiver {
                    receiver: Receiver::Block(rx),
                },
            )
        }
    }
}

impl Outbox {
    /// Enqueue one line.
    pub async fn deliver(&self, line: &str) -> Delivery {
        match &self.sender {
            Sender::DropOldest(tx) => match tx.send(line.to_string()) {
                Ok(_) => Delivery::Queued,
                Err(_) => Delivery::Closed,
            },
            Sender::Block { tx, timeout } => {
                match tx.send_timeout(line.to_string(), *timeout).await {
                    Ok(()) => Delivery::Queued,
                    Err(SendTimeoutError::Timeout(_)) => Delivery::TimedOut,
                    Err(SendTimeoutError::Closed(_)) => Delivery::Closed,
                }
            }
        }
    }
}

impl OutboxReceiver {
    /// Next queued line, or `None` once every [`Outbox`] clone is dropped and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<String> {
        match &mut self.receiver {
            Receiver::DropOldest(rx) => loop {
                match rx.recv().await {
                    Ok(line) => return Some(line),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Outbox overflowed, dropped {} oldest line(s) for a slow peer",
                            skipped
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },
            Receiver::Block(rx) => rx.recv().await,
        }
    }

    /// A line that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        match &mut self.receiver {
            Receiver::DropOldest(rx) => loop {
                match rx.try_recv() {
                    Ok(line) => return Some(line),
                    Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Outbox overflowed, dropped {} oldest line(s) for a slow peer",
                            skipped
                        );
                    }
                    Err(_) => return None,
                }
            },
            Receiver::Block(rx) => rx.try_recv().ok(),
        }
    }
}
