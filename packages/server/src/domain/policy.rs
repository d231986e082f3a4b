//! Tunable server policies.

use serde::Deserialize;

/// What happens to a room once its last member leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RoomRetention {
    /// Rooms live for the lifetime of the process, even with zero members.
    #[default]
    Retain,
    /// An empty room is closed and removed from the registry.
    EvictWhenEmpty,
}

/// What a member's outbox does when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Never wait; the oldest queued lines are discarded.
    #[default]
    DropOldest,
    /// Wait for space up to the enqueue timeout, then drop the new line.
    Block,
}

/// Which history backend records room traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryBackend {
    #[default]
    None,
    /// One append-only file per room.
    File,
    /// Emit records through `tracing`.
    Log,
}
