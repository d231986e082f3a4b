//! Per-room append-only history files.
//!
//! Each room maps to `<dir>/room-<encoded>.log`. Room names are
//! percent-encoded byte-wise (everything outside `[A-Za-z0-9_-]`), so the
//! mapping is injective and never escapes the directory.

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use hiroba_shared::time::{Clock, timestamp_to_rfc3339};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::domain::{HistoryError, HistorySink};

pub struct FileHistorySink {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileHistorySink {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the history file for `room`.
    pub fn path_for(&self, room: &str) -> PathBuf {
        self.dir.join(file_name_for(room))
    }
}

/// `room-<percent-encoded name>.log`
pub fn file_name_for(room: &str) -> String {
    let mut name = String::with_capacity(room.len() + 9);
    name.push_str("room-");
    for byte in room.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(byte as char);
        } else {
            let _ = write!(name, "%{:02X}", byte);
        }
    }
    name.push_str(".log");
    name
}

#[async_trait]
impl HistorySink for FileHistorySink {
    async fn append(&self, room: &str, record: &str) -> Result<(), HistoryError> {
        let io_error = |source| HistoryError::Io {
            room: room.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;

        let mut line = format!("[{}] {}", timestamp_to_rfc3339(self.clock.now_millis()), record);
        if !line.ends_with('\n') {
            line.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(room))
            .await
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).await.map_err(io_error)?;
        file.flush().await.map_err(io_error)?;
        Ok(())
    }
}
