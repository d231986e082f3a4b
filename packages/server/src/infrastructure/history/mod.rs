//! History sink implementations.
//!
//! - `file`: one append-only text file per room
//! - `log`: records emitted through `tracing`

pub mod file;
pub mod log;

use std::{path::PathBuf, sync::Arc};

use hiroba_shared::time::SystemClock;

use crate::domain::{HistoryBackend, HistorySink};

pub use file::FileHistorySink;
pub use log::LogHistorySink;

/// Build the sink selected by configuration, if any.
pub fn build_history_sink(
    backend: HistoryBackend,
    history_dir: PathBuf,
) -> Option<Arc<dyn HistorySink>> {
    match backend {
        HistoryBackend::None => None,
        HistoryBackend::File => Some(Arc::new(FileHistorySink::new(
            history_dir,
            Arc::new(SystemClock),
        ))),
        HistoryBackend::Log => Some(Arc::new(LogHistorySink)),
    }
}
