//! Source watching: discovery, incremental reads, timestamp carrying and
//! line classification.

mod carrier;
mod catch_up;
pub mod classify;
mod error;
mod reader;
mod registry;
mod stream_watcher;

pub use carrier::TimestampCarrier;
pub use catch_up::{catch_up, DEFAULT_TAIL_LINES};
pub use classify::{classify, classify_at, classify_lines, Classification, FormatKind};
pub use error::WatcherError;
pub use reader::{non_blank_lines, read_delta, try_read_delta, Delta, PartialLine, ReadCursor};
pub use registry::{
    find_latest_transcript, format_for, project_path_hash, SourceDescriptor, SourceLayout,
    SourceRegistry, DNA_DIR_NAME,
};
pub use stream_watcher::{
    changes, ChangeKind, SourceState, Watcher, WatcherState, DEFAULT_DEBOUNCE,
};
