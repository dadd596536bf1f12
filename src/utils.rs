//! Utility functions and helpers.

pub mod backup;
pub mod logging;
pub mod progress;

pub use backup::{restore_backup, BackupManager, DEFAULT_BACKUP_DIR};
pub use logging::{format_bytes, LogHandle, DEFAULT_LOG_FILE};
pub use progress::{progress_sink, NoProgress, PlainProgress, ProgressSink, TerminalProgress};
