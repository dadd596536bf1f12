//! Log file setup, size rotation and tailing.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::config::LogLevel;

/// Log file used when no `--log-file` path is given.
pub const DEFAULT_LOG_FILE: &str = "sheet_linker.log";

/// Log files larger than this are removed at startup.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Changes the active log level after initialisation.
#[derive(Debug, Clone)]
pub struct LogHandle {
    filter: Option<reload::Handle<EnvFilter, Registry>>,
    env_override: bool,
}

impl LogHandle {
    /// A handle not connected to any subscriber.
    pub fn disabled() -> Self {
        Self {
            filter: None,
            env_override: false,
        }
    }

    /// Switches the filter to `level` unless `RUST_LOG` pinned it.
    pub fn set_level(&self, level: LogLevel) -> Result<()> {
        let Some(filter) = &self.filter else {
            return Ok(());
        };
        if self.env_override {
            debug!("RUST_LOG is set, keeping its filter");
            return Ok(());
        }
        filter
            .reload(EnvFilter::new(level.as_filter()))
            .context("Failed to change log level")?;
        info!(level = %level, "Log level changed");
        Ok(())
    }
}

/// Removes `path` when it has grown past [`MAX_LOG_SIZE`].
///
/// Returns the size of the removed file.
pub fn rotate_if_oversized(path: &Path) -> io::Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > MAX_LOG_SIZE => {
            fs::remove_file(path)?;
            Ok(Some(meta.len()))
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Installs the global subscriber: stderr plus an append-only log file.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(log_file: &Path, level: LogLevel) -> Result<LogHandle> {
    let removed = rotate_if_oversized(log_file)
        .with_context(|| format!("Failed to rotate log file: {log_file:?}"))?;

    let (filter, env_override) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(level.as_filter()), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file: {log_file:?}"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    if let Some(size) = removed {
        info!(size = %format_bytes(size), "Removed oversized log file");
    }

    Ok(LogHandle {
        filter: Some(handle),
        env_override,
    })
}

/// Returns the last `lines` lines of a log file.
pub fn tail(path: &Path, lines: usize) -> Result<Vec<String>> {
    let bytes = fs::read(path).with_context(|| format!("Could not read log file: {path:?}"))?;
    let content = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].iter().map(|l| l.trim_end().to_string()).collect())
}

/// Formats bytes into human-readable format.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Runs `f` under a thread-local subscriber and returns everything it
/// logged at debug level and above, without ANSI colours.
#[cfg(test)]
pub(crate) fn capture_logs(f: impl FnOnce()) -> String {
    use std::io::Write;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Ok(mut bytes) = self.0.lock() {
                bytes.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = captured.0.lock().map(|b| b.clone()).unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn oversized_log_is_removed() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("big.log");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_LOG_SIZE + 1).unwrap();
        drop(file);

        assert_eq!(rotate_if_oversized(&path).unwrap(), Some(MAX_LOG_SIZE + 1));
        assert!(!path.exists());
        assert_eq!(rotate_if_oversized(&path).unwrap(), None);
    }

    #[test]
    fn small_log_is_kept() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("small.log");
        fs::write(&path, "one line\n").unwrap();

        assert_eq!(rotate_if_oversized(&path).unwrap(), None);
        assert!(path.exists());
    }

    #[test]
    fn tail_returns_last_lines() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("app.log");
        let content: String = (1..=30).map(|i| format!("line {i}\n")).collect();
        fs::write(&path, content).unwrap();

        let lines = tail(&path, 20).unwrap();
        assert_eq!(lines.len(), 20);
        assert_eq!(lines.first().unwrap(), "line 11");
        assert_eq!(lines.last().unwrap(), "line 30");

        assert_eq!(tail(&path, 100).unwrap().len(), 30);
        assert!(tail(&temp_dir.path().join("missing.log"), 5).is_err());
    }

    #[test]
    fn disabled_handle_accepts_level_changes() {
        assert!(LogHandle::disabled().set_level(LogLevel::Debug).is_ok());
    }

    #[test]
    fn format_bytes() {
        assert_eq!(super::format_bytes(0), "0 B");
        assert_eq!(super::format_bytes(512), "512 B");
        assert_eq!(super::format_bytes(1536), "1.5 KB");
        assert_eq!(super::format_bytes(MAX_LOG_SIZE), "10.0 MB");
    }
}
