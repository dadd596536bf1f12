//! Timestamped backup copies of input files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use tracing::info;

/// Directory backups go to when none is configured.
pub const DEFAULT_BACKUP_DIR: &str = "backups";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Copies files into a backup directory before they are processed.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    enabled: bool,
}

impl Default for BackupManager {
    fn default() -> Self {
        Self::new(DEFAULT_BACKUP_DIR, true)
    }
}

impl BackupManager {
    /// Creates a manager writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    /// Directory backups are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Backup location for `source` at the given time:
    /// `<dir>/<file name>.backup_<YYYYMMDD_HHMMSS>`.
    pub fn backup_path_for(&self, source: &Path, at: NaiveDateTime) -> PathBuf {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.dir
            .join(format!("{file_name}.backup_{}", at.format(TIMESTAMP_FORMAT)))
    }

    /// Copies `source` into the backup directory.
    ///
    /// Returns `None` without touching the file system when backups are
    /// disabled. A backup taken in the same second as an earlier one replaces it.
    pub fn create_backup(&self, source: &Path) -> Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create backup directory: {:?}", self.dir))?;

        let backup_path = self.backup_path_for(source, Local::now().naive_local());
        fs::copy(source, &backup_path).with_context(|| {
            format!("Failed to copy {source:?} to {backup_path:?}")
        })?;

        info!(backup = %backup_path.display(), "Backup created");
        Ok(Some(backup_path))
    }
}

/// Copies a backup over `target`.
pub fn restore_backup(backup: &Path, target: &Path) -> Result<()> {
    fs::copy(backup, target)
        .with_context(|| format!("Failed to restore {backup:?} to {target:?}"))?;
    info!(backup = %backup.display(), target = %target.display(), "Restored from backup");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn backup_name_carries_timestamp() {
        let manager = BackupManager::new("backups", true);
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        let path = manager.backup_path_for(Path::new("/data/contacts.xlsx"), at);
        assert_eq!(
            path,
            PathBuf::from("backups").join("contacts.xlsx.backup_20240309_070501")
        );
    }

    #[test]
    fn create_and_restore() {
        let temp_dir = tempdir().unwrap();
        let source = temp_dir.path().join("contacts.xlsx");
        fs::write(&source, b"original").unwrap();
        let manager = BackupManager::new(temp_dir.path().join("backups"), true);

        let backup = manager.create_backup(&source).unwrap().unwrap();
        assert!(backup.starts_with(manager.dir()));
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("contacts.xlsx.backup_"));
        assert_eq!(fs::read(&backup).unwrap(), b"original");

        fs::write(&source, b"changed").unwrap();
        restore_backup(&backup, &source).unwrap();
        assert_eq!(fs::read(&source).unwrap(), b"original");
    }

    #[test]
    fn disabled_manager_does_nothing() {
        let temp_dir = tempdir().unwrap();
        let source = temp_dir.path().join("contacts.xlsx");
        fs::write(&source, b"original").unwrap();
        let manager = BackupManager::new(temp_dir.path().join("backups"), false);

        assert!(manager.create_backup(&source).unwrap().is_none());
        assert!(!manager.dir().exists());
    }

    #[test]
    fn missing_source_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let manager = BackupManager::new(temp_dir.path().join("backups"), true);
        assert!(manager
            .create_backup(&temp_dir.path().join("absent.xlsx"))
            .is_err());
    }
}
