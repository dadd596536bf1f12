//! Backup restore command.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use super::output;
use crate::utils::restore_backup;

/// Copies a backup over a file.
#[derive(Parser)]
pub struct RestoreCommand {
    /// Backup file, e.g. `backups/contacts.xlsx.backup_20240101_120000`.
    pub backup: PathBuf,
    /// File to overwrite.
    pub target: PathBuf,
}

impl RestoreCommand {
    /// Executes the restore command.
    pub fn execute(self) -> Result<()> {
        if !self.backup.is_file() {
            bail!("Backup not found: {}", self.backup.display());
        }
        restore_backup(&self.backup, &self.target)?;
        output::success(
            &mut output::stdout(),
            &format!(
                "Restored {} from {}",
                self.target.display(),
                self.backup.display()
            ),
        )?;
        Ok(())
    }
}
