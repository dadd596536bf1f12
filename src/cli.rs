//! CLI interface for sheet-linker.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{BotConfig, ConfigManager, DEFAULT_CONFIG_FILE};
use crate::processor::FileProcessor;
use crate::utils::{logging, BackupManager, LogHandle, DEFAULT_BACKUP_DIR, DEFAULT_LOG_FILE};

pub mod batch;
pub mod config;
pub mod convert;
pub mod log;
pub mod menu;
pub mod output;
pub mod restore;

/// sheet-linker: turns emails, websites and profile URLs in spreadsheets into hyperlinks.
#[derive(Parser)]
#[command(name = "sheet-linker")]
#[command(
    about = "Turns emails, websites and profile URLs in spreadsheet columns into hyperlinks",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Settings file.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Directory backups are written to.
    #[arg(long, global = true, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// The command to execute; the interactive menu when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Main command categories.
#[derive(Subcommand)]
pub enum Commands {
    /// Converts a single spreadsheet.
    Convert(convert::ConvertCommand),
    /// Converts every spreadsheet in a folder.
    Batch(batch::BatchCommand),
    /// Shows or edits the settings.
    Config(config::ConfigCommand),
    /// Shows the end of the log file.
    Log(log::LogCommand),
    /// Copies a backup over a file.
    Restore(restore::RestoreCommand),
    /// Opens the interactive menu.
    Menu(menu::MenuCommand),
}

/// State shared by every command.
pub struct AppContext {
    /// Where settings are persisted.
    pub manager: ConfigManager,
    /// Settings in effect.
    pub config: BotConfig,
    /// Directory backups are written to.
    pub backup_dir: PathBuf,
    /// Log file path.
    pub log_file: PathBuf,
    /// Handle for changing the log level at runtime.
    pub log: LogHandle,
}

impl AppContext {
    /// Processor configured from the current settings.
    pub fn processor(&self, no_backup: bool) -> FileProcessor {
        let backups = BackupManager::new(
            self.backup_dir.clone(),
            self.config.backup_files && !no_backup,
        );
        FileProcessor::new(&self.config, backups)
    }
}

impl Cli {
    /// Executes the CLI command.
    pub fn execute(self) -> Result<()> {
        let manager = ConfigManager::with_path(
            self.config
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        );
        let (config, outcome) = manager.load_or_create()?;
        let log_file = self
            .log_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        let log = logging::init(&log_file, config.log_level)?;
        info!(version = crate::VERSION, "sheet-linker started");
        outcome.log(manager.path());

        let mut ctx = AppContext {
            manager,
            config,
            backup_dir: self
                .backup_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
            log_file,
            log,
        };

        match self.command {
            Some(Commands::Convert(cmd)) => cmd.execute(&ctx),
            Some(Commands::Batch(cmd)) => cmd.execute(&ctx),
            Some(Commands::Config(cmd)) => cmd.execute(&mut ctx),
            Some(Commands::Log(cmd)) => cmd.execute(&ctx),
            Some(Commands::Restore(cmd)) => cmd.execute(),
            Some(Commands::Menu(cmd)) => cmd.execute(&mut ctx),
            None => menu::MenuCommand::default().execute(&mut ctx),
        }
    }
}
