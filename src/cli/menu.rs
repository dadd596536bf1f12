//! Interactive menu.
//!
//! Input and output are injected so the loop can be driven from tests
//! without a real terminal.

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use termcolor::WriteColor;
use tracing::info;

use super::batch::run_batch;
use super::config::show_configuration;
use super::convert::{convert_file, RunOptions};
use super::log::{view_log, DEFAULT_TAIL_LINES};
use super::{output, AppContext};
use crate::config::LogLevel;

/// Opens the interactive menu.
#[derive(Parser, Default)]
pub struct MenuCommand {}

impl MenuCommand {
    /// Executes the menu command.
    pub fn execute(self, ctx: &mut AppContext) -> Result<()> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        run_menu(ctx, &mut input, &mut output::stdout())
    }
}

/// Prints `message` and reads one trimmed line; `None` once input is closed.
fn prompt(
    input: &mut dyn BufRead,
    out: &mut dyn WriteColor,
    message: &str,
) -> Result<Option<String>> {
    write!(out, "{message}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Runs the main menu until the user exits or input ends.
pub fn run_menu(
    ctx: &mut AppContext,
    input: &mut dyn BufRead,
    out: &mut dyn WriteColor,
) -> Result<()> {
    output::heading(out, "🚀 sheet-linker: spreadsheet hyperlink converter")?;
    writeln!(out, "{}", "=".repeat(50))?;

    loop {
        output::heading(out, "🎯 Main Menu:")?;
        writeln!(out, "1. Process single spreadsheet file")?;
        writeln!(out, "2. Process folder (batch mode)")?;
        writeln!(out, "3. View configuration")?;
        writeln!(out, "4. Update configuration")?;
        writeln!(out, "5. View log file")?;
        writeln!(out, "6. Exit")?;

        let Some(choice) = prompt(input, out, "\nEnter your choice (1-6): ")? else {
            break;
        };

        match choice.as_str() {
            "1" => {
                let Some(path) = prompt(input, out, "Enter the path to your spreadsheet file: ")?
                else {
                    break;
                };
                if let Err(e) = convert_file(ctx, &PathBuf::from(path), RunOptions::default(), out)
                {
                    output::failure(out, &format!("{e:#}"))?;
                }
            }
            "2" => {
                let Some(folder) = prompt(input, out, "Enter the folder path: ")? else {
                    break;
                };
                if let Err(e) = run_batch(ctx, &PathBuf::from(folder), RunOptions::default(), out)
                {
                    output::failure(out, &format!("{e:#}"))?;
                }
            }
            "3" => show_configuration(ctx, out)?,
            "4" => {
                if !update_configuration(ctx, input, out)? {
                    break;
                }
            }
            "5" => view_log(ctx, DEFAULT_TAIL_LINES, out)?,
            "6" => {
                info!("sheet-linker stopped");
                writeln!(out, "👋 Goodbye!")?;
                return Ok(());
            }
            _ => output::failure(out, "Invalid choice!")?,
        }
    }

    Ok(())
}

/// Settings submenu. Returns false when input ended inside it.
fn update_configuration(
    ctx: &mut AppContext,
    input: &mut dyn BufRead,
    out: &mut dyn WriteColor,
) -> Result<bool> {
    loop {
        output::heading(out, "📝 Update Configuration:")?;
        writeln!(
            out,
            "1. Change hyperlink color (current: {})",
            ctx.config.hyperlink_color
        )?;
        writeln!(
            out,
            "2. Toggle backup files (current: {})",
            ctx.config.backup_files
        )?;
        writeln!(
            out,
            "3. Set max rows to process (current: {})",
            ctx.config.max_rows_to_process
        )?;
        writeln!(out, "4. Change log level (current: {})", ctx.config.log_level)?;
        writeln!(out, "5. Back to main menu")?;

        let Some(choice) = prompt(input, out, "\nEnter your choice (1-5): ")? else {
            return Ok(false);
        };

        let (key, value) = match choice.as_str() {
            "1" => {
                let Some(color) = prompt(input, out, "Enter hex color (e.g., 0000FF for blue): ")?
                else {
                    return Ok(false);
                };
                ("hyperlink_color", color)
            }
            "2" => ("backup_files", (!ctx.config.backup_files).to_string()),
            "3" => {
                let Some(rows) = prompt(input, out, "Enter max rows to process: ")? else {
                    return Ok(false);
                };
                ("max_rows_to_process", rows)
            }
            "4" => {
                let levels: Vec<&str> = LogLevel::ALL.into_iter().map(LogLevel::as_str).collect();
                writeln!(out, "Available levels: {}", levels.join(", "))?;
                let Some(level) = prompt(input, out, "Enter log level: ")? else {
                    return Ok(false);
                };
                ("log_level", level)
            }
            "5" => return Ok(true),
            _ => {
                output::failure(out, "Invalid choice!")?;
                continue;
            }
        };

        match ctx.manager.update(&mut ctx.config, key, &value) {
            Ok(()) => {
                if key == "log_level" {
                    ctx.log.set_level(ctx.config.log_level)?;
                }
                output::success(out, &format!("{key}: {}", ctx.config.get(key)?))?;
            }
            Err(e) => output::failure(out, &format!("{e:#}"))?,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{BotConfig, ConfigManager};
    use crate::utils::LogHandle;
    use crate::workbook::test_utils::XlsxBuilder;
    use crate::workbook::Workbook;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};
    use termcolor::NoColor;

    fn context(dir: &Path) -> AppContext {
        let manager = ConfigManager::with_path(dir.join("config.json"));
        let (config, _) = manager.load_or_create().unwrap();
        AppContext {
            manager,
            config,
            backup_dir: dir.join("backups"),
            log_file: dir.join("app.log"),
            log: LogHandle::disabled(),
        }
    }

    fn drive(ctx: &mut AppContext, script: &str) -> String {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = NoColor::new(Vec::new());
        run_menu(ctx, &mut input, &mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    fn setup() -> (TempDir, AppContext) {
        let temp_dir = tempdir().unwrap();
        let ctx = context(temp_dir.path());
        (temp_dir, ctx)
    }

    #[test]
    fn exit_and_end_of_input() {
        let (_dir, mut ctx) = setup();
        assert!(drive(&mut ctx, "6\n").contains("Goodbye"));
        // Closed input leaves the loop quietly
        assert!(!drive(&mut ctx, "").contains("Goodbye"));
    }

    #[test]
    fn invalid_choice_is_reported() {
        let (_dir, mut ctx) = setup();
        let out = drive(&mut ctx, "9\n6\n");
        assert!(out.contains("❌ Invalid choice!"));
    }

    #[test]
    fn converts_file_from_menu() {
        let (dir, mut ctx) = setup();
        let source = dir.path().join("people.xlsx");
        XlsxBuilder::new()
            .row(&["Email"])
            .row(&["jane@example.com"])
            .write(&source);

        let out = drive(&mut ctx, &format!("1\n{}\n6\n", source.display()));
        assert!(out.contains("🔗 Total hyperlinks created: 1"), "{out}");

        let converted = Workbook::open(dir.path().join("people_with_hyperlinks.xlsx")).unwrap();
        assert_eq!(
            converted.active_sheet().cell(2, 1).unwrap().hyperlink.as_deref(),
            Some("mailto:jane@example.com")
        );
        assert!(ctx.backup_dir.read_dir().unwrap().next().is_some());
    }

    #[test]
    fn rejects_missing_and_unsupported_files() {
        let (dir, mut ctx) = setup();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "x").unwrap();

        let out = drive(
            &mut ctx,
            &format!(
                "1\n{}\n1\n{}\n6\n",
                dir.path().join("absent.xlsx").display(),
                notes.display()
            ),
        );
        assert!(out.contains("File not found"));
        assert!(out.contains("Please provide a spreadsheet file (.xlsx, .xlsm, .xltx, .xltm)"));
    }

    #[test]
    fn batch_reports_missing_folder() {
        let (dir, mut ctx) = setup();
        let out = drive(
            &mut ctx,
            &format!("2\n{}\n6\n", dir.path().join("nowhere").display()),
        );
        assert!(out.contains("Folder not found"));
    }

    #[test]
    fn updates_settings() {
        let (_dir, mut ctx) = setup();
        let out = drive(
            &mut ctx,
            "4\n1\nnot-a-color\n1\nff0000\n2\n3\n0\n3\n500\n4\ndebug\n5\n6\n",
        );

        assert!(out.contains("expected 6 hex characters"));
        assert!(out.contains("expected a positive number"));
        assert!(out.contains("Available levels: DEBUG, INFO, WARNING, ERROR"));

        let expected = BotConfig {
            hyperlink_color: "FF0000".to_string(),
            backup_files: false,
            max_rows_to_process: 500,
            log_level: LogLevel::Debug,
            ..BotConfig::default()
        };
        assert_eq!(ctx.config, expected);
        assert_eq!(ctx.manager.load().unwrap(), expected);
    }

    #[test]
    fn shows_configuration_and_missing_log() {
        let (_dir, mut ctx) = setup();
        let out = drive(&mut ctx, "3\n5\n6\n");
        assert!(out.contains("  hyperlink_color: 0000FF"));
        assert!(out.contains("  max_rows_to_process: 100000"));
        assert!(out.contains("Log file not found yet"));
    }

    #[test]
    fn shows_log_tail() {
        let (_dir, mut ctx) = setup();
        let content: String = (1..=25).map(|i| format!("entry {i}\n")).collect();
        std::fs::write(&ctx.log_file, content).unwrap();

        let out = drive(&mut ctx, "5\n6\n");
        assert!(out.contains("Last 20 log entries"));
        assert!(out.contains("entry 25"));
        assert!(out.contains("entry 6\n"));
        assert!(!out.contains("entry 5\n"));
    }
}
