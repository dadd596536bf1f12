//! Log viewing command.

use anyhow::Result;
use clap::Parser;
use termcolor::WriteColor;

use super::{output, AppContext};
use crate::utils::logging;

/// Lines shown when `--lines` is not given.
pub const DEFAULT_TAIL_LINES: usize = 20;

/// Shows the end of the log file.
#[derive(Parser)]
pub struct LogCommand {
    /// Number of lines to show.
    #[arg(long, short = 'n', default_value_t = DEFAULT_TAIL_LINES)]
    pub lines: usize,
}

impl LogCommand {
    /// Executes the log command.
    pub fn execute(self, ctx: &AppContext) -> Result<()> {
        view_log(ctx, self.lines, &mut output::stdout())
    }
}

/// Prints the last `lines` log entries, or a hint when there is no log yet.
pub(crate) fn view_log(ctx: &AppContext, lines: usize, out: &mut dyn WriteColor) -> Result<()> {
    if !ctx.log_file.exists() {
        output::failure(out, "Log file not found yet. Process some files first.")?;
        return Ok(());
    }

    match logging::tail(&ctx.log_file, lines) {
        Ok(entries) => {
            output::heading(
                out,
                &format!(
                    "📋 Last {lines} log entries from {}:",
                    ctx.log_file.display()
                ),
            )?;
            writeln!(out, "{}", "=".repeat(60))?;
            for entry in entries {
                writeln!(out, "{entry}")?;
            }
        }
        Err(e) => output::failure(out, &format!("Could not read log file: {e:#}"))?,
    }
    Ok(())
}
