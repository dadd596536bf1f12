//! Configuration-related CLI commands.

use std::io::{self, IsTerminal};

use anyhow::Result;
use clap::{Parser, Subcommand};
use termcolor::WriteColor;

use super::{output, AppContext};

/// Configuration operations.
#[derive(Parser)]
pub struct ConfigCommand {
    /// Configuration subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

/// Configuration subcommands.
#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Shows the current settings.
    Show(ShowCommand),
    /// Changes one setting.
    Set(SetCommand),
    /// Restores the default settings.
    Reset(ResetCommand),
}

/// Show command options.
#[derive(Parser)]
pub struct ShowCommand {}

/// Set command options.
#[derive(Parser)]
pub struct SetCommand {
    /// Setting name, e.g. `hyperlink_color`.
    pub key: String,
    /// New value; lists are comma separated.
    pub value: String,
}

/// Reset command options.
#[derive(Parser)]
pub struct ResetCommand {}

impl ConfigCommand {
    /// Executes the config command.
    pub fn execute(self, ctx: &mut AppContext) -> Result<()> {
        let mut out = output::stdout();
        match self.command {
            ConfigSubcommands::Show(_) => show_configuration(ctx, &mut out)?,
            ConfigSubcommands::Set(cmd) => {
                ctx.manager.update(&mut ctx.config, &cmd.key, &cmd.value)?;
                if cmd.key == "log_level" {
                    ctx.log.set_level(ctx.config.log_level)?;
                }
                output::success(
                    &mut out,
                    &format!("{} = {}", cmd.key, ctx.config.get(&cmd.key)?),
                )?;
            }
            ConfigSubcommands::Reset(_) => {
                ctx.config = ctx.manager.reset()?;
                ctx.log.set_level(ctx.config.log_level)?;
                output::success(&mut out, "Configuration reset to defaults")?;
            }
        }
        Ok(())
    }
}

/// Prints every setting followed by a little system information.
pub(crate) fn show_configuration(ctx: &AppContext, out: &mut dyn WriteColor) -> Result<()> {
    output::heading(out, "⚙️  Current Configuration:")?;
    writeln!(out, "{}", "-".repeat(40))?;
    for (key, value) in ctx.config.entries() {
        writeln!(out, "  {key}: {value}")?;
    }

    output::heading(out, "📊 System Info:")?;
    writeln!(out, "  Config file: {}", ctx.manager.path().display())?;
    writeln!(out, "  Log file: {}", ctx.log_file.display())?;
    writeln!(out, "  Backup folder: {}", ctx.backup_dir.display())?;
    writeln!(
        out,
        "  Progress bars: {}",
        if io::stderr().is_terminal() {
            "Enabled"
        } else {
            "Plain"
        }
    )?;
    writeln!(out, "  Version: {}", crate::VERSION)?;
    Ok(())
}
