//! Single-file conversion command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Args, Parser};
use termcolor::WriteColor;

use super::{output, AppContext};
use crate::batch::ExtensionFilter;
use crate::processor::ConversionResult;
use crate::utils::progress_sink;

/// Options shared by the conversion commands.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Prints a line every 10% instead of drawing a progress bar.
    #[arg(long)]
    pub plain_progress: bool,

    /// Skips the backup copy for this run.
    #[arg(long)]
    pub no_backup: bool,
}

/// Converts a single spreadsheet.
#[derive(Parser)]
pub struct ConvertCommand {
    /// Spreadsheet to convert.
    pub file: PathBuf,

    #[command(flatten)]
    pub options: RunOptions,
}

impl ConvertCommand {
    /// Executes the convert command.
    pub fn execute(self, ctx: &AppContext) -> Result<()> {
        let mut out = output::stdout();
        let result = convert_file(ctx, &self.file, self.options, &mut out)?;
        if !result.success {
            bail!("Conversion of {} failed", self.file.display());
        }
        Ok(())
    }
}

/// Checks the path, converts it and prints the outcome.
pub(crate) fn convert_file(
    ctx: &AppContext,
    path: &Path,
    options: RunOptions,
    out: &mut dyn WriteColor,
) -> Result<ConversionResult> {
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    let filter = ExtensionFilter::new(&ctx.config.supported_extensions)?;
    if !filter.matches(path) {
        bail!(
            "Please provide a spreadsheet file ({})",
            ctx.config.supported_extensions.join(", ")
        );
    }

    let mut progress = progress_sink(options.plain_progress);
    let result = ctx.processor(options.no_backup).process(path, progress.as_mut());
    output::report_result(out, &result)?;
    Ok(result)
}
