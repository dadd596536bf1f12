//! Folder conversion command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use termcolor::WriteColor;

use super::convert::RunOptions;
use super::{output, AppContext};
use crate::batch::{process_folder, BatchSummary, ExtensionFilter};
use crate::utils::progress_sink;

/// Converts every spreadsheet directly inside a folder.
#[derive(Parser)]
pub struct BatchCommand {
    /// Folder to scan (not recursive).
    pub folder: PathBuf,

    #[command(flatten)]
    pub options: RunOptions,
}

impl BatchCommand {
    /// Executes the batch command.
    pub fn execute(self, ctx: &AppContext) -> Result<()> {
        let mut out = output::stdout();
        let summary = run_batch(ctx, &self.folder, self.options, &mut out)?;
        if !summary.any_succeeded() {
            bail!("No file in {} was converted", self.folder.display());
        }
        Ok(())
    }
}

/// Processes a folder and prints each result followed by the totals.
pub(crate) fn run_batch(
    ctx: &AppContext,
    folder: &Path,
    options: RunOptions,
    out: &mut dyn WriteColor,
) -> Result<BatchSummary> {
    let filter = ExtensionFilter::new(&ctx.config.supported_extensions)?;
    let processor = ctx.processor(options.no_backup);
    let mut progress = progress_sink(options.plain_progress);

    let summary = process_folder(folder, &filter, &processor, progress.as_mut())?;
    output::heading(
        out,
        &format!("📁 Processed {} spreadsheet files", summary.total_count()),
    )?;
    for result in &summary.results {
        output::report_result(out, result)?;
    }
    output::report_batch(out, &summary)?;
    Ok(summary)
}
