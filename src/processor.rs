//! Single-file conversion.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::column::{analyze_column, convert_column, DEFAULT_SAMPLE_SIZE};
use crate::config::BotConfig;
use crate::utils::{BackupManager, ProgressSink};
use crate::workbook::{column_letter, HyperlinkStyle, Workbook};

const OUTPUT_SUFFIX: &str = "_with_hyperlinks";

/// Outcome of processing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// File that was read.
    pub source: PathBuf,
    /// File that was written, when the conversion got that far.
    pub output: Option<PathBuf>,
    /// Cells turned into hyperlinks.
    pub hyperlinks: usize,
    /// Backup copy of the source, when one was taken.
    pub backup: Option<PathBuf>,
    /// Rows and columns of the active sheet.
    pub dimensions: Option<(u32, u32)>,
    /// Whether the output was written.
    pub success: bool,
    /// Why the conversion failed.
    pub error: Option<String>,
}

impl ConversionResult {
    fn failed(source: &Path, backup: Option<PathBuf>, message: String) -> Self {
        Self {
            source: source.to_path_buf(),
            output: None,
            hyperlinks: 0,
            backup,
            dimensions: None,
            success: false,
            error: Some(message),
        }
    }
}

/// Path the converted copy of `source` is written to:
/// `<stem>_with_hyperlinks.<ext>` in the same directory.
pub fn output_path_for(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{stem}{OUTPUT_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{OUTPUT_SUFFIX}"),
    };
    source.with_file_name(name)
}

/// Converts every column of a workbook's active sheet.
#[derive(Debug, Clone)]
pub struct FileProcessor {
    backups: BackupManager,
    style: HyperlinkStyle,
    max_rows: u32,
    auto_detect: bool,
}

impl FileProcessor {
    /// Creates a processor from the current settings.
    pub fn new(config: &BotConfig, backups: BackupManager) -> Self {
        Self {
            backups,
            style: config.hyperlink_style(),
            max_rows: config.max_rows_to_process,
            auto_detect: config.auto_detect,
        }
    }

    /// Processes one file. Failures are reported in the result, never raised.
    pub fn process(&self, path: &Path, progress: &mut dyn ProgressSink) -> ConversionResult {
        info!(path = %path.display(), "Starting processing");

        let backup = match self.backups.create_backup(path) {
            Ok(backup) => backup,
            Err(e) => {
                error!(path = %path.display(), error = %format!("{e:#}"), "Backup failed");
                None
            }
        };

        match self.convert(path, progress) {
            Ok((output, hyperlinks, dimensions)) => {
                info!(
                    path = %path.display(),
                    output = %output.display(),
                    hyperlinks,
                    "Conversion completed"
                );
                ConversionResult {
                    source: path.to_path_buf(),
                    output: Some(output),
                    hyperlinks,
                    backup,
                    dimensions: Some(dimensions),
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(path = %path.display(), error = %message, "Error processing file");
                ConversionResult::failed(path, backup, message)
            }
        }
    }

    fn convert(
        &self,
        path: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<(PathBuf, usize, (u32, u32))> {
        let mut workbook = Workbook::open(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        let sheet = workbook.active_sheet_mut();
        let dimensions = (sheet.max_row(), sheet.max_column());
        info!(
            sheet = %sheet.name(),
            rows = dimensions.0,
            columns = dimensions.1,
            "Active sheet loaded"
        );

        let mut total = 0;
        for column in 1..=sheet.max_column() {
            let header = sheet.header_label(column);
            let profile = analyze_column(sheet, column, DEFAULT_SAMPLE_SIZE);
            if self.auto_detect {
                info!(
                    column = %column_letter(column),
                    header = %header,
                    detected = profile.label(),
                    confidence = profile.votes,
                    "Column analysed"
                );
            } else {
                debug!(
                    column = %column_letter(column),
                    detected = profile.label(),
                    "Column analysed"
                );
            }
            total += convert_column(sheet, column, self.max_rows, &self.style, progress);
        }

        let output = output_path_for(path);
        workbook
            .save(&output)
            .with_context(|| format!("Failed to save workbook: {}", output.display()))?;

        Ok((output, total, dimensions))
    }
}
