//! Folder-level processing.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::processor::{ConversionResult, FileProcessor};
use crate::utils::ProgressSink;

/// Errors that stop a batch before any file is processed.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The folder does not exist or is not a directory.
    #[error("Folder not found: {}", .0.display())]
    FolderNotFound(PathBuf),

    /// The folder holds no file with a supported extension.
    #[error("No spreadsheet files found in: {}", .0.display())]
    NoEligibleFiles(PathBuf),

    /// The folder could not be listed.
    #[error("Failed to read folder {}: {source}", path.display())]
    Io {
        /// Folder being listed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A configured extension does not form a valid pattern.
    #[error("Invalid extension pattern: {0}")]
    Pattern(#[from] globset::Error),
}

/// Case-insensitive file extension allow-list.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    globs: GlobSet,
}

impl ExtensionFilter {
    /// Builds a filter from extensions such as `.xlsx`.
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Result<Self, BatchError> {
        let mut builder = GlobSetBuilder::new();
        for extension in extensions {
            let extension = extension.as_ref().trim().trim_start_matches('.');
            let glob = GlobBuilder::new(&format!("*.{extension}"))
                .case_insensitive(true)
                .literal_separator(true)
                .build()?;
            builder.add(glob);
        }
        Ok(Self {
            globs: builder.build()?,
        })
    }

    /// Returns true when the file name ends with an allowed extension.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.globs.is_match(Path::new(name)))
    }
}

/// Results of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// One entry per eligible file, in processing order.
    pub results: Vec<ConversionResult>,
}

impl BatchSummary {
    /// Files converted and saved.
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    /// Eligible files found.
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Results of files that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Whether at least one file was converted.
    pub fn any_succeeded(&self) -> bool {
        self.success_count() > 0
    }
}

/// Lists the eligible regular files directly inside `folder`.
pub fn eligible_files(folder: &Path, filter: &ExtensionFilter) -> Result<Vec<PathBuf>, BatchError> {
    if !folder.is_dir() {
        return Err(BatchError::FolderNotFound(folder.to_path_buf()));
    }

    let io_error = |source| BatchError::Io {
        path: folder.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(folder).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && filter.matches(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Processes every eligible file in `folder`, one after another.
///
/// A failing file is recorded in the summary and the batch moves on.
pub fn process_folder(
    folder: &Path,
    filter: &ExtensionFilter,
    processor: &FileProcessor,
    progress: &mut dyn ProgressSink,
) -> Result<BatchSummary, BatchError> {
    let files = eligible_files(folder, filter).inspect_err(|e| error!(error = %e, "Batch aborted"))?;
    if files.is_empty() {
        warn!(folder = %folder.display(), "No spreadsheet files found");
        return Err(BatchError::NoEligibleFiles(folder.to_path_buf()));
    }

    let total = files.len();
    info!(folder = %folder.display(), files = total, "Starting batch processing");

    let mut summary = BatchSummary::default();
    for (i, file) in files.iter().enumerate() {
        let result = processor.process(file, progress);
        if !result.success {
            error!(path = %file.display(), "Failed to process");
        }
        summary.results.push(result);
        info!(done = i + 1, total, "Batch progress");
    }

    info!(
        succeeded = summary.success_count(),
        total,
        "Batch processing completed"
    );
    Ok(summary)
}
