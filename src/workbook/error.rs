//! Workbook package errors.

use thiserror::Error;

/// Errors raised while reading or writing a spreadsheet package.
#[derive(Error, Debug)]
pub enum WorkbookError {
    /// Underlying file system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not a readable zip package.
    #[error("Invalid spreadsheet package: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A package part is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An element carries a broken attribute.
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// A part required to process the workbook is absent.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// A part was parsed but its content makes no sense.
    #[error("Malformed {part}: {reason}")]
    Malformed {
        /// Package part name.
        part: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl WorkbookError {
    pub(crate) fn malformed(part: &str, reason: impl Into<String>) -> Self {
        WorkbookError::Malformed {
            part: part.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for workbook operations.
pub type Result<T> = std::result::Result<T, WorkbookError>;
