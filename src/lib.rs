//! # sheet-linker
//!
//! Finds email addresses, websites and professional-network profile URLs in
//! spreadsheet columns and turns them into styled hyperlinks.
//!
//! ## Features
//!
//! - Pattern-based classification of cell text
//! - Column type inference by majority vote
//! - Batch processing with per-file failure isolation
//! - Timestamped backups, JSON settings and a rotating log file
//!
//! ## Quick Start
//!
//! ```rust
//! use sheet_linker::classify::{classify, ContentType};
//!
//! assert_eq!(classify("jane@example.com"), ContentType::Email);
//! assert_eq!(classify("example.com"), ContentType::Website);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod batch;
pub mod classify;
pub mod cli;
pub mod column;
pub mod config;
pub mod processor;
pub mod utils;
pub mod workbook;

pub use crate::cli::Cli;

/// The current version of sheet-linker.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
