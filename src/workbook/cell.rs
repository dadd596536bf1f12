//! Cell values, cell references and column letters.

use std::fmt;

use chrono::NaiveDateTime;

use super::error::{Result, WorkbookError};

/// Font override applied to a converted cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HyperlinkStyle {
    /// Six hex digit RGB colour, e.g. `0000FF`.
    pub color: String,
    /// Whether the text gets a single underline.
    pub underline: bool,
}

impl HyperlinkStyle {
    /// Creates an underlined style with the given colour.
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into().to_uppercase(),
            underline: true,
        }
    }

    /// ARGB value as stored in the styles part.
    pub fn argb(&self) -> String {
        format!("FF{}", self.color)
    }
}

impl Default for HyperlinkStyle {
    fn default() -> Self {
        Self::new("0000FF")
    }
}

/// Decoded content of a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No value.
    Empty,
    /// String value (shared, inline or formula string).
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Bool(bool),
    /// Number rendered through a date format.
    Date(NaiveDateTime),
    /// Formula text without the leading `=`.
    Formula(String),
    /// Error code such as `#N/A`.
    Error(String),
}

impl CellValue {
    /// Projects the value to the text the classifier sees.
    ///
    /// Falsy values (empty text, zero, `false`) become an empty string so
    /// that they are skipped like blank cells.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) if *n == 0.0 => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(false) => String::new(),
            CellValue::Bool(true) => "True".to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Formula(f) => format!("={f}"),
            CellValue::Error(e) => e.trim().to_string(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// One cell of the active sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// 1-based row.
    pub row: u32,
    /// 1-based column.
    pub column: u32,
    /// Decoded value.
    pub value: CellValue,
    /// Index into the workbook's cell formats, when the cell has one.
    pub style_index: Option<u32>,
    /// Hyperlink target, either read from the file or set by conversion.
    pub hyperlink: Option<String>,
    /// Font override set by conversion.
    pub hyperlink_style: Option<HyperlinkStyle>,
}

impl Cell {
    /// Creates an unstyled cell.
    pub fn new(row: u32, column: u32, value: CellValue) -> Self {
        Self {
            row,
            column,
            value,
            style_index: None,
            hyperlink: None,
            hyperlink_style: None,
        }
    }

    /// A1-style reference for the cell.
    pub fn reference(&self) -> CellRef {
        CellRef::new(self.row, self.column)
    }
}

/// A1-style cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    /// 1-based row.
    pub row: u32,
    /// 1-based column.
    pub column: u32,
}

impl CellRef {
    /// Creates a reference from 1-based coordinates.
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Parses `B7`, `$AA$10` and similar references.
    pub fn parse(reference: &str) -> Result<Self> {
        let cleaned: String = reference.chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| invalid_reference(reference))?;
        let (letters, digits) = cleaned.split_at(split);

        let column = column_index(letters).ok_or_else(|| invalid_reference(reference))?;
        let row: u32 = digits.parse().map_err(|_| invalid_reference(reference))?;
        if row == 0 {
            return Err(invalid_reference(reference));
        }

        Ok(Self { row, column })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.column), self.row)
    }
}

fn invalid_reference(reference: &str) -> WorkbookError {
    WorkbookError::malformed("cell reference", format!("'{reference}'"))
}

/// Converts a 1-based column index into letters (`1` → `A`, `28` → `AB`).
pub fn column_letter(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Converts column letters into a 1-based index.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        c.is_ascii_alphabetic()
            .then(|| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
    })
}
