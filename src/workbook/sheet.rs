//! In-memory worksheet grid.

use std::collections::{BTreeMap, BTreeSet};

use super::cell::{column_letter, Cell, CellRef, CellValue, HyperlinkStyle};

/// Sparse, row-major grid of the active sheet's cells.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<CellRef, Cell>,
    max_row: u32,
    max_column: u32,
    pending: BTreeSet<CellRef>,
}

impl Worksheet {
    /// Creates an empty worksheet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sheet name as shown on its tab.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Highest row that holds a cell (0 for an empty sheet).
    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    /// Highest column that holds a cell (0 for an empty sheet).
    pub fn max_column(&self) -> u32 {
        self.max_column
    }

    /// Inserts or replaces a cell and grows the extents.
    pub fn insert(&mut self, cell: Cell) {
        self.max_row = self.max_row.max(cell.row);
        self.max_column = self.max_column.max(cell.column);
        self.cells.insert(cell.reference(), cell);
    }

    /// Returns the cell at the given 1-based position.
    pub fn cell(&self, row: u32, column: u32) -> Option<&Cell> {
        self.cells.get(&CellRef::new(row, column))
    }

    /// Returns the value at a position, `Empty` when no cell exists.
    pub fn value(&self, row: u32, column: u32) -> &CellValue {
        self.cell(row, column)
            .map(|c| &c.value)
            .unwrap_or(&CellValue::Empty)
    }

    /// Returns the classifier text for a position.
    pub fn text(&self, row: u32, column: u32) -> String {
        self.value(row, column).to_text()
    }

    /// Header label for a column: the row 1 text, or `Column <letter>`.
    pub fn header_label(&self, column: u32) -> String {
        let header = self.text(1, column);
        if header.is_empty() {
            format!("Column {}", column_letter(column))
        } else {
            header
        }
    }

    /// Annotates an existing cell with a hyperlink and font override.
    ///
    /// Returns false when no cell exists at that position.
    pub fn set_hyperlink(
        &mut self,
        row: u32,
        column: u32,
        target: String,
        style: &HyperlinkStyle,
    ) -> bool {
        let reference = CellRef::new(row, column);
        match self.cells.get_mut(&reference) {
            Some(cell) => {
                cell.hyperlink = Some(target);
                cell.hyperlink_style = Some(style.clone());
                self.pending.insert(reference);
                true
            }
            None => false,
        }
    }

    /// Cells annotated since the sheet was loaded, in row-major order.
    pub fn pending_hyperlinks(&self) -> impl Iterator<Item = &Cell> {
        self.pending.iter().filter_map(|r| self.cells.get(r))
    }

    /// Number of cells annotated since the sheet was loaded.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn cell_mut(&mut self, reference: CellRef) -> Option<&mut Cell> {
        self.cells.get_mut(&reference)
    }
}
