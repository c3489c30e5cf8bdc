//! Read-only access to a two-dimensional cell grid.
//!
//! The processor never talks to a workbook directly. Everything downstream of
//! the reader works against the [`Grid`] trait, which keeps detection and
//! extraction testable with small in-memory sheets.

use std::fmt;

/// Value held by a single cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Cell without content.
    #[default]
    Empty,
    /// Textual content, exactly as read.
    Text(String),
    /// Numeric content.
    Number(f64),
}

impl CellValue {
    /// Returns `true` when the cell holds nothing printable.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Interprets the cell as a bare integer month number between 1 and 12.
    pub fn as_month(&self) -> Option<u8> {
        let month = match self {
            CellValue::Number(value) => {
                if value.fract() != 0.0 || !(1.0..=12.0).contains(value) {
                    return None;
                }
                *value as u8
            }
            CellValue::Text(text) => text.trim().parse::<u8>().ok()?,
            CellValue::Empty => return None,
        };
        (1..=12).contains(&month).then_some(month)
    }

    /// Interprets the cell as an attendance quantity. Only finite,
    /// non-negative numbers qualify.
    pub fn as_quantity(&self) -> Option<f64> {
        let number = match self {
            CellValue::Number(value) => *value,
            CellValue::Text(text) => text.trim().replace(',', "").parse::<f64>().ok()?,
            CellValue::Empty => return None,
        };
        (number.is_finite() && number >= 0.0).then_some(number)
    }

    /// Returns the text used for label matching: lower-cased with runs of
    /// whitespace collapsed to a single space.
    pub fn normalized_text(&self) -> String {
        normalize_label(&self.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(value) => write!(f, "{value}"),
        }
    }
}

/// Lower-cases `raw` and collapses whitespace runs.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read access to a grid of cells addressed by 0-based `(row, column)`.
pub trait Grid {
    /// Number of rows covered by the grid.
    fn row_count(&self) -> usize;

    /// Number of columns covered by the grid.
    fn col_count(&self) -> usize;

    /// Cell at the given position. Positions outside the grid read as empty.
    fn cell(&self, row: usize, col: usize) -> CellValue;

    /// Index of the last row holding at least one non-empty cell.
    fn last_populated_row(&self) -> Option<usize> {
        let cols = self.col_count();
        (0..self.row_count())
            .rev()
            .find(|&row| (0..cols).any(|col| !self.cell(row, col).is_empty()))
    }
}

/// Grid materialised in memory, row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    rows: Vec<Vec<CellValue>>,
    cols: usize,
}

impl SheetGrid {
    /// Builds a grid from rows of cells. Ragged rows are allowed; missing
    /// cells read as empty.
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        Self { rows, cols }
    }

    /// Creates an empty grid with `rows` rows.
    pub fn with_rows(rows: usize) -> Self {
        Self {
            rows: vec![Vec::new(); rows],
            cols: 0,
        }
    }

    /// Sets a single cell, growing the grid as needed.
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
        self.cols = self.cols.max(col + 1);
    }

    /// Sets a text cell.
    pub fn set_text(&mut self, row: usize, col: usize, text: impl Into<String>) {
        self.set(row, col, CellValue::Text(text.into()));
    }

    /// Sets a numeric cell.
    pub fn set_number(&mut self, row: usize, col: usize, value: f64) {
        self.set(row, col, CellValue::Number(value));
    }
}

impl Grid for SheetGrid {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn col_count(&self) -> usize {
        self.cols
    }

    fn cell(&self, row: usize, col: usize) -> CellValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .cloned()
            .unwrap_or_default()
    }
}
