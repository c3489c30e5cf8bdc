//! Attendance extraction within resolved program ranges.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::boundary::{BoundaryConfiguration, BoundaryRange, Diagnostic, MonthMarker};
use crate::catalog::{GradeTable, ProgramId};
use crate::detect::scan_months;
use crate::grid::Grid;
use crate::profile::SheetLayout;
use crate::progress::{Progress, Stage};

/// One attendance figure for a program, month and grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub program: ProgramId,
    pub month: u8,
    pub grade: String,
    pub value: f64,
    /// Source row the value was read from.
    pub row: usize,
}

/// Records extracted from a grid, plus the findings that kept some programs
/// out of the extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<AttendanceRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extracts attendance records for every extractable range in `config`.
///
/// A row yields a record when its grade cell names a grade from `grades`,
/// its `value_column` cell holds a finite non-negative number, and a month
/// marker sits on or above it inside the range. Any other row is skipped;
/// a missing value never becomes zero. Unresolved and overlapping ranges
/// produce no records at all.
#[instrument(level = "info", skip_all, fields(value_column = value_column))]
pub fn extract(
    grid: &dyn Grid,
    config: &BoundaryConfiguration,
    layout: &SheetLayout,
    value_column: usize,
    grades: &GradeTable,
    progress: &mut Progress<'_>,
) -> Extraction {
    let diagnostics = config.diagnostics();
    for diagnostic in &diagnostics {
        warn!(%diagnostic, "program skipped");
    }

    let ranges = config.extractable();
    let rows_total: usize = ranges
        .iter()
        .filter_map(|range| clamped_span(range, grid))
        .map(|(start, stop)| stop - start + 1)
        .sum();

    let mut records = Vec::new();
    let mut rows_done = 0usize;
    for range in ranges {
        let Some((start, stop)) = clamped_span(range, grid) else {
            warn!(program = %range.program, "program range lies outside the sheet");
            continue;
        };
        let before = records.len();
        extract_range(
            grid,
            range,
            layout,
            value_column,
            grades,
            &mut records,
            &mut |done| progress.tick(Stage::Extract, rows_done + done, rows_total),
        );
        rows_done += stop - start + 1;
        debug!(program = %range.program, records = records.len() - before, "program extracted");
    }
    progress.finish(Stage::Extract, rows_total);

    info!(records = records.len(), "attendance extraction finished");
    Extraction {
        records,
        diagnostics,
    }
}

/// The part of `range` inside the grid. Stored or edited bounds may point
/// past the last row.
fn clamped_span(range: &BoundaryRange, grid: &dyn Grid) -> Option<(usize, usize)> {
    let (start, stop) = range.span()?;
    let last = grid.row_count().checked_sub(1)?;
    (start <= last).then(|| (start, stop.min(last)))
}

fn extract_range(
    grid: &dyn Grid,
    range: &BoundaryRange,
    layout: &SheetLayout,
    value_column: usize,
    grades: &GradeTable,
    records: &mut Vec<AttendanceRecord>,
    on_row: &mut dyn FnMut(usize),
) {
    let Some((start, stop)) = clamped_span(range, grid) else {
        return;
    };
    let rescanned;
    let markers: &[MonthMarker] = if range.months.is_empty() {
        rescanned = scan_months(grid, layout, start, stop);
        &rescanned
    } else {
        &range.months
    };

    for (offset, row) in (start..=stop).enumerate() {
        on_row(offset + 1);

        let Some(month) = month_for_row(markers, row) else {
            continue;
        };
        let grade_cell = grid.cell(row, layout.grade_column).to_string();
        let Some(grade) = grades.recognize(&grade_cell) else {
            continue;
        };
        let Some(value) = grid.cell(row, value_column).as_quantity() else {
            continue;
        };

        records.push(AttendanceRecord {
            program: range.program.clone(),
            month,
            grade: grade.to_string(),
            value,
            row,
        });
    }
}

/// Month of the nearest marker on or above `row`.
fn month_for_row(markers: &[MonthMarker], row: usize) -> Option<u8> {
    markers
        .iter()
        .take_while(|marker| marker.row <= row)
        .last()
        .map(|marker| marker.month)
}
