//! Boundary detection: finds where each catalog program's section lives.
//!
//! Detection is a two-pass scan. The first pass walks the program label
//! column once, top to bottom, and records the first row whose label matches
//! each catalog entry. The second pass derives stop rows from the sorted start
//! rows and records the month markers inside every resolved range, so the
//! extractor can align data rows without scanning for months again.

use tracing::{debug, info, instrument, warn};

use crate::boundary::{BoundaryConfiguration, BoundaryRange, MonthMarker, Provenance};
use crate::catalog::ProgramCatalog;
use crate::grid::{Grid, normalize_label};
use crate::profile::SheetLayout;
use crate::progress::{Progress, Stage};

/// Detects program boundaries in `grid`.
///
/// Programs whose label never appears come back unresolved. Two programs
/// sharing a label resolve to the same range and are later reported as an
/// overlap, which keeps both out of extraction.
#[instrument(level = "info", skip_all, fields(rows = grid.row_count(), programs = catalog.len()))]
pub fn detect(
    grid: &dyn Grid,
    catalog: &ProgramCatalog,
    layout: &SheetLayout,
    progress: &mut Progress<'_>,
) -> BoundaryConfiguration {
    let starts = find_start_rows(grid, catalog, layout, progress);
    let last_row = grid.last_populated_row();

    let mut ordered: Vec<usize> = starts.iter().flatten().copied().collect();
    ordered.sort_unstable();
    ordered.dedup();

    let ranges: Vec<BoundaryRange> = catalog
        .entries()
        .iter()
        .zip(&starts)
        .map(|(entry, start)| {
            let Some(start) = *start else {
                warn!(program = %entry.id, match_text = %entry.match_text, "program section not found");
                return BoundaryRange::unresolved(entry.id.clone());
            };
            let stop = ordered
                .iter()
                .find(|&&candidate| candidate > start)
                .map(|next| next - 1)
                .or(last_row)
                .unwrap_or(start)
                .max(start);
            let mut range = BoundaryRange::resolved(entry.id.clone(), start, stop);
            range.months = scan_months(grid, layout, start, stop);
            debug!(
                program = %entry.id,
                start,
                stop,
                months = range.months.len(),
                "resolved program section"
            );
            range
        })
        .collect();

    let resolved = ranges.iter().filter(|range| range.is_resolved()).count();
    info!(resolved, total = ranges.len(), "boundary detection finished");
    progress.finish(Stage::Detect, grid.row_count());

    BoundaryConfiguration::new(None, Provenance::Detected, ranges)
}

/// Month markers in the month column between `start` and `stop`, inclusive.
/// Rows past the end of the grid are not visited.
pub fn scan_months(
    grid: &dyn Grid,
    layout: &SheetLayout,
    start: usize,
    stop: usize,
) -> Vec<MonthMarker> {
    let Some(last) = grid.row_count().checked_sub(1) else {
        return Vec::new();
    };
    (start..=stop.min(last))
        .filter_map(|row| {
            grid.cell(row, layout.month_column)
                .as_month()
                .map(|month| MonthMarker { row, month })
        })
        .collect()
}

fn find_start_rows(
    grid: &dyn Grid,
    catalog: &ProgramCatalog,
    layout: &SheetLayout,
    progress: &mut Progress<'_>,
) -> Vec<Option<usize>> {
    let wanted: Vec<String> = catalog
        .entries()
        .iter()
        .map(|entry| normalize_label(&entry.match_text))
        .collect();
    let mut starts: Vec<Option<usize>> = vec![None; wanted.len()];
    let total = grid.row_count();

    for row in 0..total {
        let label = grid.cell(row, layout.program_column).normalized_text();
        if !label.is_empty() {
            for (index, text) in wanted.iter().enumerate() {
                if starts[index].is_none() && *text == label {
                    starts[index] = Some(row);
                }
            }
        }
        progress.tick(Stage::Detect, row + 1, total);
    }

    starts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Diagnostic;
    use crate::catalog::{ProgramEntry, ProgramId};
    use crate::grid::SheetGrid;
    use crate::progress::ScanProgress;

    fn layout() -> SheetLayout {
        SheetLayout {
            sheet: None,
            program_column: 1,
            month_column: 2,
            grade_column: 4,
            value_column: 6,
        }
    }

    fn catalog() -> ProgramCatalog {
        ProgramCatalog::new(vec![
            ProgramEntry::new("Alpha", "Alpha Program"),
            ProgramEntry::new("Beta", "Beta Program"),
            ProgramEntry::new("Gamma", "Gamma Program"),
        ])
        .expect("catalog")
    }

    fn grid_with_labels(labels: &[(usize, &str)], rows: usize) -> SheetGrid {
        let mut grid = SheetGrid::with_rows(rows);
        for (row, label) in labels {
            grid.set_text(*row, 1, *label);
        }
        grid
    }

    #[test]
    fn resolves_every_program_in_catalog_order() {
        let mut grid = grid_with_labels(
            &[(2, "Alpha Program"), (8, "BETA  program"), (15, "Gamma Program")],
            30,
        );
        grid.set_number(21, 6, 4.0);

        let config = detect(&grid, &catalog(), &layout(), &mut Progress::none());
        let spans: Vec<_> = config.ranges().iter().map(BoundaryRange::span).collect();

        assert_eq!(spans, vec![Some((2, 7)), Some((8, 14)), Some((15, 21))]);
        assert!(config.overlaps().is_empty());
        assert_eq!(config.provenance, Provenance::Detected);
    }

    #[test]
    fn missing_program_leaves_others_untouched() {
        let grid = grid_with_labels(&[(2, "Alpha Program"), (15, "Gamma Program")], 20);

        let config = detect(&grid, &catalog(), &layout(), &mut Progress::none());

        assert_eq!(config.get("Alpha").and_then(BoundaryRange::span), Some((2, 14)));
        assert_eq!(config.get("Beta").and_then(BoundaryRange::span), None);
        assert_eq!(config.get("Gamma").and_then(BoundaryRange::span), Some((15, 15)));
        assert_eq!(
            config.diagnostics(),
            vec![Diagnostic::Unresolved {
                program: ProgramId::from("Beta")
            }]
        );
    }

    #[test]
    fn programs_out_of_catalog_order_still_resolve() {
        let grid = grid_with_labels(&[(2, "Gamma Program"), (10, "Alpha Program")], 12);

        let config = detect(&grid, &catalog(), &layout(), &mut Progress::none());

        assert_eq!(config.get("Gamma").and_then(BoundaryRange::span), Some((2, 9)));
        assert_eq!(config.get("Alpha").and_then(BoundaryRange::span), Some((10, 10)));
    }

    #[test]
    fn shared_match_text_is_reported_as_overlap() {
        let catalog = ProgramCatalog::new(vec![
            ProgramEntry::new("Alpha", "Same Label"),
            ProgramEntry::new("Beta", "Same Label"),
        ])
        .expect("catalog");
        let grid = grid_with_labels(&[(3, "Same Label")], 6);

        let config = detect(&grid, &catalog, &layout(), &mut Progress::none());

        assert_eq!(config.overlaps().len(), 1);
        assert!(config.extractable().is_empty());
    }

    #[test]
    fn month_markers_are_recorded_inside_ranges() {
        let mut grid = grid_with_labels(&[(5, "Alpha Program")], 11);
        grid.set_number(5, 2, 1.0);
        grid.set_text(8, 2, "2");
        grid.set_text(9, 2, "total");
        grid.set_number(10, 6, 1.0);

        let config = detect(&grid, &catalog(), &layout(), &mut Progress::none());
        let alpha = config.get("Alpha").expect("alpha range");

        assert_eq!(
            alpha.months,
            vec![MonthMarker { row: 5, month: 1 }, MonthMarker { row: 8, month: 2 }]
        );
    }

    #[test]
    fn detection_is_deterministic_and_reports_progress() {
        let grid = grid_with_labels(&[(100, "Alpha Program"), (400, "Beta Program")], 600);
        let mut updates = 0;
        let mut hook = |_: ScanProgress| updates += 1;

        let first = detect(&grid, &catalog(), &layout(), &mut Progress::new(&mut hook));
        let second = detect(&grid, &catalog(), &layout(), &mut Progress::none());

        assert_eq!(first, second);
        assert_eq!(updates, 3);
    }
}
