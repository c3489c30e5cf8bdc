use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use tracing::{debug, instrument};

use crate::error::{ProcessorError, Result};
use crate::grid::{CellValue, SheetGrid};

/// Reads one worksheet into an in-memory grid.
///
/// The grid uses absolute sheet coordinates: row 0 is the workbook's first
/// row even when the used range starts further down. When `sheet` is `None`
/// the first worksheet is read.
#[instrument(level = "info", skip_all, fields(path = %path.display(), sheet))]
pub fn read_grid(path: &Path, sheet: Option<&str>) -> Result<SheetGrid> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ProcessorError::InvalidWorkbook("workbook has no sheets".into()))?,
    };
    tracing::Span::current().record("sheet", sheet_name.as_str());

    let range = read_required_sheet(&mut workbook, &sheet_name)?;
    let grid = range_to_grid(&range);
    debug!(rows = range.height(), cols = range.width(), "worksheet loaded");
    Ok(grid)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ProcessorError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ProcessorError::from)?;
    Ok(range)
}

fn range_to_grid(range: &calamine::Range<DataType>) -> SheetGrid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    let mut grid = SheetGrid::with_rows(row_offset + range.height());
    for (row_idx, row) in range.rows().enumerate() {
        for (col_idx, cell) in row.iter().enumerate() {
            let value = cell_to_value(cell);
            if value != CellValue::Empty {
                grid.set(row_offset + row_idx, col_offset + col_idx, value);
            }
        }
    }
    grid
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Text(value.to_string()),
        DataType::Empty => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn cells_are_mapped_by_kind() {
        assert_eq!(cell_to_value(&DataType::Int(4)), CellValue::Number(4.0));
        assert_eq!(
            cell_to_value(&DataType::String("TK-3".into())),
            CellValue::Text("TK-3".into())
        );
        assert_eq!(cell_to_value(&DataType::Empty), CellValue::Empty);
    }

    #[test]
    fn offset_ranges_keep_absolute_positions() {
        let mut range = calamine::Range::new((2, 1), (3, 2));
        range.set_value((2, 1), DataType::String("Alpha".into()));
        range.set_value((3, 2), DataType::Float(7.5));

        let grid = range_to_grid(&range);

        assert_eq!(grid.cell(2, 1), CellValue::Text("Alpha".into()));
        assert_eq!(grid.cell(3, 2), CellValue::Number(7.5));
        assert_eq!(grid.row_count(), 4);
    }
}
