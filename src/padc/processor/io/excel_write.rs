use std::path::Path;

use rust_xlsxwriter::{Table, TableColumn, Workbook};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::report::{ReportCell, WorkbookData};

/// Writes the provided workbook data to the given path.
#[instrument(level = "info", skip_all, fields(path = %path.display(), sheets = workbook.tables.len()))]
pub fn write_workbook(path: &Path, workbook: &WorkbookData) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    for table in &workbook.tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;

        for (col_idx, header) in table.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            let sheet_row = (row_idx + 1) as u32;
            for (col_idx, cell) in row.iter().enumerate() {
                match cell {
                    ReportCell::Text(text) => {
                        worksheet.write_string(sheet_row, col_idx as u16, text)?;
                    }
                    ReportCell::Number(value) => {
                        worksheet.write_number(sheet_row, col_idx as u16, *value)?;
                    }
                    ReportCell::Blank => {}
                }
            }
        }

        let columns: Vec<TableColumn> = table
            .columns
            .iter()
            .map(|header| TableColumn::new().set_header(header))
            .collect();
        let mut excel_table = Table::new();
        excel_table.set_autofilter(true).set_columns(&columns);

        let col_end = (table.columns.len() as u16).saturating_sub(1);
        // An Excel table needs at least one data row.
        let row_end = table.rows.len().max(1) as u32;
        worksheet.add_table(0, 0, row_end, col_end, &excel_table)?;
        debug!(sheet = %table.sheet_name, rows = table.rows.len(), "sheet written");
    }

    workbook_writer.save(path)?;
    Ok(())
}
