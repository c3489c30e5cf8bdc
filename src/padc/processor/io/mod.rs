pub mod csv_report;
pub mod excel_read;
pub mod excel_write;
