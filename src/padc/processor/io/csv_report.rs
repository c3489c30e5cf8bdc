use std::path::Path;

use tracing::{info, instrument};

use crate::error::Result;
use crate::report::{DASHBOARD_COLUMNS, DashboardRow};

/// Writes dashboard lines as CSV with a header row.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn write_dashboard(path: &Path, rows: &[DashboardRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(DASHBOARD_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(rows = rows.len(), "dashboard report written");
    Ok(())
}
