use std::path::Path;

use tracing::{debug, info, instrument, warn};

use crate::aggregate::{MonthTotal, SummaryRow, aggregate, month_totals};
use crate::boundary::{BoundaryConfiguration, Diagnostic, Readiness};
use crate::consolidate::consolidate;
use crate::detect::detect;
use crate::error::{ProcessorError, Result};
use crate::extract::{AttendanceRecord, extract};
use crate::grid::{Grid, SheetGrid};
use crate::io::{csv_report, excel_read, excel_write};
use crate::profile::Profile;
use crate::progress::Progress;
use crate::report::{ReportContext, RunResults, build_workbook, dashboard_rows};

/// Everything a run produced, stage by stage.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Boundaries the run extracted from, aligned to the catalog.
    pub boundaries: BoundaryConfiguration,
    pub readiness: Readiness,
    pub diagnostics: Vec<Diagnostic>,
    /// Consolidated attendance records.
    pub records: Vec<AttendanceRecord>,
    pub summary: Vec<SummaryRow>,
    pub totals: Vec<MonthTotal>,
}

/// Runs detection (unless `boundaries` is given), extraction, consolidation
/// and aggregation over `grid`, strictly in sequence.
#[instrument(level = "info", skip_all, fields(rows = grid.row_count(), supplied = boundaries.is_some()))]
pub fn run(
    grid: &dyn Grid,
    profile: &Profile,
    boundaries: Option<&BoundaryConfiguration>,
    progress: &mut Progress<'_>,
) -> Result<PipelineOutcome> {
    let boundaries = match boundaries {
        Some(config) => config.aligned_to(&profile.catalog),
        None => detect(grid, &profile.catalog, &profile.layout, progress),
    };

    let readiness = boundaries.readiness();
    if readiness.ready == 0 {
        return Err(ProcessorError::NoBoundaries);
    }
    if readiness.is_sparse() {
        warn!(
            ready = readiness.ready,
            total = readiness.total,
            "fewer than half of the programs have usable boundaries"
        );
    }

    let extraction = extract(
        grid,
        &boundaries,
        &profile.layout,
        profile.layout.value_column,
        &profile.grades,
        progress,
    );
    let records = consolidate(&extraction.records, &profile.rules);
    let summary = aggregate(&records, &profile.enrollment, &profile.report_order());
    let totals = month_totals(&summary);
    info!(
        records = records.len(),
        summary_rows = summary.len(),
        "pipeline finished"
    );

    Ok(PipelineOutcome {
        boundaries,
        readiness,
        diagnostics: extraction.diagnostics,
        records,
        summary,
        totals,
    })
}

/// Input and outputs of a whole-workbook run.
#[derive(Debug, Clone, Copy)]
pub struct WorkbookJob<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    /// Optional dashboard CSV destination.
    pub report: Option<&'a Path>,
    /// Boundaries to use instead of detecting them.
    pub boundaries: Option<&'a BoundaryConfiguration>,
    pub context: &'a ReportContext,
}

/// Reads the attendance workbook named by the profile layout.
pub fn load_grid(input: &Path, profile: &Profile) -> Result<SheetGrid> {
    if !input.exists() {
        return Err(ProcessorError::MissingInput(input.to_path_buf()));
    }
    excel_read::read_grid(input, profile.layout.sheet.as_deref())
}

/// Detects boundaries in an attendance workbook.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn detect_workbook(
    input: &Path,
    profile: &Profile,
    progress: &mut Progress<'_>,
) -> Result<BoundaryConfiguration> {
    let grid = load_grid(input, profile)?;
    Ok(detect(&grid, &profile.catalog, &profile.layout, progress))
}

/// Processes an attendance workbook into the normalized output workbook and,
/// when requested, the dashboard report.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %job.input.display(), output = %job.output.display())
)]
pub fn process_workbook(
    job: WorkbookJob<'_>,
    profile: &Profile,
    progress: &mut Progress<'_>,
) -> Result<PipelineOutcome> {
    let grid = load_grid(job.input, profile)?;
    let outcome = run(&grid, profile, job.boundaries, progress)?;
    drop(grid);

    let workbook = build_workbook(RunResults {
        summary: &outcome.summary,
        totals: &outcome.totals,
        records: &outcome.records,
        boundaries: &outcome.boundaries,
    });
    debug!(sheet_count = workbook.tables.len(), "workbook constructed");
    excel_write::write_workbook(job.output, &workbook)?;

    if let Some(report) = job.report {
        let rows = dashboard_rows(&outcome.summary, &profile.catalog, &profile.grades, job.context);
        csv_report::write_dashboard(report, &rows)?;
    }

    Ok(outcome)
}
