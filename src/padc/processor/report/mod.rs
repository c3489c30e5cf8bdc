//! Flattens pipeline results into tables ready to be written out.
//!
//! The normalized workbook carries one table per concern (summary rows,
//! month totals, consolidated records, boundaries). The dashboard report is a
//! single flat table with descriptive columns for the school and year.

use serde::Serialize;

use crate::aggregate::{MonthTotal, SummaryRow};
use crate::boundary::BoundaryConfiguration;
use crate::catalog::{GradeTable, ProgramCatalog};
use crate::extract::AttendanceRecord;

/// Sheet name for summary rows.
pub const SUMMARY_SHEET: &str = "Summary";
/// Sheet name for program and month totals.
pub const TOTALS_SHEET: &str = "Month Totals";
/// Sheet name for consolidated attendance records.
pub const RECORDS_SHEET: &str = "Records";
/// Sheet name for the boundaries used by the run.
pub const BOUNDARIES_SHEET: &str = "Boundaries";

/// One output cell. Absent values stay blank; they are never written as 0.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportCell {
    Text(String),
    Number(f64),
    Blank,
}

impl From<&str> for ReportCell {
    fn from(value: &str) -> Self {
        ReportCell::Text(value.to_string())
    }
}

impl From<f64> for ReportCell {
    fn from(value: f64) -> Self {
        ReportCell::Number(value)
    }
}

impl From<Option<f64>> for ReportCell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(ReportCell::Blank, ReportCell::Number)
    }
}

impl From<Option<usize>> for ReportCell {
    fn from(value: Option<usize>) -> Self {
        value.map_or(ReportCell::Blank, |row| ReportCell::Number(row as f64))
    }
}

/// A table that will be materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ReportCell>>,
}

impl SheetTable {
    fn new(sheet_name: &str, columns: &[&str]) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Represents all tables required to materialise the output workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookData {
    pub tables: Vec<SheetTable>,
}

/// Everything produced by a run that ends up in the output workbook.
#[derive(Debug, Clone, Copy)]
pub struct RunResults<'a> {
    pub summary: &'a [SummaryRow],
    pub totals: &'a [MonthTotal],
    pub records: &'a [AttendanceRecord],
    pub boundaries: &'a BoundaryConfiguration,
}

/// Flattens run results into the normalized workbook layout.
pub fn build_workbook(results: RunResults<'_>) -> WorkbookData {
    let mut summary = SheetTable::new(
        SUMMARY_SHEET,
        &["program", "month", "grade", "total_attendance", "enrollment", "ada_percentage"],
    );
    for row in results.summary {
        summary.rows.push(vec![
            row.program.as_str().into(),
            f64::from(row.month).into(),
            row.grade.as_str().into(),
            row.total_attendance.into(),
            row.enrollment.into(),
            row.ada_percentage.into(),
        ]);
    }

    let mut totals = SheetTable::new(
        TOTALS_SHEET,
        &["program", "month", "total_attendance", "enrollment", "ada_percentage"],
    );
    for total in results.totals {
        totals.rows.push(vec![
            total.program.as_str().into(),
            f64::from(total.month).into(),
            total.total_attendance.into(),
            total.enrollment.into(),
            total.ada_percentage.into(),
        ]);
    }

    let mut records = SheetTable::new(
        RECORDS_SHEET,
        &["program", "month", "grade", "value", "source_row"],
    );
    for record in results.records {
        records.rows.push(vec![
            record.program.as_str().into(),
            f64::from(record.month).into(),
            record.grade.as_str().into(),
            record.value.into(),
            Some(record.row).into(),
        ]);
    }

    let mut boundaries = SheetTable::new(BOUNDARIES_SHEET, &["program", "start_row", "stop_row", "status"]);
    let extractable: Vec<_> = results
        .boundaries
        .extractable()
        .into_iter()
        .map(|range| range.program.clone())
        .collect();
    for range in results.boundaries.ranges() {
        let status = if extractable.contains(&range.program) {
            "resolved"
        } else if range.is_resolved() {
            "overlap"
        } else {
            "not found"
        };
        boundaries.rows.push(vec![
            range.program.as_str().into(),
            range.start_row.into(),
            range.stop_row.into(),
            status.into(),
        ]);
    }

    WorkbookData {
        tables: vec![summary, totals, records, boundaries],
    }
}

/// Descriptive columns attached to every dashboard line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportContext {
    pub school_year: String,
    pub school_name: String,
    pub location: String,
}

/// Header of the dashboard report, matching [`DashboardRow`]'s field names.
pub const DASHBOARD_COLUMNS: [&str; 9] = [
    "Year",
    "School",
    "Location",
    "Month",
    "Program",
    "TK",
    "Grade Level",
    "ADA %",
    "Total ADA",
];

/// One line of the dashboard report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardRow {
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "School")]
    pub school: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Program")]
    pub program: String,
    #[serde(rename = "TK")]
    pub transitional: String,
    #[serde(rename = "Grade Level")]
    pub grade_level: String,
    #[serde(rename = "ADA %")]
    pub ada_percentage: String,
    #[serde(rename = "Total ADA")]
    pub total_ada: String,
}

/// Renders summary rows as dashboard lines, keeping their order.
pub fn dashboard_rows(
    summary: &[SummaryRow],
    catalog: &ProgramCatalog,
    grades: &GradeTable,
    context: &ReportContext,
) -> Vec<DashboardRow> {
    summary
        .iter()
        .map(|row| {
            let entry = catalog.get(row.program.as_str());
            DashboardRow {
                year: context.school_year.clone(),
                school: context.school_name.clone(),
                location: context.location.clone(),
                month: format!("M{:02}", row.month),
                program: entry
                    .map(|entry| entry.report_code().to_string())
                    .unwrap_or_else(|| row.program.to_string()),
                transitional: if entry.is_some_and(|entry| entry.transitional) {
                    "Y".into()
                } else {
                    "N".into()
                },
                grade_level: grades.caption(&row.grade),
                ada_percentage: row
                    .ada_percentage
                    .map(|value| format!("{value:.2}%"))
                    .unwrap_or_default(),
                total_ada: format!("{:.2}", row.total_attendance),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryField, BoundaryRange, Provenance};
    use crate::catalog::ProgramEntry;

    fn summary_row(program: &str, enrollment: Option<f64>) -> SummaryRow {
        SummaryRow {
            program: program.into(),
            month: 3,
            grade: "4-6".into(),
            total_attendance: 41.5,
            enrollment,
            ada_percentage: enrollment.map(|_| 92.25),
        }
    }

    #[test]
    fn absent_values_become_blank_cells() {
        let boundaries = BoundaryConfiguration::new(
            None,
            Provenance::Detected,
            vec![
                BoundaryRange::resolved("A".into(), 1, 4),
                BoundaryRange::unresolved("B".into()),
            ],
        );
        let summary = vec![summary_row("A", None)];

        let workbook = build_workbook(RunResults {
            summary: &summary,
            totals: &[],
            records: &[],
            boundaries: &boundaries,
        });

        let sheet = &workbook.tables[0];
        assert_eq!(sheet.sheet_name, SUMMARY_SHEET);
        assert_eq!(sheet.rows[0][4], ReportCell::Blank);
        assert_eq!(sheet.rows[0][5], ReportCell::Blank);

        let bounds = &workbook.tables[3];
        assert_eq!(bounds.rows[0][3], ReportCell::from("resolved"));
        assert_eq!(bounds.rows[1][1], ReportCell::Blank);
        assert_eq!(bounds.rows[1][3], ReportCell::from("not found"));
    }

    #[test]
    fn overlapping_ranges_are_flagged() {
        let boundaries = BoundaryConfiguration::new(
            None,
            Provenance::Detected,
            vec![
                BoundaryRange::resolved("A".into(), 1, 4),
                BoundaryRange::resolved("B".into(), 5, 9),
            ],
        )
        .with_edit("B", BoundaryField::Start, Some(4))
        .expect("edit applied");

        let workbook = build_workbook(RunResults {
            summary: &[],
            totals: &[],
            records: &[],
            boundaries: &boundaries,
        });

        assert_eq!(workbook.tables[3].rows[1][3], ReportCell::from("overlap"));
    }

    #[test]
    fn dashboard_rows_use_report_codes_and_grade_captions() {
        let catalog = ProgramCatalog::new(vec![
            ProgramEntry::new("Prog_C", "Program C").with_report_code("C"),
            ProgramEntry::new("Prog_C_TK", "Program C TK")
                .with_report_code("C")
                .transitional(),
        ])
        .expect("catalog");
        let grades = GradeTable::new(["TK-3", "4-6"]).expect("grades");
        let context = ReportContext {
            school_year: "2025-2026".into(),
            school_name: "CCCS".into(),
            location: "TK-8".into(),
        };

        let rows = dashboard_rows(
            &[summary_row("Prog_C_TK", Some(45.0)), summary_row("Prog_C", None)],
            &catalog,
            &grades,
            &context,
        );

        assert_eq!(rows[0].month, "M03");
        assert_eq!(rows[0].program, "C");
        assert_eq!(rows[0].transitional, "Y");
        assert_eq!(rows[0].grade_level, "2 Grade 4-6");
        assert_eq!(rows[0].ada_percentage, "92.25%");
        assert_eq!(rows[0].total_ada, "41.50");
        assert_eq!(rows[1].transitional, "N");
        assert_eq!(rows[1].ada_percentage, "");
    }
}
