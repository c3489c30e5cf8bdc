//! Roll-up of consolidated records into summary rows.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::catalog::{GradeTable, ProgramCatalog, ProgramId};
use crate::extract::AttendanceRecord;

/// Decimal places kept for ADA percentages.
pub const PERCENT_DECIMALS: i32 = 2;

/// Attendance total for one program, month and grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub program: ProgramId,
    pub month: u8,
    pub grade: String,
    pub total_attendance: f64,
    pub enrollment: Option<f64>,
    pub ada_percentage: Option<f64>,
}

/// Attendance total for one program and month across all grades.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    pub program: ProgramId,
    pub month: u8,
    pub total_attendance: f64,
    pub enrollment: Option<f64>,
    pub ada_percentage: Option<f64>,
}

/// Source of enrollment figures.
pub trait EnrollmentLookup {
    fn enrollment(&self, program: &ProgramId, month: u8, grade: &str) -> Option<f64>;
}

/// Lookup that never knows an enrollment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnrollment;

impl EnrollmentLookup for NoEnrollment {
    fn enrollment(&self, _program: &ProgramId, _month: u8, _grade: &str) -> Option<f64> {
        None
    }
}

impl<F> EnrollmentLookup for F
where
    F: Fn(&ProgramId, u8, &str) -> Option<f64>,
{
    fn enrollment(&self, program: &ProgramId, month: u8, grade: &str) -> Option<f64> {
        self(program, month, grade)
    }
}

/// One enrollment figure as written in a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentEntry {
    pub program: ProgramId,
    pub month: u8,
    pub grade: String,
    pub enrollment: f64,
}

/// Enrollment figures keyed by program, month and grade.
#[derive(Debug, Clone, Default)]
pub struct EnrollmentTable {
    entries: HashMap<(ProgramId, u8, String), f64>,
}

impl EnrollmentTable {
    pub fn new(entries: &[EnrollmentEntry]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|entry| {
                    (
                        (entry.program.clone(), entry.month, entry.grade.clone()),
                        entry.enrollment,
                    )
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EnrollmentLookup for EnrollmentTable {
    fn enrollment(&self, program: &ProgramId, month: u8, grade: &str) -> Option<f64> {
        self.entries
            .get(&(program.clone(), month, grade.to_string()))
            .copied()
    }
}

/// Presentation order of summary rows: catalog order, then month, then the
/// grade table. Unknown programs and grades sort last, by name.
#[derive(Debug, Clone)]
pub struct ReportOrder<'a> {
    catalog: &'a ProgramCatalog,
    grades: &'a GradeTable,
}

impl<'a> ReportOrder<'a> {
    pub fn new(catalog: &'a ProgramCatalog, grades: &'a GradeTable) -> Self {
        Self { catalog, grades }
    }

    fn program_key<'b>(&self, program: &'b ProgramId) -> (usize, &'b str) {
        let position = self
            .catalog
            .position(program.as_str())
            .unwrap_or(usize::MAX);
        (position, program.as_str())
    }

    fn compare(&self, lhs: &SummaryRow, rhs: &SummaryRow) -> Ordering {
        self.program_key(&lhs.program)
            .cmp(&self.program_key(&rhs.program))
            .then(lhs.month.cmp(&rhs.month))
            .then_with(|| {
                let left = (self.grades.position(&lhs.grade).unwrap_or(usize::MAX), &lhs.grade);
                let right = (self.grades.position(&rhs.grade).unwrap_or(usize::MAX), &rhs.grade);
                left.cmp(&right)
            })
    }
}

/// Groups records by program, month and grade and sums their values.
///
/// The sum of each group does not depend on input order: values are summed
/// in ascending order. Enrollment is attached only when the lookup knows a
/// positive figure; otherwise both enrollment and percentage stay absent.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub fn aggregate(
    records: &[AttendanceRecord],
    enrollment: &dyn EnrollmentLookup,
    order: &ReportOrder<'_>,
) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<(ProgramId, u8, String), Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.program.clone(), record.month, record.grade.clone()))
            .or_default()
            .push(record.value);
    }

    let mut rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|((program, month, grade), values)| {
            let total_attendance = stable_sum(values);
            let enrollment = enrollment
                .enrollment(&program, month, &grade)
                .filter(|value| value.is_finite() && *value > 0.0);
            SummaryRow {
                ada_percentage: enrollment.map(|known| percentage(total_attendance, known)),
                program,
                month,
                grade,
                total_attendance,
                enrollment,
            }
        })
        .collect();

    rows.sort_by(|lhs, rhs| order.compare(lhs, rhs));
    debug!(rows = rows.len(), "summary rows built");
    rows
}

/// Sums summary rows per program and month, keeping their order.
///
/// Enrollment is only totalled when every grade row of the month carries one.
pub fn month_totals(rows: &[SummaryRow]) -> Vec<MonthTotal> {
    let mut totals: Vec<MonthTotal> = Vec::new();
    let mut complete: Vec<bool> = Vec::new();

    for row in rows {
        let same_group = totals
            .last()
            .is_some_and(|last| last.program == row.program && last.month == row.month);
        if !same_group {
            totals.push(MonthTotal {
                program: row.program.clone(),
                month: row.month,
                total_attendance: 0.0,
                enrollment: Some(0.0),
                ada_percentage: None,
            });
            complete.push(true);
        }
        let (Some(total), Some(is_complete)) = (totals.last_mut(), complete.last_mut()) else {
            continue;
        };
        total.total_attendance += row.total_attendance;
        match (row.enrollment, total.enrollment.as_mut()) {
            (Some(value), Some(sum)) if *is_complete => *sum += value,
            _ => *is_complete = false,
        }
    }

    for (total, is_complete) in totals.iter_mut().zip(complete) {
        if is_complete {
            total.ada_percentage = total
                .enrollment
                .map(|known| percentage(total.total_attendance, known));
        } else {
            total.enrollment = None;
        }
    }
    totals
}

fn stable_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

fn percentage(total: f64, enrollment: f64) -> f64 {
    let scale = 10f64.powi(PERCENT_DECIMALS);
    (total / enrollment * 100.0 * scale).round() / scale
}
