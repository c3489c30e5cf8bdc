use std::fs;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use padc_processor::boundary::BoundaryField;
use padc_processor::pipeline::{self, WorkbookJob};
use padc_processor::profile::Profile;
use padc_processor::progress::{Progress, ScanProgress, Stage};
use padc_processor::report::{ReportContext, SUMMARY_SHEET};
use padc_processor::store::{ConfigStore, DirectoryStore};
use padc_processor::ProcessorError;
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

const PROFILE: &str = r#"
grades = ["K", "1"]

[layout]
sheet = "Attendance"
program_column = 0
month_column = 1
grade_column = 2
value_column = 3

[[programs]]
id = "Alpha"
match_text = "Alpha Program"
report_code = "A"

[[programs]]
id = "Beta"
match_text = "Beta Program"

[[programs]]
id = "Gamma"
match_text = "Gamma Program"

[[enrollment]]
program = "Alpha"
month = 1
grade = "K"
enrollment = 20.0
"#;

fn write_profile(dir: &Path) -> Profile {
    let path = dir.join("profile.toml");
    fs::write(&path, PROFILE).expect("profile written");
    Profile::load(&path).expect("profile loaded")
}

fn write_attendance(path: &Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Attendance").expect("sheet named");

    sheet.write_string(0, 0, "Alpha Program").expect("cell");
    sheet.write_number(0, 1, 1.0).expect("cell");
    sheet.write_string(1, 2, "K").expect("cell");
    sheet.write_number(1, 3, 10.0).expect("cell");
    sheet.write_string(2, 2, "1").expect("cell");
    sheet.write_number(2, 3, 4.0).expect("cell");
    sheet.write_number(3, 1, 2.0).expect("cell");
    sheet.write_string(4, 2, "K").expect("cell");
    sheet.write_number(4, 3, 12.0).expect("cell");

    sheet.write_string(5, 0, "Beta Program").expect("cell");
    sheet.write_number(5, 1, 1.0).expect("cell");
    sheet.write_string(6, 2, "K").expect("cell");
    sheet.write_number(6, 3, 7.0).expect("cell");

    workbook.save(path).expect("attendance workbook saved");
}

fn context() -> ReportContext {
    ReportContext {
        school_year: "2025-2026".into(),
        school_name: "Test School".into(),
        location: "TK-8".into(),
    }
}

#[test]
fn workbook_run_writes_summary_and_dashboard() {
    let dir = tempdir().expect("temporary directory");
    let profile = write_profile(dir.path());
    let input = dir.path().join("attendance.xlsx");
    let output = dir.path().join("normalized.xlsx");
    let report = dir.path().join("dashboard.csv");
    write_attendance(&input);

    let context = context();
    let job = WorkbookJob {
        input: &input,
        output: &output,
        report: Some(&report),
        boundaries: None,
        context: &context,
    };
    let outcome =
        pipeline::process_workbook(job, &profile, &mut Progress::none()).expect("run succeeded");

    assert_eq!(outcome.readiness.ready, 2);
    assert_eq!(outcome.readiness.total, 3);
    assert_eq!(outcome.records.len(), 4);
    assert_eq!(outcome.summary.len(), 4);

    let mut written: Xlsx<_> = open_workbook(&output).expect("output opened");
    let summary = written
        .worksheet_range(SUMMARY_SHEET)
        .expect("summary sheet present")
        .expect("summary sheet read");
    assert_eq!(summary.height(), 5);
    assert_eq!(summary.get_value((0, 0)), Some(&DataType::String("program".into())));
    assert_eq!(
        summary.get_value((0, 5)),
        Some(&DataType::String("ada_percentage".into()))
    );
    assert_eq!(summary.get_value((1, 0)), Some(&DataType::String("Alpha".into())));
    assert_eq!(summary.get_value((1, 3)), Some(&DataType::Float(10.0)));
    assert_eq!(summary.get_value((1, 4)), Some(&DataType::Float(20.0)));
    assert_eq!(summary.get_value((1, 5)), Some(&DataType::Float(50.0)));
    assert_eq!(summary.get_value((4, 0)), Some(&DataType::String("Beta".into())));

    let csv = fs::read_to_string(&report).expect("dashboard read");
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Year,School,Location,Month,Program,TK,Grade Level,ADA %,Total ADA")
    );
    assert_eq!(
        lines.next(),
        Some("2025-2026,Test School,TK-8,M01,A,N,1 Grade K,50.00%,10.00")
    );
    assert_eq!(lines.count(), 3);
}

#[test]
fn stored_boundaries_drive_a_later_run() {
    let dir = tempdir().expect("temporary directory");
    let profile = write_profile(dir.path());
    let input = dir.path().join("attendance.xlsx");
    write_attendance(&input);

    let mut ticks = Vec::new();
    let mut hook = |update: ScanProgress| ticks.push(update);
    let detected = pipeline::detect_workbook(&input, &profile, &mut Progress::new(&mut hook))
        .expect("detection succeeded");
    assert!(ticks.iter().any(|tick| tick.stage == Stage::Detect));

    let alpha = detected.get("Alpha").expect("alpha range");
    assert_eq!((alpha.start_row, alpha.stop_row), (Some(0), Some(4)));
    assert!(!detected.get("Gamma").expect("gamma range").is_resolved());

    // Narrow Alpha to its first month only.
    let edited = detected
        .named("march")
        .with_edit("Alpha", BoundaryField::Stop, Some(2))
        .expect("edit applied");
    let mut store = DirectoryStore::new(dir.path().join("boundaries"));
    store.save(&edited).expect("saved");
    assert_eq!(store.names().expect("names"), vec!["march".to_string()]);

    let loaded = store.load("march").expect("loaded");
    assert_eq!(loaded.get("Alpha").and_then(|range| range.stop_row), Some(2));

    let output = dir.path().join("normalized.xlsx");
    let context = context();
    let job = WorkbookJob {
        input: &input,
        output: &output,
        report: None,
        boundaries: Some(&loaded),
        context: &context,
    };
    let outcome =
        pipeline::process_workbook(job, &profile, &mut Progress::none()).expect("run succeeded");

    let alpha_total: f64 = outcome
        .summary
        .iter()
        .filter(|row| row.program.as_str() == "Alpha")
        .map(|row| row.total_attendance)
        .sum();
    assert_eq!(alpha_total, 14.0);
    assert!(output.exists());
}

#[test]
fn unknown_stored_configuration_is_an_error() {
    let dir = tempdir().expect("temporary directory");
    let store = DirectoryStore::new(dir.path());

    assert!(matches!(
        store.load("missing"),
        Err(ProcessorError::UnknownConfiguration(name)) if name == "missing"
    ));
}

#[test]
fn missing_input_workbook_is_reported() {
    let dir = tempdir().expect("temporary directory");
    let profile = write_profile(dir.path());
    let input = dir.path().join("absent.xlsx");

    let result = pipeline::detect_workbook(&input, &profile, &mut Progress::none());

    assert!(matches!(result, Err(ProcessorError::MissingInput(path)) if path == input));
}

#[test]
fn builtin_profile_is_valid() {
    let profile = Profile::builtin().expect("builtin profile");
    assert_eq!(profile.layout.value_column, 35);
    assert_eq!(profile.grades.labels().len(), 4);
}
