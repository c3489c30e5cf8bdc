use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use padc_processor::boundary::{BoundaryConfiguration, BoundaryField};
use padc_processor::pipeline::{self, WorkbookJob};
use padc_processor::profile::Profile;
use padc_processor::progress::{Progress, ScanProgress};
use padc_processor::report::ReportContext;
use padc_processor::store::{ConfigStore, DirectoryStore};
use padc_processor::{ProcessorError, Result};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(cli.log_level.as_deref()).and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|error| ProcessorError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Detect(args) => execute_detect(args),
        Command::Edit(args) => execute_edit(args),
        Command::Show(args) => execute_show(args),
        Command::Run(args) => execute_run(args),
    }
}

fn execute_detect(args: DetectArgs) -> Result<()> {
    let profile = args.profile.load()?;
    let mut hook = log_progress;
    let config = pipeline::detect_workbook(&args.input, &profile, &mut Progress::new(&mut hook))?;
    print_boundaries(&config);

    if let (Some(name), Some(store)) = (args.save, args.store) {
        DirectoryStore::new(store).save(&config.named(name))?;
    }
    Ok(())
}

fn execute_edit(args: EditArgs) -> Result<()> {
    let mut store = DirectoryStore::new(&args.store);
    let config = store.load(&args.name)?;
    let edited = config.with_edit(&args.program, args.field.into(), args.row.into())?;
    store.save(&edited)?;
    print_boundaries(&edited);
    Ok(())
}

fn execute_show(args: ShowArgs) -> Result<()> {
    let store = DirectoryStore::new(&args.store);
    match args.name {
        Some(name) => print_boundaries(&store.load(&name)?),
        None => {
            for name in store.names()? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn execute_run(args: RunArgs) -> Result<()> {
    let profile = args.profile.load()?;
    let boundaries = match (&args.store, &args.boundaries) {
        (Some(store), Some(name)) => Some(DirectoryStore::new(store).load(name)?),
        _ => None,
    };
    let context = ReportContext {
        school_year: args.year.unwrap_or_default(),
        school_name: args.school.unwrap_or_default(),
        location: args.location.unwrap_or_default(),
    };

    let job = WorkbookJob {
        input: &args.input,
        output: &args.output,
        report: args.report.as_deref(),
        boundaries: boundaries.as_ref(),
        context: &context,
    };
    let mut hook = log_progress;
    let outcome = pipeline::process_workbook(job, &profile, &mut Progress::new(&mut hook))?;

    print_boundaries(&outcome.boundaries);
    println!(
        "{} of {} programs extracted, {} records, {} summary rows",
        outcome.readiness.ready,
        outcome.readiness.total,
        outcome.records.len(),
        outcome.summary.len()
    );
    Ok(())
}

fn log_progress(update: ScanProgress) {
    debug!(
        stage = ?update.stage,
        rows_done = update.rows_done,
        rows_total = update.rows_total,
        "progress"
    );
}

fn print_boundaries(config: &BoundaryConfiguration) {
    if let Some(name) = &config.name {
        println!("configuration: {name} ({:?})", config.provenance);
    }
    for range in config.ranges() {
        let start = display_row(range.start_row);
        let stop = display_row(range.stop_row);
        println!("{:<16} start {start:>6}  stop {stop:>6}", range.program.as_str());
    }
    for diagnostic in config.diagnostics() {
        println!("warning: {diagnostic}");
    }
}

fn display_row(row: Option<usize>) -> String {
    row.map(|row| row.to_string())
        .unwrap_or_else(|| "none".to_string())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Locate program sections in attendance workbooks and summarise ADA."
)]
struct Cli {
    /// Log filter directive, e.g. `debug` or `padc_processor=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect program boundaries in an attendance workbook.
    Detect(DetectArgs),
    /// Change one bound of one program in a stored configuration.
    Edit(EditArgs),
    /// List stored configurations or print one of them.
    Show(ShowArgs),
    /// Extract, consolidate and summarise attendance.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct ProfileArgs {
    /// Processor profile (TOML). The built-in profile is used when omitted.
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Worksheet to read instead of the one named by the profile.
    #[arg(long)]
    sheet: Option<String>,
}

impl ProfileArgs {
    fn load(&self) -> Result<Profile> {
        let mut profile = match &self.profile {
            Some(path) => load_profile(path)?,
            None => Profile::builtin()?,
        };
        if let Some(sheet) = &self.sheet {
            profile.layout.sheet = Some(sheet.clone());
        }
        Ok(profile)
    }
}

fn load_profile(path: &Path) -> Result<Profile> {
    if !path.exists() {
        return Err(ProcessorError::MissingInput(path.to_path_buf()));
    }
    Profile::load(path)
}

#[derive(clap::Args)]
struct DetectArgs {
    /// Attendance workbook (.xlsx).
    #[arg(long)]
    input: PathBuf,

    #[command(flatten)]
    profile: ProfileArgs,

    /// Directory holding saved boundary configurations.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Save the detected boundaries under this name.
    #[arg(long, requires = "store")]
    save: Option<String>,
}

#[derive(clap::Args)]
struct EditArgs {
    /// Directory holding saved boundary configurations.
    #[arg(long)]
    store: PathBuf,

    /// Configuration to edit.
    #[arg(long)]
    name: String,

    /// Program whose boundary changes.
    #[arg(long)]
    program: String,

    /// Bound to change.
    #[arg(long, value_enum)]
    field: Field,

    /// New 0-based row, or `none` to clear the bound.
    #[arg(long, value_parser = parse_row)]
    row: RowValue,
}

#[derive(clap::Args)]
struct ShowArgs {
    /// Directory holding saved boundary configurations.
    #[arg(long)]
    store: PathBuf,

    /// Configuration to print; lists every name when omitted.
    #[arg(long)]
    name: Option<String>,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Attendance workbook (.xlsx).
    #[arg(long)]
    input: PathBuf,

    /// Normalized output workbook (.xlsx).
    #[arg(long)]
    output: PathBuf,

    /// Optional dashboard report (.csv).
    #[arg(long)]
    report: Option<PathBuf>,

    #[command(flatten)]
    profile: ProfileArgs,

    /// Directory holding saved boundary configurations.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Use the named stored boundaries instead of detecting them.
    #[arg(long, requires = "store")]
    boundaries: Option<String>,

    /// School year written to the report, e.g. 2025-2026.
    #[arg(long)]
    year: Option<String>,

    /// School name written to the report.
    #[arg(long)]
    school: Option<String>,

    /// Location written to the report, e.g. TK-8.
    #[arg(long)]
    location: Option<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Field {
    Start,
    Stop,
}

impl From<Field> for BoundaryField {
    fn from(field: Field) -> Self {
        match field {
            Field::Start => BoundaryField::Start,
            Field::Stop => BoundaryField::Stop,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum RowValue {
    Row(usize),
    Clear,
}

impl From<RowValue> for Option<usize> {
    fn from(value: RowValue) -> Self {
        match value {
            RowValue::Row(row) => Some(row),
            RowValue::Clear => None,
        }
    }
}

fn parse_row(raw: &str) -> std::result::Result<RowValue, String> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return Ok(RowValue::Clear);
    }
    trimmed
        .parse::<usize>()
        .map(RowValue::Row)
        .map_err(|_| format!("expected a row number or 'none', got '{raw}'"))
}
