//! Processor profile: the static configuration loaded once at start-up.
//!
//! A profile describes the layout of the attendance sheet, the program
//! catalog, the consolidation rule table, the grade ordering table and,
//! optionally, enrollment figures. Profiles are written in TOML; a built-in
//! profile covers the standard monthly attendance summary export.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::aggregate::{EnrollmentEntry, EnrollmentTable, ReportOrder};
use crate::catalog::{GradeTable, ProgramCatalog, ProgramEntry};
use crate::consolidate::{ConsolidationRule, ConsolidationRules};
use crate::error::Result;

const BUILTIN_PROFILE: &str = include_str!("default_profile.toml");

/// Columns of interest in the attendance sheet, 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    /// Worksheet to read; the first worksheet when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    /// Column holding program section labels.
    pub program_column: usize,
    /// Column holding month numbers.
    pub month_column: usize,
    /// Column holding grade labels.
    pub grade_column: usize,
    /// Column holding the attendance quantity.
    pub value_column: usize,
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    layout: SheetLayout,
    programs: Vec<ProgramEntry>,
    grades: Vec<String>,
    #[serde(default)]
    consolidation: Vec<ConsolidationRule>,
    #[serde(default)]
    enrollment: Vec<EnrollmentEntry>,
}

/// Validated processor profile.
#[derive(Debug, Clone)]
pub struct Profile {
    pub layout: SheetLayout,
    pub catalog: ProgramCatalog,
    pub rules: ConsolidationRules,
    pub grades: GradeTable,
    pub enrollment: EnrollmentTable,
}

impl Profile {
    /// The profile matching the standard attendance summary export.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_PROFILE)
    }

    /// Loads and validates a profile file.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Parses and validates a profile. An invalid catalog, grade table or
    /// rule table is a configuration error.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: ProfileFile = toml::from_str(source)?;
        let catalog = ProgramCatalog::new(file.programs)?;
        let rules = ConsolidationRules::new(file.consolidation, &catalog)?;
        let grades = GradeTable::new(file.grades)?;
        let enrollment = EnrollmentTable::new(&file.enrollment);
        debug!(
            programs = catalog.len(),
            rules = rules.rules().len(),
            grades = grades.labels().len(),
            "profile loaded"
        );
        Ok(Self {
            layout: file.layout,
            catalog,
            rules,
            grades,
            enrollment,
        })
    }

    pub fn report_order(&self) -> ReportOrder<'_> {
        ReportOrder::new(&self.catalog, &self.grades)
    }
}
