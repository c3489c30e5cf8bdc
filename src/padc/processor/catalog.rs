//! Static tables describing what the processor looks for: the program
//! catalog and the grade ordering table.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProcessorError, Result};
use crate::grid::normalize_label;

/// Identifier naming one program variant, e.g. `Prog_C` or `Prog_C_TK`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(String);

impl ProgramId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ProgramId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProgramId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One catalog entry: the program and the label text that opens its section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub id: ProgramId,
    /// Label text expected in the program column on the section's first row.
    pub match_text: String,
    /// Transitional-grade variants never take part in consolidation.
    #[serde(default)]
    pub transitional: bool,
    /// Short code used in the summary report; defaults to the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_code: Option<String>,
}

impl ProgramEntry {
    pub fn new(id: impl Into<String>, match_text: impl Into<String>) -> Self {
        Self {
            id: ProgramId::new(id),
            match_text: match_text.into(),
            transitional: false,
            report_code: None,
        }
    }

    pub fn transitional(mut self) -> Self {
        self.transitional = true;
        self
    }

    pub fn with_report_code(mut self, code: impl Into<String>) -> Self {
        self.report_code = Some(code.into());
        self
    }

    pub fn report_code(&self) -> &str {
        self.report_code.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Ordered sequence of programs. Catalog order is the presentation order of
/// every report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgramCatalog {
    entries: Vec<ProgramEntry>,
}

impl ProgramCatalog {
    /// Builds a catalog, rejecting duplicate ids.
    pub fn new(entries: Vec<ProgramEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(ProcessorError::InvalidProfile(format!(
                    "program '{}' is listed more than once",
                    entry.id
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ProgramEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ProgramEntry> {
        self.entries.iter().find(|entry| entry.id.as_str() == id)
    }

    /// Position of the program in catalog order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id.as_str() == id)
    }
}

/// Recognised grade labels in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeTable {
    labels: Vec<String>,
    normalized: Vec<String>,
}

impl GradeTable {
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ProcessorError::InvalidProfile(
                "grade table must list at least one grade".into(),
            ));
        }
        let normalized = labels.iter().map(|label| normalize_label(label)).collect();
        Ok(Self { labels, normalized })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Canonical label for a raw cell text, if it names a known grade.
    pub fn recognize(&self, raw: &str) -> Option<&str> {
        let needle = normalize_label(raw);
        self.normalized
            .iter()
            .position(|label| *label == needle)
            .map(|index| self.labels[index].as_str())
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|known| known == label)
    }

    /// Dashboard caption such as `"2 Grade 4-6"`.
    pub fn caption(&self, label: &str) -> String {
        match self.position(label) {
            Some(index) => format!("{} Grade {label}", index + 1),
            None => format!("Unknown Grade {label}"),
        }
    }
}
