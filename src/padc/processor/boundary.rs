//! Program row ranges and the named configuration that groups them.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::{ProgramCatalog, ProgramId};
use crate::error::{ProcessorError, Result};

/// A month number found in the month column, and the row it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthMarker {
    pub row: usize,
    pub month: u8,
}

/// Inclusive row range holding one program's section. Either bound may be
/// unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryRange {
    pub program: ProgramId,
    pub start_row: Option<usize>,
    pub stop_row: Option<usize>,
    /// Month markers inside the range, in row order. Empty when the range was
    /// loaded or edited and has not been scanned yet.
    pub months: Vec<MonthMarker>,
}

impl BoundaryRange {
    pub fn resolved(program: ProgramId, start_row: usize, stop_row: usize) -> Self {
        Self {
            program,
            start_row: Some(start_row),
            stop_row: Some(stop_row),
            months: Vec::new(),
        }
    }

    pub fn unresolved(program: ProgramId) -> Self {
        Self {
            program,
            start_row: None,
            stop_row: None,
            months: Vec::new(),
        }
    }

    /// Both bounds, when the range is usable.
    pub fn span(&self) -> Option<(usize, usize)> {
        match (self.start_row, self.stop_row) {
            (Some(start), Some(stop)) if start <= stop => Some((start, stop)),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.span().is_some()
    }

    fn intersects(&self, other: &BoundaryRange) -> Option<(usize, usize)> {
        let (a_start, a_stop) = self.span()?;
        let (b_start, b_stop) = other.span()?;
        let first = a_start.max(b_start);
        let last = a_stop.min(b_stop);
        (first <= last).then_some((first, last))
    }
}

/// Where a configuration's boundaries came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provenance {
    #[default]
    Detected,
    Loaded,
    Edited,
}

/// The field changed by a single-field edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryField {
    Start,
    Stop,
}

/// Non-fatal findings about a configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The program's section could not be located.
    Unresolved { program: ProgramId },
    /// Two resolved ranges share rows; neither is extracted.
    Overlap {
        first: ProgramId,
        second: ProgramId,
        rows: (usize, usize),
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unresolved { program } => write!(f, "{program}: section not found"),
            Diagnostic::Overlap {
                first,
                second,
                rows: (from, to),
            } => write!(f, "{first} and {second} overlap on rows {from}..={to}"),
        }
    }
}

/// Ordered mapping of program to boundary range, plus an optional name.
///
/// Values are replaced wholesale on edit; [`BoundaryConfiguration::with_edit`]
/// returns a new configuration rather than mutating the receiver.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryConfiguration {
    pub name: Option<String>,
    pub provenance: Provenance,
    ranges: Vec<BoundaryRange>,
}

impl BoundaryConfiguration {
    pub fn new(name: Option<String>, provenance: Provenance, ranges: Vec<BoundaryRange>) -> Self {
        Self {
            name,
            provenance,
            ranges,
        }
    }

    pub fn ranges(&self) -> &[BoundaryRange] {
        &self.ranges
    }

    pub fn get(&self, program: &str) -> Option<&BoundaryRange> {
        self.ranges
            .iter()
            .find(|range| range.program.as_str() == program)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns a copy with one bound of one program replaced. `None` clears
    /// the bound. Cached month markers of that program are dropped.
    pub fn with_edit(
        &self,
        program: &str,
        field: BoundaryField,
        row: Option<usize>,
    ) -> Result<Self> {
        let mut edited = self.clone();
        let range = edited
            .ranges
            .iter_mut()
            .find(|range| range.program.as_str() == program)
            .ok_or_else(|| ProcessorError::UnknownProgram(program.to_string()))?;

        match field {
            BoundaryField::Start => range.start_row = row,
            BoundaryField::Stop => range.stop_row = row,
        }
        if let (Some(start), Some(stop)) = (range.start_row, range.stop_row) {
            if start > stop {
                return Err(ProcessorError::InvalidBoundary {
                    program: program.to_string(),
                    start,
                    stop,
                });
            }
        }
        range.months.clear();
        edited.provenance = Provenance::Edited;
        Ok(edited)
    }

    /// Aligns the configuration with the catalog: ranges follow catalog
    /// order, programs missing from the configuration are added unresolved,
    /// and programs unknown to the catalog are dropped.
    pub fn aligned_to(&self, catalog: &ProgramCatalog) -> Self {
        let ranges = catalog
            .entries()
            .iter()
            .map(|entry| {
                self.get(entry.id.as_str())
                    .cloned()
                    .unwrap_or_else(|| BoundaryRange::unresolved(entry.id.clone()))
            })
            .collect();
        Self {
            name: self.name.clone(),
            provenance: self.provenance,
            ranges,
        }
    }

    /// Every pair of resolved ranges that share rows.
    pub fn overlaps(&self) -> Vec<Diagnostic> {
        let mut found = Vec::new();
        for (index, first) in self.ranges.iter().enumerate() {
            for second in &self.ranges[index + 1..] {
                if let Some(rows) = first.intersects(second) {
                    found.push(Diagnostic::Overlap {
                        first: first.program.clone(),
                        second: second.program.clone(),
                        rows,
                    });
                }
            }
        }
        found
    }

    /// Unresolved and overlap findings, in program order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut found: Vec<Diagnostic> = self
            .ranges
            .iter()
            .filter(|range| !range.is_resolved())
            .map(|range| Diagnostic::Unresolved {
                program: range.program.clone(),
            })
            .collect();
        found.extend(self.overlaps());
        found
    }

    /// Ranges safe to extract: resolved and not involved in any overlap.
    pub fn extractable(&self) -> Vec<&BoundaryRange> {
        let overlapping: Vec<ProgramId> = self
            .overlaps()
            .into_iter()
            .flat_map(|diagnostic| match diagnostic {
                Diagnostic::Overlap { first, second, .. } => vec![first, second],
                Diagnostic::Unresolved { .. } => Vec::new(),
            })
            .collect();
        self.ranges
            .iter()
            .filter(|range| range.is_resolved() && !overlapping.contains(&range.program))
            .collect()
    }

    /// Summarises how many programs are ready for extraction.
    pub fn readiness(&self) -> Readiness {
        let ready = self.extractable().len();
        let missing = self
            .ranges
            .iter()
            .filter(|range| !range.is_resolved())
            .map(|range| range.program.clone())
            .collect();
        Readiness {
            ready,
            total: self.ranges.len(),
            missing,
        }
    }
}

/// Result of [`BoundaryConfiguration::readiness`].
#[derive(Debug, Clone, PartialEq)]
pub struct Readiness {
    pub ready: usize,
    pub total: usize,
    pub missing: Vec<ProgramId>,
}

impl Readiness {
    /// True when fewer than half of the programs can be extracted.
    pub fn is_sparse(&self) -> bool {
        self.ready * 2 < self.total
    }
}

#[derive(Serialize, Deserialize)]
struct StoredBounds {
    start: Option<usize>,
    stop: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct StoredConfiguration {
    name: Option<String>,
    #[serde(with = "ordered_bounds")]
    boundaries: Vec<(ProgramId, StoredBounds)>,
}

impl Serialize for BoundaryConfiguration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let stored = StoredConfiguration {
            name: self.name.clone(),
            boundaries: self
                .ranges
                .iter()
                .map(|range| {
                    (
                        range.program.clone(),
                        StoredBounds {
                            start: range.start_row,
                            stop: range.stop_row,
                        },
                    )
                })
                .collect(),
        };
        stored.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoundaryConfiguration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let stored = StoredConfiguration::deserialize(deserializer)?;
        let ranges = stored
            .boundaries
            .into_iter()
            .map(|(program, bounds)| BoundaryRange {
                program,
                start_row: bounds.start,
                stop_row: bounds.stop,
                months: Vec::new(),
            })
            .collect();
        Ok(Self {
            name: stored.name,
            provenance: Provenance::Loaded,
            ranges,
        })
    }
}

/// Serializes a list of pairs as a map while keeping insertion order.
mod ordered_bounds {
    use super::*;

    pub fn serialize<S: Serializer>(
        entries: &[(ProgramId, StoredBounds)],
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (program, bounds) in entries {
            map.serialize_entry(program, bounds)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<(ProgramId, StoredBounds)>, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = Vec<(ProgramId, StoredBounds)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of program id to {start, stop}")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((program, bounds)) = access.next_entry()? {
                    entries.push((program, bounds));
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BoundaryConfiguration {
        BoundaryConfiguration::new(
            Some("fall".into()),
            Provenance::Detected,
            vec![
                BoundaryRange::resolved("A".into(), 2, 9),
                BoundaryRange::resolved("B".into(), 10, 20),
                BoundaryRange::unresolved("C".into()),
            ],
        )
    }

    #[test]
    fn edit_returns_a_new_configuration() {
        let original = config();
        let edited = original
            .with_edit("B", BoundaryField::Stop, Some(15))
            .expect("edit applied");

        assert_eq!(original.get("B").and_then(|r| r.stop_row), Some(20));
        assert_eq!(edited.get("B").and_then(|r| r.stop_row), Some(15));
        assert_eq!(edited.provenance, Provenance::Edited);
    }

    #[test]
    fn edit_rejects_inverted_range_and_unknown_program() {
        let original = config();
        assert!(matches!(
            original.with_edit("A", BoundaryField::Start, Some(12)),
            Err(ProcessorError::InvalidBoundary { start: 12, stop: 9, .. })
        ));
        assert!(matches!(
            original.with_edit("Z", BoundaryField::Start, Some(1)),
            Err(ProcessorError::UnknownProgram(_))
        ));
    }

    #[test]
    fn overlapping_ranges_are_reported_and_excluded() {
        let edited = config()
            .with_edit("A", BoundaryField::Stop, Some(12))
            .expect("edit applied");

        assert_eq!(
            edited.overlaps(),
            vec![Diagnostic::Overlap {
                first: "A".into(),
                second: "B".into(),
                rows: (10, 12),
            }]
        );
        assert!(edited.extractable().is_empty());
    }

    #[test]
    fn readiness_lists_missing_programs() {
        let readiness = config().readiness();
        assert_eq!(readiness.ready, 2);
        assert_eq!(readiness.total, 3);
        assert_eq!(readiness.missing, vec![ProgramId::from("C")]);
        assert!(!readiness.is_sparse());
    }

    #[test]
    fn serialized_form_keeps_program_order() {
        let json = serde_json::to_string(&config()).expect("serialized");
        assert_eq!(
            json,
            r#"{"name":"fall","boundaries":{"A":{"start":2,"stop":9},"B":{"start":10,"stop":20},"C":{"start":null,"stop":null}}}"#
        );

        let restored: BoundaryConfiguration = serde_json::from_str(&json).expect("parsed");
        let programs: Vec<&str> = restored.ranges().iter().map(|r| r.program.as_str()).collect();
        assert_eq!(programs, ["A", "B", "C"]);
        assert_eq!(restored.provenance, Provenance::Loaded);
    }
}
