//! Relabels location-variant records onto their parent program.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::catalog::{ProgramCatalog, ProgramId};
use crate::error::{ProcessorError, Result};
use crate::extract::AttendanceRecord;

/// Maps one location variant onto its parent program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationRule {
    pub source: ProgramId,
    pub target: ProgramId,
}

impl ConsolidationRule {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: ProgramId::new(source),
            target: ProgramId::new(target),
        }
    }
}

/// Validated, read-only rule table.
#[derive(Debug, Clone, Default)]
pub struct ConsolidationRules {
    rules: Vec<ConsolidationRule>,
    by_source: HashMap<ProgramId, ProgramId>,
}

impl ConsolidationRules {
    /// Validates `rules` against the catalog.
    ///
    /// A table is rejected when a target also appears as a source, when a
    /// source is mapped twice, when either side is not in the catalog, or when
    /// either side is a transitional-grade program.
    pub fn new(rules: Vec<ConsolidationRule>, catalog: &ProgramCatalog) -> Result<Self> {
        let mut by_source = HashMap::with_capacity(rules.len());

        for rule in &rules {
            let reject = |reason: &str| ProcessorError::InvalidRule {
                source_program: rule.source.to_string(),
                target: rule.target.to_string(),
                reason: reason.to_string(),
            };

            let source = catalog
                .get(rule.source.as_str())
                .ok_or_else(|| reject("source program is not in the catalog"))?;
            let target = catalog
                .get(rule.target.as_str())
                .ok_or_else(|| reject("target program is not in the catalog"))?;
            if source.transitional || target.transitional {
                return Err(reject("transitional-grade programs cannot be consolidated"));
            }
            if rule.source == rule.target {
                return Err(reject("a program cannot consolidate into itself"));
            }
            if rules.iter().any(|other| other.source == rule.target) {
                return Err(reject("target is itself consolidated into another program"));
            }
            if by_source
                .insert(rule.source.clone(), rule.target.clone())
                .is_some()
            {
                return Err(reject("source program has more than one target"));
            }
        }

        Ok(Self { rules, by_source })
    }

    pub fn rules(&self) -> &[ConsolidationRule] {
        &self.rules
    }

    pub fn target_of(&self, program: &ProgramId) -> Option<&ProgramId> {
        self.by_source.get(program)
    }
}

/// Replaces the program of every record matched by a rule. Records are never
/// merged here; summation belongs to the aggregator.
#[instrument(level = "debug", skip_all, fields(records = records.len()))]
pub fn consolidate(records: &[AttendanceRecord], rules: &ConsolidationRules) -> Vec<AttendanceRecord> {
    let mut relabelled = 0usize;
    let output = records
        .iter()
        .map(|record| match rules.target_of(&record.program) {
            Some(target) => {
                relabelled += 1;
                AttendanceRecord {
                    program: target.clone(),
                    ..record.clone()
                }
            }
            None => record.clone(),
        })
        .collect();
    debug!(relabelled, "consolidation applied");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProgramEntry;

    fn catalog() -> ProgramCatalog {
        ProgramCatalog::new(vec![
            ProgramEntry::new("Alpha", "Alpha"),
            ProgramEntry::new("Alpha_TK", "Alpha TK").transitional(),
            ProgramEntry::new("AlphaVariant", "Alpha Variant"),
            ProgramEntry::new("AlphaAnnex", "Alpha Annex"),
        ])
        .expect("catalog")
    }

    fn record(program: &str, month: u8, value: f64) -> AttendanceRecord {
        AttendanceRecord {
            program: program.into(),
            month,
            grade: "K".into(),
            value,
            row: 0,
        }
    }

    #[test]
    fn variants_are_relabelled_and_others_pass_through() {
        let rules = ConsolidationRules::new(
            vec![ConsolidationRule::new("AlphaVariant", "Alpha")],
            &catalog(),
        )
        .expect("rules");
        let records = vec![
            record("Alpha", 1, 10.0),
            record("AlphaVariant", 1, 5.0),
            record("Alpha_TK", 1, 2.0),
        ];

        let output = consolidate(&records, &rules);

        let programs: Vec<&str> = output.iter().map(|r| r.program.as_str()).collect();
        assert_eq!(programs, ["Alpha", "Alpha", "Alpha_TK"]);
        assert_eq!(output[1].value, 5.0);
        assert_eq!(output.len(), records.len());
    }

    #[test]
    fn consolidation_is_idempotent() {
        let rules = ConsolidationRules::new(
            vec![
                ConsolidationRule::new("AlphaVariant", "Alpha"),
                ConsolidationRule::new("AlphaAnnex", "Alpha"),
            ],
            &catalog(),
        )
        .expect("rules");
        let records = vec![
            record("AlphaAnnex", 2, 1.0),
            record("AlphaVariant", 1, 5.0),
            record("Alpha", 1, 10.0),
        ];

        let once = consolidate(&records, &rules);
        let twice = consolidate(&once, &rules);

        assert_eq!(once, twice);
    }

    #[test]
    fn chained_rules_are_rejected() {
        let result = ConsolidationRules::new(
            vec![
                ConsolidationRule::new("AlphaAnnex", "AlphaVariant"),
                ConsolidationRule::new("AlphaVariant", "Alpha"),
            ],
            &catalog(),
        );
        assert!(matches!(result, Err(ProcessorError::InvalidRule { .. })));
    }

    #[test]
    fn unknown_and_transitional_programs_are_rejected() {
        let unknown = ConsolidationRules::new(
            vec![ConsolidationRule::new("AlphaVariant", "Omega")],
            &catalog(),
        );
        assert!(matches!(
            unknown,
            Err(ProcessorError::InvalidRule { ref reason, .. }) if reason.contains("target")
        ));

        let transitional = ConsolidationRules::new(
            vec![ConsolidationRule::new("Alpha_TK", "Alpha")],
            &catalog(),
        );
        assert!(matches!(transitional, Err(ProcessorError::InvalidRule { .. })));
    }
}
