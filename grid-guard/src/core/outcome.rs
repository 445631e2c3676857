//! Per-cell and per-row validation outcomes.

use super::{ColumnName, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One failing rule for a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// The set of currently failing rules for one cell.
///
/// An outcome is built in one pass and replaced wholesale by the next pass;
/// it is never patched incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    failures: Vec<RuleFailure>,
}

impl ValidationOutcome {
    /// An outcome with no failures.
    pub fn valid() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, failure: RuleFailure) {
        self.failures.push(failure);
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// The highest severity among the failures, `None` when valid.
    pub fn severity(&self) -> Option<Severity> {
        self.failures.iter().map(|f| f.severity).max()
    }

    /// True when at least one failure is Error or Critical.
    pub fn has_blocking_failure(&self) -> bool {
        self.failures.iter().any(|f| f.severity.is_blocking())
    }

    pub fn failures(&self) -> &[RuleFailure] {
        &self.failures
    }

    /// Failure messages in rule execution order.
    pub fn messages(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.message.as_str()).collect()
    }

    pub fn failed_rule_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.rule_id.as_str()).collect()
    }
}

/// Outcomes for every data column of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowValidation {
    pub row_index: usize,
    outcomes: HashMap<ColumnName, ValidationOutcome>,
}

impl RowValidation {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            outcomes: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, column: ColumnName, outcome: ValidationOutcome) {
        self.outcomes.insert(column, outcome);
    }

    /// Outcome for a column (case-insensitive).
    pub fn outcome(&self, column: &str) -> Option<&ValidationOutcome> {
        self.outcomes.get(column.to_lowercase().as_str())
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (&ColumnName, &ValidationOutcome)> {
        self.outcomes.iter()
    }

    pub fn is_valid(&self) -> bool {
        self.outcomes.values().all(ValidationOutcome::is_valid)
    }

    pub fn severity(&self) -> Option<Severity> {
        self.outcomes.values().filter_map(ValidationOutcome::severity).max()
    }

    /// Columns with at least one failure.
    pub fn invalid_columns(&self) -> Vec<&ColumnName> {
        let mut columns: Vec<_> = self
            .outcomes
            .iter()
            .filter(|(_, o)| !o.is_valid())
            .map(|(c, _)| c)
            .collect();
        columns.sort();
        columns
    }
}
