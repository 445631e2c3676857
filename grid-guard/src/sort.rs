//! Multi-column stable sort.
//!
//! Each column is compared according to its declared type: numbers
//! numerically, dates chronologically, booleans `false < true` and text
//! case-insensitively with an ordinal tie-break. Within one column a value
//! that cannot be read as the declared type is non-comparable and sorts
//! after every comparable value; blank cells come last. That partition
//! order is the same in both directions, only the order inside a partition
//! flips.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{CellValue, ColumnName, ColumnType, RowSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// One sort column. Lower `priority` numbers take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: ColumnName,
    pub direction: SortDirection,
    pub priority: u32,
}

impl SortSpec {
    pub fn new(column: impl Into<ColumnName>, direction: SortDirection, priority: u32) -> Self {
        Self {
            column: column.into(),
            direction,
            priority,
        }
    }

    pub fn ascending(column: impl Into<ColumnName>) -> Self {
        Self::new(column, SortDirection::Ascending, 0)
    }

    pub fn descending(column: impl Into<ColumnName>) -> Self {
        Self::new(column, SortDirection::Descending, 0)
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Number,
    Date,
    Bool,
    Text,
}

impl KeyKind {
    fn for_column(column_type: Option<&ColumnType>) -> Self {
        match column_type {
            Some(ColumnType::Integer | ColumnType::Decimal) => KeyKind::Number,
            Some(ColumnType::Date) => KeyKind::Date,
            Some(ColumnType::Boolean) => KeyKind::Bool,
            Some(ColumnType::Text | ColumnType::Enum(_)) | None => KeyKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
    Text { folded: String, raw: String },
    /// Present but not readable as the column's type
    Mismatch { folded: String, raw: String },
    Blank,
}

impl SortKey {
    fn new(value: &CellValue, kind: KeyKind) -> Self {
        if value.is_blank() {
            return SortKey::Blank;
        }
        let converted = match kind {
            KeyKind::Number => value.as_decimal().map(SortKey::Number),
            KeyKind::Date => value.as_date().map(SortKey::Date),
            KeyKind::Bool => value.as_bool().map(SortKey::Bool),
            KeyKind::Text => {
                let raw = value.as_text().into_owned();
                Some(SortKey::Text {
                    folded: raw.to_lowercase(),
                    raw,
                })
            }
        };
        converted.unwrap_or_else(|| {
            let raw = value.as_text().into_owned();
            SortKey::Mismatch {
                folded: raw.to_lowercase(),
                raw,
            }
        })
    }

    fn partition(&self) -> u8 {
        match self {
            SortKey::Mismatch { .. } => 1,
            SortKey::Blank => 2,
            _ => 0,
        }
    }

    fn compare(&self, other: &SortKey, direction: SortDirection) -> Ordering {
        let by_partition = self.partition().cmp(&other.partition());
        if by_partition != Ordering::Equal {
            return by_partition;
        }
        let ordering = match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (
                SortKey::Text { folded: fa, raw: ra },
                SortKey::Text { folded: fb, raw: rb },
            )
            | (
                SortKey::Mismatch { folded: fa, raw: ra },
                SortKey::Mismatch { folded: fb, raw: rb },
            ) => fa.cmp(fb).then_with(|| ra.cmp(rb)),
            _ => Ordering::Equal,
        };
        direction.apply(ordering)
    }
}

/// An ordered set of [`SortSpec`]s.
///
/// # Examples
///
/// ```rust
/// use grid_guard::core::{Column, Row, RowSnapshot};
/// use grid_guard::sort::{SortDirection, SortEngine};
///
/// let snapshot = RowSnapshot::new(
///     vec![Column::text("Name"), Column::integer("Score")],
///     vec![
///         Row::new(0).with_value("Name", "A").with_value("Score", 1),
///         Row::new(1).with_value("Name", "B").with_value("Score", 1),
///         Row::new(2).with_value("Name", "C").with_value("Score", 2),
///     ],
/// );
///
/// let mut sort = SortEngine::new();
/// sort.add_column("Score", SortDirection::Descending);
/// assert_eq!(sort.sort(&snapshot, &[0, 1, 2]), vec![2, 0, 1]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEngine {
    specs: Vec<SortSpec>,
}

impl SortEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spec, replacing any existing spec for the same column.
    pub fn add(&mut self, spec: SortSpec) {
        self.specs.retain(|s| s.column != spec.column);
        self.specs.push(spec);
    }

    /// Adds a column after every existing one.
    pub fn add_column(&mut self, column: impl Into<ColumnName>, direction: SortDirection) {
        let column = column.into();
        let priority = self
            .specs
            .iter()
            .filter(|s| s.column != column)
            .map(|s| s.priority + 1)
            .max()
            .unwrap_or(0);
        self.add(SortSpec::new(column, direction, priority));
    }

    /// Cycles a column through ascending, descending and unsorted.
    pub fn toggle(&mut self, column: &str) {
        match self.specs.iter().position(|s| s.column.matches(column)) {
            Some(i) if self.specs[i].direction == SortDirection::Ascending => {
                self.specs[i].direction = SortDirection::Descending;
            }
            Some(i) => {
                self.specs.remove(i);
            }
            None => self.add_column(column, SortDirection::Ascending),
        }
    }

    pub fn remove(&mut self, column: &str) -> bool {
        let before = self.specs.len();
        self.specs.retain(|s| !s.column.matches(column));
        self.specs.len() != before
    }

    pub fn clear(&mut self) {
        self.specs.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Specs in precedence order; equal priorities keep insertion order.
    pub fn specs(&self) -> Vec<&SortSpec> {
        let mut specs: Vec<&SortSpec> = self.specs.iter().collect();
        specs.sort_by_key(|s| s.priority);
        specs
    }

    pub fn direction_of(&self, column: &str) -> Option<SortDirection> {
        self.specs
            .iter()
            .find(|s| s.column.matches(column))
            .map(|s| s.direction)
    }

    /// Orders `rows` (indices into `snapshot`). The sort is stable: rows
    /// tied on every spec keep their input order. Indices missing from the
    /// snapshot are dropped.
    pub fn sort(&self, snapshot: &RowSnapshot, rows: &[usize]) -> Vec<usize> {
        let specs = self.specs();
        let kinds: Vec<KeyKind> = specs
            .iter()
            .map(|spec| {
                let column = snapshot.column(spec.column.key());
                KeyKind::for_column(column.map(|c| c.column_type()))
            })
            .collect();

        let mut keyed: Vec<(usize, Vec<SortKey>)> = rows
            .iter()
            .filter_map(|&index| snapshot.get(index).map(|row| (index, row)))
            .map(|(index, row)| {
                let keys = specs
                    .iter()
                    .zip(&kinds)
                    .map(|(spec, kind)| SortKey::new(row.get_by_name(&spec.column), *kind))
                    .collect();
                (index, keys)
            })
            .collect();

        keyed.sort_by(|(_, a), (_, b)| {
            specs
                .iter()
                .zip(a.iter().zip(b))
                .map(|(spec, (ka, kb))| ka.compare(kb, spec.direction))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        debug!(rows = keyed.len(), specs = specs.len(), "Sorted rows");
        keyed.into_iter().map(|(index, _)| index).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, Row};

    fn snapshot(rows: Vec<Row>) -> RowSnapshot {
        RowSnapshot::new(
            vec![
                Column::text("Name"),
                Column::integer("Score"),
                Column::new("Joined", ColumnType::Date),
            ],
            rows,
        )
    }

    fn all(snapshot: &RowSnapshot) -> Vec<usize> {
        snapshot.row_indices()
    }

    #[test]
    fn test_stable_on_equal_keys() {
        let data = snapshot(vec![
            Row::new(0).with_value("Name", "A").with_value("Score", 1),
            Row::new(1).with_value("Name", "B").with_value("Score", 1),
            Row::new(2).with_value("Name", "C").with_value("Score", 2),
        ]);
        let mut sort = SortEngine::new();
        sort.add(SortSpec::ascending("Score"));
        assert_eq!(sort.sort(&data, &all(&data)), vec![0, 1, 2]);
        assert_eq!(sort.sort(&data, &[1, 0, 2]), vec![1, 0, 2]);
    }

    #[test]
    fn test_ties_fall_through_by_priority() {
        let data = snapshot(vec![
            Row::new(0).with_value("Name", "b").with_value("Score", 1),
            Row::new(1).with_value("Name", "a").with_value("Score", 2),
            Row::new(2).with_value("Name", "a").with_value("Score", 1),
        ]);
        let mut sort = SortEngine::new();
        // Added second but with the lower priority number, so it leads.
        sort.add(SortSpec::descending("Score").with_priority(5));
        sort.add(SortSpec::ascending("Name").with_priority(1));
        assert_eq!(sort.sort(&data, &all(&data)), vec![1, 2, 0]);
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let data = snapshot(vec![
            Row::new(0).with_value("Score", 10),
            Row::new(1).with_value("Score", "9"),
            Row::new(2).with_value("Score", 9.5),
        ]);
        let mut sort = SortEngine::new();
        sort.add_column("Score", SortDirection::Ascending);
        assert_eq!(sort.sort(&data, &all(&data)), vec![1, 2, 0]);
    }

    #[test]
    fn test_mismatched_and_blank_values_sort_last_both_ways() {
        let data = snapshot(vec![
            Row::new(0).with_value("Score", "n/a"),
            Row::new(1).with_value("Score", 3),
            Row::new(2),
            Row::new(3).with_value("Score", 7),
        ]);
        let mut sort = SortEngine::new();
        sort.add_column("Score", SortDirection::Ascending);
        assert_eq!(sort.sort(&data, &all(&data)), vec![1, 3, 0, 2]);
        sort.toggle("Score");
        assert_eq!(sort.sort(&data, &all(&data)), vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_text_is_case_insensitive_then_ordinal() {
        let data = snapshot(vec![
            Row::new(0).with_value("Name", "bob"),
            Row::new(1).with_value("Name", "Bob"),
            Row::new(2).with_value("Name", "alice"),
        ]);
        let mut sort = SortEngine::new();
        sort.add_column("name", SortDirection::Ascending);
        assert_eq!(sort.sort(&data, &all(&data)), vec![2, 1, 0]);
    }

    #[test]
    fn test_dates_compare_chronologically() {
        let data = snapshot(vec![
            Row::new(0).with_value("Joined", "2024-02-01"),
            Row::new(1).with_value("Joined", NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
        ]);
        let mut sort = SortEngine::new();
        sort.add_column("Joined", SortDirection::Ascending);
        assert_eq!(sort.sort(&data, &all(&data)), vec![1, 0]);
    }

    #[test]
    fn test_toggle_cycle() {
        let mut sort = SortEngine::new();
        sort.toggle("Name");
        assert_eq!(sort.direction_of("name"), Some(SortDirection::Ascending));
        sort.toggle("Name");
        assert_eq!(sort.direction_of("Name"), Some(SortDirection::Descending));
        sort.toggle("NAME");
        assert!(sort.is_empty());
    }

    #[test]
    fn test_add_column_assigns_sequential_priority() {
        let mut sort = SortEngine::new();
        sort.add_column("Name", SortDirection::Ascending);
        sort.add_column("Score", SortDirection::Descending);
        let priorities: Vec<u32> = sort.specs().iter().map(|s| s.priority).collect();
        assert_eq!(priorities, vec![0, 1]);

        // Re-adding replaces rather than duplicates.
        sort.add_column("Name", SortDirection::Descending);
        assert_eq!(sort.specs().len(), 2);
        assert_eq!(sort.specs()[1].column, ColumnName::new("Name"));
    }

    #[test]
    fn test_no_specs_keeps_input_order_and_drops_unknown_rows() {
        let data = snapshot(vec![Row::new(0), Row::new(1)]);
        assert_eq!(SortEngine::new().sort(&data, &[1, 7, 0]), vec![1, 0]);
    }
}
