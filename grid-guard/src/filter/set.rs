//! Filter sets combining several column filters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AdvancedFilter;
use crate::core::{ColumnName, Row, RowSnapshot};

/// An ordered list of filters folded left to right.
///
/// The running result starts as the first enabled filter's outcome; each
/// later enabled filter is combined with it through that filter's own
/// [`LogicalOperator`](super::LogicalOperator). The first filter's operator
/// is ignored. Every enabled filter is evaluated. Disabled filters are
/// treated as absent, and a set without enabled filters accepts every row.
///
/// # Examples
///
/// ```rust
/// use grid_guard::core::Row;
/// use grid_guard::filter::{AdvancedFilter, FilterOperator, LogicalOperator, MultiColumnFilterSet};
///
/// let mut set = MultiColumnFilterSet::new();
/// set.add(AdvancedFilter::new("Age", FilterOperator::LessThan, "18"));
/// set.add(
///     AdvancedFilter::new("Name", FilterOperator::Equals, "Ann")
///         .with_logical_operator(LogicalOperator::Or),
/// );
///
/// let ann = Row::new(0).with_value("Name", "Ann").with_value("Age", 25);
/// let bob = Row::new(1).with_value("Name", "Bob").with_value("Age", 40);
/// assert!(set.apply(&ann));
/// assert!(!set.apply(&bob));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiColumnFilterSet {
    filters: Vec<AdvancedFilter>,
}

impl MultiColumnFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter.
    pub fn add(&mut self, filter: AdvancedFilter) {
        self.filters.push(filter);
    }

    pub fn with_filter(mut self, filter: AdvancedFilter) -> Self {
        self.add(filter);
        self
    }

    /// Removes every filter on `column`. Returns how many were removed.
    pub fn remove_column(&mut self, column: &str) -> usize {
        let before = self.filters.len();
        self.filters.retain(|f| !f.column().matches(column));
        before - self.filters.len()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn filters(&self) -> &[AdvancedFilter] {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut [AdvancedFilter] {
        &mut self.filters
    }

    pub fn enabled_filters(&self) -> impl Iterator<Item = &AdvancedFilter> {
        self.filters.iter().filter(|f| f.is_enabled())
    }

    /// True when at least one filter is enabled.
    pub fn is_active(&self) -> bool {
        self.enabled_filters().next().is_some()
    }

    /// Distinct columns referenced by enabled filters, in filter order.
    pub fn columns(&self) -> Vec<&ColumnName> {
        let mut columns: Vec<&ColumnName> = Vec::new();
        for filter in self.enabled_filters() {
            if !columns.contains(&filter.column()) {
                columns.push(filter.column());
            }
        }
        columns
    }

    /// Evaluates the set against one row.
    pub fn apply(&self, row: &Row) -> bool {
        let mut enabled = self.enabled_filters();
        let Some(first) = enabled.next() else {
            return true;
        };
        enabled.fold(first.apply(row), |running, filter| {
            filter.logical_operator().combine(running, filter.apply(row))
        })
    }

    /// Row indices of the snapshot rows the set accepts, in snapshot order.
    pub fn apply_all(&self, snapshot: &RowSnapshot) -> Vec<usize> {
        let accepted: Vec<usize> = snapshot
            .iter()
            .filter(|row| self.apply(row))
            .map(Row::row_index)
            .collect();
        debug!(
            filters = self.enabled_filters().count(),
            rows.total = snapshot.len(),
            rows.accepted = accepted.len(),
            "Applied filter set"
        );
        accepted
    }

    /// Like [`apply_all`](Self::apply_all), restricted to `candidates`.
    pub fn apply_to(&self, snapshot: &RowSnapshot, candidates: &[usize]) -> Vec<usize> {
        candidates
            .iter()
            .copied()
            .filter(|&index| snapshot.get(index).is_some_and(|row| self.apply(row)))
            .collect()
    }

    /// A readable form such as `Age less than '18' OR Name equals 'Ann'`.
    pub fn description(&self) -> String {
        let mut out = String::new();
        for (i, filter) in self.enabled_filters().enumerate() {
            if i > 0 {
                out.push(' ');
                out.push_str(filter.logical_operator().description());
                out.push(' ');
            }
            out.push_str(&filter.description());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Column;
    use crate::filter::{FilterOperator, LogicalOperator};

    fn people() -> RowSnapshot {
        RowSnapshot::new(
            vec![Column::text("Name"), Column::integer("Age")],
            vec![
                Row::new(0).with_value("Name", "Bob").with_value("Age", 17),
                Row::new(1).with_value("Name", "").with_value("Age", 30),
                Row::new(2).with_value("Name", "Ann").with_value("Age", 25),
            ],
        )
    }

    #[test]
    fn test_empty_set_accepts_everything() {
        let set = MultiColumnFilterSet::new();
        assert_eq!(set.apply_all(&people()), vec![0, 1, 2]);

        let all_disabled = MultiColumnFilterSet::new()
            .with_filter(AdvancedFilter::new("Age", FilterOperator::GreaterThan, "100").disabled());
        assert!(!all_disabled.is_active());
        assert_eq!(all_disabled.apply_all(&people()), vec![0, 1, 2]);
    }

    #[test]
    fn test_contains_scenario() {
        let set = MultiColumnFilterSet::new()
            .with_filter(AdvancedFilter::new("Name", FilterOperator::Contains, "an"));
        assert_eq!(set.apply_all(&people()), vec![2]);
    }

    #[test]
    fn test_first_logical_operator_is_ignored() {
        let set = MultiColumnFilterSet::new().with_filter(
            AdvancedFilter::new("Age", FilterOperator::GreaterThan, "20")
                .with_logical_operator(LogicalOperator::Or),
        );
        assert_eq!(set.apply_all(&people()), vec![1, 2]);
    }

    #[test]
    fn test_left_to_right_fold() {
        // (Age > 20 OR Name = Bob) AND Name is not empty
        let set = MultiColumnFilterSet::new()
            .with_filter(AdvancedFilter::new("Age", FilterOperator::GreaterThan, "20"))
            .with_filter(
                AdvancedFilter::new("Name", FilterOperator::Equals, "bob")
                    .with_logical_operator(LogicalOperator::Or),
            )
            .with_filter(AdvancedFilter::new("Name", FilterOperator::IsNotEmpty, ""));
        assert_eq!(set.apply_all(&people()), vec![0, 2]);
    }

    #[test]
    fn test_disabled_filter_is_absent_not_true() {
        // An OR with a disabled always-true filter must not widen the result.
        let set = MultiColumnFilterSet::new()
            .with_filter(AdvancedFilter::new("Age", FilterOperator::GreaterThan, "26"))
            .with_filter(
                AdvancedFilter::new("Age", FilterOperator::IsNotEmpty, "")
                    .with_logical_operator(LogicalOperator::Or)
                    .disabled(),
            );
        assert_eq!(set.apply_all(&people()), vec![1]);
    }

    #[test]
    fn test_remove_column_and_columns() {
        let mut set = MultiColumnFilterSet::new()
            .with_filter(AdvancedFilter::new("Age", FilterOperator::GreaterThan, "20"))
            .with_filter(AdvancedFilter::new("name", FilterOperator::IsNotEmpty, ""))
            .with_filter(AdvancedFilter::new("AGE", FilterOperator::LessThan, "90"));
        assert_eq!(set.columns().len(), 2);
        assert_eq!(set.remove_column("age"), 2);
        assert_eq!(set.filters().len(), 1);
        set.clear();
        assert!(set.filters().is_empty());
    }

    #[test]
    fn test_description() {
        let set = MultiColumnFilterSet::new()
            .with_filter(AdvancedFilter::new("Age", FilterOperator::LessThan, "18"))
            .with_filter(
                AdvancedFilter::new("Name", FilterOperator::Equals, "Ann")
                    .with_logical_operator(LogicalOperator::Or),
            );
        assert_eq!(set.description(), "Age less than '18' OR Name equals 'Ann'");
    }
}
