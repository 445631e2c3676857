//! Single-column filter predicates.

use std::borrow::Cow;
use std::cmp::Ordering;

use once_cell::sync::OnceCell;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FilterOperator, LogicalOperator};
use crate::core::{parse_date, parse_decimal, CellValue, ColumnName, Row};

/// A predicate over one column of a row.
///
/// Text operators honour `case_sensitive`. Numeric operators parse both
/// sides and fail closed: a cell or operand that does not parse makes the
/// filter reject the row. Pattern errors in `Regex` filters do the same.
///
/// # Examples
///
/// ```rust
/// use grid_guard::core::Row;
/// use grid_guard::filter::{AdvancedFilter, FilterOperator};
///
/// let ann = Row::new(2).with_value("Name", "Ann").with_value("Age", 25);
///
/// assert!(AdvancedFilter::new("Name", FilterOperator::Contains, "an").apply(&ann));
/// assert!(!AdvancedFilter::new("Name", FilterOperator::Contains, "an")
///     .case_sensitive(true)
///     .apply(&ann));
/// assert!(AdvancedFilter::new("Age", FilterOperator::Between, "18")
///     .with_second_value("30")
///     .apply(&ann));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedFilter {
    column: ColumnName,
    operator: FilterOperator,
    #[serde(default)]
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    second_value: Option<String>,
    #[serde(default)]
    case_sensitive: bool,
    #[serde(default)]
    logical_operator: LogicalOperator,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    /// Compiled `Regex` pattern; `None` inside means the pattern is invalid.
    #[serde(skip)]
    regex: OnceCell<Option<Regex>>,
}

fn enabled_by_default() -> bool {
    true
}

impl AdvancedFilter {
    /// Creates an enabled, case-insensitive filter joined with AND.
    pub fn new(
        column: impl Into<ColumnName>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            second_value: None,
            case_sensitive: false,
            logical_operator: LogicalOperator::And,
            enabled: true,
            regex: OnceCell::new(),
        }
    }

    /// Sets the upper bound for `Between`/`NotBetween`.
    pub fn with_second_value(mut self, value: impl Into<String>) -> Self {
        self.second_value = Some(value.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self.regex = OnceCell::new();
        self
    }

    /// Sets how this filter combines with the filters before it in a set.
    pub fn with_logical_operator(mut self, operator: LogicalOperator) -> Self {
        self.logical_operator = operator;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn column(&self) -> &ColumnName {
        &self.column
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn second_value(&self) -> Option<&str> {
        self.second_value.as_deref()
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn logical_operator(&self) -> LogicalOperator {
        self.logical_operator
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Evaluates the filter against the filter column of `row`.
    pub fn apply(&self, row: &Row) -> bool {
        self.matches(row.get_by_name(&self.column))
    }

    /// Evaluates the filter against a single cell value.
    pub fn matches(&self, cell: &CellValue) -> bool {
        use FilterOperator as Op;

        match self.operator {
            Op::Equals => self.equals(cell),
            Op::NotEquals => !self.equals(cell),
            Op::Contains => self.text_test(cell, |c, v| c.contains(v)),
            Op::NotContains => !self.text_test(cell, |c, v| c.contains(v)),
            Op::StartsWith => self.text_test(cell, |c, v| c.starts_with(v)),
            Op::EndsWith => self.text_test(cell, |c, v| c.ends_with(v)),
            Op::IsEmpty => cell.is_blank(),
            Op::IsNotEmpty => !cell.is_blank(),
            Op::GreaterThan => self.compare(cell, Ordering::is_gt),
            Op::GreaterThanOrEqual => self.compare(cell, Ordering::is_ge),
            Op::LessThan => self.compare(cell, Ordering::is_lt),
            Op::LessThanOrEqual => self.compare(cell, Ordering::is_le),
            Op::Between => self.in_range(cell).unwrap_or(false),
            Op::NotBetween => self.in_range(cell).is_some_and(|inside| !inside),
            Op::In => self.in_list(cell),
            Op::NotIn => !self.in_list(cell),
            Op::Regex => self.regex_match(cell),
        }
    }

    /// A readable form such as `Age between 18 and 65`.
    pub fn description(&self) -> String {
        let op = self.operator.description();
        match self.operator {
            FilterOperator::IsEmpty | FilterOperator::IsNotEmpty => {
                format!("{} {op}", self.column)
            }
            FilterOperator::Between | FilterOperator::NotBetween => format!(
                "{} {op} {} and {}",
                self.column,
                self.value,
                self.second_value.as_deref().unwrap_or("?")
            ),
            FilterOperator::In | FilterOperator::NotIn => {
                format!("{} {op} ({})", self.column, self.value)
            }
            _ => format!("{} {op} '{}'", self.column, self.value),
        }
    }

    fn fold_case<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.case_sensitive {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(text.to_lowercase())
        }
    }

    fn text_test<F>(&self, cell: &CellValue, test: F) -> bool
    where
        F: Fn(&str, &str) -> bool,
    {
        let text = cell.as_text();
        test(&self.fold_case(&text), &self.fold_case(&self.value))
    }

    fn equals(&self, cell: &CellValue) -> bool {
        if self.text_test(cell, |c, v| c == v) {
            return true;
        }
        // 17 and "17.0" are the same number.
        matches!(
            (cell.as_decimal(), parse_decimal(&self.value)),
            (Some(a), Some(b)) if a == b
        )
    }

    /// Dates compare as dates when both sides are dates, otherwise both
    /// sides must be numbers.
    fn compare<F>(&self, cell: &CellValue, accept: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        let ordering = match (cell.as_date(), parse_date(&self.value)) {
            (Some(cell), Some(operand)) => Some(cell.cmp(&operand)),
            _ => match (cell.as_decimal(), parse_decimal(&self.value)) {
                (Some(cell), Some(operand)) => cell.partial_cmp(&operand),
                _ => None,
            },
        };
        ordering.is_some_and(accept)
    }

    /// `None` when the cell or either bound does not parse.
    fn in_range(&self, cell: &CellValue) -> Option<bool> {
        let value = cell.as_decimal()?;
        let min = parse_decimal(&self.value)?;
        let max = parse_decimal(self.second_value.as_deref()?)?;
        Some(min <= value && value <= max)
    }

    fn in_list(&self, cell: &CellValue) -> bool {
        let text = cell.as_text();
        let cell = self.fold_case(text.trim());
        self.value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .any(|item| self.fold_case(item) == cell)
    }

    fn regex_match(&self, cell: &CellValue) -> bool {
        let regex = self.regex.get_or_init(|| {
            RegexBuilder::new(&self.value)
                .case_insensitive(!self.case_sensitive)
                .build()
                .map_err(|e| {
                    debug!(
                        column.name = %self.column,
                        error = %e,
                        "Invalid filter pattern, filter rejects every row"
                    );
                })
                .ok()
        });
        regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(&cell.as_text()))
    }
}

impl PartialEq for AdvancedFilter {
    fn eq(&self, other: &Self) -> bool {
        self.column == other.column
            && self.operator == other.operator
            && self.value == other.value
            && self.second_value == other.second_value
            && self.case_sensitive == other.case_sensitive
            && self.logical_operator == other.logical_operator
            && self.enabled == other.enabled
    }
}
