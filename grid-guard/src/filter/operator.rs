//! Filter and logical operators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison applied by an [`AdvancedFilter`](super::AdvancedFilter).
///
/// # Examples
///
/// ```rust
/// use grid_guard::filter::FilterOperator;
///
/// assert!(FilterOperator::Between.needs_second_value());
/// assert!(!FilterOperator::IsEmpty.needs_value());
/// assert_eq!(FilterOperator::GreaterThanOrEqual.to_string(), "greater than or equal to");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    /// Inclusive range over `value` and `second_value`
    Between,
    NotBetween,
    /// Comma-separated list in `value`
    In,
    NotIn,
    Regex,
}

impl FilterOperator {
    /// Every operator, in declaration order.
    pub const ALL: [FilterOperator; 17] = [
        Self::Equals,
        Self::NotEquals,
        Self::Contains,
        Self::NotContains,
        Self::StartsWith,
        Self::EndsWith,
        Self::IsEmpty,
        Self::IsNotEmpty,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::Between,
        Self::NotBetween,
        Self::In,
        Self::NotIn,
        Self::Regex,
    ];

    /// Whether the operator reads the filter's `value`.
    pub fn needs_value(&self) -> bool {
        !matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }

    /// Whether the operator reads the filter's `second_value`.
    pub fn needs_second_value(&self) -> bool {
        matches!(self, Self::Between | Self::NotBetween)
    }

    /// Whether the operator compares numbers (or dates).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan
                | Self::GreaterThanOrEqual
                | Self::LessThan
                | Self::LessThanOrEqual
                | Self::Between
                | Self::NotBetween
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not equals",
            Self::Contains => "contains",
            Self::NotContains => "does not contain",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::IsEmpty => "is empty",
            Self::IsNotEmpty => "is not empty",
            Self::GreaterThan => "greater than",
            Self::GreaterThanOrEqual => "greater than or equal to",
            Self::LessThan => "less than",
            Self::LessThanOrEqual => "less than or equal to",
            Self::Between => "between",
            Self::NotBetween => "not between",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Regex => "matches",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// How a filter combines with the running result of the filters before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    /// Combines without short-circuiting; both sides are already evaluated.
    pub fn combine(&self, running: bool, next: bool) -> bool {
        match self {
            LogicalOperator::And => running & next,
            LogicalOperator::Or => running | next,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_count() {
        let mut seen = std::collections::HashSet::new();
        for op in FilterOperator::ALL {
            assert!(seen.insert(op));
        }
        assert_eq!(seen.len(), 17);
    }

    #[test]
    fn test_logical_combine() {
        assert!(LogicalOperator::And.combine(true, true));
        assert!(!LogicalOperator::And.combine(true, false));
        assert!(LogicalOperator::Or.combine(false, true));
        assert!(!LogicalOperator::Or.combine(false, false));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&FilterOperator::GreaterThanOrEqual).unwrap(),
            "\"greater_than_or_equal\""
        );
        assert_eq!(serde_json::to_string(&LogicalOperator::Or).unwrap(), "\"or\"");
    }
}
