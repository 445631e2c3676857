//! Error types for the grid-guard engine.
//!
//! Only configuration and programming-contract violations surface as
//! [`GridError`]. Data and runtime conditions (a failing rule, an unparseable
//! filter operand, a bad search pattern, a timed-out background validation)
//! are reported through validation outcomes, predicate results and
//! validation states instead.

use thiserror::Error;

/// The main error type for the grid-guard library.
#[derive(Error, Debug)]
pub enum GridError {
    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error when a column is not part of the grid.
    #[error("Column '{column}' not found in grid")]
    ColumnNotFound { column: String },

    /// Error when two columns share a (case-insensitive) name.
    #[error("Duplicate column '{column}'")]
    DuplicateColumn { column: String },

    /// Error when a rule id is registered twice.
    #[error("Duplicate rule id '{rule_id}'")]
    DuplicateRule { rule_id: String },

    /// Error when a rule definition breaks an invariant of the rule model.
    #[error("Invalid rule '{rule_id}': {message}")]
    InvalidRule {
        /// Id of the offending rule
        rule_id: String,
        /// What is wrong with it
        message: String,
    },

    /// Error when a row index is out of range.
    #[error("Row {row_index} not found")]
    RowNotFound { row_index: usize },

    /// Error raised by a rule predicate while it was evaluating.
    #[error("Rule '{rule_id}' failed to execute: {message}")]
    RuleExecution {
        /// Id of the rule that failed
        rule_id: String,
        /// Detailed error message
        message: String,
    },

    /// Error compiling a regular expression.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, GridError>`.
///
/// # Examples
///
/// ```rust
/// use grid_guard::error::Result;
///
/// fn configure() -> Result<()> {
///     Ok(())
/// }
/// # configure().unwrap();
/// ```
pub type Result<T> = std::result::Result<T, GridError>;

impl GridError {
    /// Creates a new rule execution error.
    pub fn rule_execution(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleExecution {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid rule error.
    pub fn invalid_rule(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    /// Creates a new column-not-found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<GridError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            GridError::Internal(inner) => GridError::Internal(format!("{msg}: {inner}")),
            other => GridError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                GridError::Internal(inner) => GridError::Internal(format!("{msg}: {inner}")),
                other => GridError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_execution_error() {
        let err = GridError::rule_execution("unique_email", "lookup failed");
        assert_eq!(
            err.to_string(),
            "Rule 'unique_email' failed to execute: lookup failed"
        );
    }

    #[test]
    fn test_column_not_found() {
        let err = GridError::column_not_found("Age");
        assert_eq!(err.to_string(), "Column 'Age' not found in grid");
    }

    #[test]
    fn test_pattern_error_from_regex() {
        let err: GridError = regex::Regex::new("(unclosed").unwrap_err().into();
        assert!(err.to_string().starts_with("Pattern error"));
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(GridError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation().context("During grid setup").unwrap_err();
        assert!(err.to_string().contains("During grid setup"));
        assert!(err.to_string().contains("Something went wrong"));
    }
}
