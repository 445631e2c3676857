//! Validation context handed to rule predicates.
//!
//! A context is an immutable snapshot of one cell at the moment validation
//! was requested: the current value, the pre-edit value, the row's other
//! cells and a timestamp. Rules read it and return a
//! [`ValidationResult`](super::ValidationResult); they never write back.

use super::{CellEdit, CellValue, ColumnName, Row};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Runtime context for validating a single cell.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    column: ColumnName,
    row: Arc<Row>,
    value: CellValue,
    original_value: Option<CellValue>,
    timestamp: DateTime<Utc>,
}

impl ValidationContext {
    /// Creates a context for a cell, reading the current value from the row.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grid_guard::core::{Row, ValidationContext};
    ///
    /// let row = Row::new(0).with_value("Name", "Ann");
    /// let ctx = ValidationContext::new("Name", &row);
    /// assert_eq!(ctx.value().to_string(), "Ann");
    /// assert_eq!(ctx.row_index(), 0);
    /// ```
    pub fn new(column: impl Into<ColumnName>, row: &Row) -> Self {
        Self::from_shared(column, Arc::new(row.clone()))
    }

    pub(crate) fn from_shared(column: impl Into<ColumnName>, row: Arc<Row>) -> Self {
        let column = column.into();
        let value = row.get_by_name(&column).clone();
        Self {
            column,
            row,
            value,
            original_value: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a context for a value that has not been committed to the row yet.
    pub fn with_value(
        column: impl Into<ColumnName>,
        value: impl Into<CellValue>,
        row: &Row,
    ) -> Self {
        let mut ctx = Self::new(column, row);
        ctx.value = value.into();
        ctx
    }

    /// Creates a context for a committed edit; `row` is the post-edit row.
    pub fn for_edit(edit: &CellEdit, row: &Row) -> Self {
        Self::with_value(edit.column.clone(), edit.current.clone(), row)
            .with_original(edit.original.clone())
    }

    /// Sets the pre-edit value.
    pub fn with_original(mut self, original: impl Into<CellValue>) -> Self {
        self.original_value = Some(original.into());
        self
    }

    pub fn column(&self) -> &ColumnName {
        &self.column
    }

    pub fn row_index(&self) -> usize {
        self.row.row_index()
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn original_value(&self) -> Option<&CellValue> {
        self.original_value.as_ref()
    }

    /// True when an original value is known and differs from the current one.
    pub fn is_changed(&self) -> bool {
        self.original_value
            .as_ref()
            .is_some_and(|original| original != &self.value)
    }

    /// Reads another column of the same row. Reading the context's own
    /// column returns the value under validation.
    pub fn value_of(&self, column: &str) -> &CellValue {
        if self.column.matches(column) {
            &self.value
        } else {
            self.row.get(column)
        }
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_reads_row_value() {
        let row = Row::new(3).with_value("Age", 17).with_value("Name", "Bob");
        let ctx = ValidationContext::new("age", &row);
        assert_eq!(ctx.value(), &CellValue::Integer(17));
        assert_eq!(ctx.value_of("Name"), &CellValue::from("Bob"));
        assert_eq!(ctx.row_index(), 3);
        assert!(!ctx.is_changed());
    }

    #[test]
    fn test_pending_value_shadows_row() {
        let row = Row::new(0).with_value("Age", 17);
        let ctx = ValidationContext::with_value("Age", 21, &row).with_original(17);
        assert_eq!(ctx.value_of("AGE"), &CellValue::Integer(21));
        assert_eq!(ctx.original_value(), Some(&CellValue::Integer(17)));
        assert!(ctx.is_changed());
    }

    #[test]
    fn test_for_edit() {
        let row = Row::new(1).with_value("Name", "Robert");
        let edit = CellEdit {
            row_index: 1,
            column: ColumnName::new("Name"),
            original: CellValue::from("Bob"),
            current: CellValue::from("Robert"),
        };
        let ctx = ValidationContext::for_edit(&edit, &row);
        assert_eq!(ctx.value(), &CellValue::from("Robert"));
        assert_eq!(ctx.original_value(), Some(&CellValue::from("Bob")));
    }
}
