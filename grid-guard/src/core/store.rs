//! The row store: the only owner of grid rows.

use super::{CellValue, Column, ColumnName, Row, RowSnapshot};
use crate::prelude::*;
use std::collections::HashSet;
use tracing::debug;

/// A committed cell edit, carrying the pre-edit value so rules can compare
/// against it.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub row_index: usize,
    pub column: ColumnName,
    pub original: CellValue,
    pub current: CellValue,
}

/// Owns the grid's columns and rows and hands out immutable snapshots.
#[derive(Debug, Clone)]
pub struct RowStore {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl RowStore {
    /// Creates an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::DuplicateColumn`] when two columns share a
    /// case-insensitive name, and [`GridError::Configuration`] when no
    /// columns are given.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(GridError::Configuration(
                "a grid needs at least one column".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name().key().to_string()) {
                return Err(GridError::DuplicateColumn {
                    column: column.name().to_string(),
                });
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name().matches(name))
    }

    /// Changes a column's visibility, the one column property that may
    /// change after initialization together with width.
    pub fn set_column_visible(&mut self, name: &str, visible: bool) -> Result<()> {
        self.column_mut(name)?.set_visible(visible);
        Ok(())
    }

    pub fn set_column_width(&mut self, name: &str, width: Option<u32>) -> Result<()> {
        self.column_mut(name)?.set_width(width);
        Ok(())
    }

    fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name().matches(name))
            .ok_or_else(|| GridError::column_not_found(name))
    }

    fn resolve(&self, name: &str) -> Result<ColumnName> {
        self.column(name)
            .map(|c| c.name().clone())
            .ok_or_else(|| GridError::column_not_found(name))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row_index: usize) -> Option<&Row> {
        self.rows.get(row_index)
    }

    /// Appends a row and returns its index.
    ///
    /// Columns not mentioned start out `Null`.
    pub fn push_row<I, S, V>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = (S, V)>,
        S: AsRef<str>,
        V: Into<CellValue>,
    {
        let row_index = self.rows.len();
        let mut row = Row::new(row_index);
        for column in &self.columns {
            row.set(column.name().clone(), CellValue::Null);
        }
        for (name, value) in values {
            let column = self.resolve(name.as_ref())?;
            row.set(column, value);
        }
        row.recompute_empty(&self.columns);
        self.rows.push(row);
        Ok(row_index)
    }

    /// Writes a new value into a cell.
    pub fn apply_edit(
        &mut self,
        row_index: usize,
        column: &str,
        value: impl Into<CellValue>,
    ) -> Result<CellEdit> {
        let column = self.resolve(column)?;
        let row = self
            .rows
            .get_mut(row_index)
            .ok_or(GridError::RowNotFound { row_index })?;
        let current = value.into();
        let original = row.set(column.clone(), current.clone());
        row.recompute_empty(&self.columns);
        debug!(
            row.index = row_index,
            column.name = %column,
            row.is_empty = row.is_empty(),
            "Applied cell edit"
        );
        Ok(CellEdit {
            row_index,
            column,
            original,
            current,
        })
    }

    /// Resets every cell of a row to `Null`, keeping its position.
    pub fn clear_row(&mut self, row_index: usize) -> Result<()> {
        self.rows
            .get_mut(row_index)
            .ok_or(GridError::RowNotFound { row_index })?
            .clear();
        Ok(())
    }

    /// Removes a row and recompacts the indices of the rows after it.
    pub fn remove_row(&mut self, row_index: usize) -> Result<Row> {
        if row_index >= self.rows.len() {
            return Err(GridError::RowNotFound { row_index });
        }
        let removed = self.rows.remove(row_index);
        for (index, row) in self.rows.iter_mut().enumerate().skip(row_index) {
            row.set_row_index(index);
        }
        debug!(row.index = row_index, rows.remaining = self.rows.len(), "Removed row");
        Ok(removed)
    }

    /// Takes an immutable snapshot of the current rows.
    pub fn snapshot(&self) -> RowSnapshot {
        RowSnapshot::new(self.columns.clone(), self.rows.clone())
    }
}
