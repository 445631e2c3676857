//! Rows and immutable row snapshots.

use super::{CellValue, Column, ColumnName};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

static NULL: CellValue = CellValue::Null;

/// A single grid row.
///
/// `row_index` is a position, not an identity: it is reassigned when rows
/// are removed and the store recompacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    row_index: usize,
    cells: HashMap<ColumnName, CellValue>,
    is_empty: bool,
}

impl Row {
    /// Creates an empty row at the given position.
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            cells: HashMap::new(),
            is_empty: true,
        }
    }

    /// Builder-style cell assignment.
    ///
    /// A row does not know which columns are special, so `is_empty` is
    /// recomputed over every cell present. Call [`Row::recompute_empty`]
    /// with the grid's columns to exclude special ones; the store does this
    /// on every write.
    pub fn with_value(mut self, column: impl Into<ColumnName>, value: impl Into<CellValue>) -> Self {
        self.set(column, value);
        self.is_empty = self.cells.values().all(CellValue::is_blank);
        self
    }

    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub(crate) fn set_row_index(&mut self, row_index: usize) {
        self.row_index = row_index;
    }

    /// Returns the value of a column (case-insensitive). Missing cells read as `Null`.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells
            .get(column.to_lowercase().as_str())
            .unwrap_or(&NULL)
    }

    /// Case-insensitive lookup by an already-built column name.
    pub fn get_by_name(&self, column: &ColumnName) -> &CellValue {
        self.cells.get(column).unwrap_or(&NULL)
    }

    /// Replaces a cell value and returns the previous one.
    pub fn set(&mut self, column: impl Into<ColumnName>, value: impl Into<CellValue>) -> CellValue {
        self.cells
            .insert(column.into(), value.into())
            .unwrap_or(CellValue::Null)
    }

    /// Iterates over all stored cells in arbitrary order.
    pub fn cells(&self) -> impl Iterator<Item = (&ColumnName, &CellValue)> {
        self.cells.iter()
    }

    /// True iff every non-special column is null or blank.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Recomputes the `is_empty` flag against the grid's columns.
    pub fn recompute_empty(&mut self, columns: &[Column]) {
        self.is_empty = columns
            .iter()
            .filter(|c| !c.is_special())
            .all(|c| self.get_by_name(c.name()).is_blank());
    }

    pub(crate) fn clear(&mut self) {
        for value in self.cells.values_mut() {
            *value = CellValue::Null;
        }
        self.is_empty = true;
    }
}

/// An immutable, cheaply clonable view of the grid's rows.
///
/// Snapshots never change after creation, so components can read them from
/// any thread while the store keeps accepting edits.
///
/// Rows are looked up by their `row_index`, which need not match their
/// position (a filtered or hand-built snapshot). When two rows share an
/// index the first one wins.
#[derive(Debug, Clone)]
pub struct RowSnapshot {
    columns: Arc<[Column]>,
    rows: Arc<[Row]>,
    // Row index to position. `None` when every row sits at its own index.
    positions: Option<Arc<HashMap<usize, usize>>>,
}

impl RowSnapshot {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        let positional = rows
            .iter()
            .enumerate()
            .all(|(position, row)| row.row_index() == position);
        let positions = (!positional).then(|| {
            let mut positions = HashMap::with_capacity(rows.len());
            for (position, row) in rows.iter().enumerate() {
                positions.entry(row.row_index()).or_insert(position);
            }
            Arc::new(positions)
        });
        Self {
            columns: columns.into(),
            rows: rows.into(),
            positions,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Data columns: not special.
    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.is_special())
    }

    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name().matches(name))
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The row whose `row_index` is `row_index`.
    pub fn get(&self, row_index: usize) -> Option<&Row> {
        match &self.positions {
            None => self.rows.get(row_index),
            Some(positions) => positions
                .get(&row_index)
                .and_then(|&position| self.rows.get(position)),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Every row index in store order.
    pub fn row_indices(&self) -> Vec<usize> {
        self.rows.iter().map(Row::row_index).collect()
    }

    /// Rows other than `row_index`, as seen by cross-row rules.
    pub fn others(&self, row_index: usize) -> OtherRows<'_> {
        OtherRows {
            rows: &self.rows,
            exclude: row_index,
        }
    }
}

/// The rows a cross-row rule may inspect: the whole snapshot minus the row
/// under validation, excluded by row index.
#[derive(Debug, Clone, Copy)]
pub struct OtherRows<'a> {
    rows: &'a [Row],
    exclude: usize,
}

impl<'a> OtherRows<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a Row> + 'a {
        let (rows, exclude) = (self.rows, self.exclude);
        rows.iter().filter(move |r| r.row_index() != exclude)
    }

    /// Number of rows visible to the rule.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the given column's values across the other rows.
    pub fn values(&self, column: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.iter().map(move |r| r.get(column))
    }
}
