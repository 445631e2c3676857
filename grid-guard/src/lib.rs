//! # Grid Guard - Validation, filtering, search and sorting for data grids
//!
//! Grid Guard is the non-visual core of an editable data grid. It owns the
//! rows and columns, validates cells against prioritized rules (including
//! cross-row and asynchronous ones) and computes the filtered, searched and
//! sorted view of the rows that a front end renders.
//!
//! ## Quick Start
//!
//! ```rust
//! use grid_guard::prelude::*;
//! use grid_guard::core::rules;
//!
//! # fn main() -> grid_guard::error::Result<()> {
//! let mut store = RowStore::new(vec![Column::text("Name"), Column::integer("Age")])?;
//! store.push_row([("Name", CellValue::from("Bob")), ("Age", CellValue::from(17))])?;
//! store.push_row([("Name", CellValue::from("")), ("Age", CellValue::from(30))])?;
//! store.push_row([("Name", CellValue::from("Ann")), ("Age", CellValue::from(25))])?;
//!
//! let engine = RuleEngine::default()
//!     .with_rule(rules::required("Name"))?
//!     .with_rule(rules::range("Age", 18.0, 100.0))?;
//!
//! let snapshot = store.snapshot();
//! let invalid: Vec<usize> = snapshot
//!     .iter()
//!     .filter(|row| !engine.evaluate_row(row, &snapshot).is_valid())
//!     .map(|row| row.row_index())
//!     .collect();
//! assert_eq!(invalid, vec![0, 1]);
//!
//! // Filter, then sort what is left.
//! let mut view = ViewPipeline::new();
//! view.filters_mut()
//!     .add(AdvancedFilter::new("Age", FilterOperator::GreaterThanOrEqual, "18"));
//! view.sort_mut().add_column("Name", SortDirection::Ascending);
//! let result = view.apply(&snapshot);
//! assert_eq!(result.row_indices, vec![2, 1]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`core`**: the data model ([`core::RowStore`], [`core::RowSnapshot`]),
//!   rules and the synchronous/asynchronous [`core::RuleEngine`]
//! - **`orchestrator`**: background validation with debouncing,
//!   cancel-and-replace per cell, a concurrency cap, timeouts and a result
//!   cache
//! - **`filter`**: per-column predicates combined left to right with AND/OR
//! - **`search`**: multi-strategy text search with relevance scoring and
//!   highlighting
//! - **`sort`**: stable multi-column sort
//! - **`pipeline`**: filter, search and sort composed into one view
//!
//! Every component reads immutable [`core::RowSnapshot`]s, so background
//! work never observes a half-applied edit.

pub mod core;
pub mod error;
pub mod filter;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod prelude;
pub mod search;
pub mod sort;
