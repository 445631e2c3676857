//! Core grid model and the rule engine.
//!
//! This module holds the data the other components read and the rule
//! engine that turns it into validity:
//!
//! - **[`RowStore`]**: owns the [`Column`]s and [`Row`]s and hands out
//!   immutable [`RowSnapshot`]s
//! - **[`ValidationRule`]**: one predicate (single-cell, cross-row or async)
//!   with targets, dependencies, priority, severity and an optional gate
//! - **[`RuleEngine`]**: resolves the rules that apply to a cell and folds
//!   their results into a [`ValidationOutcome`] according to the
//!   [`ExecutionMode`]
//!
//! ```text
//! edit ──► RowStore ──► ValidationContext ──► RuleEngine ──► ValidationOutcome
//!              │                                  ▲
//!              └──────── RowSnapshot ─────────────┘ (cross-row rules)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use grid_guard::core::{rules, CellValue, Column, RowStore, RuleEngine};
//!
//! # fn main() -> grid_guard::error::Result<()> {
//! let mut store = RowStore::new(vec![Column::text("Name"), Column::integer("Age")])?;
//! store.push_row([("Name", CellValue::from("Bob")), ("Age", CellValue::from(17))])?;
//!
//! let mut engine = RuleEngine::default();
//! engine.add_rule(rules::required("Name"))?;
//! engine.add_rule(rules::range("Age", 18.0, 100.0))?;
//!
//! let snapshot = store.snapshot();
//! let row = snapshot.get(0).unwrap();
//! let validation = engine.evaluate_row(row, &snapshot);
//! assert!(validation.outcome("Name").unwrap().is_valid());
//! assert!(!validation.outcome("Age").unwrap().is_valid());
//! # Ok(())
//! # }
//! ```

mod column;
mod engine;
mod level;
mod outcome;
mod row;
mod rule;
pub mod rules;
mod store;
mod validation_context;
mod value;

pub use column::{Column, ColumnName, ColumnType};
pub use engine::{ExecutionMode, RuleEngine, RuleEngineConfig};
pub(crate) use engine::panic_message;
pub use level::Severity;
pub use outcome::{RowValidation, RuleFailure, ValidationOutcome};
pub use row::{OtherRows, Row, RowSnapshot};
pub use rule::{
    AsyncFn, AsyncPredicate, CellPredicate, CrossRowPredicate, RuleCondition, RuleKind,
    RulePredicate, ValidationResult, ValidationRule,
};
pub use store::{CellEdit, RowStore};
pub use validation_context::ValidationContext;
pub use value::{parse_date, parse_decimal, CellValue, DATE_FORMAT};
