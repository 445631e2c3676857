//! Column filters.
//!
//! An [`AdvancedFilter`] tests one column of a row with one of the
//! [`FilterOperator`]s; a [`MultiColumnFilterSet`] folds several filters into
//! one boolean using each filter's [`LogicalOperator`].

mod advanced;
mod operator;
mod set;

pub use advanced::AdvancedFilter;
pub use operator::{FilterOperator, LogicalOperator};
pub use set::MultiColumnFilterSet;
