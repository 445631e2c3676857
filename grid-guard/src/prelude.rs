//! Prelude for commonly used types and traits in grid-guard.

pub use crate::core::{
    CellValue, Column, ColumnName, ExecutionMode, Row, RowSnapshot, RowStore, RuleEngine,
    Severity, ValidationContext, ValidationOutcome, ValidationResult, ValidationRule,
};
pub use crate::error::{ErrorContext, GridError, Result};
pub use crate::filter::{AdvancedFilter, FilterOperator, LogicalOperator, MultiColumnFilterSet};
pub use crate::logging::LogConfig;
pub use crate::orchestrator::{OrchestratorConfig, ValidationOrchestrator, ValidationState};
pub use crate::pipeline::ViewPipeline;
pub use crate::search::{SearchEngine, SearchOptions, SearchStrategy};
pub use crate::sort::{SortDirection, SortEngine};
