//! Validation rules and the predicate capability traits they wrap.

use super::{ColumnName, OtherRows, Severity, ValidationContext};
use crate::prelude::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The verdict a predicate returns for one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Overrides the rule's severity when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Overrides the rule's message when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ValidationResult {
    /// A passing result.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            severity: None,
            message: None,
            metadata: HashMap::new(),
        }
    }

    /// A failing result with a message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            severity: None,
            message: Some(message.into()),
            metadata: HashMap::new(),
        }
    }

    /// A failing result that falls back to the rule's own message.
    pub fn failed() -> Self {
        Self {
            is_valid: false,
            ..Self::valid()
        }
    }

    /// Converts a boolean check into a result.
    pub fn from_bool(is_valid: bool) -> Self {
        if is_valid {
            Self::valid()
        } else {
            Self::failed()
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A synchronous predicate over a single cell.
pub trait CellPredicate: Send + Sync {
    fn check(&self, ctx: &ValidationContext) -> Result<ValidationResult>;
}

impl<F> CellPredicate for F
where
    F: Fn(&ValidationContext) -> Result<ValidationResult> + Send + Sync,
{
    fn check(&self, ctx: &ValidationContext) -> Result<ValidationResult> {
        self(ctx)
    }
}

/// A synchronous predicate that also sees every other row of the grid.
///
/// The rows come from an immutable snapshot, so the predicate can iterate
/// freely while edits keep landing in the store.
pub trait CrossRowPredicate: Send + Sync {
    fn check(&self, ctx: &ValidationContext, others: OtherRows<'_>) -> Result<ValidationResult>;
}

impl<F> CrossRowPredicate for F
where
    F: for<'a> Fn(&ValidationContext, OtherRows<'a>) -> Result<ValidationResult> + Send + Sync,
{
    fn check(&self, ctx: &ValidationContext, others: OtherRows<'_>) -> Result<ValidationResult> {
        self(ctx, others)
    }
}

/// An asynchronous predicate. Long-running implementations must poll
/// `cancel` between steps.
#[async_trait]
pub trait AsyncPredicate: Send + Sync {
    async fn check(
        &self,
        ctx: &ValidationContext,
        cancel: &CancellationToken,
    ) -> Result<ValidationResult>;
}

/// Adapts an async closure into an [`AsyncPredicate`].
pub struct AsyncFn<F>(pub F);

#[async_trait]
impl<F, Fut> AsyncPredicate for AsyncFn<F>
where
    F: Fn(ValidationContext, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ValidationResult>> + Send + 'static,
{
    async fn check(
        &self,
        ctx: &ValidationContext,
        cancel: &CancellationToken,
    ) -> Result<ValidationResult> {
        (self.0)(ctx.clone(), cancel.clone()).await
    }
}

/// Exactly one predicate per rule.
#[derive(Clone)]
pub enum RulePredicate {
    SingleCell(Arc<dyn CellPredicate>),
    CrossRow(Arc<dyn CrossRowPredicate>),
    Async(Arc<dyn AsyncPredicate>),
}

impl RulePredicate {
    pub fn kind(&self) -> RuleKind {
        match self {
            RulePredicate::SingleCell(_) => RuleKind::SingleCell,
            RulePredicate::CrossRow(_) => RuleKind::CrossRow,
            RulePredicate::Async(_) => RuleKind::Async,
        }
    }
}

impl fmt::Debug for RulePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RulePredicate::{}", self.kind())
    }
}

/// The kind of predicate a rule carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    SingleCell,
    CrossRow,
    Async,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::SingleCell => "single_cell",
            RuleKind::CrossRow => "cross_row",
            RuleKind::Async => "async",
        };
        f.write_str(name)
    }
}

/// Gate evaluated before a rule runs; a false gate counts as a pass.
pub type RuleCondition = Arc<dyn Fn(&ValidationContext) -> bool + Send + Sync>;

/// A validation rule.
///
/// # Examples
///
/// ```rust
/// use grid_guard::core::{Severity, ValidationResult, ValidationRule};
///
/// let rule = ValidationRule::cell("adult", |ctx| {
///     let age = ctx.value().as_decimal().unwrap_or(0.0);
///     Ok(ValidationResult::from_bool(age >= 18.0))
/// })
/// .for_column("Age")
/// .with_priority(10)
/// .with_severity(Severity::Warning)
/// .with_message("Age should be at least 18");
///
/// assert!(rule.applies_to(&"age".into()));
/// assert!(!rule.applies_to(&"Name".into()));
/// ```
#[derive(Clone)]
pub struct ValidationRule {
    id: String,
    target_columns: Vec<ColumnName>,
    dependency_columns: Vec<ColumnName>,
    priority: i32,
    severity: Severity,
    message: Option<String>,
    enabled: bool,
    condition: Option<RuleCondition>,
    predicate: RulePredicate,
}

impl ValidationRule {
    /// Creates a rule from any predicate.
    pub fn with_predicate(id: impl Into<String>, predicate: RulePredicate) -> Self {
        Self {
            id: id.into(),
            target_columns: Vec::new(),
            dependency_columns: Vec::new(),
            priority: 0,
            severity: Severity::Error,
            message: None,
            enabled: true,
            condition: None,
            predicate,
        }
    }

    /// Creates a single-cell rule from a closure.
    pub fn cell<F>(id: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&ValidationContext) -> Result<ValidationResult> + Send + Sync + 'static,
    {
        Self::with_predicate(id, RulePredicate::SingleCell(Arc::new(predicate)))
    }

    /// Creates a cross-row rule from a closure. Declare the columns it reads
    /// with [`ValidationRule::with_dependencies`].
    pub fn cross_row<F>(id: impl Into<String>, predicate: F) -> Self
    where
        F: for<'a> Fn(&ValidationContext, OtherRows<'a>) -> Result<ValidationResult>
            + Send
            + Sync
            + 'static,
    {
        Self::with_predicate(id, RulePredicate::CrossRow(Arc::new(predicate)))
    }

    /// Creates an asynchronous rule from an async closure.
    pub fn asynchronous<F, Fut>(id: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(ValidationContext, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ValidationResult>> + Send + 'static,
    {
        Self::with_predicate(id, RulePredicate::Async(Arc::new(AsyncFn(predicate))))
    }

    /// Restricts the rule to one column.
    pub fn for_column(mut self, column: impl Into<ColumnName>) -> Self {
        self.target_columns.push(column.into());
        self
    }

    /// Restricts the rule to a set of columns.
    pub fn for_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnName>,
    {
        self.target_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Declares columns the rule reads without targeting them.
    pub fn with_dependencies<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnName>,
    {
        self.dependency_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Higher priorities run first.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Default failure message, used when the predicate returns none.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Only runs the rule when `condition` holds.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&ValidationContext) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target_columns(&self) -> &[ColumnName] {
        &self.target_columns
    }

    pub fn dependency_columns(&self) -> &[ColumnName] {
        &self.dependency_columns
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn condition(&self) -> Option<&RuleCondition> {
        self.condition.as_ref()
    }

    pub fn predicate(&self) -> &RulePredicate {
        &self.predicate
    }

    pub fn kind(&self) -> RuleKind {
        self.predicate.kind()
    }

    pub fn is_async(&self) -> bool {
        self.kind() == RuleKind::Async
    }

    /// True when the rule targets `column` (an empty target set targets every column).
    pub fn applies_to(&self, column: &ColumnName) -> bool {
        self.target_columns.is_empty() || self.target_columns.contains(column)
    }

    /// True when the rule reads `column` without targeting it.
    pub fn depends_on(&self, column: &ColumnName) -> bool {
        self.dependency_columns.contains(column)
    }

    /// Checks the structural invariants of the rule definition.
    pub fn validate_definition(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(GridError::invalid_rule(&self.id, "rule id must not be empty"));
        }
        if self.kind() == RuleKind::CrossRow && self.dependency_columns.is_empty() {
            return Err(GridError::invalid_rule(
                &self.id,
                "cross-row rules must declare their dependency columns",
            ));
        }
        Ok(())
    }

    /// Resolves the message reported for a failing result.
    pub(crate) fn failure_message(&self, result: &ValidationResult) -> String {
        result
            .message
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| format!("Validation rule '{}' failed", self.id))
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("target_columns", &self.target_columns)
            .field("dependency_columns", &self.dependency_columns)
            .field("priority", &self.priority)
            .field("severity", &self.severity)
            .field("enabled", &self.enabled)
            .field("has_condition", &self.condition.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Row;

    #[test]
    fn test_empty_targets_apply_everywhere() {
        let rule = ValidationRule::cell("any", |_| Ok(ValidationResult::valid()));
        assert!(rule.applies_to(&"Name".into()));
        assert!(rule.applies_to(&"Age".into()));
    }

    #[test]
    fn test_cross_row_requires_dependencies() {
        let rule = ValidationRule::cross_row("unique", |_, _| Ok(ValidationResult::valid()))
            .for_column("Email");
        let err = rule.validate_definition().unwrap_err();
        assert!(matches!(err, GridError::InvalidRule { .. }));

        let rule = rule.with_dependencies(["Email"]);
        assert!(rule.validate_definition().is_ok());
    }

    #[test]
    fn test_failure_message_precedence() {
        let rule = ValidationRule::cell("r", |_| Ok(ValidationResult::failed()));
        assert_eq!(
            rule.failure_message(&ValidationResult::failed()),
            "Validation rule 'r' failed"
        );

        let rule = rule.with_message("rule message");
        assert_eq!(rule.failure_message(&ValidationResult::failed()), "rule message");
        assert_eq!(
            rule.failure_message(&ValidationResult::invalid("result message")),
            "result message"
        );
    }

    #[test]
    fn test_predicate_kinds() {
        let cell = ValidationRule::cell("a", |_| Ok(ValidationResult::valid()));
        let cross = ValidationRule::cross_row("b", |_, _| Ok(ValidationResult::valid()));
        let asynchronous =
            ValidationRule::asynchronous("c", |_, _| async { Ok(ValidationResult::valid()) });
        assert_eq!(cell.kind(), RuleKind::SingleCell);
        assert_eq!(cross.kind(), RuleKind::CrossRow);
        assert_eq!(asynchronous.kind(), RuleKind::Async);
        assert!(asynchronous.is_async());
    }

    #[tokio::test]
    async fn test_async_fn_adapter() {
        let predicate = AsyncFn(|ctx: ValidationContext, _cancel: CancellationToken| async move {
            Ok(ValidationResult::from_bool(!ctx.value().is_blank()))
        });
        let row = Row::new(0).with_value("Name", "Ann");
        let ctx = ValidationContext::new("Name", &row);
        let result = predicate.check(&ctx, &CancellationToken::new()).await.unwrap();
        assert!(result.is_valid);
    }
}
