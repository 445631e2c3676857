//! The rule engine: resolves which rules apply to a cell and runs them.

use super::{
    ColumnName, Row, RowSnapshot, RowValidation, RuleFailure, RulePredicate, Severity,
    ValidationContext, ValidationOutcome, ValidationResult, ValidationRule,
};
use crate::log_rule;
use crate::logging::{truncate_field, LogConfig};
use crate::prelude::*;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// How failures of one column's rules are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Stop at the first failing rule.
    StopOnFirstError,
    /// Run every applicable rule and report every failure.
    #[default]
    ProcessAll,
    /// Stop running Error/Critical rules after the first blocking failure,
    /// but keep running Info/Warning rules.
    ContinueWithWarnings,
}

/// Configuration for a [`RuleEngine`].
#[derive(Debug, Clone, Default)]
pub struct RuleEngineConfig {
    pub execution_mode: ExecutionMode,
    pub log_config: LogConfig,
}

impl RuleEngineConfig {
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }
}

/// What a single rule run produced.
enum Verdict {
    Pass,
    Skipped,
    Fail(RuleFailure),
}

struct Aggregator {
    mode: ExecutionMode,
    outcome: ValidationOutcome,
    blocked: bool,
    stopped: bool,
}

impl Aggregator {
    fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            outcome: ValidationOutcome::valid(),
            blocked: false,
            stopped: false,
        }
    }

    fn should_run(&self, rule: &ValidationRule) -> bool {
        match self.mode {
            ExecutionMode::StopOnFirstError => !self.stopped,
            ExecutionMode::ProcessAll => true,
            ExecutionMode::ContinueWithWarnings => {
                !self.blocked || !rule.severity().is_blocking()
            }
        }
    }

    fn record(&mut self, verdict: Verdict) {
        if let Verdict::Fail(failure) = verdict {
            self.blocked |= failure.severity.is_blocking();
            self.stopped = true;
            self.outcome.push(failure);
        }
    }
}

/// Holds validation rules and evaluates them against cell contexts.
///
/// Evaluation is a pure function of the context, the optional row snapshot
/// and the registered rules, so the engine can be shared across threads.
///
/// # Examples
///
/// ```rust
/// use grid_guard::core::{rules, Row, RuleEngine, ValidationContext};
///
/// let mut engine = RuleEngine::default();
/// engine.add_rule(rules::required("Name")).unwrap();
///
/// let row = Row::new(0).with_value("Name", "");
/// let outcome = engine.evaluate(&ValidationContext::new("Name", &row), None);
/// assert!(!outcome.is_valid());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<Arc<ValidationRule>>,
    config: RuleEngineConfig,
}

impl RuleEngine {
    pub fn new(config: RuleEngineConfig) -> Self {
        Self {
            rules: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &RuleEngineConfig {
        &self.config
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.config.execution_mode
    }

    pub fn set_execution_mode(&mut self, mode: ExecutionMode) {
        self.config.execution_mode = mode;
    }

    /// Registers a rule.
    ///
    /// # Errors
    ///
    /// Rejects duplicate ids and rule definitions that break the rule
    /// invariants (see [`ValidationRule::validate_definition`]).
    pub fn add_rule(&mut self, rule: ValidationRule) -> Result<()> {
        rule.validate_definition()?;
        if self.rules.iter().any(|r| r.id() == rule.id()) {
            return Err(GridError::DuplicateRule {
                rule_id: rule.id().to_string(),
            });
        }
        debug!(
            rule.id = %rule.id(),
            rule.kind = %rule.kind(),
            rule.priority = rule.priority(),
            "Registered validation rule"
        );
        self.rules.push(Arc::new(rule));
        Ok(())
    }

    /// Builder-style [`RuleEngine::add_rule`].
    pub fn with_rule(mut self, rule: ValidationRule) -> Result<Self> {
        self.add_rule(rule)?;
        Ok(self)
    }

    pub fn remove_rule(&mut self, rule_id: &str) -> Option<Arc<ValidationRule>> {
        let position = self.rules.iter().position(|r| r.id() == rule_id)?;
        Some(self.rules.remove(position))
    }

    pub fn set_enabled(&mut self, rule_id: &str, enabled: bool) -> Result<()> {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id() == rule_id)
            .ok_or_else(|| GridError::invalid_rule(rule_id, "no such rule"))?;
        Arc::make_mut(rule).set_enabled(enabled);
        Ok(())
    }

    /// Every rule in insertion order, enabled or not.
    pub fn rules(&self) -> &[Arc<ValidationRule>] {
        &self.rules
    }

    pub fn rule(&self, rule_id: &str) -> Option<&Arc<ValidationRule>> {
        self.rules.iter().find(|r| r.id() == rule_id)
    }

    /// Enabled rules targeting `column`, highest priority first; equal
    /// priorities keep insertion order.
    pub fn rules_for(&self, column: &str) -> Vec<Arc<ValidationRule>> {
        self.rules_for_name(&ColumnName::new(column))
    }

    fn rules_for_name(&self, column: &ColumnName) -> Vec<Arc<ValidationRule>> {
        let mut rules: Vec<_> = self
            .rules
            .iter()
            .filter(|r| r.is_enabled() && r.applies_to(column))
            .cloned()
            .collect();
        rules.sort_by_key(|r| Reverse(r.priority()));
        rules
    }

    /// Enabled rules in priority order, regardless of target.
    pub fn rules_for_row(&self) -> Vec<Arc<ValidationRule>> {
        let mut rules: Vec<_> = self.rules.iter().filter(|r| r.is_enabled()).cloned().collect();
        rules.sort_by_key(|r| Reverse(r.priority()));
        rules
    }

    /// True when any enabled rule for `column` is asynchronous.
    pub fn has_async_rules(&self, column: &str) -> bool {
        self.rules_for(column).iter().any(|r| r.is_async())
    }

    /// Columns whose rules read `column` as a dependency, excluding `column`
    /// itself. Those cells need re-validation after `column` changes.
    pub fn dependents_of(&self, column: &str) -> Vec<ColumnName> {
        let column = ColumnName::new(column);
        let mut dependents: Vec<ColumnName> = Vec::new();
        for rule in self.rules.iter().filter(|r| r.is_enabled() && r.depends_on(&column)) {
            for target in rule.target_columns() {
                if target != &column && !dependents.contains(target) {
                    dependents.push(target.clone());
                }
            }
        }
        dependents
    }

    /// Evaluates the synchronous rules for the context's column.
    ///
    /// Asynchronous rules are left to the background orchestrator. Cross-row
    /// rules are skipped when no `snapshot` is given.
    #[instrument(level = "debug", skip_all, fields(column.name = %ctx.column(), row.index = ctx.row_index()))]
    pub fn evaluate(&self, ctx: &ValidationContext, snapshot: Option<&RowSnapshot>) -> ValidationOutcome {
        let mut aggregator = Aggregator::new(self.config.execution_mode);
        for rule in self.rules_for_name(ctx.column()) {
            if !aggregator.should_run(&rule) {
                if aggregator.stopped && self.config.execution_mode == ExecutionMode::StopOnFirstError {
                    break;
                }
                continue;
            }
            let verdict = self.run_sync(&rule, ctx, snapshot);
            aggregator.record(verdict);
        }
        aggregator.outcome
    }

    /// Evaluates every rule for the context's column, including
    /// asynchronous ones.
    ///
    /// The cancellation token is checked before and after each rule; `None`
    /// is returned as soon as cancellation is observed.
    pub async fn evaluate_async(
        &self,
        ctx: &ValidationContext,
        snapshot: Option<&RowSnapshot>,
        cancel: &CancellationToken,
    ) -> Option<ValidationOutcome> {
        let mut aggregator = Aggregator::new(self.config.execution_mode);
        for rule in self.rules_for_name(ctx.column()) {
            if cancel.is_cancelled() {
                return None;
            }
            if !aggregator.should_run(&rule) {
                if aggregator.stopped && self.config.execution_mode == ExecutionMode::StopOnFirstError {
                    break;
                }
                continue;
            }
            let verdict = match rule.predicate() {
                RulePredicate::Async(predicate) => {
                    self.run_async(&rule, predicate.as_ref(), ctx, cancel).await
                }
                _ => self.run_sync(&rule, ctx, snapshot),
            };
            if cancel.is_cancelled() {
                return None;
            }
            aggregator.record(verdict);
        }
        Some(aggregator.outcome)
    }

    /// Evaluates all synchronous rules for every data column of `row`.
    pub fn evaluate_row(&self, row: &Row, snapshot: &RowSnapshot) -> RowValidation {
        let shared = Arc::new(row.clone());
        let mut validation = RowValidation::new(row.row_index());
        for column in snapshot.data_columns() {
            let ctx = ValidationContext::from_shared(column.name().clone(), Arc::clone(&shared));
            validation.insert(column.name().clone(), self.evaluate(&ctx, Some(snapshot)));
        }
        validation
    }

    /// Async counterpart of [`RuleEngine::evaluate_row`]; `None` when cancelled.
    pub async fn evaluate_row_async(
        &self,
        row: &Row,
        snapshot: &RowSnapshot,
        cancel: &CancellationToken,
    ) -> Option<RowValidation> {
        let shared = Arc::new(row.clone());
        let mut validation = RowValidation::new(row.row_index());
        for column in snapshot.data_columns() {
            let ctx = ValidationContext::from_shared(column.name().clone(), Arc::clone(&shared));
            let outcome = self.evaluate_async(&ctx, Some(snapshot), cancel).await?;
            validation.insert(column.name().clone(), outcome);
        }
        Some(validation)
    }

    /// Evaluates the `when` gate. `Err` carries a failure when the gate
    /// itself panicked.
    fn gate(&self, rule: &ValidationRule, ctx: &ValidationContext) -> std::result::Result<bool, Verdict> {
        let Some(condition) = rule.condition() else {
            return Ok(true);
        };
        catch_unwind(AssertUnwindSafe(|| condition(ctx))).map_err(|panic| {
            Verdict::Fail(execution_failure(
                rule,
                &format!("condition panicked: {}", panic_message(panic.as_ref())),
            ))
        })
    }

    fn run_sync(
        &self,
        rule: &ValidationRule,
        ctx: &ValidationContext,
        snapshot: Option<&RowSnapshot>,
    ) -> Verdict {
        match self.gate(rule, ctx) {
            Ok(true) => {}
            Ok(false) => return self.skipped(rule, ctx, "condition not met"),
            Err(verdict) => return verdict,
        }

        let result = match rule.predicate() {
            RulePredicate::SingleCell(predicate) => {
                catch_unwind(AssertUnwindSafe(|| predicate.check(ctx)))
            }
            RulePredicate::CrossRow(predicate) => match snapshot {
                Some(snapshot) => catch_unwind(AssertUnwindSafe(|| {
                    predicate.check(ctx, snapshot.others(ctx.row_index()))
                })),
                None => return self.skipped(rule, ctx, "no row snapshot for cross-row rule"),
            },
            RulePredicate::Async(_) => return self.skipped(rule, ctx, "asynchronous rule"),
        };

        self.verdict(rule, ctx, result.map_err(|p| panic_message(p.as_ref())))
    }

    async fn run_async(
        &self,
        rule: &ValidationRule,
        predicate: &dyn super::AsyncPredicate,
        ctx: &ValidationContext,
        cancel: &CancellationToken,
    ) -> Verdict {
        match self.gate(rule, ctx) {
            Ok(true) => {}
            Ok(false) => return self.skipped(rule, ctx, "condition not met"),
            Err(verdict) => return verdict,
        }

        let result = AssertUnwindSafe(predicate.check(ctx, cancel))
            .catch_unwind()
            .await
            .map_err(|p| panic_message(p.as_ref()));
        self.verdict(rule, ctx, result)
    }

    fn verdict(
        &self,
        rule: &ValidationRule,
        ctx: &ValidationContext,
        result: std::result::Result<Result<ValidationResult>, String>,
    ) -> Verdict {
        match result {
            Ok(Ok(result)) if result.is_valid => {
                log_rule!(
                    self.config.log_config,
                    rule.id = %rule.id(),
                    column.name = %ctx.column(),
                    row.index = ctx.row_index(),
                    "Rule passed"
                );
                Verdict::Pass
            }
            Ok(Ok(result)) => {
                let failure = RuleFailure {
                    rule_id: rule.id().to_string(),
                    severity: result.severity.unwrap_or(rule.severity()),
                    message: rule.failure_message(&result),
                    metadata: result.metadata,
                };
                log_rule!(
                    self.config.log_config,
                    rule.id = %rule.id(),
                    column.name = %ctx.column(),
                    row.index = ctx.row_index(),
                    cell.value = %truncate_field(&ctx.value().as_text(), self.config.log_config.max_field_length),
                    failure.severity = %failure.severity,
                    failure.message = %failure.message,
                    "Rule failed"
                );
                Verdict::Fail(failure)
            }
            Ok(Err(e)) => {
                warn!(rule.id = %rule.id(), column.name = %ctx.column(), error = %e, "Rule returned an error");
                Verdict::Fail(execution_failure(rule, &e.to_string()))
            }
            Err(panic) => {
                warn!(rule.id = %rule.id(), column.name = %ctx.column(), panic = %panic, "Rule panicked");
                Verdict::Fail(execution_failure(rule, &panic))
            }
        }
    }

    fn skipped(&self, rule: &ValidationRule, ctx: &ValidationContext, reason: &str) -> Verdict {
        log_rule!(
            self.config.log_config,
            rule.id = %rule.id(),
            column.name = %ctx.column(),
            skip.reason = reason,
            "Rule skipped"
        );
        Verdict::Skipped
    }
}

/// Critical failure reported in place of a rule that could not run.
fn execution_failure(rule: &ValidationRule, message: &str) -> RuleFailure {
    let mut metadata = HashMap::new();
    metadata.insert("error".to_string(), serde_json::Value::from(message));
    RuleFailure {
        rule_id: rule.id().to_string(),
        severity: Severity::Critical,
        message: format!("Rule execution error in '{}': {message}", rule.id()),
        metadata,
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
