//! Built-in rule constructors.
//!
//! Every constructor returns an ordinary [`ValidationRule`] with a default
//! id (`<kind>_<column>`, lowercased) and message; both can be overridden
//! with the usual builder methods. Rules other than [`required`] treat blank
//! cells as valid so that "missing" and "malformed" stay separate messages.

use super::{CellValue, ColumnName, OtherRows, Severity, ValidationContext, ValidationResult, ValidationRule};
use crate::prelude::*;
use regex::Regex;
use std::future::Future;
use tokio_util::sync::CancellationToken;

fn rule_id(kind: &str, column: &ColumnName) -> String {
    format!("{kind}_{}", column.key())
}

/// The cell must not be null or blank.
///
/// Default id `required_<column>`, message `"<Column> is required"`.
///
/// # Examples
///
/// ```rust
/// use grid_guard::core::{rules, Row, RuleEngine, ValidationContext};
///
/// let engine = RuleEngine::default().with_rule(rules::required("Name")).unwrap();
/// let row = Row::new(0).with_value("Name", " ");
/// let outcome = engine.evaluate(&ValidationContext::new("Name", &row), None);
/// assert_eq!(outcome.messages(), vec!["Name is required"]);
/// ```
pub fn required(column: impl Into<ColumnName>) -> ValidationRule {
    let column = column.into();
    let message = format!("{column} is required");
    ValidationRule::cell(rule_id("required", &column), |ctx| {
        Ok(ValidationResult::from_bool(!ctx.value().is_blank()))
    })
    .for_column(column)
    .with_message(message)
}

/// The cell must be a number within `[min, max]`, bounds inclusive.
///
/// Fails with `"<Column> must be between <min> and <max>"` (carrying the
/// parsed value as `actual` metadata) or, for text that does not parse,
/// `"<Column> must be a number"`.
pub fn range(column: impl Into<ColumnName>, min: f64, max: f64) -> ValidationRule {
    let column = column.into();
    let label = column.to_string();
    ValidationRule::cell(rule_id("range", &column), move |ctx| {
        if ctx.value().is_blank() {
            return Ok(ValidationResult::valid());
        }
        Ok(match ctx.value().as_decimal() {
            Some(v) if v >= min && v <= max => ValidationResult::valid(),
            Some(v) => ValidationResult::invalid(format!(
                "{label} must be between {min} and {max}"
            ))
            .with_metadata("actual", v),
            None => ValidationResult::invalid(format!("{label} must be a number")),
        })
    })
    .for_column(column)
}

/// The cell's text must have at least `min` characters.
///
/// Default message `"<Column> must be at least <min> characters"`.
pub fn min_length(column: impl Into<ColumnName>, min: usize) -> ValidationRule {
    length_rule("min_length", column.into(), Some(min), None)
}

/// The cell's text must have at most `max` characters.
///
/// Default message `"<Column> must be at most <max> characters"`.
pub fn max_length(column: impl Into<ColumnName>, max: usize) -> ValidationRule {
    length_rule("max_length", column.into(), None, Some(max))
}

/// The cell's text length must be within `[min, max]` characters.
///
/// Default message `"<Column> must be between <min> and <max> characters"`.
/// Lengths count characters, not bytes.
pub fn length(column: impl Into<ColumnName>, min: usize, max: usize) -> ValidationRule {
    length_rule("length", column.into(), Some(min), Some(max))
}

fn length_rule(
    kind: &str,
    column: ColumnName,
    min: Option<usize>,
    max: Option<usize>,
) -> ValidationRule {
    let label = column.to_string();
    ValidationRule::cell(rule_id(kind, &column), move |ctx| {
        if ctx.value().is_blank() {
            return Ok(ValidationResult::valid());
        }
        let len = ctx.value().as_text().chars().count();
        let too_short = min.is_some_and(|min| len < min);
        let too_long = max.is_some_and(|max| len > max);
        if !too_short && !too_long {
            return Ok(ValidationResult::valid());
        }
        let message = match (min, max) {
            (Some(min), Some(max)) => format!("{label} must be between {min} and {max} characters"),
            (Some(min), None) => format!("{label} must be at least {min} characters"),
            (None, Some(max)) => format!("{label} must be at most {max} characters"),
            (None, None) => return Ok(ValidationResult::valid()),
        };
        Ok(ValidationResult::invalid(message).with_metadata("length", len))
    })
    .for_column(column)
}

/// The cell's text must match `pattern` (the whole value is not anchored
/// implicitly; use `^...$` for that).
///
/// Default message `"<Column> has an invalid format"`.
///
/// # Errors
///
/// Returns [`GridError::Pattern`] when the pattern does not compile.
pub fn pattern(column: impl Into<ColumnName>, pattern: &str) -> Result<ValidationRule> {
    let column = column.into();
    let regex = Regex::new(pattern)?;
    let message = format!("{column} has an invalid format");
    Ok(ValidationRule::cell(rule_id("pattern", &column), move |ctx| {
        if ctx.value().is_blank() {
            return Ok(ValidationResult::valid());
        }
        Ok(ValidationResult::from_bool(regex.is_match(&ctx.value().as_text())))
    })
    .for_column(column)
    .with_message(message))
}

/// The cell must be one of `allowed` (case-insensitive).
///
/// Default message `"<Column> must be one of: a, b, c"`.
pub fn one_of<I, S>(column: impl Into<ColumnName>, allowed: I) -> ValidationRule
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let column = column.into();
    let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
    let message = format!("{column} must be one of: {}", allowed.join(", "));
    let allowed: Vec<CellValue> = allowed.into_iter().map(CellValue::Text).collect();
    ValidationRule::cell(rule_id("one_of", &column), move |ctx| {
        if ctx.value().is_blank() {
            return Ok(ValidationResult::valid());
        }
        Ok(ValidationResult::from_bool(
            allowed.iter().any(|a| a.eq_ignore_case(ctx.value())),
        ))
    })
    .for_column(column)
    .with_message(message)
}

/// No other row may hold the same value in `column` (case-insensitive).
///
/// A cross-row rule: it needs a table snapshot and is skipped without one.
/// Default message `"<Column> must be unique"`; the clashing row indices
/// are attached as `duplicate_rows` metadata.
pub fn unique(column: impl Into<ColumnName>) -> ValidationRule {
    let column = column.into();
    let message = format!("{column} must be unique");
    let key = column.key().to_string();
    ValidationRule::cross_row(rule_id("unique", &column), move |ctx, others| {
        let value = ctx.value();
        if value.is_blank() {
            return Ok(ValidationResult::valid());
        }
        let duplicates: Vec<usize> = others
            .iter()
            .filter(|row| row.get(&key).eq_ignore_case(value))
            .map(|row| row.row_index())
            .collect();
        if duplicates.is_empty() {
            Ok(ValidationResult::valid())
        } else {
            Ok(ValidationResult::failed().with_metadata("duplicate_rows", duplicates))
        }
    })
    .for_column(column.clone())
    .with_dependencies([column])
    .with_message(message)
}

/// A single-cell rule for `column` backed by a boolean closure.
///
/// A `false` result fails with `"Validation rule '<id>' failed"` unless a
/// message is set with [`ValidationRule::with_message`].
pub fn custom<F>(id: impl Into<String>, column: impl Into<ColumnName>, predicate: F) -> ValidationRule
where
    F: Fn(&ValidationContext) -> bool + Send + Sync + 'static,
{
    ValidationRule::cell(id, move |ctx| Ok(ValidationResult::from_bool(predicate(ctx))))
        .for_column(column)
}

/// A cross-row rule targeting `targets` and reading `dependencies`.
///
/// The predicate sees every row of the snapshot except the one under
/// validation.
pub fn cross_row<F, T, D>(
    id: impl Into<String>,
    targets: T,
    dependencies: D,
    predicate: F,
) -> ValidationRule
where
    F: for<'a> Fn(&ValidationContext, OtherRows<'a>) -> Result<ValidationResult>
        + Send
        + Sync
        + 'static,
    T: IntoIterator,
    T::Item: Into<ColumnName>,
    D: IntoIterator,
    D::Item: Into<ColumnName>,
{
    ValidationRule::cross_row(id, predicate)
        .for_columns(targets)
        .with_dependencies(dependencies)
}

/// An asynchronous rule for `column`.
///
/// The predicate receives an owned context and the validation's
/// cancellation token. It only runs in the background orchestrator or
/// through [`RuleEngine::evaluate_async`](super::RuleEngine::evaluate_async).
pub fn custom_async<F, Fut>(
    id: impl Into<String>,
    column: impl Into<ColumnName>,
    predicate: F,
) -> ValidationRule
where
    F: Fn(ValidationContext, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ValidationResult>> + Send + 'static,
{
    ValidationRule::asynchronous(id, predicate).for_column(column)
}

/// Flags (as a warning) values that changed compared to the pre-edit value
/// by more than `max_delta`.
pub fn max_change(column: impl Into<ColumnName>, max_delta: f64) -> ValidationRule {
    let column = column.into();
    let label = column.to_string();
    ValidationRule::cell(rule_id("max_change", &column), move |ctx| {
        let (Some(current), Some(original)) = (
            ctx.value().as_decimal(),
            ctx.original_value().and_then(CellValue::as_decimal),
        ) else {
            return Ok(ValidationResult::valid());
        };
        let delta = (current - original).abs();
        if delta <= max_delta {
            Ok(ValidationResult::valid())
        } else {
            Ok(ValidationResult::invalid(format!(
                "{label} changed by {delta}, more than {max_delta}"
            )))
        }
    })
    .for_column(column)
    .with_severity(Severity::Warning)
    .when(|ctx| ctx.is_changed())
}
