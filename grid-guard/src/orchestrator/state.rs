use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::ColumnName;

/// Identifies what a background validation covers: one cell, or a whole
/// row when `column` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationKey {
    pub row_index: usize,
    pub column: Option<ColumnName>,
}

impl ValidationKey {
    pub fn cell(row_index: usize, column: impl Into<ColumnName>) -> Self {
        Self {
            row_index,
            column: Some(column.into()),
        }
    }

    pub fn row(row_index: usize) -> Self {
        Self {
            row_index,
            column: None,
        }
    }

    pub fn is_row(&self) -> bool {
        self.column.is_none()
    }
}

impl fmt::Display for ValidationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "row {}/{}", self.row_index, column),
            None => write!(f, "row {}", self.row_index),
        }
    }
}

/// Lifecycle of one background validation.
///
/// ```text
/// Starting ──► Running ──► Completed | Cancelled | Failed | TimedOut
///     │
///     └──────► Cancelled | Failed
/// ```
///
/// Terminal states never change again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ValidationState {
    /// Registered and waiting for the debounce window or a worker slot
    Starting,
    /// Rules are executing
    Running,
    Completed,
    Cancelled,
    Failed { message: String },
    TimedOut,
}

impl ValidationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Starting | Self::Running)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: &ValidationState) -> bool {
        match self {
            Self::Starting => matches!(
                next,
                Self::Running | Self::Cancelled | Self::Failed { .. }
            ),
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed { .. } => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { message } => write!(f, "failed: {message}"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        use ValidationState::*;
        assert!(Starting.can_transition_to(&Running));
        assert!(Starting.can_transition_to(&Cancelled));
        assert!(!Starting.can_transition_to(&Completed));
        assert!(!Starting.can_transition_to(&TimedOut));
        assert!(Running.can_transition_to(&Completed));
        assert!(Running.can_transition_to(&TimedOut));
        assert!(!Running.can_transition_to(&Starting));

        for terminal in [
            Completed,
            Cancelled,
            Failed {
                message: "boom".into(),
            },
            TimedOut,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(&Cancelled));
            assert!(!terminal.can_transition_to(&Running));
        }
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ValidationKey::cell(2, "Age").to_string(), "row 2/Age");
        assert_eq!(ValidationKey::row(2).to_string(), "row 2");
        assert_eq!(ValidationKey::cell(1, "AGE"), ValidationKey::cell(1, "age"));
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_value(ValidationState::Failed {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "message": "boom"}));
    }
}
