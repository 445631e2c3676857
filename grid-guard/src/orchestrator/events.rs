use serde::Serialize;
use uuid::Uuid;

use super::{ValidationKey, ValidationState};
use crate::core::{RowValidation, ValidationOutcome};

/// The result a completed background validation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", content = "result", rename_all = "snake_case")]
pub enum ValidationReport {
    Cell(ValidationOutcome),
    Row(RowValidation),
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Cell(outcome) => outcome.is_valid(),
            Self::Row(row) => row.is_valid(),
        }
    }

    pub fn as_cell(&self) -> Option<&ValidationOutcome> {
        match self {
            Self::Cell(outcome) => Some(outcome),
            Self::Row(_) => None,
        }
    }

    pub fn as_row(&self) -> Option<&RowValidation> {
        match self {
            Self::Row(row) => Some(row),
            Self::Cell(_) => None,
        }
    }
}

/// Lifecycle notifications published by the orchestrator.
///
/// Every transition produces a `StateChanged`; every terminal transition is
/// followed by a `Completed` carrying the report when the state is
/// `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ValidationEvent {
    StateChanged {
        key: ValidationKey,
        validation_id: Uuid,
        state: ValidationState,
    },
    Completed {
        key: ValidationKey,
        validation_id: Uuid,
        state: ValidationState,
        #[serde(skip_serializing_if = "Option::is_none")]
        report: Option<ValidationReport>,
    },
}

impl ValidationEvent {
    pub fn key(&self) -> &ValidationKey {
        match self {
            Self::StateChanged { key, .. } | Self::Completed { key, .. } => key,
        }
    }

    pub fn validation_id(&self) -> Uuid {
        match self {
            Self::StateChanged { validation_id, .. } | Self::Completed { validation_id, .. } => {
                *validation_id
            }
        }
    }

    pub fn state(&self) -> &ValidationState {
        match self {
            Self::StateChanged { state, .. } | Self::Completed { state, .. } => state,
        }
    }
}
