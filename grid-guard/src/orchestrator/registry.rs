//! The per-key registry behind the orchestrator.
//!
//! One mutex guards every piece of shared state: the in-flight request per
//! key, the lifecycle record per validation id, the result caches and the
//! counters. The lock is never held across an `.await`. Events are sent
//! while it is held so subscribers see transitions in the order they were
//! applied.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{ValidationEvent, ValidationKey, ValidationReport, ValidationState};
use crate::core::{ColumnName, RowValidation, ValidationOutcome};
use crate::log_orchestration;
use crate::logging::LogConfig;

/// Counters over the orchestrator's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorStats {
    pub started: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub failed: u64,
    pub timed_out: u64,
}

/// A cached result and whether a newer request for it is still in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub stale: bool,
}

/// Handle a worker task holds for the validation it runs.
pub(crate) struct Ticket {
    pub(crate) id: Uuid,
    pub(crate) seq: u64,
    pub(crate) token: CancellationToken,
}

struct InFlight {
    id: Uuid,
    seq: u64,
    token: CancellationToken,
}

struct Record {
    key: ValidationKey,
    state: ValidationState,
}

struct CacheEntry<T> {
    value: T,
    /// Sequence number of the request that produced the value.
    seq: u64,
}

#[derive(Default)]
struct RegistryState {
    seq: u64,
    in_flight: HashMap<ValidationKey, InFlight>,
    records: HashMap<Uuid, Record>,
    history: VecDeque<Uuid>,
    cells: HashMap<(usize, ColumnName), CacheEntry<ValidationOutcome>>,
    rows: HashMap<usize, CacheEntry<RowValidation>>,
    stats: OrchestratorStats,
}

impl RegistryState {
    fn newer_in_flight(&self, key: &ValidationKey, seq: u64) -> bool {
        self.in_flight.get(key).is_some_and(|f| f.seq > seq)
    }
}

pub(crate) struct Registry {
    state: Mutex<RegistryState>,
    events: broadcast::Sender<ValidationEvent>,
    history_capacity: usize,
    log_config: LogConfig,
}

impl Registry {
    pub(crate) fn new(event_capacity: usize, history_capacity: usize, log_config: LogConfig) -> Self {
        let (events, _) = broadcast::channel(event_capacity);
        Self {
            state: Mutex::new(RegistryState::default()),
            events,
            history_capacity,
            log_config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ValidationEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ValidationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Registers a new request for `key`, cancelling the one it replaces.
    pub(crate) fn register(&self, key: ValidationKey) -> Ticket {
        let mut state = self.lock();
        state.seq += 1;
        let ticket = Ticket {
            id: Uuid::new_v4(),
            seq: state.seq,
            token: CancellationToken::new(),
        };

        if let Some(previous) = state.in_flight.remove(&key) {
            previous.token.cancel();
            self.apply(&mut state, previous.id, ValidationState::Cancelled, None);
        }

        state.in_flight.insert(
            key.clone(),
            InFlight {
                id: ticket.id,
                seq: ticket.seq,
                token: ticket.token.clone(),
            },
        );
        state.records.insert(
            ticket.id,
            Record {
                key: key.clone(),
                state: ValidationState::Starting,
            },
        );
        state.stats.started += 1;
        log_orchestration!(
            self.log_config,
            validation.id = %ticket.id,
            key = %key,
            "Validation registered"
        );
        self.emit(ValidationEvent::StateChanged {
            key,
            validation_id: ticket.id,
            state: ValidationState::Starting,
        });
        ticket
    }

    /// Applies a transition if it is legal. Returns whether it was applied.
    pub(crate) fn transition(&self, id: Uuid, next: ValidationState) -> bool {
        let mut state = self.lock();
        self.apply(&mut state, id, next, None)
    }

    /// Records a finished run. The result is written only if the ticket is
    /// still the current request for `key`.
    pub(crate) fn complete(&self, ticket: &Ticket, key: &ValidationKey, report: ValidationReport) -> bool {
        let mut state = self.lock();
        let current = state.in_flight.get(key).is_some_and(|f| f.id == ticket.id);
        if !current || ticket.token.is_cancelled() {
            return false;
        }

        let row_index = key.row_index;
        match (&report, &key.column) {
            (ValidationReport::Cell(outcome), Some(column)) => {
                state.cells.insert(
                    (row_index, column.clone()),
                    CacheEntry {
                        value: outcome.clone(),
                        seq: ticket.seq,
                    },
                );
            }
            (ValidationReport::Row(validation), _) => {
                state.rows.insert(
                    row_index,
                    CacheEntry {
                        value: validation.clone(),
                        seq: ticket.seq,
                    },
                );
                for (column, outcome) in validation.outcomes() {
                    let cell = (row_index, column.clone());
                    let newer_request =
                        state.newer_in_flight(&ValidationKey::cell(row_index, column.clone()), ticket.seq);
                    let newer_result = state.cells.get(&cell).is_some_and(|c| c.seq > ticket.seq);
                    if !newer_request && !newer_result {
                        state.cells.insert(
                            cell,
                            CacheEntry {
                                value: outcome.clone(),
                                seq: ticket.seq,
                            },
                        );
                    }
                }
            }
            (ValidationReport::Cell(_), None) => {}
        }

        self.apply(&mut state, ticket.id, ValidationState::Completed, Some(report))
    }

    fn apply(
        &self,
        state: &mut RegistryState,
        id: Uuid,
        next: ValidationState,
        report: Option<ValidationReport>,
    ) -> bool {
        let Some(record) = state.records.get_mut(&id) else {
            return false;
        };
        if !record.state.can_transition_to(&next) {
            return false;
        }
        record.state = next.clone();
        let key = record.key.clone();

        log_orchestration!(
            self.log_config,
            validation.id = %id,
            key = %key,
            state = %next,
            "Validation state changed"
        );
        self.emit(ValidationEvent::StateChanged {
            key: key.clone(),
            validation_id: id,
            state: next.clone(),
        });

        if next.is_terminal() {
            if state.in_flight.get(&key).is_some_and(|f| f.id == id) {
                state.in_flight.remove(&key);
            }
            match next {
                ValidationState::Completed => state.stats.completed += 1,
                ValidationState::Cancelled => state.stats.cancelled += 1,
                ValidationState::Failed { .. } => state.stats.failed += 1,
                ValidationState::TimedOut => state.stats.timed_out += 1,
                ValidationState::Starting | ValidationState::Running => {}
            }
            state.history.push_back(id);
            while state.history.len() > self.history_capacity {
                if let Some(expired) = state.history.pop_front() {
                    state.records.remove(&expired);
                }
            }
            self.emit(ValidationEvent::Completed {
                key,
                validation_id: id,
                state: next,
                report,
            });
        }
        true
    }

    /// Cancels the in-flight request for `key`, if any.
    pub(crate) fn cancel(&self, key: &ValidationKey) -> bool {
        let mut state = self.lock();
        self.cancel_locked(&mut state, key)
    }

    fn cancel_locked(&self, state: &mut RegistryState, key: &ValidationKey) -> bool {
        let Some(flight) = state.in_flight.remove(key) else {
            return false;
        };
        flight.token.cancel();
        self.apply(state, flight.id, ValidationState::Cancelled, None)
    }

    /// Cancels every in-flight request whose key matches `predicate`.
    pub(crate) fn cancel_matching<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ValidationKey) -> bool,
    {
        let mut state = self.lock();
        let keys: Vec<ValidationKey> = state
            .in_flight
            .keys()
            .filter(|k| predicate(k))
            .cloned()
            .collect();
        keys.iter()
            .filter(|key| self.cancel_locked(&mut state, key))
            .count()
    }

    /// Cancels everything for `row_index` and forgets its cached results.
    pub(crate) fn invalidate_row(&self, row_index: usize) {
        let mut state = self.lock();
        let keys: Vec<ValidationKey> = state
            .in_flight
            .keys()
            .filter(|k| k.row_index == row_index)
            .cloned()
            .collect();
        for key in &keys {
            self.cancel_locked(&mut state, key);
        }
        state.rows.remove(&row_index);
        state.cells.retain(|(row, _), _| *row != row_index);
    }

    pub(crate) fn cached(&self, row_index: usize, column: &ColumnName) -> Option<Cached<ValidationOutcome>> {
        let state = self.lock();
        let entry = state.cells.get(&(row_index, column.clone()))?;
        let stale = state.newer_in_flight(&ValidationKey::cell(row_index, column.clone()), entry.seq)
            || state.newer_in_flight(&ValidationKey::row(row_index), entry.seq);
        Some(Cached {
            value: entry.value.clone(),
            stale,
        })
    }

    pub(crate) fn cached_row(&self, row_index: usize) -> Option<Cached<RowValidation>> {
        let state = self.lock();
        let entry = state.rows.get(&row_index)?;
        let stale = state.newer_in_flight(&ValidationKey::row(row_index), entry.seq);
        Some(Cached {
            value: entry.value.clone(),
            stale,
        })
    }

    pub(crate) fn status(&self, id: Uuid) -> Option<ValidationState> {
        self.lock().records.get(&id).map(|r| r.state.clone())
    }

    pub(crate) fn stats(&self) -> OrchestratorStats {
        self.lock().stats
    }

    pub(crate) fn active_count(&self) -> usize {
        self.lock().in_flight.len()
    }
}
