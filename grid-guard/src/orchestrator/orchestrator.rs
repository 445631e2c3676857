use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::registry::{Registry, Ticket};
use super::{
    Cached, OrchestratorConfig, OrchestratorStats, ValidationEvent, ValidationKey,
    ValidationReport, ValidationState,
};
use crate::core::{
    panic_message, CellEdit, CellValue, Column, ColumnName, Row, RowSnapshot, RowValidation,
    RuleEngine, ValidationContext, ValidationOutcome,
};
use crate::prelude::*;

/// Runs rule evaluations in the background.
///
/// Every request is keyed by `(row, column)` (or by row alone). A new
/// request for a key cancels the one in flight, waits out the debounce
/// window, queues FIFO for one of `max_concurrency` worker slots and then
/// runs under the configured timeout. Only the most recent request for a
/// key may write the result cache.
///
/// The `start_*` methods return immediately with the validation id; progress
/// is observable through [`subscribe`](Self::subscribe),
/// [`status`](Self::status) and [`cached`](Self::cached).
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use grid_guard::core::{rules, Row, RuleEngine};
/// use grid_guard::orchestrator::{OrchestratorConfig, ValidationOrchestrator, ValidationState};
///
/// # #[tokio::main]
/// # async fn main() -> grid_guard::error::Result<()> {
/// let engine = RuleEngine::default().with_rule(rules::required("Name"))?;
/// let config = OrchestratorConfig::default().with_debounce(Duration::ZERO);
/// let orchestrator = ValidationOrchestrator::new(Arc::new(engine), config)?;
///
/// let id = orchestrator.start_cell_validation("Name", "", Row::new(0), 0);
/// orchestrator.shutdown().await;
/// # let _ = id;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ValidationOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    config: OrchestratorConfig,
    registry: Registry,
    engine: RwLock<Arc<RuleEngine>>,
    table: RwLock<Option<RowSnapshot>>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    runtime: Handle,
}

/// The work a validation performs once it reaches a worker slot.
enum Job {
    Cell(ValidationContext),
    Row(Row),
}

impl Job {
    async fn run(
        self,
        engine: Arc<RuleEngine>,
        table: Option<RowSnapshot>,
        cancel: CancellationToken,
    ) -> Option<ValidationReport> {
        match self {
            Job::Cell(ctx) => engine
                .evaluate_async(&ctx, table.as_ref(), &cancel)
                .await
                .map(ValidationReport::Cell),
            Job::Row(row) => {
                let snapshot = table.unwrap_or_else(|| single_row_snapshot(&row));
                engine
                    .evaluate_row_async(&row, &snapshot, &cancel)
                    .await
                    .map(ValidationReport::Row)
            }
        }
    }
}

/// A snapshot made of the row alone, with one text column per cell.
fn single_row_snapshot(row: &Row) -> RowSnapshot {
    let mut names: Vec<&ColumnName> = row.cells().map(|(name, _)| name).collect();
    names.sort();
    let columns = names.into_iter().map(|name| Column::text(name.clone())).collect();
    RowSnapshot::new(columns, vec![row.clone()])
}

impl ValidationOrchestrator {
    /// Creates an orchestrator that spawns onto the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Configuration`] when the configuration is invalid
    /// or when called outside a Tokio runtime.
    pub fn new(engine: Arc<RuleEngine>, config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| {
            GridError::Configuration(format!("validation orchestrator needs a Tokio runtime: {e}"))
        })?;

        info!(
            max_concurrency = config.max_concurrency(),
            debounce_ms = config.debounce().as_millis() as u64,
            timeout_ms = config.timeout().as_millis() as u64,
            "Validation orchestrator started"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                registry: Registry::new(
                    config.event_capacity(),
                    config.history_capacity(),
                    config.log_config().clone(),
                ),
                engine: RwLock::new(engine),
                table: RwLock::new(None),
                permits: Arc::new(Semaphore::new(config.max_concurrency())),
                tracker: TaskTracker::new(),
                runtime,
                config,
            }),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Replaces the rule engine used by validations started from now on.
    pub fn set_rule_engine(&self, engine: Arc<RuleEngine>) {
        *self
            .inner
            .engine
            .write()
            .unwrap_or_else(PoisonError::into_inner) = engine;
    }

    /// Replaces the table snapshot cross-row rules see. Validations already
    /// started keep the snapshot they were started with.
    pub fn set_table_snapshot(&self, snapshot: RowSnapshot) {
        *self
            .inner
            .table
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ValidationEvent> {
        self.inner.registry.subscribe()
    }

    /// Validates `value` for `column` of the row at `row_index`.
    ///
    /// `row` is the row as it was before the value was written; the value it
    /// holds for `column` becomes the context's original value. Columns
    /// whose rules depend on `column` are re-validated as well.
    #[instrument(skip(self, value, row), fields(row.index = row_index, column.name = column))]
    pub fn start_cell_validation(
        &self,
        column: &str,
        value: impl Into<CellValue>,
        row: Row,
        row_index: usize,
    ) -> Uuid {
        let mut row = row;
        row.set_row_index(row_index);
        let column = self.resolve_column(column, &row);
        let original = row.set(column.clone(), value);
        let ctx = ValidationContext::new(column, &row).with_original(original);
        self.schedule_cell(ctx)
    }

    /// Validates a committed edit. `row` is the post-edit row.
    #[instrument(skip(self, edit, row), fields(row.index = edit.row_index, column.name = %edit.column))]
    pub fn start_edit_validation(&self, edit: &CellEdit, row: Row) -> Uuid {
        let mut row = row;
        row.set_row_index(edit.row_index);
        self.schedule_cell(ValidationContext::for_edit(edit, &row))
    }

    /// Validates every data column of the row at `row_index`.
    #[instrument(skip(self, row), fields(row.index = row_index))]
    pub fn start_row_validation(&self, row: Row, row_index: usize) -> Uuid {
        let mut row = row;
        row.set_row_index(row_index);
        self.spawn(ValidationKey::row(row_index), Job::Row(row))
    }

    /// Cancels the pending or running validation of one cell.
    pub fn cancel_cell_validation(&self, row_index: usize, column: &str) -> bool {
        self.inner
            .registry
            .cancel(&ValidationKey::cell(row_index, column))
    }

    /// Cancels the row validation of `row_index` and every cell validation
    /// in that row. Returns how many were cancelled.
    pub fn cancel_row_validation(&self, row_index: usize) -> usize {
        self.inner
            .registry
            .cancel_matching(|key| key.row_index == row_index)
    }

    /// Cancels everything in flight. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.inner.registry.cancel_matching(|_| true);
        if cancelled > 0 {
            debug!(cancelled, "Cancelled all background validations");
        }
        cancelled
    }

    /// The last completed outcome of a cell, flagged stale when a newer
    /// request for it is still in flight. Never waits.
    pub fn cached(&self, row_index: usize, column: &str) -> Option<Cached<ValidationOutcome>> {
        self.inner
            .registry
            .cached(row_index, &ColumnName::new(column))
    }

    /// The last completed row validation of `row_index`.
    pub fn cached_row(&self, row_index: usize) -> Option<Cached<RowValidation>> {
        self.inner.registry.cached_row(row_index)
    }

    /// Cancels in-flight work for a row and drops its cached results, for
    /// rows that were cleared or removed. After a removal every later row
    /// index shifts, so those rows need invalidating too.
    pub fn invalidate_row(&self, row_index: usize) {
        self.inner.registry.invalidate_row(row_index);
    }

    /// The state of a validation, while it is in flight or in the
    /// finished-validation history.
    pub fn status(&self, validation_id: Uuid) -> Option<ValidationState> {
        self.inner.registry.status(validation_id)
    }

    pub fn stats(&self) -> OrchestratorStats {
        self.inner.registry.stats()
    }

    /// Number of validations that are starting or running.
    pub fn active_count(&self) -> usize {
        self.inner.registry.active_count()
    }

    /// Cancels everything and waits for the worker tasks to finish.
    pub async fn shutdown(&self) {
        let cancelled = self.cancel_all();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
        let stats = self.stats();
        info!(
            cancelled,
            started = stats.started,
            completed = stats.completed,
            failed = stats.failed,
            timed_out = stats.timed_out,
            "Validation orchestrator shut down"
        );
    }

    fn resolve_column(&self, column: &str, row: &Row) -> ColumnName {
        row.cells()
            .map(|(name, _)| name)
            .find(|name| name.matches(column))
            .cloned()
            .unwrap_or_else(|| ColumnName::new(column))
    }

    fn schedule_cell(&self, ctx: ValidationContext) -> Uuid {
        let row_index = ctx.row_index();
        let dependents = self.inner.engine().dependents_of(ctx.column().as_str());
        let key = ValidationKey::cell(row_index, ctx.column().clone());

        if dependents.is_empty() {
            return self.spawn(key, Job::Cell(ctx));
        }

        let row = ctx.row().clone();
        let id = self.spawn(key, Job::Cell(ctx));
        for dependent in dependents {
            debug!(
                row.index = row_index,
                column.name = %dependent,
                "Scheduling dependent column"
            );
            let ctx = ValidationContext::new(dependent.clone(), &row);
            self.spawn(ValidationKey::cell(row_index, dependent), Job::Cell(ctx));
        }
        id
    }

    fn spawn(&self, key: ValidationKey, job: Job) -> Uuid {
        let ticket = self.inner.registry.register(key.clone());
        let id = ticket.id;
        let inner = Arc::clone(&self.inner);
        let engine = inner.engine();
        let table = inner.table();
        self.inner.tracker.spawn_on(
            inner.run(key, ticket, job, engine, table),
            &self.inner.runtime,
        );
        id
    }
}

impl Inner {
    fn engine(&self) -> Arc<RuleEngine> {
        Arc::clone(&self.engine.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn table(&self) -> Option<RowSnapshot> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[instrument(skip_all, fields(validation.id = %ticket.id, key = %key))]
    async fn run(
        self: Arc<Self>,
        key: ValidationKey,
        ticket: Ticket,
        job: Job,
        engine: Arc<RuleEngine>,
        table: Option<RowSnapshot>,
    ) {
        let debounce = self.config.debounce();
        if !debounce.is_zero() {
            tokio::select! {
                biased;
                _ = ticket.token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }
        }

        let permit = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => return,
            permit = Arc::clone(&self.permits).acquire_owned() => permit,
        };
        let Ok(_permit) = permit else {
            self.registry.transition(
                ticket.id,
                ValidationState::Failed {
                    message: "worker pool is closed".to_string(),
                },
            );
            return;
        };

        if !self.registry.transition(ticket.id, ValidationState::Running) {
            return;
        }

        let work = AssertUnwindSafe(job.run(engine, table, ticket.token.clone())).catch_unwind();
        match tokio::time::timeout(self.config.timeout(), work).await {
            Ok(Ok(Some(report))) => {
                if !self.registry.complete(&ticket, &key, report) {
                    debug!("Discarded result of a superseded validation");
                }
            }
            Ok(Ok(None)) => {
                self.registry.transition(ticket.id, ValidationState::Cancelled);
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                warn!(error = %message, "Background validation failed");
                self.registry
                    .transition(ticket.id, ValidationState::Failed { message });
            }
            Err(_) => {
                ticket.token.cancel();
                warn!(
                    timeout_ms = self.config.timeout().as_millis() as u64,
                    "Background validation timed out"
                );
                self.registry.transition(ticket.id, ValidationState::TimedOut);
            }
        }
    }
}
