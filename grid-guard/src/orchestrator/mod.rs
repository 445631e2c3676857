//! Background validation orchestration.
//!
//! [`ValidationOrchestrator`] runs the rule engine off the edit path. Each
//! request moves through [`ValidationState`]s and publishes
//! [`ValidationEvent`]s; finished results land in a per-cell cache that can
//! be read at any time without waiting.
//!
//! ```text
//! start_* ──► register (cancel previous) ──► debounce ──► permit ──► run ──► cache
//!                                               │            │        │
//!                                               └── cancel ──┴────────┴──► Cancelled
//! ```

mod config;
mod events;
mod orchestrator;
mod registry;
mod state;

pub use config::OrchestratorConfig;
pub use events::{ValidationEvent, ValidationReport};
pub use orchestrator::ValidationOrchestrator;
pub use registry::{Cached, OrchestratorStats};
pub use state::{ValidationKey, ValidationState};
