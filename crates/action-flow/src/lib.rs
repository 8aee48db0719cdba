//! Flow Orchestration Layer
//!
//! Runs a fixed sequence of [`FlowStep`]s against one shared context,
//! stopping at the first failure. Every transition leaves a diagnostic
//! snapshot behind.

pub mod errors;
pub mod orchestrator;
pub mod snapshot;
pub mod types;

pub use errors::FlowError;
pub use orchestrator::{FlowOrchestrator, FlowStep};
pub use snapshot::{PageSnapshotRecorder, SnapshotPort};
pub use types::{FlowReport, FlowState, StepOutcome, StepRecord, StepStatus};
