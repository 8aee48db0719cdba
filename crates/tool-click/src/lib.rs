//! Applies a click or submit to a resolved element through an ordered
//! fallback chain of interaction strategies.

pub mod errors;
pub mod model;
pub mod pause;
pub mod policy;

mod runner;

pub use errors::ClickError;
pub use model::{ActionKind, ActionOutcome, ActionReport, InteractionStrategy, StrategyAttempt};
pub use pause::{operator_pause, PauseOutcome};
pub use policy::{ClickPolicyView, AFTER_CLICK_SETTLE, OPERATOR_PAUSE};
pub use runner::{perform, perform_or_pause};
