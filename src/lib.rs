//! ticketpilot: a semi-automated e+ ticket purchase assistant.
//!
//! The site flows in [`flows`] are assembled from the workspace crates
//! (selector resolution, option picking, click fallbacks, availability
//! polling and step orchestration) and driven by the CLI in [`cli`].

pub mod cli;
pub mod config;
pub mod errors;
pub mod flows;

pub use config::FlowConfig;
pub use errors::ConfigError;
pub use flows::{FlowContext, FlowKind};
