//! Selector resolution with ordered fallback
//!
//! A [`CandidateList`] is an ordered set of [`Matcher`]s. The resolver tries
//! each one once, within its own time budget, and returns the first element
//! that matches. Running out of candidates is a normal `None`, not an error.

pub mod errors;
pub mod matchers;
pub mod resolver;
pub mod types;

pub use errors::*;
pub use matchers::*;
pub use resolver::*;
pub use types::*;
