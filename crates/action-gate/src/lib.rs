//! Availability gate
//!
//! Polls a [`GateCondition`] against the page until it holds or the budget
//! runs out. Running out is a normal [`PollResult`] with `found == false`;
//! the caller decides what that means for the run.

pub mod conditions;
pub mod errors;
pub mod poller;

pub use conditions::*;
pub use errors::*;
pub use poller::*;
