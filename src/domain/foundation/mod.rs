//! Foundation module - Shared domain primitives.
//!
//! Contains the identifiers, timestamps, and error types that form the
//! vocabulary of the dispatch hub.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{ConnectionId, OrderId, ParticipantId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
