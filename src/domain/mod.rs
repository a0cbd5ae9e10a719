//! Domain layer containing the hub's core types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `dispatch` - Roles, connections, the message protocol, liveness

pub mod dispatch;
pub mod foundation;
