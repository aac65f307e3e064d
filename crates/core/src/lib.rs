//! Core domain logic for the agent dashboard.
//!
//! Holds the external process orchestration layer ([`invocation`]) and the
//! catalogue of logical agent operations built on top of it ([`agents`]).
//! Nothing in this crate knows about HTTP.

pub mod agents;
pub mod error;
pub mod invocation;
