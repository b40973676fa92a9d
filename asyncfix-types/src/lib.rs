//! Shared DTOs (schemas-as-code) for the asyncfix workspace.
//!
//! # Design constraints
//! - These types are intended to be serialized to disk.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod location;
pub mod mode;
pub mod run;
pub mod shape;

/// Schema identifiers.
pub mod schema {
    pub const ASYNCFIX_RUN_V1: &str = "asyncfix.run.v1";
}
