//! Domain logic: locate a flagged C# method, classify its return shape, and rewrite it.
//!
//! This crate owns *what* text changes at a flagged location. It never touches the filesystem;
//! reading, ordering across files and persisting results is the `asyncfix-edit` crate.
//!
//! Pipeline per location: [`lexer`] classifies every byte, [`brackets`] tracks structural depth,
//! [`locator`] finds the method span, [`signature`] classifies the declaration and [`rewriter`]
//! (or [`suppress`]) plans edits that [`buffer::SourceBuffer`] applies in one step.

pub mod brackets;
pub mod buffer;
mod engine;
mod error;
pub mod lexer;
pub mod locator;
pub mod rewriter;
pub mod signature;
pub mod suppress;

pub use engine::{DEFAULT_MAX_SCAN_LINES, Engine, EngineOptions, FileFix, LineResult, LocationOutcome};
pub use error::{FixError, MalformedInput};
