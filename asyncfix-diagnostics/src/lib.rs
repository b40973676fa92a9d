//! Diagnostic ingestion.
//!
//! asyncfix never runs a build itself. It reads compiler output that already exists (MSBuild or
//! `dotnet build` logs) and extracts the locations flagged with a given warning code. Loading is
//! tolerant: an unreadable log is reported next to the others instead of failing the run.

mod load;
mod parse;

pub use load::{DiagnosticLoadError, LoadedLog, collect_locations, load_diagnostics};
pub use parse::{
    DEFAULT_CODE, LocationArgError, group_by_file, parse_diagnostics, parse_location_arg,
};
