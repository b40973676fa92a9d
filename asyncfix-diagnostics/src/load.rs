use std::collections::{BTreeSet, HashSet};

use anyhow::Context;
use asyncfix_types::location::FlaggedLocation;
use camino::Utf8PathBuf;
use fs_err as fs;
use glob::glob;
use thiserror::Error;
use tracing::{debug, warn};

use crate::parse::parse_diagnostics;

#[derive(Debug, Clone)]
pub struct LoadedLog {
    pub path: Utf8PathBuf,
    pub locations: Result<Vec<FlaggedLocation>, DiagnosticLoadError>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiagnosticLoadError {
    #[error("io error: {message}")]
    Io { message: String },
}

/// Expand `patterns`, read every matching log and parse the `code` warnings out of it.
///
/// Logs are returned sorted by path; a log matched by several patterns is read once. Logs that
/// cannot be read are returned with an error rather than failing the whole load.
pub fn load_diagnostics(patterns: &[String], code: &str) -> anyhow::Result<Vec<LoadedLog>> {
    let mut paths = BTreeSet::new();
    for pattern in patterns {
        debug!(pattern = %pattern, "scanning for build logs");
        let mut matched = 0usize;
        for entry in glob(pattern).with_context(|| format!("invalid log pattern {pattern}"))? {
            let path = entry
                .map_err(|e| anyhow::anyhow!("glob error: {e}"))?
                .to_string_lossy()
                .to_string();
            paths.insert(Utf8PathBuf::from(path));
            matched += 1;
        }
        if matched == 0 {
            warn!(pattern = %pattern, "log pattern matched no files");
        }
    }

    let out = paths
        .into_iter()
        .map(|path| {
            // Build logs are not guaranteed to be UTF-8; parse what is readable.
            let locations = fs::read(&path)
                .map(|bytes| parse_diagnostics(&String::from_utf8_lossy(&bytes), code))
                .map_err(|e| DiagnosticLoadError::Io {
                    message: e.to_string(),
                });
            match &locations {
                Ok(found) => debug!(path = %path, count = found.len(), "parsed build log"),
                Err(err) => warn!(path = %path, error = %err, "could not read build log"),
            }
            LoadedLog { path, locations }
        })
        .collect();
    Ok(out)
}

/// All locations from successfully loaded logs, deduplicated in first-seen order.
pub fn collect_locations(logs: &[LoadedLog]) -> Vec<FlaggedLocation> {
    let mut seen = HashSet::new();
    logs.iter()
        .filter_map(|log| log.locations.as_ref().ok())
        .flatten()
        .filter(|loc| seen.insert((loc.path.clone(), loc.line, loc.column)))
        .cloned()
        .collect()
}
