use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use asyncfix_types::location::FlaggedLocation;
use camino::Utf8PathBuf;
use regex::Regex;
use thiserror::Error;

pub const DEFAULT_CODE: &str = "CS1998";

// `12>C:\src\Foo.cs(14,27): warning CS1998: This async method lacks 'await' ...`
static DIAGNOSTIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\s*\d+>)?\s*(?P<path>[^()]+?)\((?P<line>\d+),(?P<col>\d+)(?:,\d+,\d+)?\): warning (?P<code>[A-Za-z]+\d+):",
    )
    .expect("diagnostic pattern is valid")
});

/// Extract every `warning <code>` location from compiler output.
///
/// Duplicates (the same path, line and column reported twice, as MSBuild does for multi-target
/// builds) are dropped, keeping first-seen order.
pub fn parse_diagnostics(text: &str, code: &str) -> Vec<FlaggedLocation> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for line in text.lines() {
        let Some(caps) = DIAGNOSTIC_LINE.captures(line) else {
            continue;
        };
        if !caps["code"].eq_ignore_ascii_case(code) {
            continue;
        }
        let (Ok(line_no), Ok(col)) = (caps["line"].parse::<u64>(), caps["col"].parse::<u64>()) else {
            continue;
        };
        if line_no == 0 {
            continue;
        }

        let path = Utf8PathBuf::from(caps["path"].trim());
        if !seen.insert((path.clone(), line_no, col)) {
            continue;
        }
        out.push(FlaggedLocation {
            path,
            line: line_no,
            column: Some(col),
            code: Some(caps["code"].to_string()),
        });
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationArgError {
    #[error("expected PATH:LINE, got '{0}'")]
    MissingLine(String),

    #[error("invalid line number '{line}' in '{arg}'")]
    InvalidLine { arg: String, line: String },
}

/// Parse a `path:line` command-line location.
pub fn parse_location_arg(arg: &str) -> Result<FlaggedLocation, LocationArgError> {
    let Some((path, line)) = arg.rsplit_once(':') else {
        return Err(LocationArgError::MissingLine(arg.to_string()));
    };
    if path.is_empty() {
        return Err(LocationArgError::MissingLine(arg.to_string()));
    }
    match line.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(FlaggedLocation::new(path, n)),
        _ => Err(LocationArgError::InvalidLine {
            arg: arg.to_string(),
            line: line.to_string(),
        }),
    }
}

/// Group locations by file: paths ascending, lines descending without duplicates.
///
/// This is the order in which the engine must process them.
pub fn group_by_file(locations: &[FlaggedLocation]) -> Vec<(Utf8PathBuf, Vec<u64>)> {
    let mut by_file: BTreeMap<Utf8PathBuf, Vec<u64>> = BTreeMap::new();
    for loc in locations {
        by_file.entry(loc.path.clone()).or_default().push(loc.line);
    }
    by_file
        .into_iter()
        .map(|(path, mut lines)| {
            lines.sort_unstable_by(|a, b| b.cmp(a));
            lines.dedup();
            (path, lines)
        })
        .collect()
}
