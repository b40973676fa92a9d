use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(file, line)` pair flagged by an external diagnostic.
///
/// Ordering is by path, then line, which is the order locations are grouped in before each file's
/// lines are reversed for processing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlaggedLocation {
    pub path: Utf8PathBuf,

    /// 1-based line number, as reported by the compiler.
    pub line: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u64>,

    /// Diagnostic code, e.g. "CS1998".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FlaggedLocation {
    pub fn new(path: impl Into<Utf8PathBuf>, line: u64) -> Self {
        Self {
            path: path.into(),
            line,
            column: None,
            code: None,
        }
    }
}

impl fmt::Display for FlaggedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}
