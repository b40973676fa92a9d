use crate::mode::FixMode;
use crate::shape::ReturnShape;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of one `asyncfix fix` run: one result per flagged location, one change per written file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncfixRun {
    pub schema: String,
    pub run_id: String,
    pub tool: ToolInfo,

    #[serde(default)]
    pub run: RunInfo,

    pub mode: FixMode,

    /// False for dry runs: results describe what would have been written.
    pub applied: bool,

    #[serde(default)]
    pub results: Vec<LocationResult>,

    #[serde(default)]
    pub files: Vec<FileChange>,

    pub summary: RunSummary,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl AsyncfixRun {
    pub fn new(tool: ToolInfo, run_id: String, mode: FixMode) -> Self {
        Self {
            schema: crate::schema::ASYNCFIX_RUN_V1.to_string(),
            run_id,
            tool,
            run: RunInfo::default(),
            mode,
            applied: false,
            results: vec![],
            files: vec![],
            summary: RunSummary::default(),
            errors: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationResult {
    pub path: String,
    pub line: u64,
    pub status: LocationStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ReturnShape>,

    #[serde(default)]
    pub returns_rewritten: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Stable machine-readable reason, see [`error_tokens`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    Fixed,
    AlreadyFixed,
    Skipped,
    Fatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub sha256_before: String,
    pub sha256_after: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub locations: u64,
    pub fixed: u64,
    pub already_fixed: u64,
    pub skipped: u64,
    pub fatal: u64,
    pub files_modified: u64,
}

impl RunSummary {
    pub fn record(&mut self, status: LocationStatus) {
        self.locations += 1;
        match status {
            LocationStatus::Fixed => self.fixed += 1,
            LocationStatus::AlreadyFixed => self.already_fixed += 1,
            LocationStatus::Skipped => self.skipped += 1,
            LocationStatus::Fatal => self.fatal += 1,
        }
    }
}

/// Tokens stored in [`LocationResult::error_token`].
pub mod error_tokens {
    pub const MALFORMED_INPUT: &str = "malformed_input";
    pub const SIGNATURE_MISMATCH: &str = "signature_mismatch";
    pub const MANUAL_REVIEW: &str = "manual_review";
    pub const IO_FAILURE: &str = "io_failure";
}
