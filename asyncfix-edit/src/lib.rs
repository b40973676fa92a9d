//! Apply engine for asyncfix runs.
//!
//! Responsibilities:
//! - Group flagged locations per file and run the domain engine over each file's text.
//! - Write rewritten files atomically, optionally keeping a backup of the original.
//! - Generate a unified diff preview and the run record.
//!
//! Failures are isolated per file: a file that cannot be read, analysed or written is reported
//! `fatal` for each of its locations and every other file is still processed.

mod error;
mod ports;

pub use error::FileError;
pub use ports::{FsSourceFiles, SourceFiles};

use asyncfix_diagnostics::group_by_file;
use asyncfix_domain::{Engine, EngineOptions, FixError, LineResult, LocationOutcome};
use asyncfix_types::location::FlaggedLocation;
use asyncfix_types::run::{
    AsyncfixRun, FileChange, LocationResult, LocationStatus, RunSummary, ToolInfo,
};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use diffy::PatchFormatter;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const DEFAULT_BACKUP_SUFFIX: &str = ".asyncfix.bak";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    pub enabled: bool,
    pub suffix: String,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
    pub backup: BackupOptions,
    pub engine: EngineOptions,
}

/// Unified diff of every file the run would change. Nothing is written.
pub fn preview_patch<R: SourceFiles + ?Sized>(
    files: &R,
    locations: &[FlaggedLocation],
    opts: &ApplyOptions,
) -> String {
    let opts = ApplyOptions {
        dry_run: true,
        ..opts.clone()
    };
    let outcome = execute_fix(files, locations, &opts);
    render_patch(&outcome.before, &outcome.after)
}

/// Fix every flagged location. When `opts.dry_run` is true, no files are written, but results
/// and a patch are still produced.
pub fn run_fix<R: SourceFiles + ?Sized>(
    files: &R,
    locations: &[FlaggedLocation],
    tool: ToolInfo,
    run_id: String,
    opts: &ApplyOptions,
) -> (AsyncfixRun, String) {
    let mut run = AsyncfixRun::new(tool, run_id, opts.engine.mode);
    run.run.started_at = Some(Utc::now());

    let outcome = execute_fix(files, locations, opts);
    let patch = render_patch(&outcome.before, &outcome.after);

    run.applied = !opts.dry_run;
    run.results = outcome.results;
    run.files = outcome.changes;
    run.summary = outcome.summary;
    run.run.ended_at = Some(Utc::now());

    info!(
        root = %files.root(),
        locations = run.summary.locations,
        fixed = run.summary.fixed,
        fatal = run.summary.fatal,
        applied = run.applied,
        "fix run complete"
    );
    (run, patch)
}

struct ExecuteOutcome {
    /// Original text of every changed file.
    before: BTreeMap<Utf8PathBuf, String>,
    after: BTreeMap<Utf8PathBuf, String>,
    results: Vec<LocationResult>,
    changes: Vec<FileChange>,
    summary: RunSummary,
}

fn execute_fix<R: SourceFiles + ?Sized>(
    files: &R,
    locations: &[FlaggedLocation],
    opts: &ApplyOptions,
) -> ExecuteOutcome {
    let engine = Engine::new(opts.engine.clone());
    let mut outcome = ExecuteOutcome {
        before: BTreeMap::new(),
        after: BTreeMap::new(),
        results: Vec::new(),
        changes: Vec::new(),
        summary: RunSummary::default(),
    };

    for (path, lines) in group_by_file(locations) {
        let file = fix_file(files, &engine, &path, &lines, opts);
        for result in &file.results {
            outcome.summary.record(result.status);
        }
        outcome.results.extend(file.results);

        if let Some(rewrite) = file.rewrite {
            outcome.changes.push(file_change(
                &path,
                &rewrite.before,
                &rewrite.after,
                rewrite.backup,
            ));
            outcome.before.insert(path.clone(), rewrite.before);
            outcome.after.insert(path, rewrite.after);
        }
    }

    outcome.summary.files_modified = outcome.changes.len() as u64;
    outcome
}

struct FileOutcome {
    results: Vec<LocationResult>,
    rewrite: Option<Rewrite>,
}

struct Rewrite {
    before: String,
    after: String,
    backup: Option<Utf8PathBuf>,
}

impl FileOutcome {
    fn failed(path: &Utf8Path, lines: impl IntoIterator<Item = u64>, err: &FileError) -> Self {
        warn!(path = %path, error = %err, "file left untouched");
        let results = lines
            .into_iter()
            .map(|line| LocationResult {
                path: path.to_string(),
                line,
                status: LocationStatus::Fatal,
                shape: None,
                returns_rewritten: 0,
                message: Some(err.to_string()),
                error_token: Some(err.token().to_string()),
            })
            .collect();
        Self {
            results,
            rewrite: None,
        }
    }
}

fn fix_file<R: SourceFiles + ?Sized>(
    files: &R,
    engine: &Engine,
    path: &Utf8Path,
    lines: &[u64],
    opts: &ApplyOptions,
) -> FileOutcome {
    let before = match files.read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            return FileOutcome::failed(path, lines.iter().copied(), &FileError::from(err));
        }
    };

    // Lines past usize::MAX cannot exist in memory; the engine reports them as out of range.
    let targets: Vec<usize> = lines
        .iter()
        .map(|&line| usize::try_from(line).unwrap_or(usize::MAX))
        .collect();
    let fix = engine.fix_source(&before, &targets);

    let Some(after) = fix.text.clone() else {
        let reason = fix
            .results
            .iter()
            .find_map(|r| r.outcome.clone().err())
            .unwrap_or_else(|| FixError::ManualReview("file aborted".to_string()));
        let lines = fix.results.iter().map(|r| r.line as u64);
        return FileOutcome::failed(path, lines, &FileError::from(reason));
    };

    let results = fix
        .results
        .iter()
        .map(|r| location_result(path, r))
        .collect();

    if after == before {
        debug!(path = %path, "no changes");
        return FileOutcome {
            results,
            rewrite: None,
        };
    }

    if opts.dry_run {
        return FileOutcome {
            results,
            rewrite: Some(Rewrite {
                before,
                after,
                backup: None,
            }),
        };
    }

    match write_file(files, path, &before, &after, &opts.backup) {
        Ok(backup) => {
            info!(path = %path, fixed = fix.fixed_count(), "file rewritten");
            FileOutcome {
                results,
                rewrite: Some(Rewrite {
                    before,
                    after,
                    backup,
                }),
            }
        }
        Err(err) => FileOutcome::failed(path, lines.iter().copied(), &FileError::from(err)),
    }
}

fn write_file<R: SourceFiles + ?Sized>(
    files: &R,
    path: &Utf8Path,
    before: &str,
    after: &str,
    backup: &BackupOptions,
) -> anyhow::Result<Option<Utf8PathBuf>> {
    let backup_path = if backup.enabled {
        Some(files.write_backup(path, &backup.suffix, before)?)
    } else {
        None
    };
    files.write_atomic(path, after)?;
    Ok(backup_path)
}

fn location_result(path: &Utf8Path, result: &LineResult) -> LocationResult {
    let mut out = LocationResult {
        path: path.to_string(),
        line: result.line as u64,
        status: LocationStatus::Fixed,
        shape: None,
        returns_rewritten: 0,
        message: None,
        error_token: None,
    };

    match &result.outcome {
        Ok(LocationOutcome::Fixed {
            shape,
            returns_rewritten,
        }) => {
            out.shape = Some(shape.clone());
            out.returns_rewritten = *returns_rewritten as u64;
        }
        Ok(LocationOutcome::AlreadyFixed) => {
            out.status = LocationStatus::AlreadyFixed;
            out.message = Some("already fixed".to_string());
        }
        Err(err) => {
            out.status = if err.is_file_fatal() {
                LocationStatus::Fatal
            } else {
                LocationStatus::Skipped
            };
            out.message = Some(err.to_string());
            out.error_token = Some(err.token().to_string());
        }
    }
    out
}

fn file_change(
    path: &Utf8Path,
    before: &str,
    after: &str,
    backup: Option<Utf8PathBuf>,
) -> FileChange {
    let before_bytes = before.as_bytes();
    let after_bytes = after.as_bytes();
    FileChange {
        path: path.to_string(),
        sha256_before: sha256_hex(before_bytes),
        sha256_after: sha256_hex(after_bytes),
        before_bytes: Some(before_bytes.len() as u64),
        after_bytes: Some(after_bytes.len() as u64),
        backup_path: backup.map(|p| p.to_string()),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn render_patch(
    before: &BTreeMap<Utf8PathBuf, String>,
    after: &BTreeMap<Utf8PathBuf, String>,
) -> String {
    let mut out = String::new();
    let formatter = PatchFormatter::new();

    for (path, old) in before {
        let new = after.get(path).unwrap_or(old);
        if old == new {
            continue;
        }

        out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
        out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

        let patch = diffy::create_patch(old, new);
        // Skip diffy's own ---/+++ header; ours carries the repo-relative path.
        let body = formatter.fmt_patch(&patch).to_string();
        let hunks = body.find("\n@@").map_or("", |i| &body[i + 1..]);
        out.push_str(hunks);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out
}
