//! Configuration file loading for asyncfix.
//!
//! Discovers and loads `asyncfix.toml` from the repository root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use asyncfix_diagnostics::DEFAULT_CODE;
use asyncfix_domain::{DEFAULT_MAX_SCAN_LINES, EngineOptions};
use asyncfix_edit::{ApplyOptions, BackupOptions, DEFAULT_BACKUP_SUFFIX};
use asyncfix_types::mode::{FixMode, NestedReturns};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "asyncfix.toml";

/// Top-level configuration from asyncfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AsyncfixConfig {
    /// How flagged methods are fixed.
    pub fix: FixConfig,

    /// Backup settings.
    pub backups: BackupsConfig,
}

/// Fix section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixConfig {
    pub mode: FixMode,

    /// Diagnostic code to read from build logs and name in suppression pragmas.
    pub code: String,

    /// How far past the flagged line a method body may extend.
    pub max_scan_lines: usize,

    pub nested_returns: NestedReturns,

    /// Always write `Task.FromResult<T>(...)` instead of relying on inference.
    pub explicit_type_arguments: bool,

    /// Add `return Task.CompletedTask;` when a `Task` method can fall off its end.
    pub complete_fallthrough: bool,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            mode: FixMode::default(),
            code: DEFAULT_CODE.to_string(),
            max_scan_lines: DEFAULT_MAX_SCAN_LINES,
            nested_returns: NestedReturns::default(),
            explicit_type_arguments: false,
            complete_fallthrough: true,
        }
    }
}

/// Backups section of the config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupsConfig {
    /// Whether to keep a copy of each file before it is rewritten.
    pub enabled: bool,

    /// Suffix for backup files.
    pub suffix: String,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

/// Discover the asyncfix.toml config file.
///
/// Searches for `asyncfix.toml` in the repository root directory.
/// Returns `None` if no config file is found.
pub fn discover_config(repo_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = repo_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an asyncfix.toml config file.
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<AsyncfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<AsyncfixConfig> {
    let config: AsyncfixConfig = toml::from_str(contents).context("invalid TOML")?;
    if config.fix.max_scan_lines == 0 {
        anyhow::bail!("fix.max_scan_lines must be at least 1");
    }
    if config.fix.code.trim().is_empty() {
        anyhow::bail!("fix.code must not be empty");
    }
    if config.backups.suffix.is_empty() {
        anyhow::bail!("backups.suffix must not be empty");
    }
    Ok(config)
}

/// Load config from repo root, or return default if not found.
pub fn load_or_default(repo_root: &Utf8Path) -> anyhow::Result<AsyncfixConfig> {
    match discover_config(repo_root) {
        Some(path) => load_config(&path),
        None => Ok(AsyncfixConfig::default()),
    }
}

/// Values given on the command line for `asyncfix fix`. `None` or `false` defers to the file.
#[derive(Debug, Clone, Default)]
pub struct FixOverrides {
    pub mode: Option<FixMode>,
    pub code: Option<String>,
    pub max_scan_lines: Option<usize>,
    pub nested_returns: Option<NestedReturns>,
    pub explicit_type_arguments: bool,
    pub no_fallthrough: bool,
    pub backup: bool,
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub engine: EngineOptions,
    pub backup: BackupOptions,
}

impl MergedConfig {
    pub fn apply_options(&self, dry_run: bool) -> ApplyOptions {
        ApplyOptions {
            dry_run,
            backup: self.backup.clone(),
            engine: self.engine.clone(),
        }
    }
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: AsyncfixConfig,
}

impl ConfigMerger {
    /// Create a new merger from a loaded config.
    pub fn new(config: AsyncfixConfig) -> Self {
        Self { config }
    }

    /// Merge with fix command CLI arguments.
    ///
    /// Valued options replace the config file value; boolean flags can only switch a setting on
    /// (or, for `no_fallthrough`, off).
    pub fn merge_fix_args(self, cli: &FixOverrides) -> MergedConfig {
        let fix = self.config.fix;
        let engine = EngineOptions {
            mode: cli.mode.unwrap_or(fix.mode),
            max_scan_lines: cli.max_scan_lines.unwrap_or(fix.max_scan_lines),
            nested_returns: cli.nested_returns.unwrap_or(fix.nested_returns),
            explicit_type_arguments: cli.explicit_type_arguments || fix.explicit_type_arguments,
            complete_fallthrough: fix.complete_fallthrough && !cli.no_fallthrough,
            diagnostic_code: cli.code.clone().unwrap_or(fix.code),
        };

        MergedConfig {
            engine,
            backup: BackupOptions {
                enabled: cli.backup || self.config.backups.enabled,
                suffix: self.config.backups.suffix,
            },
        }
    }

    /// The diagnostic code for commands that only read logs.
    pub fn code(&self, cli_code: Option<&str>) -> String {
        cli_code
            .map(str::to_string)
            .unwrap_or_else(|| self.config.fix.code.clone())
    }
}
