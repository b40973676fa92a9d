mod config;

use anyhow::Context;
use asyncfix_diagnostics::{
    LoadedLog, collect_locations, group_by_file, load_diagnostics, parse_location_arg,
};
use asyncfix_edit::{FsSourceFiles, run_fix};
use asyncfix_render::render_run_md;
use asyncfix_types::mode::{FixMode, NestedReturns};
use asyncfix_types::run::{AsyncfixRun, ToolInfo};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use config::{ConfigMerger, FixOverrides};
use fs_err as fs;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "asyncfix",
    version,
    about = "Removes needless `async` from C# methods flagged by CS1998."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fix flagged methods (default: dry-run).
    Fix(FixArgs),
    /// List the locations found in build logs, in the order they would be fixed.
    Locations(LocationsArgs),
}

#[derive(Debug, Parser)]
struct FixArgs {
    /// Repository root (default: current directory).
    #[arg(long, default_value = ".")]
    repo_root: Utf8PathBuf,

    /// Build log to read diagnostics from; glob patterns are expanded. Repeatable.
    #[arg(long = "log", value_name = "PATTERN")]
    logs: Vec<String>,

    /// Explicit location to fix, as PATH:LINE. Repeatable.
    #[arg(long = "location", value_name = "PATH:LINE")]
    locations: Vec<String>,

    /// Diagnostic code to pick from the logs (default: CS1998).
    #[arg(long)]
    code: Option<String>,

    /// How flagged methods are fixed.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Write changes to disk. If omitted, runs a dry-run and only emits artifacts.
    #[arg(long, default_value_t = false)]
    apply: bool,

    /// Output directory for asyncfix artifacts (default: <repo_root>/artifacts/asyncfix).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Give up on a method whose body does not close within this many lines.
    #[arg(long)]
    max_scan_lines: Option<usize>,

    /// Which returns are rewritten: method scope only, or lambdas and local functions too.
    #[arg(long, value_enum)]
    nested_returns: Option<NestedArg>,

    /// Always spell out the type argument of Task.FromResult<T>.
    #[arg(long, default_value_t = false)]
    explicit_type_arguments: bool,

    /// Do not add a completed-task return to Task methods that can fall off their end.
    #[arg(long, default_value_t = false)]
    no_fallthrough: bool,

    /// Keep a copy of every rewritten file next to it.
    #[arg(long, default_value_t = false)]
    backup: bool,
}

#[derive(Debug, Parser)]
struct LocationsArgs {
    /// Build log to read diagnostics from; glob patterns are expanded. Repeatable.
    #[arg(long = "log", value_name = "PATTERN", required = true)]
    logs: Vec<String>,

    /// Diagnostic code to pick from the logs (default: CS1998).
    #[arg(long)]
    code: Option<String>,

    /// Repository root, used to find asyncfix.toml (default: current directory).
    #[arg(long, default_value = ".")]
    repo_root: Utf8PathBuf,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Rewrite,
    Suppress,
}

impl From<ModeArg> for FixMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Rewrite => FixMode::RemoveAsyncAndWrap,
            ModeArg::Suppress => FixMode::SuppressOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum NestedArg {
    TopLevel,
    All,
}

impl From<NestedArg> for NestedReturns {
    fn from(arg: NestedArg) -> Self {
        match arg {
            NestedArg::TopLevel => NestedReturns::TopLevel,
            NestedArg::All => NestedReturns::All,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => code,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Fix(args) => cmd_fix(args),
        Command::Locations(args) => cmd_locations(args),
    }
}

fn cmd_fix(args: FixArgs) -> anyhow::Result<ExitCode> {
    let repo_root = args.repo_root;
    let out_dir = args
        .out_dir
        .unwrap_or_else(|| repo_root.join("artifacts").join("asyncfix"));

    // Load config file and merge with CLI arguments
    let file_config = config::load_or_default(&repo_root).context("load asyncfix.toml config")?;
    let merged = ConfigMerger::new(file_config).merge_fix_args(&FixOverrides {
        mode: args.mode.map(FixMode::from),
        code: args.code,
        max_scan_lines: args.max_scan_lines,
        nested_returns: args.nested_returns.map(NestedReturns::from),
        explicit_type_arguments: args.explicit_type_arguments,
        no_fallthrough: args.no_fallthrough,
        backup: args.backup,
    });
    if merged.engine.max_scan_lines == 0 {
        anyhow::bail!("--max-scan-lines must be at least 1");
    }
    debug!("merged config: {:?}", merged);

    if args.logs.is_empty() && args.locations.is_empty() {
        anyhow::bail!("nothing to fix: pass --log PATTERN or --location PATH:LINE");
    }

    let logs = load_diagnostics(&args.logs, &merged.engine.diagnostic_code)
        .context("load build logs")?;
    let mut locations = collect_locations(&logs);
    for arg in &args.locations {
        locations.push(parse_location_arg(arg)?);
    }

    let files = FsSourceFiles::new(repo_root.clone());
    let opts = merged.apply_options(!args.apply);
    let (mut run, patch) = run_fix(&files, &locations, tool_info(), new_run_id(), &opts);
    run.errors = load_errors(&logs);

    fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir))?;
    write_json(&out_dir.join("run.json"), &run)?;
    fs::write(out_dir.join("run.md"), render_run_md(&run))?;
    fs::write(out_dir.join("patch.diff"), &patch)?;

    info!("wrote run artifacts to {}", out_dir);
    println!("{}", summary_line(&run, &out_dir));

    if run.summary.fatal > 0 {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_locations(args: LocationsArgs) -> anyhow::Result<ExitCode> {
    let file_config =
        config::load_or_default(&args.repo_root).context("load asyncfix.toml config")?;
    let code = ConfigMerger::new(file_config).code(args.code.as_deref());

    let logs = load_diagnostics(&args.logs, &code).context("load build logs")?;
    for err in load_errors(&logs) {
        eprintln!("warning: {}", err);
    }
    let grouped = group_by_file(&collect_locations(&logs));

    match args.format {
        OutputFormat::Text => {
            for (path, lines) in &grouped {
                for line in lines {
                    println!("{}:{}", path, line);
                }
            }
        }
        OutputFormat::Json => {
            let files: Vec<_> = grouped
                .iter()
                .map(|(path, lines)| {
                    serde_json::json!({
                        "path": path,
                        "lines": lines,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_errors(logs: &[LoadedLog]) -> Vec<String> {
    logs.iter()
        .filter_map(|log| match &log.locations {
            Ok(_) => None,
            Err(err) => Some(format!("{}: {}", log.path, err)),
        })
        .collect()
}

fn summary_line(run: &AsyncfixRun, out_dir: &Utf8Path) -> String {
    let s = &run.summary;
    let files = if run.applied {
        format!("{} file(s) written", s.files_modified)
    } else {
        format!("{} file(s) would change (dry run)", s.files_modified)
    };
    format!(
        "asyncfix: {} location(s): {} fixed, {} already fixed, {} skipped, {} fatal; {}; artifacts in {}",
        s.locations, s.fixed, s.already_fixed, s.skipped, s.fatal, files, out_dir
    )
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "asyncfix".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    }
}

fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
