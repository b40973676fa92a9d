//! Rendering helpers (markdown) for human-readable artifacts.

use asyncfix_types::run::{AsyncfixRun, LocationResult, LocationStatus};
use asyncfix_types::shape::ReturnShape;

pub fn render_run_md(run: &AsyncfixRun) -> String {
    let mut out = String::new();
    out.push_str("# asyncfix run\n\n");
    out.push_str(&format!(
        "- Mode: `{}`{}\n",
        run.mode.as_str(),
        if run.applied { "" } else { " (dry run)" }
    ));
    out.push_str(&format!(
        "- Locations: {}\n- Fixed: {}\n- Already fixed: {}\n- Skipped: {}\n- Fatal: {}\n- Files modified: {}\n\n",
        run.summary.locations,
        run.summary.fixed,
        run.summary.already_fixed,
        run.summary.skipped,
        run.summary.fatal,
        run.summary.files_modified
    ));

    if !run.errors.is_empty() {
        out.push_str("## Errors\n\n");
        for e in &run.errors {
            out.push_str(&format!("- {}\n", e));
        }
        out.push('\n');
    }

    out.push_str("## Results\n\n");
    if run.results.is_empty() {
        out.push_str("_No locations._\n");
        return out;
    }

    let mut current: Option<&str> = None;
    for r in &run.results {
        if current != Some(r.path.as_str()) {
            if current.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("### `{}`\n\n", r.path));
            current = Some(r.path.as_str());
        }
        out.push_str(&result_line(r));
    }

    if !run.files.is_empty() {
        out.push_str("\n## Files changed\n\n");
        for fc in &run.files {
            out.push_str(&format!(
                "- `{}` {} → {}\n",
                fc.path,
                short(&fc.sha256_before),
                short(&fc.sha256_after)
            ));
            if let Some(backup) = &fc.backup_path {
                out.push_str(&format!("  - backup: `{}`\n", backup));
            }
        }
    }

    out
}

fn result_line(r: &LocationResult) -> String {
    let mut line = format!("- line {}: `{}`", r.line, status_label(r.status));
    if let Some(shape) = &r.shape {
        line.push_str(&format!(" {}", shape_label(shape)));
    }
    if r.returns_rewritten > 0 {
        line.push_str(&format!(", {} return(s) rewritten", r.returns_rewritten));
    }
    if r.status != LocationStatus::AlreadyFixed
        && let Some(msg) = &r.message
    {
        line.push_str(&format!(" ({})", msg));
    }
    line.push('\n');
    line
}

fn shape_label(shape: &ReturnShape) -> String {
    match shape {
        ReturnShape::WrappedValue { wrapper, inner } => {
            format!("`{}<{}>`", wrapper.type_name(), inner)
        }
        ReturnShape::WrappedVoid { wrapper } => format!("`{}`", wrapper.type_name()),
        ReturnShape::PlainValue => "plain value".to_string(),
        ReturnShape::Unknown => "unknown shape".to_string(),
    }
}

fn status_label(s: LocationStatus) -> &'static str {
    match s {
        LocationStatus::Fixed => "fixed",
        LocationStatus::AlreadyFixed => "already fixed",
        LocationStatus::Skipped => "skipped",
        LocationStatus::Fatal => "fatal",
    }
}

fn short(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}
