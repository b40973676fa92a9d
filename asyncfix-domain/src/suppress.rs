//! Fence a flagged method with a scoped `#pragma warning disable`.

use crate::buffer::{SourceBuffer, TextEdit};
use crate::locator::MethodSpan;

pub const SUPPRESSION_NOTE: &str = "Async method lacks 'await' operators and will run synchronously";

pub fn disable_pragma(code: &str) -> String {
    format!("#pragma warning disable {code} // {SUPPRESSION_NOTE}")
}

pub fn restore_pragma(code: &str) -> String {
    format!("#pragma warning restore {code}")
}

/// Whether the nearest non-blank line above `line` already disables `code`.
pub fn is_suppressed(buffer: &SourceBuffer, line: usize, code: &str) -> bool {
    (1..line)
        .rev()
        .filter_map(|l| buffer.line_text(l))
        .map(str::trim)
        .find(|t| !t.is_empty())
        .and_then(|t| t.strip_prefix("#pragma warning disable"))
        .is_some_and(|rest| rest.split([',', ' ', '/']).any(|c| c == code))
}

/// Edits inserting the disable pragma above the method and the restore pragma below it.
///
/// Returns `None` when the method is already fenced.
pub fn plan_suppression(buffer: &SourceBuffer, span: &MethodSpan, code: &str) -> Option<Vec<TextEdit>> {
    if is_suppressed(buffer, span.start_line, code) {
        return None;
    }

    let eol = buffer.line_ending();
    let indent = buffer.indentation(span.start_line);
    let start = buffer.line_start(span.start_line)?;
    let mut edits = vec![TextEdit::insert(
        start,
        format!("{indent}{}{eol}", disable_pragma(code)),
    )];

    let restore = format!("{indent}{}", restore_pragma(code));
    match buffer.line_start(span.end_line + 1) {
        Some(next) => edits.push(TextEdit::insert(next, format!("{restore}{eol}"))),
        None => {
            let text = buffer.text();
            let insert = if text.ends_with('\n') {
                format!("{restore}{eol}")
            } else {
                format!("{eol}{restore}")
            };
            edits.push(TextEdit::insert(text.len(), insert));
        }
    }
    Some(edits)
}
