use asyncfix_types::mode::{FixMode, NestedReturns};
use asyncfix_types::shape::ReturnShape;
use tracing::{debug, warn};

use crate::brackets::check_balance;
use crate::buffer::SourceBuffer;
use crate::error::FixError;
use crate::lexer::lex;
use crate::locator::locate_method;
use crate::rewriter::{RewriteOptions, plan_rewrite};
use crate::signature::classify_signature;
use crate::suppress::plan_suppression;

pub const DEFAULT_MAX_SCAN_LINES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub mode: FixMode,
    /// Lines past the flagged line a method body may extend to.
    pub max_scan_lines: usize,
    pub nested_returns: NestedReturns,
    pub explicit_type_arguments: bool,
    pub complete_fallthrough: bool,
    /// Diagnostic code named in suppression pragmas.
    pub diagnostic_code: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mode: FixMode::default(),
            max_scan_lines: DEFAULT_MAX_SCAN_LINES,
            nested_returns: NestedReturns::default(),
            explicit_type_arguments: false,
            complete_fallthrough: true,
            diagnostic_code: "CS1998".to_string(),
        }
    }
}

impl EngineOptions {
    fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            nested_returns: self.nested_returns,
            explicit_type_arguments: self.explicit_type_arguments,
            complete_fallthrough: self.complete_fallthrough,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationOutcome {
    Fixed {
        shape: ReturnShape,
        returns_rewritten: usize,
    },
    /// No async marker, or the pragma fence is already in place.
    AlreadyFixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineResult {
    pub line: usize,
    pub outcome: Result<LocationOutcome, FixError>,
}

/// Outcome of fixing every flagged line of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFix {
    /// Text to write back; `None` when a file-fatal error aborted the file.
    pub text: Option<String>,
    /// One entry per distinct flagged line, highest line first.
    pub results: Vec<LineResult>,
}

impl FileFix {
    fn aborted(lines: &[usize], err: FixError) -> Self {
        Self {
            text: None,
            results: lines
                .iter()
                .map(|&line| LineResult {
                    line,
                    outcome: Err(err.clone()),
                })
                .collect(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.text.is_none()
    }

    pub fn fixed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Ok(LocationOutcome::Fixed { .. })))
            .count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    options: EngineOptions,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Fix every flagged line of one file's text.
    ///
    /// Lines are deduplicated and processed from the bottom up, so edits never shift a line that
    /// is still waiting to be processed.
    pub fn fix_source(&self, text: &str, lines: &[usize]) -> FileFix {
        let mut ordered = lines.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();

        if let Err(err) = lex(text).and_then(|lexed| check_balance(text, &lexed)) {
            warn!(error = %err, "file cannot be analysed; skipping all locations");
            return FileFix::aborted(&ordered, err.into());
        }

        let mut buffer = SourceBuffer::new(text);
        let mut results = Vec::with_capacity(ordered.len());
        for &line in &ordered {
            match self.fix_location(&mut buffer, line) {
                Err(err) if err.is_file_fatal() => {
                    warn!(line, error = %err, "aborting file");
                    return FileFix::aborted(&ordered, err);
                }
                Err(err) => {
                    warn!(line, error = %err, "location skipped");
                    results.push(LineResult {
                        line,
                        outcome: Err(err),
                    });
                }
                Ok(outcome) => results.push(LineResult {
                    line,
                    outcome: Ok(outcome),
                }),
            }
        }

        FileFix {
            text: Some(buffer.into_text()),
            results,
        }
    }

    /// Fix one flagged line in place. The buffer is only changed on success.
    pub fn fix_location(
        &self,
        buffer: &mut SourceBuffer,
        line: usize,
    ) -> Result<LocationOutcome, FixError> {
        let lexed = lex(buffer.text())?;
        let mut span = locate_method(buffer, &lexed, line, self.options.max_scan_lines)?;

        let code = lexed.code_view(buffer.text(), span.signature.clone());
        let signature = classify_signature(&code);
        span.return_shape_hint = signature.shape.clone();

        let Some(keyword) = signature.async_keyword else {
            debug!(line, "no async marker; already fixed");
            return Ok(LocationOutcome::AlreadyFixed);
        };
        let offset = span.signature.start;
        let keyword = keyword.start + offset..keyword.end + offset;

        match self.options.mode {
            FixMode::SuppressOnly => {
                match plan_suppression(buffer, &span, &self.options.diagnostic_code) {
                    Some(edits) => {
                        buffer.apply(edits);
                        Ok(LocationOutcome::Fixed {
                            shape: signature.shape,
                            returns_rewritten: 0,
                        })
                    }
                    None => {
                        debug!(line, "pragma already present");
                        Ok(LocationOutcome::AlreadyFixed)
                    }
                }
            }
            FixMode::RemoveAsyncAndWrap => {
                let plan = plan_rewrite(
                    buffer,
                    &lexed,
                    &span,
                    keyword,
                    &self.options.rewrite_options(),
                )?;
                debug!(
                    line,
                    end_line = span.end_line,
                    shape = signature.shape.label(),
                    returns = plan.returns_rewritten,
                    "rewriting method"
                );
                buffer.apply(plan.edits);
                Ok(LocationOutcome::Fixed {
                    shape: signature.shape,
                    returns_rewritten: plan.returns_rewritten,
                })
            }
        }
    }
}
