//! Find the extent of the method declared at a flagged line.

use std::ops::Range;

use asyncfix_types::shape::ReturnShape;
use tracing::debug;

use crate::brackets::{BracketTracker, Structural};
use crate::buffer::SourceBuffer;
use crate::error::{FixError, MalformedInput};
use crate::lexer::Lexed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodBody {
    /// Offsets of the opening and matching closing brace.
    Block { open: usize, close: usize },
    /// Offset of the `=` of `=>` and of the terminating `;`.
    Expression { arrow: usize, terminator: usize },
}

impl MethodBody {
    /// Byte range strictly between the body delimiters.
    pub fn interior(&self) -> Range<usize> {
        match *self {
            MethodBody::Block { open, close } => open + 1..close,
            MethodBody::Expression { arrow, terminator } => arrow + 2..terminator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpan {
    pub start_line: usize,
    /// Line of the closing brace (or the `;` of an expression body).
    pub end_line: usize,
    /// From the start of the flagged line up to the body delimiter.
    pub signature: Range<usize>,
    pub body: MethodBody,
    pub return_shape_hint: ReturnShape,
}

/// Scan forward from the start of `line` for the member's body.
///
/// `window` bounds how many lines past `line` the body may end on.
pub fn locate_method(
    buffer: &SourceBuffer,
    lexed: &Lexed,
    line: usize,
    window: usize,
) -> Result<MethodSpan, FixError> {
    let Some(start) = buffer.line_start(line) else {
        return Err(FixError::ManualReview(format!(
            "line {line} is outside the file ({} lines)",
            buffer.line_count()
        )));
    };

    let bytes = buffer.text().as_bytes();
    let limit = line + window;
    let mut tracker = BracketTracker::starting_at_line(line);
    let mut opener: Option<usize> = None;
    let mut arrow: Option<usize> = None;

    for (pos, &b) in bytes.iter().enumerate().skip(start) {
        // Depth is relative to the flagged line, so closing past it means the line sits inside an
        // enclosing expression such as a call argument.
        let event = tracker.feed(b, lexed.state_at(pos)).map_err(|err| match err {
            MalformedInput::NegativeDepth { delimiter, .. } => FixError::ManualReview(format!(
                "flagged line {line} is inside an enclosing expression (closes '{delimiter}' at line {})",
                buffer.line_of(pos)
            )),
            other => other.into(),
        })?;
        let depth = tracker.depth();

        match (opener, arrow, event) {
            (None, None, Some(Structural::OpenBrace(_))) if depth.paren == 0 && depth.bracket == 0 => {
                opener = Some(pos);
            }
            (None, None, Some(Structural::Arrow)) if depth.is_zero() => {
                arrow = Some(pos - 1);
            }
            (None, None, Some(Structural::Semicolon)) if depth.is_zero() => {
                return Err(FixError::ManualReview(format!(
                    "declaration at line {line} has no body"
                )));
            }
            (Some(open), _, Some(Structural::CloseBrace(_))) if depth.brace == 0 => {
                let end_line = buffer.line_of(pos);
                debug!(line, end_line, "located block body");
                return Ok(MethodSpan {
                    start_line: line,
                    end_line,
                    signature: start..open,
                    body: MethodBody::Block { open, close: pos },
                    return_shape_hint: ReturnShape::Unknown,
                });
            }
            (None, Some(arrow), Some(Structural::Semicolon)) if depth.is_zero() => {
                let end_line = buffer.line_of(pos);
                debug!(line, end_line, "located expression body");
                return Ok(MethodSpan {
                    start_line: line,
                    end_line,
                    signature: start..arrow,
                    body: MethodBody::Expression {
                        arrow,
                        terminator: pos,
                    },
                    return_shape_hint: ReturnShape::Unknown,
                });
            }
            _ => {}
        }

        if tracker.line() > limit {
            break;
        }
    }

    Err(MalformedInput::RunawayScan { line, window }.into())
}
