use asyncfix_types::run::error_tokens;
use thiserror::Error;

use crate::lexer::LexState;

/// The source cannot be analysed safely. Always fatal for the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedInput {
    #[error("unterminated {state} starting at line {line}")]
    Unterminated { state: LexState, line: usize },

    #[error("unbalanced '{delimiter}' at line {line}")]
    NegativeDepth { delimiter: char, line: usize },

    #[error("method starting at line {line} does not close within {window} lines (too long or malformed)")]
    RunawayScan { line: usize, window: usize },

    #[error("statement at line {line} has no terminating ';'")]
    UnterminatedStatement { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    #[error("malformed input: {0}")]
    Malformed(#[from] MalformedInput),

    /// The body disagrees with the declared return type.
    #[error("signature mismatch: {0}")]
    SignatureMismatch(String),

    #[error("needs manual review: {0}")]
    ManualReview(String),
}

impl FixError {
    /// Whether the error aborts every location in the file.
    pub fn is_file_fatal(&self) -> bool {
        matches!(self, FixError::Malformed(_))
    }

    pub fn token(&self) -> &'static str {
        match self {
            FixError::Malformed(_) => error_tokens::MALFORMED_INPUT,
            FixError::SignatureMismatch(_) => error_tokens::SIGNATURE_MISMATCH,
            FixError::ManualReview(_) => error_tokens::MANUAL_REVIEW,
        }
    }
}
