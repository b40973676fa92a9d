//! Error types for asyncfix-edit.
//!
//! A [`FileError`] is always fatal for one file: every flagged location in that file is reported
//! `fatal` with the same reason, and the file is left as it was on disk. Location-level problems
//! never reach this type; they stay as [`FixError`]s on the individual results.

use asyncfix_domain::FixError;
use asyncfix_types::run::error_tokens;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    /// The engine refused the whole file (unterminated literal, unbalanced braces, ...).
    #[error(transparent)]
    Fix(#[from] FixError),

    /// Reading, backing up or writing the file failed.
    #[error("io failure: {0:#}")]
    Io(#[from] anyhow::Error),
}

impl FileError {
    /// Stable token recorded in the run record.
    pub fn token(&self) -> &'static str {
        match self {
            FileError::Fix(err) => err.token(),
            FileError::Io(_) => error_tokens::IO_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FileError;
    use asyncfix_domain::{FixError, MalformedInput};

    #[test]
    fn io_failure_reports_io_token() {
        let err = FileError::from(anyhow::anyhow!("disk full").context("write Service.cs"));
        assert_eq!(err.token(), "io_failure");
        assert_eq!(err.to_string(), "io failure: write Service.cs: disk full");
    }

    #[test]
    fn engine_errors_keep_their_token_and_message() {
        let fix = FixError::from(MalformedInput::NegativeDepth {
            delimiter: '}',
            line: 4,
        });
        let err = FileError::from(fix.clone());
        assert_eq!(err.token(), "malformed_input");
        assert_eq!(err.to_string(), fix.to_string());
    }
}
