//! In-memory source text with a line index.

use std::ops::Range;

/// Replace `range` with `replacement`. Pure insertions use an empty range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl TextEdit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            replacement: text.into(),
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            replacement: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBuffer {
    text: String,
    /// Byte offset of the first character of each line.
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = index_lines(&text);
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Number of lines; a trailing newline does not start a new line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Offset of the first byte of `line` (1-based).
    pub fn line_start(&self, line: usize) -> Option<usize> {
        line.checked_sub(1)
            .and_then(|i| self.line_starts.get(i))
            .copied()
    }

    /// Offset one past the last byte of `line`, excluding its line terminator.
    pub fn line_end(&self, line: usize) -> Option<usize> {
        let start = self.line_start(line)?;
        let end = self.text[start..]
            .find('\n')
            .map_or(self.text.len(), |i| start + i);
        let end = if end > start && self.text.as_bytes()[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };
        Some(end)
    }

    pub fn line_text(&self, line: usize) -> Option<&str> {
        Some(&self.text[self.line_start(line)?..self.line_end(line)?])
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    /// Leading blanks of `line`.
    pub fn indentation(&self, line: usize) -> &str {
        let text = self.line_text(line).unwrap_or("");
        let trimmed = text.trim_start_matches([' ', '\t']);
        &text[..text.len() - trimmed.len()]
    }

    /// The file's line terminator: `\r\n` if it uses any, otherwise `\n`.
    pub fn line_ending(&self) -> &'static str {
        if self.text.contains("\r\n") { "\r\n" } else { "\n" }
    }

    /// Apply non-overlapping edits computed against the current text, then rebuild the index.
    ///
    /// Edits are applied from the highest offset down so earlier offsets stay valid. Insertions
    /// at the same offset keep the order in which they were given.
    pub fn apply(&mut self, mut edits: Vec<TextEdit>) {
        if edits.is_empty() {
            return;
        }
        edits.reverse();
        edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));

        let mut floor = self.text.len();
        for edit in edits {
            debug_assert!(edit.range.end <= floor, "overlapping edits");
            floor = edit.range.start;
            self.text.replace_range(edit.range, &edit.replacement);
        }
        self.line_starts = index_lines(&self.text);
    }
}

fn index_lines(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        text.bytes()
            .enumerate()
            .filter(|(i, b)| *b == b'\n' && i + 1 < text.len())
            .map(|(i, _)| i + 1),
    );
    starts
}
