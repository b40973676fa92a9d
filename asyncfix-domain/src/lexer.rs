//! Byte-level lexical classification of C# source.
//!
//! The scanner reports, for every byte, the [`LexState`] *before* that byte is consumed. Only
//! bytes classified as [`LexState::Code`] may carry structural meaning (braces, `;`, keywords).
//! Everything else belongs to a literal or a comment and is opaque to the rest of the engine.

use std::fmt;
use std::ops::Range;

use crate::error::MalformedInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexState {
    Code,
    InString,
    InChar,
    /// Verbatim (`@"…"`) and raw (`"""…"""`) string literals.
    InVerbatimString,
    InLineComment,
    InBlockComment,
}

impl LexState {
    pub fn is_code(self) -> bool {
        self == LexState::Code
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            LexState::InString | LexState::InChar | LexState::InVerbatimString
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(self, LexState::InLineComment | LexState::InBlockComment)
    }
}

impl fmt::Display for LexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LexState::Code => "code",
            LexState::InString => "string literal",
            LexState::InChar => "character literal",
            LexState::InVerbatimString => "verbatim string literal",
            LexState::InLineComment => "line comment",
            LexState::InBlockComment => "block comment",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
struct Literal {
    state: LexState,
    /// Number of quotes that close a raw string literal; zero otherwise.
    raw_quotes: usize,
    interpolated: bool,
    /// `$` count of a raw interpolated literal: braces needed to open or close a hole.
    dollars: usize,
    opened_at: usize,
}

impl Literal {
    fn none() -> Self {
        Self {
            state: LexState::Code,
            raw_quotes: 0,
            interpolated: false,
            dollars: 0,
            opened_at: 0,
        }
    }
}

/// An open `{…}` hole inside an interpolated string.
#[derive(Debug, Clone, Copy)]
struct Hole {
    literal: Literal,
    /// Code braces opened inside the hole and not yet closed.
    braces: u32,
}

/// Streaming classifier. Yields `(offset, state_before_byte)` for every byte of the input.
pub struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    state: LexState,
    escape_next: bool,
    pending_verbatim_quote: bool,
    literal: Literal,
    holes: Vec<Hole>,
    /// Bytes that still belong to a multi-byte token (`//`, `*/`, `{{`, raw quotes).
    carry: usize,
    carry_state: LexState,
    /// Only blanks seen since the last newline.
    line_start: bool,
    opened_at: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            state: LexState::Code,
            escape_next: false,
            pending_verbatim_quote: false,
            literal: Literal::none(),
            holes: Vec::new(),
            carry: 0,
            carry_state: LexState::Code,
            line_start: true,
            opened_at: 0,
        }
    }

    /// Offset where the innermost open literal or comment started.
    pub fn opened_at(&self) -> usize {
        self.opened_at
    }

    /// State left open at end of input, with the offset where it began.
    pub fn unterminated(&self) -> Option<(LexState, usize)> {
        if let Some(outer) = self.holes.first() {
            return Some((outer.literal.state, outer.literal.opened_at));
        }
        if self.pending_verbatim_quote {
            // The final quote closed the literal.
            return None;
        }
        match self.state {
            LexState::Code | LexState::InLineComment => None,
            other => Some((other, self.opened_at)),
        }
    }

    fn peek(&self, at: usize) -> Option<u8> {
        self.bytes.get(at).copied()
    }

    fn count_quotes(&self, from: usize) -> usize {
        self.count_run(from, b'"')
    }

    fn count_run(&self, from: usize, byte: u8) -> usize {
        self.bytes[from..].iter().take_while(|b| **b == byte).count()
    }

    fn count_dollars_before(&self, pos: usize) -> usize {
        self.bytes[..pos].iter().rev().take_while(|b| **b == b'$').count()
    }

    fn enter(&mut self, state: LexState, at: usize) {
        self.state = state;
        self.opened_at = at;
    }

    fn open_literal(&mut self, literal: Literal) {
        self.literal = literal;
        self.enter(literal.state, literal.opened_at);
    }

    fn close_literal(&mut self) {
        self.state = LexState::Code;
        self.literal = Literal::none();
    }

    fn carry(&mut self, count: usize, state: LexState) {
        self.carry = count;
        self.carry_state = state;
    }

    fn step(&mut self, b: u8, pos: usize) -> LexState {
        let before = self.state;

        if self.escape_next {
            self.escape_next = false;
            return before;
        }

        if self.pending_verbatim_quote {
            self.pending_verbatim_quote = false;
            if b == b'"' {
                return before;
            }
            self.close_literal();
            return self.step(b, pos);
        }

        match self.state {
            LexState::Code => self.step_code(b, pos),
            LexState::InString => {
                match b {
                    b'\\' => self.escape_next = true,
                    b'"' => self.close_literal(),
                    b'{' | b'}' if self.literal.interpolated => self.interpolation_brace(b, pos),
                    _ => {}
                }
                before
            }
            LexState::InChar => {
                match b {
                    b'\\' => self.escape_next = true,
                    b'\'' => self.state = LexState::Code,
                    _ => {}
                }
                before
            }
            LexState::InVerbatimString => {
                let raw = self.literal.raw_quotes;
                if raw > 0 {
                    if b == b'"' && self.count_quotes(pos) >= raw {
                        self.carry(raw - 1, LexState::InVerbatimString);
                        self.close_literal();
                    } else if b == b'{' && self.literal.interpolated {
                        self.raw_interpolation_brace(pos);
                    }
                } else if b == b'"' {
                    self.pending_verbatim_quote = true;
                } else if matches!(b, b'{' | b'}') && self.literal.interpolated {
                    self.interpolation_brace(b, pos);
                }
                before
            }
            LexState::InLineComment => {
                if b == b'\n' {
                    self.state = LexState::Code;
                    return LexState::Code;
                }
                before
            }
            LexState::InBlockComment => {
                if b == b'*' && self.peek(pos + 1) == Some(b'/') {
                    self.carry(1, LexState::InBlockComment);
                    self.state = LexState::Code;
                }
                before
            }
        }
    }

    fn interpolation_brace(&mut self, b: u8, pos: usize) {
        if self.peek(pos + 1) == Some(b) {
            self.carry(1, self.literal.state);
            return;
        }
        if b == b'{' {
            self.holes.push(Hole {
                literal: self.literal,
                braces: 0,
            });
            self.state = LexState::Code;
            self.literal = Literal::none();
        }
    }

    /// A run of `{` inside a raw interpolated literal. Runs shorter than the `$` count are content;
    /// otherwise the last `dollars` braces open a hole.
    fn raw_interpolation_brace(&mut self, pos: usize) {
        let run = self.count_run(pos, b'{');
        self.carry(run - 1, self.literal.state);
        if run >= self.literal.dollars {
            self.holes.push(Hole {
                literal: self.literal,
                braces: 0,
            });
            self.state = LexState::Code;
            self.literal = Literal::none();
        }
    }

    fn step_code(&mut self, b: u8, pos: usize) -> LexState {
        match b {
            b'"' => {
                let quotes = self.count_quotes(pos);
                let (verbatim, interpolated) = self.literal_prefix(pos);
                if quotes >= 3 && !verbatim {
                    let dollars = self.count_dollars_before(pos);
                    self.open_literal(Literal {
                        state: LexState::InVerbatimString,
                        raw_quotes: quotes,
                        interpolated: dollars > 0,
                        dollars,
                        opened_at: pos,
                    });
                    self.carry(quotes - 1, LexState::InVerbatimString);
                } else {
                    let state = if verbatim {
                        LexState::InVerbatimString
                    } else {
                        LexState::InString
                    };
                    self.open_literal(Literal {
                        state,
                        raw_quotes: 0,
                        interpolated,
                        dollars: usize::from(interpolated),
                        opened_at: pos,
                    });
                }
            }
            b'\'' => self.enter(LexState::InChar, pos),
            b'/' if self.peek(pos + 1) == Some(b'/') => {
                self.enter(LexState::InLineComment, pos);
                self.carry(1, LexState::InLineComment);
            }
            b'/' if self.peek(pos + 1) == Some(b'*') => {
                self.enter(LexState::InBlockComment, pos);
                self.carry(1, LexState::InBlockComment);
            }
            b'#' if self.line_start && self.holes.is_empty() => {
                self.enter(LexState::InLineComment, pos);
            }
            b'{' => {
                if let Some(hole) = self.holes.last_mut() {
                    hole.braces += 1;
                }
            }
            b'}' => {
                if let Some(hole) = self.holes.last_mut() {
                    if hole.braces == 0 {
                        let literal = hole.literal;
                        self.holes.pop();
                        self.literal = literal;
                        self.state = literal.state;
                        if literal.raw_quotes > 0 {
                            let run = self.count_run(pos, b'}').min(literal.dollars);
                            self.carry(run.saturating_sub(1), literal.state);
                        }
                        return literal.state;
                    }
                    hole.braces -= 1;
                }
            }
            _ => {}
        }
        LexState::Code
    }

    /// `(verbatim, interpolated)` for a string whose opening quote is at `pos`.
    fn literal_prefix(&self, pos: usize) -> (bool, bool) {
        let prev = |back: usize| pos.checked_sub(back).map(|i| self.bytes[i]);
        match (prev(1), prev(2)) {
            (Some(b'@'), Some(b'$')) | (Some(b'$'), Some(b'@')) => (true, true),
            (Some(b'@'), _) => (true, false),
            (Some(b'$'), _) => (false, true),
            _ => (false, false),
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = (usize, LexState);

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.pos;
        let b = self.peek(pos)?;
        self.pos += 1;

        let state = if self.carry > 0 {
            self.carry -= 1;
            self.carry_state
        } else {
            self.step(b, pos)
        };

        match b {
            b'\n' => self.line_start = true,
            b' ' | b'\t' | b'\r' => {}
            _ => self.line_start = false,
        }

        Some((pos, state))
    }
}

/// Per-byte classification of a whole buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed {
    states: Vec<LexState>,
}

impl Lexed {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state_at(&self, offset: usize) -> LexState {
        self.states.get(offset).copied().unwrap_or(LexState::Code)
    }

    pub fn is_code(&self, offset: usize) -> bool {
        self.state_at(offset).is_code()
    }

    /// Copy of `text[range]` where every non-code byte is blanked to a space.
    ///
    /// Offsets in the result line up with offsets in `text[range]`.
    pub fn code_view(&self, text: &str, range: Range<usize>) -> String {
        let start = range.start;
        let mut out = String::with_capacity(range.len());
        for (i, ch) in text[range].char_indices() {
            if self.is_code(start + i) {
                out.push(ch);
            } else {
                out.extend(std::iter::repeat_n(' ', ch.len_utf8()));
            }
        }
        out
    }
}

/// Classify every byte of `text`.
///
/// Fails when a literal or block comment is still open at end of input, or when a regular string
/// or character literal runs into a newline.
pub fn lex(text: &str) -> Result<Lexed, MalformedInput> {
    let bytes = text.as_bytes();
    let mut scanner = Scanner::new(text);
    let mut states = Vec::with_capacity(bytes.len());

    while let Some((pos, before)) = scanner.next() {
        // A byte that opens a literal or comment belongs to it.
        let state = if before.is_code() { scanner.state } else { before };
        if bytes[pos] == b'\n' && matches!(state, LexState::InString | LexState::InChar) {
            return Err(MalformedInput::Unterminated {
                state,
                line: line_number(bytes, scanner.opened_at()),
            });
        }
        states.push(state);
    }

    if let Some((state, at)) = scanner.unterminated() {
        return Err(MalformedInput::Unterminated {
            state,
            line: line_number(bytes, at),
        });
    }

    Ok(Lexed { states })
}

fn line_number(bytes: &[u8], offset: usize) -> usize {
    bytes[..offset.min(bytes.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}
