//! Structural depth tracking over classified bytes.
//!
//! [`BracketTracker`] is fed one byte at a time together with its [`LexState`]. Only code bytes
//! move the depth counters; literals and comments are skipped. Besides raw depth it remembers the
//! last significant token, which is enough to tell a statement block (`if (…) {`) apart from a
//! nested callable scope (`=> {`, `Local() {`).

use crate::error::MalformedInput;
use crate::lexer::{LexState, Lexed};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BracketDepth {
    pub paren: i32,
    pub brace: i32,
    pub bracket: i32,
}

impl BracketDepth {
    /// A `;` here terminates a statement whose block sits at `baseline` braces.
    pub fn is_statement_level(&self, baseline: i32) -> bool {
        self.brace == baseline && self.paren == 0 && self.bracket == 0
    }

    pub fn is_zero(&self) -> bool {
        self.is_statement_level(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Control-flow or bare block: still the enclosing method's scope.
    Block,
    /// Lambda, anonymous method, local function or initializer.
    Nested,
}

/// Structural event produced by a code byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structural {
    OpenBrace(ScopeKind),
    CloseBrace(ScopeKind),
    Semicolon,
    /// The `>` of `=>`.
    Arrow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    None,
    Word(String),
    Punct(u8),
    Arrow,
    /// A `)` with the word that preceded its `(`.
    CloseParen(Option<String>),
    Literal,
}

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "foreach", "while", "using", "lock", "switch", "catch", "fixed", "when",
];

const BLOCK_KEYWORDS: &[&str] = &[
    "else", "try", "finally", "do", "checked", "unchecked", "unsafe", "catch",
];

pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'@' || b >= 0x80
}

/// An expression-bodied lambda (`x => x + 1`), open until its enclosing delimiter closes or a
/// `,` / `;` ends it at the depth where the arrow appeared.
#[derive(Debug, Clone, Copy)]
struct LambdaExpr {
    depth: BracketDepth,
    /// No token after the arrow yet; a `{` turns it into a braced lambda.
    awaiting_body: bool,
}

#[derive(Debug, Clone)]
pub struct BracketTracker {
    depth: BracketDepth,
    scopes: Vec<ScopeKind>,
    lambdas: Vec<LambdaExpr>,
    paren_words: Vec<Option<String>>,
    word: String,
    last: Token,
    prev_code: u8,
    line: usize,
}

impl Default for BracketTracker {
    fn default() -> Self {
        Self::starting_at_line(1)
    }
}

impl BracketTracker {
    /// Tracker whose first fed byte sits on `line` (1-based).
    pub fn starting_at_line(line: usize) -> Self {
        Self {
            depth: BracketDepth::default(),
            scopes: Vec::new(),
            lambdas: Vec::new(),
            paren_words: Vec::new(),
            word: String::new(),
            last: Token::None,
            prev_code: 0,
            line,
        }
    }

    pub fn depth(&self) -> BracketDepth {
        self.depth
    }

    /// Line of the next byte to be fed.
    pub fn line(&self) -> usize {
        self.line
    }

    /// True inside a lambda, anonymous method, local function or initializer.
    pub fn in_nested_scope(&self) -> bool {
        self.scopes.contains(&ScopeKind::Nested) || !self.lambdas.is_empty()
    }

    /// The last complete identifier, if it is the last significant token.
    pub fn last_word(&self) -> Option<&str> {
        match &self.last {
            Token::Word(w) => Some(w),
            _ => None,
        }
    }

    pub fn feed(&mut self, b: u8, state: LexState) -> Result<Option<Structural>, MalformedInput> {
        let line = self.line;
        if b == b'\n' {
            self.line += 1;
        }

        if !state.is_code() {
            self.flush_word();
            if state.is_literal() {
                self.last = Token::Literal;
            }
            self.prev_code = 0;
            return Ok(None);
        }

        let blank = matches!(b, b' ' | b'\t' | b'\r' | b'\n');
        if !blank && b != b'{' {
            if let Some(lambda) = self.lambdas.last_mut() {
                lambda.awaiting_body = false;
            }
        }

        if is_ident_byte(b) {
            self.word.push(b as char);
            self.prev_code = b;
            return Ok(None);
        }
        self.flush_word();

        let prev = self.prev_code;
        self.prev_code = b;

        let event = match b {
            b' ' | b'\t' | b'\r' | b'\n' => None,
            b'(' => {
                let opener = match &self.last {
                    Token::Word(w) => Some(w.clone()),
                    _ => None,
                };
                self.paren_words.push(opener);
                self.depth.paren += 1;
                self.last = Token::Punct(b);
                None
            }
            b')' => {
                self.depth.paren -= 1;
                self.check(')', self.depth.paren, line)?;
                self.last = Token::CloseParen(self.paren_words.pop().flatten());
                self.end_lambdas_outside();
                None
            }
            b'[' => {
                self.depth.bracket += 1;
                self.last = Token::Punct(b);
                None
            }
            b']' => {
                self.depth.bracket -= 1;
                self.check(']', self.depth.bracket, line)?;
                self.last = Token::Punct(b);
                self.end_lambdas_outside();
                None
            }
            b'{' => {
                if self.lambdas.last().is_some_and(|l| l.awaiting_body) {
                    self.lambdas.pop();
                }
                let kind = self.classify_brace();
                self.scopes.push(kind);
                self.depth.brace += 1;
                self.last = Token::Punct(b);
                Some(Structural::OpenBrace(kind))
            }
            b'}' => {
                self.depth.brace -= 1;
                self.check('}', self.depth.brace, line)?;
                let kind = self.scopes.pop().unwrap_or(ScopeKind::Block);
                self.last = Token::Punct(b);
                self.end_lambdas_outside();
                Some(Structural::CloseBrace(kind))
            }
            b';' => {
                self.last = Token::Punct(b);
                self.end_lambdas_at_depth();
                Some(Structural::Semicolon)
            }
            b',' => {
                self.last = Token::Punct(b);
                self.end_lambdas_at_depth();
                None
            }
            b'>' if prev == b'=' => {
                self.last = Token::Arrow;
                self.lambdas.push(LambdaExpr {
                    depth: self.depth,
                    awaiting_body: true,
                });
                Some(Structural::Arrow)
            }
            other => {
                self.last = Token::Punct(other);
                None
            }
        };
        Ok(event)
    }

    fn end_lambdas_outside(&mut self) {
        let depth = self.depth;
        while self.lambdas.last().is_some_and(|l| {
            l.depth.paren > depth.paren || l.depth.bracket > depth.bracket || l.depth.brace > depth.brace
        }) {
            self.lambdas.pop();
        }
    }

    fn end_lambdas_at_depth(&mut self) {
        let depth = self.depth;
        while self.lambdas.last().is_some_and(|l| l.depth == depth) {
            self.lambdas.pop();
        }
    }

    fn flush_word(&mut self) {
        if !self.word.is_empty() {
            self.last = Token::Word(std::mem::take(&mut self.word));
        }
    }

    fn check(&self, delimiter: char, value: i32, line: usize) -> Result<(), MalformedInput> {
        if value < 0 {
            return Err(MalformedInput::NegativeDepth { delimiter, line });
        }
        Ok(())
    }

    fn classify_brace(&self) -> ScopeKind {
        match &self.last {
            Token::None => ScopeKind::Block,
            Token::Word(w) if BLOCK_KEYWORDS.contains(&w.as_str()) => ScopeKind::Block,
            Token::Punct(b'{' | b'}' | b';' | b':') => ScopeKind::Block,
            Token::CloseParen(Some(w)) if CONTROL_KEYWORDS.contains(&w.as_str()) => {
                ScopeKind::Block
            }
            _ => ScopeKind::Nested,
        }
    }
}

/// Walk the whole file once and fail on the first delimiter that closes more than it opened.
pub fn check_balance(text: &str, lexed: &Lexed) -> Result<(), MalformedInput> {
    let mut tracker = BracketTracker::default();
    for (pos, b) in text.bytes().enumerate() {
        tracker.feed(b, lexed.state_at(pos))?;
    }
    Ok(())
}
