//! Classify a member declaration by its `async` marker and return type.

use std::ops::Range;

use asyncfix_types::shape::{ReturnShape, Wrapper};

use crate::brackets::is_ident_byte;

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "virtual", "override", "sealed",
    "new", "extern", "unsafe", "partial", "abstract", "readonly",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub shape: ReturnShape,
    /// Range of the `async` keyword, relative to the classified text.
    pub async_keyword: Option<Range<usize>>,
    pub return_type: Option<String>,
    pub name: Option<String>,
}

impl Signature {
    pub fn has_async_marker(&self) -> bool {
        self.async_keyword.is_some()
    }
}

/// Classify a code-only view of the text between the flagged line and the body.
pub fn classify_signature(code: &str) -> Signature {
    let async_keyword = find_async(code);
    let header_start = async_keyword.as_ref().map_or(0, |r| r.end);
    let header = parameter_list_start(code, header_start).map(|paren| &code[header_start..paren]);

    let (return_type, name) = match header.and_then(split_header) {
        Some((ty, name)) => (Some(ty), Some(name)),
        None => (None, None),
    };
    let shape = return_type
        .as_deref()
        .map_or(ReturnShape::Unknown, shape_of);

    Signature {
        shape,
        async_keyword,
        return_type,
        name,
    }
}

/// First whole-word `async` outside parentheses and brackets.
fn find_async(code: &str) -> Option<Range<usize>> {
    let bytes = code.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth -= 1,
            _ if is_ident_byte(b) => {
                let end = word_end(bytes, i);
                if depth == 0 && &code[i..end] == "async" {
                    return Some(i..end);
                }
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn word_end(bytes: &[u8], from: usize) -> usize {
    from + bytes[from..].iter().take_while(|b| is_ident_byte(**b)).count()
}

/// Offset of the `(` opening the parameter list: the first one outside generic arguments.
fn parameter_list_start(code: &str, from: usize) -> Option<usize> {
    let mut angle = 0i32;
    for (i, b) in code.bytes().enumerate().skip(from) {
        match b {
            b'<' => angle += 1,
            b'>' => angle -= 1,
            b'(' if angle == 0 => return Some(i),
            b'=' | b';' | b'{' if angle == 0 => return None,
            _ => {}
        }
    }
    None
}

/// Split `[modifiers] ReturnType Name[<T>]` into return type and name.
fn split_header(header: &str) -> Option<(String, String)> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut angle = 0i32;

    for ch in header.chars() {
        match ch {
            '<' | '(' => angle += 1,
            '>' | ')' => angle -= 1,
            _ => {}
        }
        if ch.is_whitespace() && angle == 0 {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_whitespace() {
            current.push(' ');
            continue;
        }
        if matches!(ch, '<' | '?' | '[' | '.') && current.is_empty() {
            if let Some(prev) = tokens.pop() {
                current = prev;
            }
        }
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    let tokens: Vec<String> = tokens
        .into_iter()
        .skip_while(|t| MODIFIERS.contains(&t.as_str()))
        .collect();
    let (name, return_type) = tokens.split_last()?;
    if return_type.is_empty() {
        return None;
    }
    Some((collapse_spaces(&return_type.join(" ")), name.clone()))
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Shape implied by a declared return type.
pub fn shape_of(return_type: &str) -> ReturnShape {
    let mut ty = return_type.trim();
    ty = ty.strip_prefix("global::").unwrap_or(ty);
    ty = ty.strip_prefix("System.Threading.Tasks.").unwrap_or(ty);

    for wrapper in [Wrapper::Task, Wrapper::ValueTask] {
        let name = wrapper.type_name();
        if ty == name {
            return ReturnShape::WrappedVoid { wrapper };
        }
        if let Some(args) = ty.strip_prefix(name).and_then(|rest| rest.trim_start().strip_prefix('<')) {
            if let Some(inner) = args.strip_suffix('>') {
                return ReturnShape::WrappedValue {
                    wrapper,
                    inner: inner.trim().to_string(),
                };
            }
        }
    }
    ReturnShape::PlainValue
}
