use crate::error::SourceLocation;
use crate::symbols::{SymbolId, SymbolTable};

/// One lexed token: a shared symbol-table entry plus where it appeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub id: SymbolId,
    pub location: SourceLocation,
    /// Whitespace (or the start of a line) came right before this token.
    pub spaced: bool,
}

impl Token {
    pub fn new(id: SymbolId, line: usize, column: usize, spaced: bool) -> Self {
        Self {
            id,
            location: SourceLocation::new(line, column),
            spaced,
        }
    }

    pub fn line(&self) -> usize {
        self.location.line
    }

    /// Printable spelling, used in error windows.
    pub fn text<'t>(&self, symbols: &'t SymbolTable) -> &'t str {
        match symbols.symbol(self.id).token.as_str() {
            "\n" => "\\n",
            other => other,
        }
    }
}

/// Value of an AWK string literal (quotes included in `token`).
///
/// Unknown escapes keep the escaped character, as gawk does.
pub fn decode_awk_string(token: &str) -> String {
    let inner = match token.chars().next() {
        Some(q @ ('"' | '\'')) if token.len() >= 2 && token.ends_with(q) => &token[1..token.len() - 1],
        Some('"' | '\'') => &token[1..],
        _ => token,
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Render `value` as a double-quoted Python string literal.
pub fn python_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
