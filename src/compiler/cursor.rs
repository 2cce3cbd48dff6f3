use crate::lexer::Token;
use crate::symbols::{SymbolKind, SymbolTable};

/// Tokens either side of the offender in a syntax error window.
const WINDOW: usize = 4;

/// Read position over an immutable token buffer.
///
/// `advance` hides comments (collecting them for the emitter) and runs of
/// newlines, so the parser only ever sees one newline between statements.
#[derive(Debug)]
pub struct Cursor {
    tokens: Vec<Token>,
    comment: Vec<bool>,
    newline: Vec<bool>,
    pos: usize,
    prior: Option<Token>,
    pending: Vec<Token>,
}

impl Cursor {
    /// The buffer should end with the lexer's end-of-input padding. An empty
    /// buffer gets one end-of-input token, so the cursor is never empty.
    pub fn new(mut tokens: Vec<Token>, symbols: &SymbolTable) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(symbols.end_of_input(), 1, 0, true));
        }
        let comment = tokens
            .iter()
            .map(|t| matches!(symbols.symbol(t.id).kind, SymbolKind::Comment { .. }))
            .collect();
        let newline = tokens.iter().map(|t| t.id == symbols.newline()).collect();
        let mut cursor = Self {
            tokens,
            comment,
            newline,
            pos: 0,
            prior: None,
            pending: Vec::new(),
        };
        cursor.settle();
        cursor
    }

    pub fn current(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len().saturating_sub(1))]
    }

    pub fn prior(&self) -> Option<Token> {
        self.prior
    }

    /// The `n`th visible token after the current one. Past the end this keeps
    /// returning the last sentinel.
    pub fn peek(&self, n: usize) -> Token {
        let mut seen = 0;
        let mut i = self.pos;
        while i + 1 < self.tokens.len() {
            i += 1;
            if self.comment[i] {
                continue;
            }
            seen += 1;
            if seen == n {
                break;
            }
        }
        self.tokens[i]
    }

    pub fn advance(&mut self) {
        self.prior = Some(self.current());
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        self.settle();
    }

    /// Comments passed over since the last call.
    pub fn take_comments(&mut self) -> Vec<Token> {
        std::mem::take(&mut self.pending)
    }

    /// Tokens around the current one, for error reports.
    pub fn window(&self) -> (Vec<Token>, Vec<Token>) {
        let visible = |i: &usize| !self.comment[*i];
        let start = self.pos.saturating_sub(WINDOW * 2);
        let before: Vec<Token> = (start..self.pos)
            .filter(visible)
            .map(|i| self.tokens[i])
            .collect();
        let before = before[before.len().saturating_sub(WINDOW)..].to_vec();
        let after = (self.pos + 1..self.tokens.len())
            .filter(visible)
            .take(WINDOW)
            .map(|i| self.tokens[i])
            .collect();
        (before, after)
    }

    fn settle(&mut self) {
        while self.pos + 1 < self.tokens.len() && self.comment[self.pos] {
            self.pending.push(self.tokens[self.pos]);
            self.pos += 1;
        }
        if self.newline[self.pos] {
            self.skip_repeated_newlines();
        }
    }

    fn skip_repeated_newlines(&mut self) {
        loop {
            let mut next = self.pos + 1;
            while next < self.tokens.len() && self.comment[next] {
                next += 1;
            }
            if next >= self.tokens.len() || !self.newline[next] || !self.newline[self.pos] {
                return;
            }
            for i in self.pos + 1..next {
                self.pending.push(self.tokens[i]);
            }
            self.pos = next;
        }
    }
}
