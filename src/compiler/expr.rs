//! Expression compilation by precedence climbing.
//!
//! Each routine consumes tokens and returns a [`Fragment`] of Python text.
//! Precedences are AWK's (lower binds tighter); an operand is parenthesized
//! when its own outermost operator binds no tighter than the one applied
//! to it.

use super::Compiler;
use crate::error::Result;
use crate::lexer::Token;
use crate::symbols::{
    ASSIGNMENT_PRECEDENCE, BinaryOp, Bracket, CONCAT_PRECEDENCE, Keyword, SymbolId, SymbolKind,
    UnaryOp,
};

const FIELD_PRECEDENCE: u8 = 2;
const UNARY_PRECEDENCE: u8 = 5;
const ADDITIVE_PRECEDENCE: u8 = 7;
const TERNARY_PRECEDENCE: u8 = 19;

/// Limit that admits every operator, assignments included.
pub(crate) const ANY: u8 = ASSIGNMENT_PRECEDENCE + 1;

/// Something an assignment or increment can target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LValue {
    Variable(SymbolId),
    Element { base: String, index: String },
    Field { index: String },
}

/// Compiled Python text for one (sub)expression.
#[derive(Debug, Clone, Default)]
pub(crate) struct Fragment {
    pub text: String,
    /// AWK precedence of the outermost operator; `None` for atoms.
    pub precedence: Option<u8>,
    /// Contains an assignment.
    pub assigns: bool,
    /// Python evaluates it to a `str`.
    pub is_string: bool,
    pub lvalue: Option<LValue>,
    /// A lone string or regex literal.
    pub literal: Option<SymbolId>,
    /// Its work was already emitted as statements ahead of the current line.
    pub hoisted: bool,
}

impl Fragment {
    pub fn atom(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self {
            is_string: true,
            ..Self::atom(text)
        }
    }

    fn operator(text: String, precedence: u8) -> Self {
        Self {
            text,
            precedence: Some(precedence),
            ..Self::default()
        }
    }

    /// Text usable as an operand of an operator at `precedence`.
    pub fn wrapped(&self, precedence: u8) -> String {
        match self.precedence {
            Some(p) if p >= precedence => format!("({})", self.text),
            _ => self.text.clone(),
        }
    }

    /// Text evaluating to a Python `str`.
    pub fn stringified(&self) -> String {
        if self.is_string {
            self.text.clone()
        } else {
            format!("str({})", self.text)
        }
    }

    /// The fragment as the content of a parenthesized group.
    pub fn grouped(self) -> Self {
        let text = match self.precedence {
            Some(_) => format!("({})", self.text),
            None => self.text,
        };
        Self {
            text,
            precedence: None,
            lvalue: None,
            ..self
        }
    }
}

/// How the surrounding construct constrains an expression.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ExprContext {
    /// Inside `print`: `>`, `>>` and `|` redirect instead of operating.
    pub print: bool,
    /// Array reads must not create the element.
    pub missing_index: bool,
    /// A function argument; a bare name may still turn out to be an array.
    pub argument: bool,
    /// The expression is a whole statement.
    pub statement: bool,
}

impl ExprContext {
    pub fn argument() -> Self {
        Self {
            argument: true,
            ..Self::default()
        }
    }
}

impl Compiler {
    pub(crate) fn expression(&mut self, ctx: ExprContext) -> Result<Fragment> {
        let fragment = self.binary(ctx, ANY)?;
        if !ctx.argument {
            self.use_as_scalar(&fragment)?;
        }
        Ok(fragment)
    }

    /// A pattern or loop condition; assignments are rejected.
    pub(crate) fn condition(&mut self) -> Result<Fragment> {
        let fragment = self.expression(ExprContext::default())?;
        if fragment.assigns {
            return Err(self.syntax_error("a condition, not an assignment"));
        }
        Ok(fragment)
    }

    pub(crate) fn use_as_scalar(&mut self, fragment: &Fragment) -> Result<()> {
        if let Some(LValue::Variable(id)) = fragment.lvalue {
            let line = self.line();
            self.symbols.mark_scalar(id, line)?;
        }
        Ok(())
    }

    /// Operators binding tighter than `limit`, starting with a fresh operand.
    pub(crate) fn binary(&mut self, ctx: ExprContext, limit: u8) -> Result<Fragment> {
        let lhs = self.unary(ctx)?;
        self.continue_binary(lhs, ctx, limit)
    }

    /// Operators binding tighter than `limit` applied to an operand already
    /// compiled.
    pub(crate) fn continue_binary(
        &mut self,
        mut lhs: Fragment,
        ctx: ExprContext,
        limit: u8,
    ) -> Result<Fragment> {
        loop {
            let token = self.cursor.current();
            let symbol = self.symbols.symbol(token.id);
            let op = match &symbol.kind {
                SymbolKind::Ambiguous { binary, .. } => *binary,
                SymbolKind::Binary(_) => token.id,
                SymbolKind::Number if symbol.token.starts_with('-') => {
                    // `a -1` lexes as a negative literal but means `a - 1`
                    if ADDITIVE_PRECEDENCE >= limit {
                        return Ok(lhs);
                    }
                    lhs = self.split_negative_number(lhs, ctx)?;
                    continue;
                }
                _ if symbol.starts_operand() => {
                    if CONCAT_PRECEDENCE >= limit {
                        return Ok(lhs);
                    }
                    lhs = self.concatenate(lhs, ctx)?;
                    continue;
                }
                _ => return Ok(lhs),
            };
            let operator = self.symbols.symbol(op).clone();
            let precedence = operator.source_precedence;
            if precedence >= limit {
                return Ok(lhs);
            }
            let SymbolKind::Binary(kind) = operator.kind else {
                return Ok(lhs);
            };
            lhs = match kind {
                BinaryOp::Arithmetic | BinaryOp::Comparison => {
                    if ctx.print && operator.token == ">" {
                        return Ok(lhs);
                    }
                    self.advance();
                    let right = if precedence == 4 { precedence + 1 } else { precedence };
                    let rhs = self.binary(ctx, right)?;
                    self.use_as_scalar(&lhs)?;
                    self.use_as_scalar(&rhs)?;
                    // Python chains comparisons, AWK does not
                    let left = if kind == BinaryOp::Comparison {
                        lhs.wrapped(precedence)
                    } else {
                        lhs.wrapped(precedence + 1)
                    };
                    Fragment {
                        assigns: lhs.assigns || rhs.assigns,
                        ..Fragment::operator(
                            format!("{}{}{}", left, operator.emit, rhs.wrapped(precedence)),
                            precedence,
                        )
                    }
                }
                BinaryOp::And | BinaryOp::Or => {
                    self.advance();
                    self.skip_newlines();
                    let mark = self.out.mark();
                    let rhs = self.binary(ctx, precedence)?;
                    self.use_as_scalar(&lhs)?;
                    self.use_as_scalar(&rhs)?;
                    let hoisted = self.out.take_since(mark);
                    if !hoisted.is_empty() {
                        self.guarded(&lhs, kind == BinaryOp::And, hoisted, &rhs)
                    } else {
                        Fragment {
                            assigns: lhs.assigns || rhs.assigns,
                            ..Fragment::operator(
                                format!(
                                    "{}{}{}",
                                    lhs.wrapped(precedence + 1),
                                    operator.emit,
                                    rhs.wrapped(precedence)
                                ),
                                precedence,
                            )
                        }
                    }
                }
                BinaryOp::Match | BinaryOp::NotMatch => {
                    self.advance();
                    let regex = self.regex_operand(ctx, precedence)?;
                    self.use_as_scalar(&lhs)?;
                    let search = format!("{}.search({})", regex, lhs.stringified());
                    let text = if kind == BinaryOp::NotMatch {
                        format!("(not {})", search)
                    } else {
                        search
                    };
                    Fragment {
                        assigns: lhs.assigns,
                        ..Fragment::atom(text)
                    }
                }
                BinaryOp::In => {
                    self.advance();
                    let array = self.cursor.current();
                    if !matches!(self.symbol().kind, SymbolKind::Variable(_)) {
                        return Err(self.syntax_error("an array name"));
                    }
                    self.symbols.mark_array(array.id, array.line())?;
                    let emit = self.symbols.symbol(array.id).emit.clone();
                    self.advance();
                    self.use_as_scalar(&lhs)?;
                    Fragment {
                        assigns: lhs.assigns,
                        ..Fragment::operator(
                            format!("{} in {}", lhs.wrapped(precedence), emit),
                            precedence,
                        )
                    }
                }
                BinaryOp::Pipe => {
                    if ctx.print {
                        return Ok(lhs);
                    }
                    self.advance();
                    if !self.symbol().is_keyword(Keyword::Getline) {
                        return Err(self.syntax_error("\"getline\""));
                    }
                    self.use_as_scalar(&lhs)?;
                    self.getline(Some(&lhs.text))?
                }
                BinaryOp::Append => {
                    if ctx.print {
                        return Ok(lhs);
                    }
                    return Err(self.syntax_error("an operator"));
                }
                BinaryOp::Question => {
                    self.advance();
                    self.skip_newlines();
                    let then_mark = self.out.mark();
                    let then = self.binary(ctx, ANY)?;
                    self.skip_newlines();
                    if !self.symbol().is_binary(BinaryOp::Colon) {
                        return Err(self.syntax_error("\":\""));
                    }
                    self.advance();
                    self.skip_newlines();
                    let otherwise_mark = self.out.mark();
                    let otherwise = self.binary(ctx, ASSIGNMENT_PRECEDENCE)?;
                    self.use_as_scalar(&lhs)?;
                    self.use_as_scalar(&then)?;
                    self.use_as_scalar(&otherwise)?;
                    let otherwise_lines = self.out.take_since(otherwise_mark);
                    let then_lines = self.out.take_since(then_mark);
                    if !then_lines.is_empty() || !otherwise_lines.is_empty() {
                        self.choice(&lhs, (then_lines, &then), (otherwise_lines, &otherwise))
                    } else {
                        Fragment {
                            assigns: lhs.assigns || then.assigns || otherwise.assigns,
                            is_string: then.is_string && otherwise.is_string,
                            ..Fragment::atom(format!(
                                "({} if {} else {})",
                                then.wrapped(TERNARY_PRECEDENCE),
                                lhs.wrapped(TERNARY_PRECEDENCE),
                                otherwise.wrapped(TERNARY_PRECEDENCE)
                            ))
                        }
                    }
                }
                BinaryOp::Colon => return Ok(lhs),
                BinaryOp::Assign => self.assignment(lhs, &operator.emit, ctx)?,
            };
        }
    }

    fn assignment(&mut self, lhs: Fragment, op: &str, ctx: ExprContext) -> Result<Fragment> {
        let Some(target) = lhs.lvalue.clone() else {
            return Err(self.syntax_error("an assignable left-hand side"));
        };
        self.advance();
        self.skip_newlines();
        let rhs = self.binary(ctx, ANY)?;
        self.use_as_scalar(&rhs)?;
        let text = match target {
            LValue::Variable(id) => {
                let line = self.line();
                self.symbols.mark_scalar(id, line)?;
                format!("{}{}{}", lhs.text, op, rhs.text)
            }
            LValue::Element { base, index } => format!("{}[{}]{}{}", base, index, op, rhs.text),
            LValue::Field { index } if op == "=" => {
                if index == "0" {
                    format!("self._set_dollar_fields({})", rhs.text)
                } else {
                    format!("self._set_dollar_field({}, {})", index, rhs.text)
                }
            }
            LValue::Field { index } => {
                let operator = op.trim_end_matches('=');
                let value = |v: &str| format!("{}{}{}", v, operator, rhs.wrapped(0));
                let field = self.field_update(index, value, false);
                return Ok(Fragment {
                    assigns: true,
                    ..field
                });
            }
        };
        Ok(Fragment {
            assigns: true,
            ..Fragment::operator(text, ASSIGNMENT_PRECEDENCE)
        })
    }

    /// Field writes other than plain `=` are emitted ahead of the current
    /// line through the runtime setter, so `$0` is rebuilt. The fragment
    /// names a temp holding the new value, or the old one when `old` is set.
    fn field_update(
        &mut self,
        index: String,
        update: impl Fn(&str) -> String,
        old: bool,
    ) -> Fragment {
        let n = self.next_temp();
        let index = if index.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
            index
        } else {
            let temp = format!("field_index_{}", n);
            self.emit(format!("{} = {}", temp, index));
            temp
        };
        let temp = format!("field_{}", n);
        let current = format!("self._FLDS[{}]", index);
        let (value, stored) = if old {
            (current, update(&temp))
        } else {
            (update(&current), temp.clone())
        };
        self.emit(format!("{} = {}", temp, value));
        if index == "0" {
            self.emit(format!("self._set_dollar_fields({})", stored));
        } else {
            self.emit(format!("self._set_dollar_field({}, {})", index, stored));
        }
        Fragment {
            hoisted: true,
            ..Fragment::atom(temp)
        }
    }

    /// `lhs && rhs` or `lhs || rhs` whose right side hoisted statements: they
    /// run only when the left side does not decide the result.
    fn guarded(
        &mut self,
        lhs: &Fragment,
        and: bool,
        hoisted: Vec<String>,
        rhs: &Fragment,
    ) -> Fragment {
        let temp = format!("cond_{}", self.next_temp());
        self.emit(format!("{}={}", temp, lhs.text));
        self.emit(format!("if {}{}:", if and { "" } else { "not " }, temp));
        self.out.append_lines(hoisted, 1);
        self.out.indent();
        self.emit(format!("{}={}", temp, rhs.text));
        self.out.dedent();
        Fragment {
            assigns: lhs.assigns || rhs.assigns,
            hoisted: true,
            ..Fragment::atom(temp)
        }
    }

    /// `test ? then : otherwise` where a branch hoisted statements: each
    /// branch's statements run only when it is chosen.
    fn choice(
        &mut self,
        test: &Fragment,
        (then_lines, then): (Vec<String>, &Fragment),
        (otherwise_lines, otherwise): (Vec<String>, &Fragment),
    ) -> Fragment {
        let temp = format!("choice_{}", self.next_temp());
        self.emit(format!("if {}:", test.text));
        self.out.append_lines(then_lines, 1);
        self.out.indent();
        self.emit(format!("{}={}", temp, then.text));
        self.out.dedent();
        self.emit("else:");
        self.out.append_lines(otherwise_lines, 1);
        self.out.indent();
        self.emit(format!("{}={}", temp, otherwise.text));
        self.out.dedent();
        Fragment {
            assigns: test.assigns || then.assigns || otherwise.assigns,
            is_string: then.is_string && otherwise.is_string,
            hoisted: true,
            ..Fragment::atom(temp)
        }
    }

    fn split_negative_number(&mut self, lhs: Fragment, ctx: ExprContext) -> Result<Fragment> {
        let digits = self.symbol().emit.trim_start_matches('-').to_string();
        self.advance();
        let rhs = self.continue_binary(Fragment::atom(digits), ctx, ADDITIVE_PRECEDENCE)?;
        self.use_as_scalar(&lhs)?;
        Ok(Fragment::operator(
            format!(
                "{}-{}",
                lhs.wrapped(ADDITIVE_PRECEDENCE),
                rhs.wrapped(ADDITIVE_PRECEDENCE)
            ),
            ADDITIVE_PRECEDENCE,
        ))
    }

    fn concatenate(&mut self, lhs: Fragment, ctx: ExprContext) -> Result<Fragment> {
        let rhs = self.binary(ctx, CONCAT_PRECEDENCE)?;
        self.use_as_scalar(&lhs)?;
        self.use_as_scalar(&rhs)?;
        Ok(Fragment {
            assigns: lhs.assigns || rhs.assigns,
            ..Fragment::string(format!("({}+{})", lhs.stringified(), rhs.stringified()))
        })
    }

    /// Right side of `~`, or a regex argument of a builtin. Returns Python
    /// text naming a compiled pattern.
    pub(crate) fn regex_operand(&mut self, ctx: ExprContext, limit: u8) -> Result<String> {
        let token = self.cursor.current();
        if self.symbol().kind == SymbolKind::Regex {
            self.advance();
            return Ok(self.symbols.symbol(token.id).emit.clone());
        }
        let operand = self.binary(ExprContext { statement: false, ..ctx }, limit)?;
        self.use_as_scalar(&operand)?;
        match operand.literal {
            Some(id) if self.symbols.symbol(id).kind == SymbolKind::String => {
                let regex = self.symbols.regex_for_string(id);
                Ok(self.symbols.symbol(regex).emit.clone())
            }
            _ => Ok(format!("self._dynamic_regex({})", operand.text)),
        }
    }

    fn unary(&mut self, ctx: ExprContext) -> Result<Fragment> {
        let symbol = self.symbol();
        match symbol.kind.clone() {
            SymbolKind::Ambiguous { unary, .. } => {
                let emit = self.symbols.symbol(unary).emit.clone();
                self.advance();
                let operand = self.binary(ctx, UNARY_PRECEDENCE)?;
                self.use_as_scalar(&operand)?;
                Ok(Fragment::operator(
                    format!("{}{}", emit, operand.wrapped(UNARY_PRECEDENCE)),
                    UNARY_PRECEDENCE,
                ))
            }
            SymbolKind::Unary(UnaryOp::Not) => {
                let grouping = symbol.needs_grouping();
                let emit = symbol.emit.clone();
                self.advance();
                let operand = self.binary(ctx, UNARY_PRECEDENCE)?;
                self.use_as_scalar(&operand)?;
                let text = format!("{} {}", emit, operand.wrapped(UNARY_PRECEDENCE));
                Ok(if grouping {
                    Fragment::atom(format!("({})", text))
                } else {
                    Fragment::operator(text, UNARY_PRECEDENCE)
                })
            }
            SymbolKind::Unary(op @ (UnaryOp::Increment | UnaryOp::Decrement)) => {
                self.advance();
                let operand = self.primary(ctx)?;
                self.increment(operand, op, true)
            }
            SymbolKind::Unary(UnaryOp::Minus | UnaryOp::Plus) => {
                let emit = symbol.emit.clone();
                self.advance();
                let operand = self.binary(ctx, UNARY_PRECEDENCE)?;
                self.use_as_scalar(&operand)?;
                Ok(Fragment::operator(
                    format!("{}{}", emit, operand.wrapped(UNARY_PRECEDENCE)),
                    UNARY_PRECEDENCE,
                ))
            }
            _ => {
                let operand = self.primary(ctx)?;
                self.postfix(operand)
            }
        }
    }

    fn postfix(&mut self, operand: Fragment) -> Result<Fragment> {
        if operand.lvalue.is_none() {
            return Ok(operand);
        }
        match self.symbol().kind {
            SymbolKind::Unary(op @ (UnaryOp::Increment | UnaryOp::Decrement)) => {
                self.advance();
                self.increment(operand, op, false)
            }
            _ => Ok(operand),
        }
    }

    fn increment(&mut self, operand: Fragment, op: UnaryOp, prefix: bool) -> Result<Fragment> {
        let helper = match (op, prefix) {
            (UnaryOp::Increment, true) => "pre_inc",
            (UnaryOp::Increment, false) => "post_inc",
            (_, true) => "pre_dec",
            (_, false) => "post_dec",
        };
        let text = match operand.lvalue {
            Some(LValue::Variable(id)) => {
                let line = self.line();
                self.symbols.mark_scalar(id, line)?;
                let emit = &self.symbols.symbol(id).emit;
                let (owner, name) = emit.split_once('.').unwrap_or(("self", emit.as_str()));
                format!("{}._{}_var('{}')", owner, helper, name)
            }
            Some(LValue::Element { base, index }) => {
                let owner = base.split_once('.').map_or("self", |(owner, _)| owner);
                format!("{}._{}_arr({}, {})", owner, helper, base, index)
            }
            Some(LValue::Field { index }) => {
                let step = if op == UnaryOp::Increment { "+1" } else { "-1" };
                return Ok(self.field_update(index, |v| format!("{}{}", v, step), !prefix));
            }
            None => return Err(self.syntax_error("a variable, array element or field")),
        };
        Ok(Fragment::atom(text))
    }

    pub(crate) fn primary(&mut self, ctx: ExprContext) -> Result<Fragment> {
        let token = self.cursor.current();
        let symbol = self.symbols.symbol(token.id);
        let emit = symbol.emit.clone();
        match symbol.kind.clone() {
            SymbolKind::Number => {
                self.advance();
                Ok(Fragment::atom(emit))
            }
            SymbolKind::String => {
                self.advance();
                Ok(Fragment {
                    literal: Some(token.id),
                    ..Fragment::string(emit)
                })
            }
            SymbolKind::Regex => {
                self.advance();
                Ok(Fragment {
                    literal: Some(token.id),
                    ..Fragment::atom(format!("{}.search(str(self._FLDS[0]))", emit))
                })
            }
            SymbolKind::FieldRef(Some(n)) => {
                self.advance();
                Ok(Fragment {
                    lvalue: Some(LValue::Field {
                        index: n.to_string(),
                    }),
                    ..Fragment::string(emit)
                })
            }
            SymbolKind::FieldRef(None) => self.dynamic_field(ctx),
            SymbolKind::Bracket(Bracket::OpenParen) => self.group(ctx),
            SymbolKind::Variable(_) => self.variable_operand(token, ctx),
            SymbolKind::Function(function) => self.call(token, function, ctx),
            SymbolKind::Statement(Keyword::Getline) => self.getline(None),
            _ => Err(self.syntax_error("an operand")),
        }
    }

    /// `$expr`. Only the operator's own precedence level is consumed, so
    /// `$i++` increments the field and `$NF-1` subtracts from it.
    fn dynamic_field(&mut self, ctx: ExprContext) -> Result<Fragment> {
        self.advance();
        let index = match self.symbol().kind {
            SymbolKind::Unary(_) | SymbolKind::Ambiguous { .. } => self.unary(ctx)?,
            SymbolKind::FieldRef(_) => self.binary(ctx, FIELD_PRECEDENCE + 1)?,
            _ => self.primary(ctx)?,
        };
        self.use_as_scalar(&index)?;
        let index = if index.text.parse::<usize>().is_ok() {
            index.text
        } else {
            format!("int({})", index.text)
        };
        Ok(Fragment {
            lvalue: Some(LValue::Field {
                index: index.clone(),
            }),
            ..Fragment::string(format!("self._FLDS[{}]", index))
        })
    }

    /// `( expr )`, or a parenthesized list as used by `(i, j) in arr`.
    fn group(&mut self, ctx: ExprContext) -> Result<Fragment> {
        self.advance();
        let inner = ExprContext {
            missing_index: ctx.missing_index,
            ..ExprContext::default()
        };
        self.skip_newlines();
        let mut items = vec![self.expression(inner)?];
        while self.symbol().kind == SymbolKind::Comma {
            self.advance();
            self.skip_newlines();
            items.push(self.expression(inner)?);
        }
        self.skip_newlines();
        self.expect_bracket(Bracket::CloseParen, "\")\"")?;
        if items.len() == 1 {
            let item = items.remove(0);
            return Ok(item.grouped());
        }
        let texts: Vec<String> = items.iter().map(|f| f.text.clone()).collect();
        Ok(Fragment::atom(format!("({})", texts.join(", "))))
    }

    fn variable_operand(&mut self, token: Token, ctx: ExprContext) -> Result<Fragment> {
        let next = self.cursor.peek(1);
        let next_symbol = self.symbols.symbol(next.id);
        if next_symbol.is_bracket(Bracket::OpenParen) && !next.spaced {
            return self.user_call(token);
        }
        let emit = self.symbols.symbol(token.id).emit.clone();
        if next_symbol.is_bracket(Bracket::OpenBracket) {
            self.symbols.mark_array(token.id, token.line())?;
            self.advance();
            self.advance();
            let index = self.subscript()?;
            let text = if ctx.missing_index {
                format!("{}.get({}, \"\")", emit, index)
            } else {
                format!("{}[{}]", emit, index)
            };
            return Ok(Fragment {
                lvalue: Some(LValue::Element { base: emit, index }),
                ..Fragment::atom(text)
            });
        }
        self.advance();
        Ok(Fragment {
            lvalue: Some(LValue::Variable(token.id)),
            ..Fragment::atom(emit)
        })
    }

    /// Array subscript after `[`, through the closing `]`. Multiple
    /// subscripts form a tuple key.
    fn subscript(&mut self) -> Result<String> {
        let ctx = ExprContext::default();
        let mut parts = vec![self.expression(ctx)?.text];
        while self.symbol().kind == SymbolKind::Comma {
            self.advance();
            self.skip_newlines();
            parts.push(self.expression(ctx)?.text);
        }
        self.expect_bracket(Bracket::CloseBracket, "\"]\"")?;
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            format!("({})", parts.join(", "))
        })
    }

    /// Call of a function defined in the program, possibly further down.
    pub(crate) fn user_call(&mut self, token: Token) -> Result<Fragment> {
        let symbol = self.symbols.symbol(token.id);
        let emit = symbol.emit.clone();
        if matches!(symbol.kind, SymbolKind::Variable(_)) {
            self.calls.push((token.id, token.line()));
        }
        self.advance();
        let args = self.arguments(ExprContext::argument())?;
        let texts: Vec<String> = args.into_iter().map(|f| f.text).collect();
        Ok(Fragment::atom(format!("{}({})", emit, texts.join(", "))))
    }

    /// `( arg, ... )` including the parentheses.
    pub(crate) fn arguments(&mut self, ctx: ExprContext) -> Result<Vec<Fragment>> {
        self.expect_bracket(Bracket::OpenParen, "\"(\"")?;
        self.skip_newlines();
        let mut args = Vec::new();
        if self.at_bracket(Bracket::CloseParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expression(ctx)?);
            self.skip_newlines();
            if self.symbol().kind == SymbolKind::Comma {
                self.advance();
                self.skip_newlines();
            } else if self.at_bracket(Bracket::CloseParen) {
                self.advance();
                return Ok(args);
            } else {
                return Err(self.syntax_error("\",\" or \")\""));
            }
        }
    }

    /// `getline [target] [< file]`, or `cmd | getline [target]` when
    /// `command` is given. The cursor is on `getline`.
    pub(crate) fn getline(&mut self, command: Option<&str>) -> Result<Fragment> {
        self.has_mainloop = true;
        self.advance();
        let target = match self.symbol().kind {
            SymbolKind::Variable(_) | SymbolKind::FieldRef(_) => {
                self.primary(ExprContext::default())?.lvalue
            }
            _ => None,
        };
        let source = match command {
            Some(command) => format!("self._access_file({}, \"|r\")", command),
            None if self.symbol().token == "<" => {
                self.advance();
                let file = self.primary(ExprContext::default())?;
                self.use_as_scalar(&file)?;
                format!("self._access_file({}, \"r\")", file.text)
            }
            None => "self._std_in_out".to_string(),
        };
        let text = match target {
            None => format!("{}.get_into_dollar_fields()", source),
            Some(LValue::Field { index }) if index == "0" => {
                format!("{}.get_into_dollar_fields()", source)
            }
            Some(LValue::Field { index }) => {
                format!("{}.get_into_dollar_field({})", source, index)
            }
            Some(LValue::Variable(id)) => {
                let line = self.line();
                self.symbols.mark_scalar(id, line)?;
                let emit = &self.symbols.symbol(id).emit;
                let (owner, name) = emit.split_once('.').unwrap_or(("self", emit.as_str()));
                format!("{}.get_into_variable({}, \"{}\")", source, owner, name)
            }
            Some(LValue::Element { base, index }) => {
                format!("{}.get_into_array({}, {})", source, base, index)
            }
        };
        Ok(Fragment::atom(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Source;
    use crate::error::Error;
    use crate::symbols::Section;

    /// Body lines of one section after compiling `source`.
    fn section(source: &str, section: Section) -> Vec<String> {
        let mut compiler = Compiler::new().unwrap();
        compiler.add_source(Source::Inline(source)).unwrap();
        compiler.out.section(section).to_vec()
    }

    fn begin(source: &str) -> Vec<String> {
        section(&format!("BEGIN {{ {} }}", source), Section::Begin)
    }

    fn begin_line(source: &str) -> String {
        begin(source).join("\n")
    }

    fn error(source: &str) -> Error {
        let mut compiler = Compiler::new().unwrap();
        match compiler.add_source(Source::Inline(source)) {
            Err(e) => e,
            Ok(()) => compiler.finish().unwrap_err(),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(begin_line("x = 1 + 2 * 3"), "self.x=1+2*3");
        assert_eq!(begin_line("x = (1 + 2) * 3"), "self.x=(1+2)*3");
        assert_eq!(begin_line("x = 2 ^ 3 ^ 2"), "self.x=2**(3**2)");
        assert_eq!(begin_line("x = 10 - 4 - 3"), "self.x=10-4-3");
    }

    #[test]
    fn test_comparison_operands_are_grouped() {
        assert_eq!(begin_line("x = a < b == c"), "self.x=(self.a<self.b)==self.c");
    }

    #[test]
    fn test_negative_literal_after_operand_subtracts() {
        assert_eq!(begin_line("x = a -1"), "self.x=self.a-1");
        assert_eq!(begin_line("x = a - -1"), "self.x=self.a--1");
        assert_eq!(begin_line("x = a -1 * 2"), "self.x=self.a-1*2");
        assert_eq!(begin_line("x = -1"), "self.x=-1");
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(begin_line("x = \"a\" \"b\""), "self.x=(\"a\"+\"b\")");
        assert_eq!(begin_line("x = a 1"), "self.x=(str(self.a)+str(1))");
        assert_eq!(begin_line("x = $1 \"-\" $2"), "self.x=((self._FLDS[1]+\"-\")+self._FLDS[2])");
        assert_eq!(begin_line("x = a 1 + 2"), "self.x=(str(self.a)+str(1+2))");
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(begin_line("x = a && b || c"), "self.x=self.a and self.b or self.c");
        assert_eq!(begin_line("x = a && (b || c)"), "self.x=self.a and (self.b or self.c)");
        assert_eq!(begin_line("x = !a"), "self.x=(not self.a)");
        assert_eq!(begin_line("x = !(a == b)"), "self.x=(not (self.a==self.b))");
    }

    #[test]
    fn test_ternary() {
        assert_eq!(begin_line("x = a ? b : c"), "self.x=(self.b if self.a else self.c)");
        assert_eq!(
            begin_line("x = a ? b : c ? d : e"),
            "self.x=(self.b if self.a else (self.d if self.c else self.e))"
        );
    }

    #[test]
    fn test_match_operators() {
        let lines = section("BEGIN { x = $1 ~ /ab+/ }", Section::Begin);
        assert_eq!(lines, ["self.x=self._re_0.search(self._FLDS[1])"]);
        let lines = section("BEGIN { x = $1 !~ \"a.c\" }", Section::Begin);
        assert_eq!(lines, ["self.x=(not self._re_0.search(self._FLDS[1]))"]);
        let lines = section("BEGIN { x = s ~ pat }", Section::Begin);
        assert_eq!(lines, ["self.x=self._dynamic_regex(self.pat).search(str(self.s))"]);
    }

    #[test]
    fn test_bare_regex_matches_record() {
        assert_eq!(begin_line("x = /foo/"), "self.x=self._re_0.search(str(self._FLDS[0]))");
    }

    #[test]
    fn test_membership() {
        assert_eq!(begin_line("x = k in arr"), "self.x=self.k in self.arr");
        assert_eq!(begin_line("x = (i, j) in arr"), "self.x=(self.i, self.j) in self.arr");
        assert_eq!(begin_line("x = !(k in arr)"), "self.x=(not (self.k in self.arr))");
    }

    #[test]
    fn test_array_elements() {
        assert_eq!(begin_line("arr[1] = 2"), "self.arr[1]=2");
        assert_eq!(begin_line("arr[i, j] = 2"), "self.arr[(self.i, self.j)]=2");
        assert_eq!(begin_line("arr[\"k\"] += 1"), "self.arr[\"k\"]+=1");
    }

    #[test]
    fn test_field_references() {
        assert_eq!(begin_line("x = $3"), "self.x=self._FLDS[3]");
        assert_eq!(begin_line("x = $NF"), "self.x=self._FLDS[int(self.NF)]");
        assert_eq!(begin_line("x = $NF-1"), "self.x=self._FLDS[int(self.NF)]-1");
        assert_eq!(begin_line("x = $(i+1)"), "self.x=self._FLDS[int((self.i+1))]");
        assert_eq!(begin_line("x = $$0"), "self.x=self._FLDS[int(self._FLDS[0])]");
    }

    #[test]
    fn test_field_assignment() {
        assert_eq!(begin_line("$2 = \"x\""), "self._set_dollar_field(2, \"x\")");
        assert_eq!(begin_line("$0 = \"a b\""), "self._set_dollar_fields(\"a b\")");
        assert_eq!(begin_line("$i = 1"), "self._set_dollar_field(int(self.i), 1)");
    }

    #[test]
    fn test_compound_field_assignment_rebuilds_record() {
        assert_eq!(
            begin("$2 += 1; $3 = 5"),
            [
                "field_1 = self._FLDS[2]+1",
                "self._set_dollar_field(2, field_1)",
                "self._set_dollar_field(3, 5)"
            ]
        );
        assert_eq!(
            begin("x = $0 *= a + b"),
            [
                "field_1 = self._FLDS[0]*(self.a+self.b)",
                "self._set_dollar_fields(field_1)",
                "self.x=field_1"
            ]
        );
    }

    #[test]
    fn test_increments() {
        assert_eq!(begin_line("i++"), "self._post_inc_var('i')");
        assert_eq!(begin_line("--i"), "self._pre_dec_var('i')");
        assert_eq!(begin_line("arr[k]++"), "self._post_inc_arr(self.arr, self.k)");
        assert_eq!(begin_line("x = y++ + 1"), "self.x=self._post_inc_var('y')+1");
    }

    #[test]
    fn test_field_increments_rebuild_record() {
        assert_eq!(begin("$2++"), ["field_1 = self._FLDS[2]", "self._set_dollar_field(2, field_1+1)"]);
        assert_eq!(
            begin("x = --$2"),
            [
                "field_1 = self._FLDS[2]-1",
                "self._set_dollar_field(2, field_1)",
                "self.x=field_1"
            ]
        );
        assert_eq!(
            begin("$i++"),
            [
                "field_index_1 = int(self.i)",
                "field_1 = self._FLDS[field_index_1]",
                "self._set_dollar_field(field_index_1, field_1+1)"
            ]
        );
    }

    #[test]
    fn test_short_circuit_guards_hoisted_substitution() {
        assert_eq!(
            begin("x = 0 && sub(/a/, \"b\", s)"),
            [
                "cond_2=0",
                "if cond_2:",
                "    self.s, num_changed_1 = self._re_0.subn(\"b\", str(self.s), 1)",
                "    cond_2=num_changed_1",
                "self.x=cond_2"
            ]
        );
        assert_eq!(
            begin("if (done || gsub(/a/, \"b\")) n++"),
            [
                "cond_2=self.done",
                "if not cond_2:",
                "    target_1, num_changed_1 = self._re_0.subn(\"b\", str(self._FLDS[0]), 0)",
                "    self._set_dollar_fields(target_1)",
                "    cond_2=num_changed_1",
                "if cond_2:",
                "    self._post_inc_var('n')"
            ]
        );
    }

    #[test]
    fn test_ternary_guards_hoisted_branch() {
        assert_eq!(
            begin("x = c ? sub(/a/, \"b\", s) : 0"),
            [
                "if self.c:",
                "    self.s, num_changed_1 = self._re_0.subn(\"b\", str(self.s), 1)",
                "    choice_2=num_changed_1",
                "else:",
                "    choice_2=0",
                "self.x=choice_2"
            ]
        );
    }

    #[test]
    fn test_chained_assignment() {
        assert_eq!(begin_line("a = b = 1"), "self.a=self.b=1");
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(begin_line("x = -a"), "self.x=-self.a");
        assert_eq!(begin_line("x = -a * b"), "self.x=-self.a*self.b");
        assert_eq!(begin_line("x = -(a + b)"), "self.x=-(self.a+self.b)");
    }

    #[test]
    fn test_assignment_needs_lvalue() {
        assert!(matches!(error("BEGIN { 1 = 2 }"), Error::Syntax { .. }));
        assert!(matches!(error("BEGIN { (a) = 2 }"), Error::Syntax { .. }));
    }

    #[test]
    fn test_array_scalar_conflict() {
        let err = error("BEGIN { a = 1; a[1] = 2 }");
        assert!(matches!(err, Error::Semantic { .. }));
        assert!(err.to_string().contains("both an array and a scalar"));
    }

    #[test]
    fn test_getline_forms() {
        assert_eq!(begin_line("getline"), "self._std_in_out.get_into_dollar_fields()");
        assert_eq!(begin_line("getline line"), "self._std_in_out.get_into_variable(self, \"line\")");
        assert_eq!(begin_line("getline $2"), "self._std_in_out.get_into_dollar_field(2)");
        assert_eq!(begin_line("getline $0"), "self._std_in_out.get_into_dollar_fields()");
        assert_eq!(
            begin_line("getline arr[n]"),
            "self._std_in_out.get_into_array(self.arr, self.n)"
        );
        assert_eq!(
            begin_line("getline < \"in.txt\""),
            "self._access_file(\"in.txt\", \"r\").get_into_dollar_fields()"
        );
        assert_eq!(
            begin_line("getline line < file"),
            "self._access_file(self.file, \"r\").get_into_variable(self, \"line\")"
        );
        assert_eq!(
            begin_line("\"date\" | getline"),
            "self._access_file(\"date\", \"|r\").get_into_dollar_fields()"
        );
        assert_eq!(
            begin_line("\"date\" | getline now"),
            "self._access_file(\"date\", \"|r\").get_into_variable(self, \"now\")"
        );
        assert_eq!(
            begin_line("cmd | getline $1"),
            "self._access_file(self.cmd, \"|r\").get_into_dollar_field(1)"
        );
    }

    #[test]
    fn test_getline_in_condition() {
        let lines = begin("while ((getline line < f) > 0) n++");
        assert_eq!(
            lines[0],
            "while self._access_file(self.f, \"r\").get_into_variable(self, \"line\")>0:"
        );
    }

    #[test]
    fn test_getline_reads_input() {
        let mut compiler = Compiler::new().unwrap();
        compiler.add_source(Source::Inline("BEGIN { getline }")).unwrap();
        assert!(compiler.has_mainloop);
    }

    #[test]
    fn test_python_keyword_variable() {
        assert_eq!(begin_line("lambda = 1"), "self.lambda_=1");
    }

    #[test]
    fn test_fragment_wrapping() {
        let sum = Fragment::operator("a+b".to_string(), 7);
        assert_eq!(sum.wrapped(6), "(a+b)");
        assert_eq!(sum.wrapped(8), "a+b");
        assert_eq!(Fragment::atom("x").wrapped(1), "x");
        assert_eq!(Fragment::atom("x").stringified(), "str(x)");
        assert_eq!(Fragment::string("\"x\"").stringified(), "\"x\"");
    }
}
