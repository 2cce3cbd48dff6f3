//! Statements, actions and top-level program items.

use super::Compiler;
use super::expr::{ANY, ExprContext, Fragment};
use super::output::Bucket;
use crate::error::{Error, Result};
use crate::lexer::Token;
use crate::namespace::split_qualified;
use crate::symbols::{
    BinaryOp, Bracket, CONCAT_PRECEDENCE, EMPTY_ARRAY, EMPTY_VALUE, Function, Keyword, Section,
    Strategy, Symbol, SymbolId, SymbolKind, Variable, python_name,
};

const DEFAULT_ACTION: &str = "print(self._FLDS[0], sep=self.OFS, end=self.ORS)";

impl Compiler {
    /// All items of the current segment.
    pub(crate) fn program(&mut self) -> Result<()> {
        loop {
            self.skip_terminators();
            if self.symbol().is_end() {
                return Ok(());
            }
            self.item()?;
        }
    }

    fn item(&mut self) -> Result<()> {
        match self.symbol().kind.clone() {
            SymbolKind::Section(section) => {
                self.advance();
                if !self.at_bracket(Bracket::OpenBrace) {
                    return Err(self.syntax_error("\"{\""));
                }
                // END needs the input read to know NR and the last record
                if section != Section::Begin {
                    self.has_mainloop = true;
                }
                self.in_bucket(Bucket::Section(section), Self::block)
            }
            SymbolKind::Bracket(Bracket::OpenBrace) => {
                self.has_mainloop = true;
                self.in_bucket(Bucket::Section(Section::MainLoop), Self::block)
            }
            SymbolKind::Statement(Keyword::Function) => self.function_definition(),
            _ => {
                self.has_mainloop = true;
                self.in_bucket(Bucket::Section(Section::MainLoop), Self::pattern_action)
            }
        }
    }

    fn in_bucket(&mut self, bucket: Bucket, compile: fn(&mut Self) -> Result<()>) -> Result<()> {
        let saved = self.out.enter(bucket);
        let result = compile(self);
        self.out.leave(saved);
        result
    }

    /// `pattern [{ action }]` or `start, end [{ action }]`.
    fn pattern_action(&mut self) -> Result<()> {
        let start = self.condition()?;
        if self.symbol().kind == SymbolKind::Comma {
            self.advance();
            self.skip_newlines();
            let mark = self.out.mark();
            let end = self.condition()?;
            let hoisted = self.out.take_since(mark);
            let flag = self.symbols.new_range_flag();
            let flag = self.symbols.symbol(flag).emit.clone();
            self.emit(format!("if {} or ({}):", flag, start.text));
            self.out.indent();
            self.out.append_lines(hoisted, 1);
            self.emit(format!("{} = not ({})", flag, end.text));
        } else {
            self.emit(format!("if {}:", start.text));
            self.out.indent();
        }
        let result = if self.at_bracket(Bracket::OpenBrace) {
            self.block()
        } else if self.at_end_of_statement() {
            self.emit(DEFAULT_ACTION);
            Ok(())
        } else {
            Err(self.syntax_error("\"{\" or the end of the pattern"))
        };
        self.out.dedent();
        result
    }

    /// `function name(params) { body }`. The name is reclassified from the
    /// variable the lexer took it for.
    fn function_definition(&mut self) -> Result<()> {
        self.advance();
        let name = self.cursor.current();
        let symbol = self.symbols.symbol(name.id);
        match &symbol.kind {
            SymbolKind::Variable(v) if !v.built_in && !v.is_array && !v.is_scalar => {}
            SymbolKind::Variable(_) => {
                return Err(Error::semantic(format!(
                    "function name {} is already used as a variable (line {})",
                    symbol.token,
                    name.line()
                )));
            }
            SymbolKind::Function(Function {
                strategy: Strategy::User,
                ..
            }) => {
                return Err(Error::semantic(format!(
                    "function {} is defined twice (line {})",
                    symbol.token,
                    name.line()
                )));
            }
            _ => return Err(self.syntax_error("a function name")),
        }
        let method = symbol
            .emit
            .strip_prefix("self.")
            .unwrap_or(&symbol.emit)
            .to_string();
        let definition = self.symbols.symbol_mut(name.id);
        definition.kind = SymbolKind::Function(Function {
            strategy: Strategy::User,
            library: None,
        });
        definition.init.clear();

        self.advance();
        self.expect_bracket(Bracket::OpenParen, "\"(\"")?;
        self.skip_newlines();
        let mut params: Vec<Token> = Vec::new();
        while !self.at_bracket(Bracket::CloseParen) {
            if !matches!(self.symbol().kind, SymbolKind::Variable(_)) {
                return Err(self.syntax_error("a parameter name"));
            }
            params.push(self.cursor.current());
            self.advance();
            self.skip_newlines();
            if self.symbol().kind == SymbolKind::Comma {
                self.advance();
                self.skip_newlines();
            } else if !self.at_bracket(Bracket::CloseParen) {
                return Err(self.syntax_error("\",\" or \")\""));
            }
        }
        self.advance();
        self.skip_newlines();
        if !self.at_bracket(Bracket::OpenBrace) {
            return Err(self.syntax_error("\"{\""));
        }
        let saved = self.out.enter(Bucket::Functions);
        let result = self.function_body(&method, &params);
        self.out.leave(saved);
        result
    }

    /// Parameters live on a per-call `_locals` owner. While the body is
    /// compiled their symbols are redirected there; an array parameter the
    /// caller leaves out gets a fresh array.
    fn function_body(&mut self, method: &str, params: &[Token]) -> Result<()> {
        let names: Vec<String> = params
            .iter()
            .map(|t| {
                let token = &self.symbols.symbol(t.id).token;
                python_name(split_qualified(token).map_or(token.as_str(), |(_, bare)| bare))
            })
            .collect();
        let signature: Vec<String> = std::iter::once("self".to_string())
            .chain(names.iter().map(|n| format!("{}={}", n, EMPTY_VALUE)))
            .collect();
        self.emit(format!("def {}({}):", method, signature.join(", ")));
        self.out.indent();
        self.out.line("_locals=AwkpyRuntimeVarOwner()");
        let first_param = self.out.mark();
        for name in &names {
            self.out.line(format!("_locals.{0}={0}", name));
        }

        let saved: Vec<(SymbolId, Symbol)> = params
            .iter()
            .map(|t| (t.id, self.symbols.symbol(t.id).clone()))
            .collect();
        for (param, name) in params.iter().zip(&names) {
            let symbol = self.symbols.symbol_mut(param.id);
            symbol.kind = SymbolKind::Variable(Variable::default());
            symbol.emit = format!("_locals.{}", name);
        }
        let result = self.block();
        for (i, (param, name)) in params.iter().zip(&names).enumerate() {
            if self.symbols.is_array(param.id) {
                self.out.replace(
                    first_param + i,
                    &format!("_locals.{0}={0}", name),
                    &format!(
                        "_locals.{0}={0} if {0} is not {1} else {2}",
                        name, EMPTY_VALUE, EMPTY_ARRAY
                    ),
                );
            }
        }
        for (id, symbol) in saved {
            *self.symbols.symbol_mut(id) = symbol;
        }
        self.out.dedent();
        self.out.line("");
        result
    }

    /// `{ statements }`, emitting `pass` for an empty block.
    pub(crate) fn block(&mut self) -> Result<()> {
        self.expect_bracket(Bracket::OpenBrace, "\"{\"")?;
        let mark = self.out.mark();
        loop {
            self.skip_terminators();
            if self.is_token("}") {
                self.advance();
                break;
            }
            if self.symbol().is_end() {
                return Err(self.syntax_error("\"}\""));
            }
            self.statement()?;
        }
        if self.out.statements_since(mark) == 0 {
            self.emit("pass");
        }
        Ok(())
    }

    /// Body of a compound statement, one level deeper.
    fn body(&mut self) -> Result<()> {
        self.skip_newlines();
        self.out.indent();
        let mark = self.out.mark();
        let result = if self.is_token(";") {
            self.advance();
            Ok(())
        } else {
            self.statement()
        };
        if result.is_ok() && self.out.statements_since(mark) == 0 {
            self.emit("pass");
        }
        self.out.dedent();
        result
    }

    pub(crate) fn statement(&mut self) -> Result<()> {
        match self.symbol().kind.clone() {
            SymbolKind::Bracket(Bracket::OpenBrace) => self.block(),
            SymbolKind::Statement(keyword) => self.keyword_statement(keyword),
            _ => self.expression_statement(),
        }
    }

    fn keyword_statement(&mut self, keyword: Keyword) -> Result<()> {
        match keyword {
            Keyword::Print => self.print_statement(false),
            Keyword::Printf => self.print_statement(true),
            Keyword::If => self.if_statement(),
            Keyword::While => self.while_statement(),
            Keyword::Do => self.do_statement(),
            Keyword::For => self.for_statement(),
            Keyword::Break | Keyword::Continue | Keyword::Next | Keyword::NextFile => {
                let emit = self.symbol().emit.clone();
                self.advance();
                self.emit(emit);
                self.end_simple_statement()
            }
            Keyword::Exit => {
                self.advance();
                if !self.at_end_of_statement() {
                    let code = self.expression(ExprContext::default())?;
                    self.emit(format!("AwkpyRuntimeWrapper._ans={}", code.text));
                }
                self.emit("raise AwkExit");
                self.end_simple_statement()
            }
            Keyword::Return => {
                self.advance();
                if self.at_end_of_statement() {
                    self.emit("return");
                } else {
                    let value = self.expression(ExprContext::default())?;
                    self.emit(format!("return {}", value.text));
                }
                self.end_simple_statement()
            }
            Keyword::Delete => self.delete_statement(),
            Keyword::Getline => self.expression_statement(),
            Keyword::Function => Err(self.syntax_error("a statement (functions are defined at top level)")),
        }
    }

    fn expression_statement(&mut self) -> Result<()> {
        let statement = matches!(
            self.symbol().kind,
            SymbolKind::Function(Function {
                strategy: Strategy::Split,
                ..
            })
        );
        let fragment = self.expression(ExprContext {
            statement,
            ..ExprContext::default()
        })?;
        if !fragment.hoisted {
            self.emit(&fragment.text);
        }
        self.end_simple_statement()
    }

    /// Simple statements end at `;` or a newline, which they consume, or
    /// before a `}`.
    fn end_simple_statement(&mut self) -> Result<()> {
        match self.symbol().kind {
            SymbolKind::Terminator { consume: true, .. } => {
                self.advance();
                Ok(())
            }
            SymbolKind::Terminator { consume: false, .. } | SymbolKind::EndOfInput => Ok(()),
            _ => Err(self.syntax_error("the end of the statement")),
        }
    }

    fn parenthesized_condition(&mut self) -> Result<Fragment> {
        self.expect_bracket(Bracket::OpenParen, "\"(\"")?;
        self.skip_newlines();
        let condition = self.condition()?;
        self.skip_newlines();
        self.expect_bracket(Bracket::CloseParen, "\")\"")?;
        Ok(condition)
    }

    fn if_statement(&mut self) -> Result<()> {
        self.advance();
        let condition = self.parenthesized_condition()?;
        self.emit(format!("if {}:", condition.text));
        self.body()?;
        if self.symbol().is_terminator() && self.peek_symbol(1).kind == SymbolKind::Reserved {
            self.advance();
        }
        if self.symbol().kind == SymbolKind::Reserved {
            self.advance();
            self.emit("else:");
            self.body()?;
        }
        Ok(())
    }

    /// A condition whose statements were hoisted is re-evaluated at the top
    /// of every pass.
    fn while_statement(&mut self) -> Result<()> {
        self.advance();
        let mark = self.out.mark();
        let condition = self.parenthesized_condition()?;
        let hoisted = self.out.take_since(mark);
        if hoisted.is_empty() {
            self.emit(format!("while {}:", condition.text));
        } else {
            self.emit("while True:");
            self.out.append_lines(hoisted, 1);
            self.out.indent();
            self.loop_exit(&condition);
            self.out.dedent();
        }
        self.body()
    }

    /// `if not (cond): break` at the current level.
    fn loop_exit(&mut self, condition: &Fragment) {
        self.emit(format!("if not ({}):", condition.text));
        self.out.indent();
        self.emit("break");
        self.out.dedent();
    }

    /// Python has no post-test loop: a first-pass flag forces one iteration.
    fn do_statement(&mut self) -> Result<()> {
        self.advance();
        let flag = format!("do_first_{}", self.next_temp());
        self.emit(format!("{}=True", flag));
        let mark = self.out.mark();
        self.out.indent();
        self.out.line(format!("{}=False", flag));
        self.out.dedent();
        self.body()?;
        self.skip_terminators();
        if !self.symbol().is_keyword(Keyword::While) {
            return Err(self.syntax_error("\"while\""));
        }
        self.advance();
        let condition_mark = self.out.mark();
        let condition = self.parenthesized_condition()?;
        let hoisted = self.out.take_since(condition_mark);
        if hoisted.is_empty() {
            self.out.insert(mark, format!("while {} or ({}):", flag, condition.text));
        } else {
            // every pass after the first starts with the test
            let count = hoisted.len();
            self.out.insert(mark, "while True:");
            self.out.insert(mark + 1, format!("    if not {}:", flag));
            self.out.insert_lines(mark + 2, hoisted, 2);
            self.out.insert(mark + 2 + count, format!("        if not ({}):", condition.text));
            self.out.insert(mark + 3 + count, "            break");
        }
        self.end_simple_statement()
    }

    fn for_statement(&mut self) -> Result<()> {
        self.advance();
        if !self.at_bracket(Bracket::OpenParen) {
            return Err(self.syntax_error("\"(\""));
        }
        let (key, op, array) = (self.cursor.peek(1), self.cursor.peek(2), self.cursor.peek(3));
        let is_variable = |id| matches!(self.symbols.symbol(id).kind, SymbolKind::Variable(_));
        if is_variable(key.id)
            && self.symbols.symbol(op.id).is_binary(BinaryOp::In)
            && is_variable(array.id)
            && self.peek_symbol(4).is_bracket(Bracket::CloseParen)
        {
            return self.for_in(key, array);
        }
        self.advance();
        self.skip_newlines();
        let init = if self.is_token(";") {
            None
        } else {
            Some(self.expression(ExprContext::default())?)
        };
        self.expect_semicolon()?;
        let condition_mark = self.out.mark();
        let condition = if self.is_token(";") {
            None
        } else {
            Some(self.condition()?)
        };
        self.expect_semicolon()?;
        let step_mark = self.out.mark();
        let step = if self.at_bracket(Bracket::CloseParen) {
            None
        } else {
            Some(self.expression(ExprContext::default())?)
        };
        self.skip_newlines();
        self.expect_bracket(Bracket::CloseParen, "\")\"")?;
        let step_lines = self.out.take_since(step_mark);
        let condition_lines = self.out.take_since(condition_mark);

        // The step must run before `continue` re-tests the condition, so the
        // loop is driven by a generator.
        let n = self.next_temp();
        if let Some(init) = init.filter(|f| !f.hoisted) {
            self.emit(init.text);
        }
        self.emit(format!("def _generator__{}():", n));
        self.out.indent();
        match condition {
            Some(condition) if !condition_lines.is_empty() => {
                self.emit("while True:");
                self.out.append_lines(condition_lines, 2);
                self.out.indent();
                self.loop_exit(&condition);
            }
            condition => {
                let condition = condition.map_or_else(|| "True".to_string(), |c| c.text);
                self.emit(format!("while {}:", condition));
                self.out.indent();
            }
        }
        self.emit("yield True");
        self.out.append_lines(step_lines, 2);
        if let Some(step) = step.filter(|f| !f.hoisted) {
            self.emit(step.text);
        }
        self.out.dedent();
        self.out.dedent();
        self.emit(format!("for _dummy__{0} in _generator__{0}():", n));
        self.body()
    }

    fn for_in(&mut self, key: Token, array: Token) -> Result<()> {
        self.advance();
        self.symbols.mark_scalar(key.id, key.line())?;
        self.advance();
        self.advance();
        self.symbols.mark_array(array.id, array.line())?;
        self.advance();
        self.expect_bracket(Bracket::CloseParen, "\")\"")?;
        let key = self.symbols.symbol(key.id).emit.clone();
        let array = self.symbols.symbol(array.id).emit.clone();
        self.emit(format!("for {} in list({}):", key, array));
        self.body()
    }

    fn expect_semicolon(&mut self) -> Result<()> {
        if !self.is_token(";") {
            return Err(self.syntax_error("\";\""));
        }
        self.advance();
        self.skip_newlines();
        Ok(())
    }

    /// `delete arr[key]` or `delete arr`.
    fn delete_statement(&mut self) -> Result<()> {
        self.advance();
        let array = self.cursor.current();
        if !matches!(self.symbol().kind, SymbolKind::Variable(_)) {
            return Err(self.syntax_error("an array name"));
        }
        self.symbols.mark_array(array.id, array.line())?;
        let emit = self.symbols.symbol(array.id).emit.clone();
        self.advance();
        if self.at_bracket(Bracket::OpenBracket) {
            self.advance();
            let mut keys = vec![self.expression(ExprContext::default())?.text];
            while self.symbol().kind == SymbolKind::Comma {
                self.advance();
                keys.push(self.expression(ExprContext::default())?.text);
            }
            self.expect_bracket(Bracket::CloseBracket, "\"]\"")?;
            let key = if keys.len() == 1 {
                keys.remove(0)
            } else {
                format!("({})", keys.join(", "))
            };
            self.emit(format!("{}.pop({}, None)", emit, key));
        } else {
            self.emit(format!("{}.clear()", emit));
        }
        self.end_simple_statement()
    }

    fn print_statement(&mut self, formatted: bool) -> Result<()> {
        self.advance();
        let fields = self.output_fields()?;
        let redirect = self.redirection()?;
        let call = if formatted {
            if fields.is_empty() {
                return Err(self.syntax_error("a format for printf"));
            }
            let texts: Vec<String> = fields.into_iter().map(|f| f.text).collect();
            let compiled = self.formats.compile(&texts);
            for warning in compiled.warnings {
                self.warn(warning);
            }
            format!("print({}, end='')", compiled.code)
        } else if fields.is_empty() {
            DEFAULT_ACTION.to_string()
        } else {
            let texts: Vec<String> = fields
                .iter()
                .map(|f| {
                    if f.is_string {
                        f.text.clone()
                    } else {
                        format!("self.awkpy__to_string({})", f.text)
                    }
                })
                .collect();
            format!("print({}, sep=self.OFS, end=self.ORS)", texts.join(", "))
        };
        match redirect {
            Some((target, mode)) => {
                self.emit(format!("file_handle = self._access_file({}, \"{}\")", target, mode));
                self.emit(format!("file_handle.{}", call));
            }
            None => self.emit(call),
        }
        self.end_simple_statement()
    }

    fn at_output_end(&self) -> bool {
        self.at_end_of_statement() || matches!(self.symbol().token.as_str(), ">" | ">>" | "|")
    }

    /// The expression list of `print`/`printf`, bare or parenthesized.
    fn output_fields(&mut self) -> Result<Vec<Fragment>> {
        let ctx = ExprContext {
            print: true,
            missing_index: true,
            ..ExprContext::default()
        };
        let mut fields = Vec::new();
        if self.at_output_end() {
            return Ok(fields);
        }
        if self.at_bracket(Bracket::OpenParen) {
            let group = self.arguments(ExprContext {
                missing_index: true,
                ..ExprContext::default()
            })?;
            if self.at_output_end() {
                return Ok(group);
            }
            // `print (a)(b)` or `print (a) + 1, c`: the group was an operand
            let [first] = <[Fragment; 1]>::try_from(group).map_err(|_| self.syntax_error("the end of print"))?;
            let first = self.continue_binary(first.grouped(), ctx, ANY)?;
            self.use_as_scalar(&first)?;
            fields.push(first);
        } else {
            fields.push(self.expression(ctx)?);
        }
        while self.symbol().kind == SymbolKind::Comma {
            self.advance();
            self.skip_newlines();
            fields.push(self.expression(ctx)?);
        }
        Ok(fields)
    }

    /// `> file`, `>> file` or `| command` after print.
    fn redirection(&mut self) -> Result<Option<(String, &'static str)>> {
        let mode = match self.symbol().token.as_str() {
            ">" => "w",
            ">>" => "a",
            "|" => "|w",
            _ => return Ok(None),
        };
        self.advance();
        let ctx = ExprContext {
            print: true,
            ..ExprContext::default()
        };
        let target = self.binary(ctx, CONCAT_PRECEDENCE + 1)?;
        self.use_as_scalar(&target)?;
        Ok(Some((target.text, mode)))
    }
}
