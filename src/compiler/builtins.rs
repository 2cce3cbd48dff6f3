//! Calls of built-in functions. Most render as a plain Python call; the
//! rest are rewritten into Python idioms or hoisted statements.

use super::Compiler;
use super::expr::{ANY, ExprContext, Fragment, LValue};
use crate::error::Result;
use crate::lexer::{Token, decode_awk_string, python_literal};
use crate::symbols::{Bracket, Function, Strategy, SymbolKind};

impl Compiler {
    /// The cursor is on the function name.
    pub(crate) fn call(&mut self, token: Token, function: Function, ctx: ExprContext) -> Result<Fragment> {
        if let Some(library) = &function.library {
            self.require_library(library);
        }
        let emit = self.symbols.symbol(token.id).emit.clone();
        let name = self.symbols.symbol(token.id).token.clone();
        match function.strategy {
            Strategy::User => return self.user_call(token),
            Strategy::Length => return self.length(),
            Strategy::Split => return self.split(ctx),
            Strategy::Sub { global } => return self.substitute(global),
            Strategy::Match => return self.match_call(),
            _ => {}
        }
        self.advance();
        let arg_ctx = ExprContext {
            missing_index: ctx.missing_index || function.strategy == Strategy::Sprintf,
            ..ExprContext::default()
        };
        let args = self.arguments(arg_ctx)?;
        match function.strategy {
            Strategy::Method(method) => {
                let [subject] = args.as_slice() else {
                    return Err(self.arity_error(&name, "one argument"));
                };
                Ok(Fragment::string(format!("{}.{}()", subject.stringified(), method)))
            }
            Strategy::Index => {
                let [haystack, needle] = args.as_slice() else {
                    return Err(self.arity_error(&name, "two arguments"));
                };
                Ok(Fragment::atom(format!(
                    "({}.find({})+1)",
                    haystack.stringified(),
                    needle.stringified()
                )))
            }
            Strategy::Substr => self.substr(&args),
            Strategy::Sprintf => {
                if args.is_empty() {
                    return Err(self.arity_error(&name, "a format"));
                }
                let texts: Vec<String> = args.into_iter().map(|f| f.text).collect();
                let compiled = self.formats.compile(&texts);
                for warning in compiled.warnings {
                    self.warn(warning);
                }
                Ok(Fragment::string(compiled.code))
            }
            _ => {
                let texts: Vec<String> = args.into_iter().map(|f| f.text).collect();
                Ok(Fragment::atom(format!("{}({})", emit, texts.join(", "))))
            }
        }
    }

    fn arity_error(&self, name: &str, wanted: &str) -> crate::error::Error {
        self.syntax_error(&format!("{} for {}", wanted, name))
    }

    /// `length`, `length()` and `length(x)`. An array argument counts
    /// elements.
    fn length(&mut self) -> Result<Fragment> {
        self.advance();
        if !self.at_bracket(Bracket::OpenParen) {
            return Ok(Fragment::atom("len(str(self._FLDS[0]))"));
        }
        let args = self.arguments(ExprContext::argument())?;
        match args.as_slice() {
            [] => Ok(Fragment::atom("len(str(self._FLDS[0]))")),
            [arg] => {
                let is_array = match arg.lvalue {
                    Some(LValue::Variable(id)) => self.symbols.is_array(id),
                    _ => false,
                };
                if is_array {
                    Ok(Fragment::atom(format!("len({})", arg.text)))
                } else {
                    Ok(Fragment::atom(format!("len({})", arg.stringified())))
                }
            }
            _ => Err(self.arity_error("length", "at most one argument")),
        }
    }

    /// Literal bounds fold into a slice; anything else goes through the
    /// runtime, which clamps like AWK does.
    fn substr(&mut self, args: &[Fragment]) -> Result<Fragment> {
        let (subject, start, count) = match args {
            [subject, start] => (subject, start, None),
            [subject, start, count] => (subject, start, Some(count)),
            _ => return Err(self.arity_error("substr", "two or three arguments")),
        };
        let text = subject.stringified();
        let start_literal = start.text.parse::<i64>().ok();
        let count_literal = count.map(|c| c.text.parse::<i64>().ok());
        let folded = match (start_literal, count_literal) {
            (Some(start), None) => Some(format!("{}[{}:]", text, start.max(1) - 1)),
            (Some(start), Some(Some(count))) => {
                let first = start.max(1) - 1;
                let end = start.saturating_sub(1).saturating_add(count).max(first);
                Some(format!("{}[{}:{}]", text, first, end))
            }
            _ => None,
        };
        if let Some(slice) = folded {
            return Ok(Fragment::string(slice));
        }
        let call = match count {
            Some(count) => format!("self._substr({}, int({}), int({}))", text, start.text, count.text),
            None => format!("self._substr({}, int({}))", text, start.text),
        };
        Ok(Fragment::string(call))
    }

    /// `match(s, re)` sets RSTART and RLENGTH in the runtime.
    fn match_call(&mut self) -> Result<Fragment> {
        self.advance();
        self.expect_bracket(Bracket::OpenParen, "\"(\"")?;
        let subject = self.expression(ExprContext::default())?;
        self.expect_comma()?;
        let regex = self.regex_operand(ExprContext::default(), ANY)?;
        self.expect_bracket(Bracket::CloseParen, "\")\"")?;
        Ok(Fragment::atom(format!("self._match({}, {})", subject.stringified(), regex)))
    }

    /// `split(s, arr [, sep])`. As a whole statement it is emitted inline;
    /// inside an expression the split is hoisted and the element count
    /// takes its place.
    fn split(&mut self, ctx: ExprContext) -> Result<Fragment> {
        self.advance();
        self.expect_bracket(Bracket::OpenParen, "\"(\"")?;
        let subject = self.expression(ExprContext::default())?.stringified();
        self.expect_comma()?;
        let array = self.cursor.current();
        if !matches!(self.symbol().kind, SymbolKind::Variable(_)) {
            return Err(self.syntax_error("an array name"));
        }
        self.symbols.mark_array(array.id, array.line())?;
        let array = self.symbols.symbol(array.id).emit.clone();
        self.advance();
        let pieces = if self.symbol().kind == SymbolKind::Comma {
            self.advance();
            self.skip_newlines();
            self.split_by(&subject)?
        } else {
            format!("{}.split(None if self.FS == \" \" else self.FS)", subject)
        };
        self.expect_bracket(Bracket::CloseParen, "\")\"")?;
        let line = format!("{} = self._to_array({})", array, pieces);
        if ctx.statement && self.at_end_of_statement() {
            return Ok(Fragment::atom(line));
        }
        self.emit(line);
        Ok(Fragment {
            hoisted: true,
            ..Fragment::atom(format!("len({})", array))
        })
    }

    fn split_by(&mut self, subject: &str) -> Result<String> {
        let token = self.cursor.current();
        match self.symbol().kind {
            SymbolKind::Regex => {
                self.advance();
                let regex = &self.symbols.symbol(token.id).emit;
                return Ok(format!("{}.split({})", regex, subject));
            }
            SymbolKind::String if !self.peek_symbol(1).starts_operand() => {
                let value = decode_awk_string(&self.symbols.symbol(token.id).token);
                self.advance();
                if value == " " {
                    return Ok(format!("{}.split()", subject));
                }
                if value.chars().count() == 1 {
                    return Ok(format!("{}.split({})", subject, python_literal(&value)));
                }
                let regex = self.symbols.regex_for_string(token.id);
                let regex = &self.symbols.symbol(regex).emit;
                return Ok(format!("{}.split({})", regex, subject));
            }
            _ => {}
        }
        let separator = self.expression(ExprContext::default())?;
        Ok(format!(
            "{0}.split() if {1} == \" \" else self._dynamic_regex({1}).split({0})",
            subject, separator.text
        ))
    }

    /// `sub`/`gsub`. The substitution is hoisted ahead of the current line
    /// and the count of replacements takes its place.
    fn substitute(&mut self, global: bool) -> Result<Fragment> {
        self.advance();
        self.expect_bracket(Bracket::OpenParen, "\"(\"")?;
        let regex = self.regex_operand(ExprContext::default(), ANY)?;
        self.expect_comma()?;
        let replacement = self.expression(ExprContext::default())?;
        let replacement = match replacement.literal {
            Some(id) if self.symbols.symbol(id).kind == SymbolKind::String => {
                python_literal(&replacement_template(&decode_awk_string(&self.symbols.symbol(id).token)))
            }
            _ => format!("self._dynamic_replacement({})", replacement.text),
        };
        let target = if self.symbol().kind == SymbolKind::Comma {
            self.advance();
            self.skip_newlines();
            Some(self.expression(ExprContext::default())?)
        } else {
            None
        };
        self.expect_bracket(Bracket::CloseParen, "\")\"")?;

        let n = self.next_temp();
        let count = if global { 0 } else { 1 };
        let changed = format!("num_changed_{}", n);
        let subn = |subject: &str| format!("{}.subn({}, {}, {})", regex, replacement, subject, count);
        match target.as_ref().map(|t| (t, t.lvalue.clone())) {
            None => self.substitute_record(&format!("target_{}", n), &changed, &subn("str(self._FLDS[0])")),
            Some((_, Some(LValue::Field { index }))) if index == "0" => {
                self.substitute_record(&format!("target_{}", n), &changed, &subn("str(self._FLDS[0])"))
            }
            Some((_, Some(LValue::Field { index }))) => {
                let temp = format!("target_{}", n);
                let subject = subn(&format!("str(self._FLDS[{}])", index));
                self.emit(format!("{}, {} = {}", temp, changed, subject));
                self.emit(format!("self._set_dollar_field({}, {})", index, temp));
            }
            Some((t, Some(LValue::Variable(_)))) => {
                self.emit(format!("{}, {} = {}", t.text, changed, subn(&t.stringified())));
            }
            Some((_, Some(LValue::Element { base, index }))) => {
                let element = format!("{}[{}]", base, index);
                let subject = subn(&format!("str({})", element));
                self.emit(format!("{}, {} = {}", element, changed, subject));
            }
            Some((t, None)) => {
                self.emit(format!("_, {} = {}", changed, subn(&t.stringified())));
            }
        }
        Ok(Fragment {
            hoisted: true,
            ..Fragment::atom(changed)
        })
    }

    fn substitute_record(&mut self, temp: &str, changed: &str, subn: &str) {
        self.emit(format!("{}, {} = {}", temp, changed, subn));
        self.emit(format!("self._set_dollar_fields({})", temp));
    }

    fn expect_comma(&mut self) -> Result<()> {
        if self.symbol().kind != SymbolKind::Comma {
            return Err(self.syntax_error("\",\""));
        }
        self.advance();
        self.skip_newlines();
        Ok(())
    }
}

/// Python `re` replacement template for an AWK replacement string:
/// `&` is the whole match and `\&` a literal ampersand.
fn replacement_template(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some('&') => {
                    chars.next();
                    out.push('&');
                }
                Some('\\') => {
                    chars.next();
                    out.push_str("\\\\");
                }
                _ => out.push_str("\\\\"),
            },
            '&' => out.push_str("\\g<0>"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Source;
    use crate::error::Error;
    use crate::symbols::Section;

    fn compile(source: &str) -> Compiler {
        let mut compiler = Compiler::new().unwrap();
        compiler.add_source(Source::Inline(source)).unwrap();
        compiler
    }

    fn begin(source: &str) -> Vec<String> {
        compile(&format!("BEGIN {{ {} }}", source))
            .out
            .section(Section::Begin)
            .to_vec()
    }

    fn begin_line(source: &str) -> String {
        begin(source).join("\n")
    }

    fn error(source: &str) -> Error {
        let mut compiler = Compiler::new().unwrap();
        compiler
            .add_source(Source::Inline(source))
            .expect_err("compilation should fail")
    }

    #[test]
    fn test_replacement_template() {
        assert_eq!(replacement_template("x"), "x");
        assert_eq!(replacement_template("[&]"), "[\\g<0>]");
        assert_eq!(replacement_template("\\&"), "&");
        assert_eq!(replacement_template("a\\\\b"), "a\\\\b");
        assert_eq!(replacement_template("\\n"), "\\\\n");
    }

    #[test]
    fn test_library_call_records_import() {
        let compiler = compile("BEGIN { x = sin(1) + cos(2); y = sqrt(4) }");
        assert_eq!(compiler.imports, vec!["math"]);
        assert_eq!(
            compiler.out.section(Section::Begin)[0],
            "self.x=math.sin(1)+math.cos(2)"
        );
    }

    #[test]
    fn test_case_conversion() {
        assert_eq!(begin_line("x = toupper($1)"), "self.x=self._FLDS[1].upper()");
        assert_eq!(begin_line("x = tolower(s)"), "self.x=str(self.s).lower()");
    }

    #[test]
    fn test_index() {
        assert_eq!(begin_line("x = index(s, \"b\")"), "self.x=(str(self.s).find(\"b\")+1)");
    }

    #[test]
    fn test_length_forms() {
        assert_eq!(begin_line("x = length"), "self.x=len(str(self._FLDS[0]))");
        assert_eq!(begin_line("x = length()"), "self.x=len(str(self._FLDS[0]))");
        assert_eq!(begin_line("x = length(s)"), "self.x=len(str(self.s))");
        assert_eq!(begin_line("a[1] = 1; x = length(a)"), "self.a[1]=1\nself.x=len(self.a)");
        assert_eq!(begin_line("x = length($2)"), "self.x=len(self._FLDS[2])");
    }

    #[test]
    fn test_substr_literal_bounds_fold() {
        assert_eq!(begin_line("x = substr(s, 2)"), "self.x=str(self.s)[1:]");
        assert_eq!(begin_line("x = substr(s, 2, 3)"), "self.x=str(self.s)[1:4]");
        assert_eq!(begin_line("x = substr(s, 0, 2)"), "self.x=str(self.s)[0:1]");
        assert_eq!(begin_line("x = substr(s, 3, -1)"), "self.x=str(self.s)[2:2]");
        assert_eq!(begin_line("x = substr($1, 1, 1)"), "self.x=self._FLDS[1][0:1]");
    }

    #[test]
    fn test_substr_extreme_literal_bounds() {
        assert_eq!(
            begin_line("x = substr(s, -9223372036854775808, 1)"),
            "self.x=str(self.s)[0:0]"
        );
        assert_eq!(
            begin_line("x = substr(s, 2, 9223372036854775807)"),
            "self.x=str(self.s)[1:9223372036854775807]"
        );
    }

    #[test]
    fn test_substr_dynamic_bounds() {
        assert_eq!(begin_line("x = substr(s, i)"), "self.x=self._substr(str(self.s), int(self.i))");
        assert_eq!(
            begin_line("x = substr(s, i, n)"),
            "self.x=self._substr(str(self.s), int(self.i), int(self.n))"
        );
    }

    #[test]
    fn test_substr_arity() {
        assert!(matches!(error("BEGIN { x = substr(s) }"), Error::Syntax { .. }));
    }

    #[test]
    fn test_match() {
        assert_eq!(begin_line("x = match($0, /a+/)"), "self.x=self._match(self._FLDS[0], self._re_0)");
        assert_eq!(
            begin_line("x = match(s, \"b+\")"),
            "self.x=self._match(str(self.s), self._re_0)"
        );
    }

    #[test]
    fn test_split_statement_is_inline() {
        assert_eq!(
            begin_line("split(s, parts)"),
            "self.parts = self._to_array(str(self.s).split(None if self.FS == \" \" else self.FS))"
        );
    }

    #[test]
    fn test_split_separators() {
        assert_eq!(begin_line("split(s, a, \",\")"), "self.a = self._to_array(str(self.s).split(\",\"))");
        assert_eq!(begin_line("split(s, a, \" \")"), "self.a = self._to_array(str(self.s).split())");
        assert_eq!(begin_line("split(s, a, /[,;]/)"), "self.a = self._to_array(self._re_0.split(str(self.s)))");
        assert_eq!(begin_line("split(s, a, \"::\")"), "self.a = self._to_array(self._re_0.split(str(self.s)))");
    }

    #[test]
    fn test_split_in_expression_is_hoisted() {
        let lines = begin("n = split($0, words)");
        assert_eq!(
            lines,
            [
                "self.words = self._to_array(self._FLDS[0].split(None if self.FS == \" \" else self.FS))",
                "self.n=len(self.words)"
            ]
        );
    }

    #[test]
    fn test_split_regex_does_not_capture_separators() {
        let compiler = compile("BEGIN { n = split(\"a,b;c\", arr, /[,;]/) }");
        let (_, regex) = compiler
            .symbols
            .iter()
            .find(|(_, symbol)| symbol.kind == SymbolKind::Regex)
            .unwrap();
        assert_eq!(regex.init, "re.compile(r\"(?:[,;])\")");
    }

    #[test]
    fn test_split_target_must_be_a_name() {
        assert!(matches!(error("BEGIN { split(s, 3) }"), Error::Syntax { .. }));
    }

    #[test]
    fn test_sub_on_record() {
        assert_eq!(
            begin("sub(/a/, \"b\")"),
            [
                "target_1, num_changed_1 = self._re_0.subn(\"b\", str(self._FLDS[0]), 1)",
                "self._set_dollar_fields(target_1)"
            ]
        );
    }

    #[test]
    fn test_gsub_on_variable() {
        assert_eq!(
            begin("gsub(/a/, \"[&]\", s)"),
            ["self.s, num_changed_1 = self._re_0.subn(\"[\\\\g<0>]\", str(self.s), 0)"]
        );
    }

    #[test]
    fn test_gsub_on_field_and_element() {
        assert_eq!(
            begin("gsub(\"x\", \"y\", $2)"),
            [
                "target_1, num_changed_1 = self._re_0.subn(\"y\", str(self._FLDS[2]), 0)",
                "self._set_dollar_field(2, target_1)"
            ]
        );
        assert_eq!(
            begin("gsub(/x/, r, a[k])"),
            ["self.a[self.k], num_changed_1 = self._re_0.subn(self._dynamic_replacement(self.r), str(self.a[self.k]), 0)"]
        );
    }

    #[test]
    fn test_sub_count_is_used() {
        let lines = begin("if (sub(/a/, \"b\", s)) n++");
        assert_eq!(
            lines,
            [
                "self.s, num_changed_1 = self._re_0.subn(\"b\", str(self.s), 1)",
                "if num_changed_1:",
                "    self._post_inc_var('n')"
            ]
        );
    }

    #[test]
    fn test_sprintf() {
        let line = begin_line("x = sprintf(\"%d items\", n)");
        assert!(line.starts_with("self.x="), "{}", line);
        assert!(line.contains("self.n"), "{}", line);
    }

    #[test]
    fn test_dynamic_sprintf_format() {
        assert_eq!(begin_line("x = sprintf(fmt, 1)"), "self.x=self.sprintf(self.fmt, 1)");
    }

    #[test]
    fn test_plain_builtin_calls() {
        assert_eq!(begin_line("close(\"f\")"), "self._close_file(\"f\")");
        assert_eq!(begin_line("x = int(y)"), "self.x=int(self.y)");
        assert_eq!(begin_line("system(\"ls\")"), "self._system(\"ls\")");
    }

    #[test]
    fn test_spaced_builtin_paren() {
        assert_eq!(begin_line("x = int (y)"), "self.x=int(self.y)");
    }
}
