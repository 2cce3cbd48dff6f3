//! Single-pass AWK to Python compiler.
//!
//! The compiler walks the token stream once, emitting Python lines straight
//! into per-section output buckets; there is no syntax tree. One `Compiler`
//! accumulates any number of source segments (`-e`, `-f`, `-i`) and
//! `finish` assembles them into one program.

mod assemble;
mod builtins;
mod cursor;
mod expr;
mod output;
mod stmt;

pub use cursor::Cursor;
pub use assemble::RUNTIME_MODULE;
pub use output::{Bucket, Output};

use std::fmt;
use std::path::Path;

use crate::config::CompileOptions;
use crate::error::{Error, Result};
use crate::lexer::{Lexer, SourceFiles, Token, TokenPatterns, decode_awk_string, locate, python_literal};
use crate::namespace::{NamespaceRegistry, is_identifier, split_qualified};
use crate::sprintf::FormatCompiler;
use crate::symbols::{Bracket, Symbol, SymbolId, SymbolKind, SymbolTable};

/// A problem that did not stop compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// One unit of AWK source.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// Program text given on the command line (`-e`).
    Inline(&'a str),
    /// A source file compiled exactly once (`-f`).
    File(&'a Path),
    /// An idempotent include (`-i`); repeats are skipped.
    Include(&'a Path),
}

pub struct Compiler {
    options: CompileOptions,
    patterns: TokenPatterns,
    formats: FormatCompiler,
    symbols: SymbolTable,
    namespaces: NamespaceRegistry,
    files: SourceFiles,
    cursor: Cursor,
    out: Output,
    /// Python modules emitted calls depend on, in first-use order.
    imports: Vec<String>,
    headers: Vec<String>,
    has_mainloop: bool,
    /// Call sites of names not yet known to be functions.
    calls: Vec<(SymbolId, usize)>,
    temps: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Compiler {
    pub fn new() -> Result<Self> {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Result<Self> {
        let symbols = SymbolTable::new();
        let cursor = Cursor::new(Vec::new(), &symbols);
        Ok(Self {
            options,
            patterns: TokenPatterns::new()?,
            formats: FormatCompiler::new()?,
            symbols,
            namespaces: NamespaceRegistry::new(),
            files: SourceFiles::default(),
            cursor,
            out: Output::new(),
            imports: Vec::new(),
            headers: Vec::new(),
            has_mainloop: false,
            calls: Vec::new(),
            temps: 0,
            diagnostics: Vec::new(),
        })
    }

    /// Compile one source segment into the output buckets.
    pub fn add_source(&mut self, source: Source<'_>) -> Result<()> {
        match source {
            Source::Inline(text) => {
                let first = text.lines().next().unwrap_or("");
                self.headers.push(format!("# -e {}", header_text(first)));
                self.compile_segment(text)
            }
            Source::File(path) => {
                let path = locate(&path.to_string_lossy(), &self.options.include_path);
                self.files.add_source(&path)?;
                let text = std::fs::read_to_string(&path).map_err(|e| Error::include(&path, e))?;
                self.headers.push(format!("# -f {}", path.display()));
                self.compile_segment(&text)
            }
            Source::Include(path) => {
                let path = locate(&path.to_string_lossy(), &self.options.include_path);
                if !self.files.add_include(&path)? {
                    return Ok(());
                }
                let text = std::fs::read_to_string(&path).map_err(|e| Error::include(&path, e))?;
                self.headers.push(format!("# -i {}", path.display()));
                self.compile_segment(&text)
            }
        }
    }

    /// Compile the compiler's share of the command line: `-e`, `-f`, `-i`
    /// and `-v`, each with its value attached or as the next argument.
    pub fn compile_args(&mut self, args: &[String]) -> Result<()> {
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            let Some((flag, attached)) = ["-e", "-f", "-i", "-v"]
                .into_iter()
                .find_map(|flag| arg.strip_prefix(flag).map(|rest| (flag, rest)))
            else {
                return Err(Error::usage(format!("unknown compiler option: {}", arg)));
            };
            let value = if attached.is_empty() {
                i += 1;
                args.get(i)
                    .map(String::as_str)
                    .ok_or_else(|| Error::usage(format!("option {} requires an argument", flag)))?
            } else {
                attached
            };
            match flag {
                "-e" => self.add_source(Source::Inline(value))?,
                "-f" => self.add_source(Source::File(Path::new(value)))?,
                "-i" => self.add_source(Source::Include(Path::new(value)))?,
                _ => self.preset_variable(value)?,
            }
            i += 1;
        }
        Ok(())
    }

    /// Apply `-v name=value`. The variable starts the program holding `value`.
    pub fn preset_variable(&mut self, assignment: &str) -> Result<()> {
        let Some((name, value)) = assignment.split_once('=') else {
            return Err(Error::usage(format!("invalid variable assignment: {}", assignment)));
        };
        if !is_identifier(name) && split_qualified(name).is_none() {
            return Err(Error::usage(format!("invalid variable name: {}", name)));
        }
        let (key, ns) = self.namespaces.resolve(name);
        let id = match self.symbols.get(&key) {
            Some(id) => id,
            None => {
                let bare = split_qualified(name).map_or(name, |(_, bare)| bare);
                let prefix = self.namespaces.namespace(ns).target_prefix.clone();
                self.symbols.variable(&key, &prefix, bare)
            }
        };
        let symbol = self.symbols.symbol_mut(id);
        match &mut symbol.kind {
            SymbolKind::Variable(v) if !v.is_array => {
                v.built_in = false;
                v.is_scalar = true;
            }
            _ => {
                return Err(Error::semantic(format!("{} cannot be preset with -v", name)));
            }
        }
        symbol.init = preset_literal(value);
        self.headers
            .push(format!("# -v {}={}", name, header_text(value)));
        Ok(())
    }

    /// Check cross-segment consistency and produce the Python program.
    pub fn finish(&mut self) -> Result<String> {
        for (id, line) in &self.calls {
            let symbol = self.symbols.symbol(*id);
            if !matches!(symbol.kind, SymbolKind::Function(_)) {
                return Err(Error::semantic(format!(
                    "function {} called at line {} is never defined",
                    symbol.token, line
                )));
            }
        }
        Ok(self.assemble())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    fn compile_segment(&mut self, source: &str) -> Result<()> {
        let tokens = Lexer::new(
            &self.patterns,
            &mut self.symbols,
            &mut self.namespaces,
            &mut self.files,
            &self.options.include_path,
        )
        .tokenize(source)?;
        if self.options.debug {
            let dump: Vec<&str> = tokens.iter().map(|t| t.text(&self.symbols)).collect();
            self.headers.push(format!("# tokens: {}", dump.join(" ")));
        }
        self.cursor = Cursor::new(tokens, &self.symbols);
        self.program()
    }

    fn symbol(&self) -> &Symbol {
        self.symbols.symbol(self.cursor.current().id)
    }

    fn peek_symbol(&self, n: usize) -> &Symbol {
        self.symbols.symbol(self.cursor.peek(n).id)
    }

    fn advance(&mut self) {
        self.cursor.advance();
    }

    fn line(&self) -> usize {
        self.cursor.current().line()
    }

    fn is_token(&self, text: &str) -> bool {
        self.symbol().token == text
    }

    fn at_bracket(&self, bracket: Bracket) -> bool {
        self.symbol().is_bracket(bracket)
    }

    /// `;`, newline, `}` or the end of input.
    fn at_end_of_statement(&self) -> bool {
        let symbol = self.symbol();
        symbol.is_terminator() || symbol.is_end()
    }

    fn skip_newlines(&mut self) {
        while self.cursor.current().id == self.symbols.newline() {
            self.advance();
        }
    }

    /// Skip `;` and newlines between statements.
    fn skip_terminators(&mut self) {
        while matches!(self.symbol().kind, SymbolKind::Terminator { consume: true, .. }) {
            self.advance();
        }
    }

    fn expect_bracket(&mut self, bracket: Bracket, expected: &str) -> Result<()> {
        if !self.at_bracket(bracket) {
            return Err(self.syntax_error(expected));
        }
        self.advance();
        Ok(())
    }

    fn syntax_error(&self, expected: &str) -> Error {
        let token = self.cursor.current();
        let (before, after) = self.cursor.window();
        let text = |t: &Token| t.text(&self.symbols).to_string();
        let mut window: Vec<String> = before.iter().map(text).collect();
        window.push(format!(">>>{}<<<", text(&token)));
        window.extend(after.iter().map(text));
        Error::syntax(expected, text(&token), window.join(" "), token.location)
    }

    /// Emit a line, preceded by own-line comments collected since the last
    /// emit and followed by trailing ones.
    fn emit(&mut self, line: impl AsRef<str>) {
        let mut trailing = Vec::new();
        for comment in self.cursor.take_comments() {
            let symbol = self.symbols.symbol(comment.id);
            match symbol.kind {
                SymbolKind::Comment { own_line: true } => self.out.line(&symbol.emit),
                _ => trailing.push(symbol.emit.clone()),
            }
        }
        self.out.line(line);
        for comment in trailing {
            self.out.append(&format!("  {}", comment));
        }
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            line: self.line(),
            message: message.into(),
        });
    }

    fn next_temp(&mut self) -> usize {
        self.temps += 1;
        self.temps
    }

    fn require_library(&mut self, library: &str) {
        if !self.imports.iter().any(|l| l == library) {
            self.imports.push(library.to_string());
        }
    }
}

/// Keeps control characters from breaking a header comment.
fn header_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { c.escape_default().to_string() } else { c.to_string() })
        .collect()
}

/// Python literal for a `-v` value: numbers stay numbers.
fn preset_literal(value: &str) -> String {
    if let Ok(n) = value.parse::<i64>() {
        return n.to_string();
    }
    let numeric = value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if numeric {
        if let Ok(f) = value.parse::<f64>() {
            return format!("{:?}", f);
        }
    }
    python_literal(&decode_awk_string(&format!("\"{}\"", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<String> {
        let mut compiler = Compiler::new()?;
        compiler.add_source(Source::Inline(source))?;
        compiler.finish()
    }

    #[test]
    fn test_finish_without_sources() {
        let mut compiler = Compiler::new().unwrap();
        let python = compiler.finish().unwrap();
        assert!(python.contains("class AwkPyTranslated(AwkpyRuntimeWrapper):"));
        assert!(compiler.diagnostics().is_empty());
    }

    #[test]
    fn test_preset_literal() {
        assert_eq!(preset_literal("42"), "42");
        assert_eq!(preset_literal("007"), "7");
        assert_eq!(preset_literal("-3"), "-3");
        assert_eq!(preset_literal("1.5"), "1.5");
        assert_eq!(preset_literal("1e3"), "1000.0");
        assert_eq!(preset_literal("inf"), "\"inf\"");
        assert_eq!(preset_literal("a\"b"), "\"a\\\"b\"");
        assert_eq!(preset_literal("\\t"), "\"\\t\"");
        assert_eq!(preset_literal(""), "\"\"");
    }

    #[test]
    fn test_preset_variable_sets_init() {
        let mut compiler = Compiler::new().unwrap();
        compiler.preset_variable("count=3").unwrap();
        compiler.preset_variable("FS=,").unwrap();
        compiler.add_source(Source::Inline("BEGIN { print count }")).unwrap();
        let program = compiler.finish().unwrap();
        assert!(program.contains("        self.count = 3\n"));
        assert!(program.contains("        self.FS = \",\"\n"));
    }

    #[test]
    fn test_preset_namespaced_variable() {
        let mut compiler = Compiler::new().unwrap();
        compiler.preset_variable("lib::limit=10").unwrap();
        let program = compiler.finish().unwrap();
        assert!(program.contains("self.lib__limit = 10"));
    }

    #[test]
    fn test_preset_rejects_bad_assignment() {
        let mut compiler = Compiler::new().unwrap();
        assert!(matches!(compiler.preset_variable("novalue"), Err(Error::Usage { .. })));
        assert!(matches!(compiler.preset_variable("1x=2"), Err(Error::Usage { .. })));
    }

    #[test]
    fn test_preset_array_is_rejected() {
        let mut compiler = Compiler::new().unwrap();
        assert!(matches!(
            compiler.preset_variable("ARGV=1"),
            Err(Error::Semantic { .. })
        ));
    }

    #[test]
    fn test_compile_args() {
        let mut compiler = Compiler::new().unwrap();
        let args: Vec<String> = ["-vx=1", "-e", "BEGIN { print x }"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        compiler.compile_args(&args).unwrap();
        let program = compiler.finish().unwrap();
        assert!(program.contains("self.x = 1"));
        assert!(program.contains("def BEGIN(self):"));
    }

    #[test]
    fn test_compile_args_missing_value() {
        let mut compiler = Compiler::new().unwrap();
        let err = compiler.compile_args(&["-e".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Usage { .. }));
    }

    #[test]
    fn test_source_file_twice_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.awk");
        std::fs::write(&path, "BEGIN { x = 1 }\n").unwrap();
        let mut compiler = Compiler::new().unwrap();
        compiler.add_source(Source::File(&path)).unwrap();
        let err = compiler.add_source(Source::File(&path)).unwrap_err();
        assert!(matches!(err, Error::Semantic { .. }));
    }

    #[test]
    fn test_include_then_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.awk");
        std::fs::write(&path, "function one() { return 1 }\n").unwrap();
        let mut compiler = Compiler::new().unwrap();
        compiler.add_source(Source::Include(&path)).unwrap();
        compiler.add_source(Source::Include(&path)).unwrap();
        let err = compiler.add_source(Source::File(&path)).unwrap_err();
        assert!(matches!(err, Error::Semantic { .. }));
    }

    #[test]
    fn test_include_path_is_searched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.awk"), "BEGIN { y = 2 }\n").unwrap();
        let options = CompileOptions::new().include_path(vec![dir.path().to_path_buf()]);
        let mut compiler = Compiler::with_options(options).unwrap();
        compiler.add_source(Source::Include(Path::new("lib.awk"))).unwrap();
        let program = compiler.finish().unwrap();
        assert!(program.contains("self.y=2"));
    }

    #[test]
    fn test_missing_source_file() {
        let mut compiler = Compiler::new().unwrap();
        let err = compiler
            .add_source(Source::File(Path::new("/no/such/prog.awk")))
            .unwrap_err();
        assert!(matches!(err, Error::Include { .. }));
    }

    #[test]
    fn test_undefined_function_call() {
        let err = compile("BEGIN { foo(1) }").unwrap_err();
        assert!(matches!(err, Error::Semantic { .. }));
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn test_function_defined_after_use() {
        let program = compile("BEGIN { print foo(1) }\nfunction foo(a) { return a + 1 }").unwrap();
        assert!(program.contains("self.foo(1)"));
        assert!(program.contains("    def foo(self, a=AwkEmptyVarInstance):"));
    }

    #[test]
    fn test_debug_dumps_tokens() {
        let options = CompileOptions::new().debug(true);
        let mut compiler = Compiler::with_options(options).unwrap();
        compiler.add_source(Source::Inline("BEGIN { x = 1 }")).unwrap();
        let program = compiler.finish().unwrap();
        assert!(program.contains("# tokens: BEGIN { x = 1 } \\n"));
    }

    #[test]
    fn test_segments_do_not_share_namespace() {
        let mut compiler = Compiler::new().unwrap();
        compiler
            .add_source(Source::Inline("@namespace \"lib\"\nBEGIN { x = 1 }"))
            .unwrap();
        compiler.add_source(Source::Inline("BEGIN { x = 2 }")).unwrap();
        let program = compiler.finish().unwrap();
        assert!(program.contains("self.lib__x=1"));
        assert!(program.contains("self.x=2"));
    }

    #[test]
    fn test_syntax_error_window() {
        let err = compile("BEGIN { x = ( 1 + }").unwrap_err();
        match err {
            Error::Syntax { found, window, .. } => {
                assert_eq!(found, "}");
                assert!(window.contains(">>>}<<<"));
                assert!(window.starts_with("x = ( 1 +") || window.contains("( 1 + >>>}<<<"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
