mod tokens;

pub use tokens::{Token, decode_awk_string, python_literal};

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};
use crate::namespace::{NamespaceRegistry, is_identifier, split_qualified};
use crate::symbols::{Symbol, SymbolId, SymbolKind, SymbolTable};

/// Number of end-of-input sentinels closing every token stream.
pub const END_PADDING: usize = 3;

const REGEX_BODY: &str = r"(?:\[[^\]]*\]|\\.|\\$|[^/\\\[]|\[)*(?:/|$)";

/// The lexer's compiled patterns, built once per compiler.
#[derive(Debug, Clone)]
pub struct TokenPatterns {
    token: Regex,
    line_start_regex: Regex,
}

impl TokenPatterns {
    pub fn new() -> Result<Self> {
        let token = [
            r"(?P<comment>#.*$)",
            r#"(?P<string>"(?:[^"\\]|\\.|\\$)*(?:"|$))"#,
            r"(?P<chars>'(?:[^'\\]|\\.|\\$)*(?:'|$))",
            &format!(
                r"(?P<regex>(?:!~|&&|\|\||[=!<>]=|\*\*=|[-+*%^]=|[~(,{{}};!?:=])\s*/{})",
                REGEX_BODY
            ),
            r"(?P<ident>@?[A-Za-z_][A-Za-z_0-9]*(?:::[A-Za-z_][A-Za-z_0-9]*)?)",
            r"(?P<field>\$[0-9]+)",
            r"(?P<number>-?(?:0[xX][0-9a-fA-F]+|[0-9]+(?:\.[0-9]*)?(?:[eE][-+]?[0-9]+)?|\.[0-9]+(?:[eE][-+]?[0-9]+)?))",
            r"(?P<op>!~|\+\+|--|\*\*=|\*\*|\|\||&&|>>|[-+*/%^=!<>]=|[-+*/%^!~(){}\[\],:;?$<>=|])",
        ]
        .join("|");
        Ok(Self {
            token: Regex::new(&token)?,
            line_start_regex: Regex::new(&format!("^/{}", REGEX_BODY))?,
        })
    }
}

/// Files seen so far, by loading mode.
#[derive(Debug, Clone, Default)]
pub struct SourceFiles {
    sources: Vec<PathBuf>,
    includes: Vec<PathBuf>,
}

impl SourceFiles {
    /// Register a one-shot source file (`-f`).
    pub fn add_source(&mut self, path: &Path) -> Result<()> {
        let key = identity(path);
        if self.includes.contains(&key) {
            return Err(Error::semantic(format!(
                "{} is already included, it cannot also be a source file",
                path.display()
            )));
        }
        if self.sources.contains(&key) {
            return Err(Error::semantic(format!(
                "{} is given as a source file more than once",
                path.display()
            )));
        }
        self.sources.push(key);
        Ok(())
    }

    /// Register an idempotent include. Returns false if it was already included.
    pub fn add_include(&mut self, path: &Path) -> Result<bool> {
        let key = identity(path);
        if self.sources.contains(&key) {
            return Err(Error::semantic(format!(
                "{} is a source file, it cannot also be included",
                path.display()
            )));
        }
        if self.includes.contains(&key) {
            return Ok(false);
        }
        self.includes.push(key);
        Ok(true)
    }
}

fn identity(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Find `name` as given, else in the include search path.
pub fn locate(name: &str, include_path: &[PathBuf]) -> PathBuf {
    let given = PathBuf::from(name);
    if given.exists() || given.is_absolute() {
        return given;
    }
    include_path
        .iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
        .unwrap_or(given)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Namespace,
    Include,
}

/// Regex-driven AWK tokenizer.
///
/// Identifiers are namespace-decorated and interned as they are seen, so the
/// lexer needs the compiler's symbol table and namespace registry.
pub struct Lexer<'c> {
    patterns: &'c TokenPatterns,
    symbols: &'c mut SymbolTable,
    namespaces: &'c mut NamespaceRegistry,
    files: &'c mut SourceFiles,
    include_path: &'c [PathBuf],
}

impl<'c> Lexer<'c> {
    pub fn new(
        patterns: &'c TokenPatterns,
        symbols: &'c mut SymbolTable,
        namespaces: &'c mut NamespaceRegistry,
        files: &'c mut SourceFiles,
        include_path: &'c [PathBuf],
    ) -> Self {
        Self {
            patterns,
            symbols,
            namespaces,
            files,
            include_path,
        }
    }

    /// Tokenize one source segment. The segment starts in the default namespace
    /// and the caller's namespace is restored afterwards.
    pub fn tokenize(&mut self, source: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::with_capacity((source.len() / 4 + 1).min(4096));
        let default = self.namespaces.default_namespace();
        let saved = self.namespaces.set_current(default);
        let result = self.lex_lines(source, &mut tokens);
        self.namespaces.set_current(saved);
        result?;

        let line = tokens.last().map_or(1, |t| t.line());
        let end = self.symbols.end_of_input();
        for _ in 0..END_PADDING {
            tokens.push(Token::new(end, line, 0, true));
        }
        Ok(tokens)
    }

    fn lex_lines(&mut self, source: &str, out: &mut Vec<Token>) -> Result<()> {
        let lines: Vec<&str> = source.lines().collect();
        let mut nr = 0;
        while nr < lines.len() {
            let mut line = lines[nr].trim().to_string();
            let mut pos = 0;
            let mut first = true;
            let mut spaced = true;
            let mut directive: Option<Directive> = None;

            while pos < line.len() {
                let rest = &line[pos..];
                let trimmed = rest.trim_start();
                if trimmed.len() != rest.len() {
                    pos += rest.len() - trimmed.len();
                    spaced = true;
                    continue;
                }
                let line_no = nr + 1;
                let column = pos + 1;

                if rest == "\\" {
                    // backslash-newline joins physical lines
                    nr += 1;
                    line = lines.get(nr).map_or(String::new(), |l| l.trim().to_string());
                    pos = 0;
                    spaced = true;
                    continue;
                }

                let found = if first {
                    self.patterns
                        .line_start_regex
                        .find(rest)
                        .map(|m| (m.start(), m.end(), Some("regex")))
                } else {
                    None
                };
                let found = found.or_else(|| {
                    self.patterns.token.captures(rest).and_then(|caps| {
                        let m = caps.get(0)?;
                        let group = ["comment", "string", "chars", "regex"]
                            .into_iter()
                            .find(|name| caps.name(name).is_some());
                        Some((m.start(), m.end(), group))
                    })
                });

                let Some((start, end, group)) = found else {
                    return Err(Error::lexer(format!("unrecognised token {}", rest), line_no, column));
                };
                if start > 0 {
                    let raw = rest[..start].trim_end().to_string();
                    return Err(Error::lexer(format!("unrecognised token {}", raw), line_no, column));
                }

                let text = rest[..end].to_string();
                if group == Some("comment") {
                    let id = self.symbols.insert_comment(&text, first);
                    out.push(Token::new(id, line_no, column, spaced));
                    pos = line.len();
                    continue;
                }

                let (prefix, literal) = match text.find('/') {
                    Some(slash) if group == Some("regex") => (text[..slash].trim(), &text[slash..]),
                    _ => ("", text.as_str()),
                };

                if group.is_some() && is_unterminated(literal) {
                    nr += 1;
                    let Some(next) = lines.get(nr) else {
                        let what = if literal.starts_with('/') { "regex" } else { "string" };
                        return Err(Error::lexer(format!("unterminated {} {}", what, literal), line_no, column));
                    };
                    let joined = text.strip_suffix('\\').unwrap_or(&text);
                    line = format!("{}{}{}", &line[..pos], joined, next);
                    continue;
                }

                if !prefix.is_empty() {
                    self.emit(prefix, line_no, column, spaced, &mut directive, out)?;
                    spaced = literal.len() < text.len() - prefix.len();
                }
                let literal_column = column + text.len() - literal.len();
                self.emit(literal, line_no, literal_column, spaced, &mut directive, out)?;

                pos += end;
                first = false;
                spaced = false;
            }

            if let Some(pending) = directive {
                let name = match pending {
                    Directive::Namespace => "@namespace",
                    Directive::Include => "@include",
                };
                return Err(Error::lexer(format!("{} must be followed by a string", name), nr + 1, 1));
            }
            out.push(Token::new(self.symbols.newline(), nr + 1, line.len() + 1, true));
            nr += 1;
        }
        Ok(())
    }

    /// Handle directives, then intern and push one raw token.
    fn emit(
        &mut self,
        raw: &str,
        line: usize,
        column: usize,
        spaced: bool,
        directive: &mut Option<Directive>,
        out: &mut Vec<Token>,
    ) -> Result<()> {
        match raw {
            "@namespace" => {
                *directive = Some(Directive::Namespace);
                return Ok(());
            }
            "@include" => {
                *directive = Some(Directive::Include);
                return Ok(());
            }
            _ => {}
        }
        if let Some(pending) = directive.take() {
            if !raw.starts_with('"') {
                return Err(Error::lexer(
                    format!("expected a quoted name after directive, found {}", raw),
                    line,
                    column,
                ));
            }
            let name = decode_awk_string(raw);
            return match pending {
                Directive::Namespace => {
                    self.namespaces.set_current_named(&name);
                    Ok(())
                }
                Directive::Include => self.include(&name, out),
            };
        }
        let id = self.classify(raw, line, column)?;
        out.push(Token::new(id, line, column, spaced));
        Ok(())
    }

    fn include(&mut self, name: &str, out: &mut Vec<Token>) -> Result<()> {
        let path = locate(name, self.include_path);
        if !self.files.add_include(&path)? {
            return Ok(());
        }
        let source = std::fs::read_to_string(&path).map_err(|e| Error::include(&path, e))?;
        let default = self.namespaces.default_namespace();
        let saved = self.namespaces.set_current(default);
        let result = self.lex_lines(&source, out);
        self.namespaces.set_current(saved);
        result
    }

    /// Map a raw token to its symbol, creating entries for first sightings.
    fn classify(&mut self, raw: &str, line: usize, column: usize) -> Result<SymbolId> {
        if is_identifier(raw) || split_qualified(raw).is_some() {
            if self.symbols.is_reserved(raw) {
                if let Some(id) = self.symbols.get(raw) {
                    return Ok(id);
                }
            }
            let (key, ns) = self.namespaces.resolve(raw);
            if let Some(id) = self.symbols.get(&key) {
                return Ok(id);
            }
            let name = split_qualified(raw).map_or(raw, |(_, name)| name);
            let prefix = self.namespaces.namespace(ns).target_prefix.clone();
            return Ok(self.symbols.variable(&key, &prefix, name));
        }

        if let Some(id) = self.symbols.get(raw) {
            return Ok(id);
        }

        let mut chars = raw.chars();
        let first = chars.next().unwrap_or(' ');
        let second = chars.next().unwrap_or(' ');
        let numeric = first.is_ascii_digit()
            || (first == '.' && second.is_ascii_digit())
            || (first == '-' && (second.is_ascii_digit() || second == '.'));

        let id = if numeric {
            self.symbols
                .insert(Symbol::new(raw, SymbolKind::Number, normalize_number(raw)))
        } else if first == '"' || first == '\'' {
            self.symbols.insert(Symbol::new(
                raw,
                SymbolKind::String,
                python_literal(&decode_awk_string(raw)),
            ))
        } else if let Some(index) = raw.strip_prefix('$').and_then(|n| n.parse::<usize>().ok()) {
            self.symbols.insert(Symbol::new(
                raw,
                SymbolKind::FieldRef(Some(index)),
                format!("self._FLDS[{}]", index),
            ))
        } else if first == '/' {
            let body = raw
                .strip_prefix('/')
                .and_then(|r| r.strip_suffix('/'))
                .unwrap_or(&raw[1..]);
            self.symbols.new_regex(body)
        } else {
            return Err(Error::lexer(
                format!("unrecognised token {} near line {}", raw, line),
                line,
                column,
            ));
        };
        Ok(id)
    }
}

/// A string or regex literal whose closing delimiter is missing on this line.
fn is_unterminated(text: &str) -> bool {
    let Some(open) = text.chars().next().filter(|c| matches!(c, '"' | '\'' | '/')) else {
        return false;
    };
    let body = &text[1..];
    let Some(inner) = body.strip_suffix(open) else {
        return true;
    };
    inner.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Python rejects leading zeros in integer literals; AWK reads them as decimal.
fn normalize_number(text: &str) -> String {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    if digits.starts_with("0x") || digits.starts_with("0X") {
        return text.to_string();
    }
    let split = digits.find(['.', 'e', 'E']).unwrap_or(digits.len());
    let (int_part, tail) = digits.split_at(split);
    let trimmed = int_part.trim_start_matches('0');
    let int_part = if trimmed.is_empty() && !int_part.is_empty() {
        "0"
    } else {
        trimmed
    };
    format!("{}{}{}", sign, int_part, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        patterns: TokenPatterns,
        symbols: SymbolTable,
        namespaces: NamespaceRegistry,
        files: SourceFiles,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                patterns: TokenPatterns::new().unwrap(),
                symbols: SymbolTable::new(),
                namespaces: NamespaceRegistry::new(),
                files: SourceFiles::default(),
            }
        }

        fn lex(&mut self, source: &str) -> Result<Vec<Token>> {
            let mut lexer = Lexer::new(
                &self.patterns,
                &mut self.symbols,
                &mut self.namespaces,
                &mut self.files,
                &[],
            );
            lexer.tokenize(source)
        }

        fn texts(&mut self, source: &str) -> Vec<String> {
            let tokens = self.lex(source).unwrap();
            tokens
                .iter()
                .map(|t| t.text(&self.symbols).to_string())
                .collect()
        }

        fn emit_of(&self, token: &Token) -> &str {
            &self.symbols.symbol(token.id).emit
        }
    }

    #[test]
    fn test_simple_tokens() {
        let mut fx = Fixture::new();
        let texts = fx.texts("{ print $1 }");
        assert_eq!(
            texts,
            vec!["{", "print", "$1", "}", "\\n", "<end of input>", "<end of input>", "<end of input>"]
        );
    }

    #[test]
    fn test_three_end_sentinels() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("").unwrap();
        assert_eq!(tokens.len(), END_PADDING);
        assert!(tokens.iter().all(|t| fx.symbols.symbol(t.id).is_end()));
    }

    #[test]
    fn test_identifiers_are_interned() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("x = x + 1").unwrap();
        assert_eq!(tokens[0].id, tokens[2].id);
        assert_eq!(fx.emit_of(&tokens[0]), "self.x");
    }

    #[test]
    fn test_regex_after_match_operator() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("$1 ~ /ab+c/").unwrap();
        assert_eq!(tokens[1].text(&fx.symbols), "~");
        assert!(matches!(fx.symbols.symbol(tokens[2].id).kind, SymbolKind::Regex));
        assert_eq!(fx.emit_of(&tokens[2]), "self._re_0");
        assert_eq!(fx.symbols.symbol(tokens[2].id).init, "re.compile(r\"(?:ab+c)\")");
    }

    #[test]
    fn test_regex_at_line_start_and_division() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("/x/ { y = a / b / c }").unwrap();
        assert!(matches!(fx.symbols.symbol(tokens[0].id).kind, SymbolKind::Regex));
        let slashes = tokens
            .iter()
            .filter(|t| t.text(&fx.symbols) == "/")
            .count();
        assert_eq!(slashes, 2);
    }

    #[test]
    fn test_regex_after_assignment_and_comparison() {
        let mut fx = Fixture::new();
        let cases = [
            ("x = /foo/", "="),
            ("x == /foo/", "=="),
            ("x != /foo/", "!="),
            ("x += /foo/", "+="),
        ];
        for (source, operator) in cases {
            let tokens = fx.lex(source).unwrap();
            assert_eq!(tokens[1].text(&fx.symbols), operator, "{}", source);
            assert!(matches!(fx.symbols.symbol(tokens[2].id).kind, SymbolKind::Regex), "{}", source);
        }
        let tokens = fx.lex("x = a / b / c").unwrap();
        let slashes = tokens.iter().filter(|t| t.text(&fx.symbols) == "/").count();
        assert_eq!(slashes, 2);
        let tokens = fx.lex("x /= 2; y = 4 / 2").unwrap();
        assert!(tokens.iter().all(|t| !matches!(fx.symbols.symbol(t.id).kind, SymbolKind::Regex)));
    }

    #[test]
    fn test_regex_with_slash_in_brackets() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("split(s, parts, /[/,]/)").unwrap();
        let regex = tokens
            .iter()
            .find(|t| matches!(fx.symbols.symbol(t.id).kind, SymbolKind::Regex))
            .unwrap();
        assert_eq!(fx.symbols.symbol(regex.id).token, "/[/,]/");
    }

    #[test]
    fn test_same_regex_text_gets_new_entries() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("$1 ~ /a/ || $2 ~ /a/").unwrap();
        let regexes: Vec<_> = tokens
            .iter()
            .filter(|t| matches!(fx.symbols.symbol(t.id).kind, SymbolKind::Regex))
            .collect();
        assert_eq!(regexes.len(), 2);
        assert_ne!(regexes[0].id, regexes[1].id);
    }

    #[test]
    fn test_numbers() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("x = 42 + 3.14 + 007 + .5 + 1e3").unwrap();
        let numbers: Vec<&str> = tokens
            .iter()
            .filter(|t| matches!(fx.symbols.symbol(t.id).kind, SymbolKind::Number))
            .map(|t| fx.emit_of(t))
            .collect();
        assert_eq!(numbers, vec!["42", "3.14", "7", ".5", "1e3"]);
    }

    #[test]
    fn test_minus_folds_into_number() {
        let mut fx = Fixture::new();
        let texts = fx.texts("a-1");
        assert_eq!(&texts[..2], &["a", "-1"]);
        let texts = fx.texts("i--");
        assert_eq!(&texts[..2], &["i", "--"]);
        let texts = fx.texts("x -= 2");
        assert_eq!(&texts[..3], &["x", "-=", "2"]);
    }

    #[test]
    fn test_strings() {
        let mut fx = Fixture::new();
        let tokens = fx.lex(r#"print "hello\tworld", 'c'"#).unwrap();
        assert_eq!(fx.emit_of(&tokens[1]), "\"hello\\tworld\"");
        assert_eq!(fx.emit_of(&tokens[3]), "\"c\"");
    }

    #[test]
    fn test_multi_line_string_is_stitched() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("print \"abc\\\ndef\"").unwrap();
        assert_eq!(fx.symbols.symbol(tokens[1].id).token, "\"abcdef\"");
        assert_eq!(tokens[2].text(&fx.symbols), "\\n");
    }

    #[test]
    fn test_multi_line_regex_is_stitched() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("$0 ~ /ab\ncd/ { }").unwrap();
        assert_eq!(fx.symbols.symbol(tokens[2].id).token, "/abcd/");
    }

    #[test]
    fn test_unterminated_string_at_end_of_file() {
        let mut fx = Fixture::new();
        let err = fx.lex("print \"abc").unwrap_err();
        assert!(matches!(err, Error::Lexer { .. }));
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn test_backslash_continuation() {
        let mut fx = Fixture::new();
        let texts = fx.texts("x = 1 + \\\n 2");
        assert_eq!(&texts[..6], &["x", "=", "1", "+", "2", "\\n"]);
    }

    #[test]
    fn test_comments_are_tagged() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("# own line\nx = 1 # trailing").unwrap();
        match fx.symbols.symbol(tokens[0].id).kind {
            SymbolKind::Comment { own_line } => assert!(own_line),
            ref other => panic!("unexpected {:?}", other),
        }
        let trailing = tokens
            .iter()
            .filter(|t| matches!(fx.symbols.symbol(t.id).kind, SymbolKind::Comment { .. }))
            .nth(1)
            .unwrap();
        assert_eq!(
            fx.symbols.symbol(trailing.id).kind,
            SymbolKind::Comment { own_line: false }
        );
        assert_eq!(fx.emit_of(trailing), "# trailing");
    }

    #[test]
    fn test_line_tracking() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("x\ny\n\nz").unwrap();
        let lines: Vec<usize> = tokens.iter().map(|t| t.line()).collect();
        assert_eq!(&lines[..6], &[1, 1, 2, 2, 3, 4]);
    }

    #[test]
    fn test_spacing_is_recorded() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("f(x) g (y)").unwrap();
        assert!(!tokens[1].spaced);
        assert!(tokens[5].spaced);
    }

    #[test]
    fn test_namespace_directive() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("@namespace \"smurf\"\nx = NR").unwrap();
        let x = tokens
            .iter()
            .find(|t| t.text(&fx.symbols) == "smurf::x")
            .unwrap();
        assert_eq!(fx.emit_of(x), "self.smurf__x");
        assert!(tokens.iter().any(|t| t.text(&fx.symbols) == "NR"));
        // segment ends back in the default namespace
        assert_eq!(fx.namespaces.current(), fx.namespaces.default_namespace());
    }

    #[test]
    fn test_qualified_identifier() {
        let mut fx = Fixture::new();
        let tokens = fx.lex("lib::count++").unwrap();
        assert_eq!(fx.emit_of(&tokens[0]), "self.lib__count");
    }

    #[test]
    fn test_keywords_not_decorated_in_namespace() {
        let mut fx = Fixture::new();
        let texts = fx.texts("@namespace \"q\"\nprint length(x)");
        assert_eq!(&texts[1..6], &["print", "length", "(", "q::x", ")"]);
    }

    #[test]
    fn test_unrecognised_token() {
        let mut fx = Fixture::new();
        let err = fx.lex("x = 1 @ 2").unwrap_err();
        assert!(matches!(err, Error::Lexer { .. }));
        assert!(err.to_string().contains("unrecognised token"));
    }

    #[test]
    fn test_include_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.awk");
        std::fs::write(&lib, "BEGIN { a = a + 1 }\n").unwrap();
        let source = format!(
            "@include \"{0}\"\n@include \"{0}\"\nBEGIN {{ exit a }}",
            lib.display()
        );
        let mut fx = Fixture::new();
        let texts = fx.texts(&source);
        assert_eq!(texts.iter().filter(|t| *t == "BEGIN").count(), 2);
    }

    #[test]
    fn test_include_conflicts_with_source() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.awk");
        std::fs::write(&lib, "BEGIN { }\n").unwrap();
        let mut fx = Fixture::new();
        fx.files.add_source(&lib).unwrap();
        let err = fx
            .lex(&format!("@include \"{}\"", lib.display()))
            .unwrap_err();
        assert!(matches!(err, Error::Semantic { .. }));
    }

    #[test]
    fn test_include_restores_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.awk");
        std::fs::write(&lib, "BEGIN { a = 1 }\n").unwrap();
        let source = format!(
            "@namespace \"q\"\n@include \"{}\"\nBEGIN {{ a = 7 }}",
            lib.display()
        );
        let mut fx = Fixture::new();
        let texts = fx.texts(&source);
        assert!(texts.contains(&"a".to_string()));
        assert!(texts.contains(&"q::a".to_string()));
    }

    #[test]
    fn test_missing_include() {
        let mut fx = Fixture::new();
        let err = fx.lex("@include \"/no/such/file.awk\"").unwrap_err();
        assert!(matches!(err, Error::Include { .. }));
    }

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number("007"), "7");
        assert_eq!(normalize_number("0"), "0");
        assert_eq!(normalize_number("-010.5"), "-10.5");
        assert_eq!(normalize_number("0.25"), "0.25");
        assert_eq!(normalize_number("0x1F"), "0x1F");
    }

    #[test]
    fn test_is_unterminated() {
        assert!(is_unterminated("\"abc"));
        assert!(is_unterminated("\"abc\\\""));
        assert!(!is_unterminated("\"abc\\\\\""));
        assert!(!is_unterminated("/x/"));
        assert!(is_unterminated("/x"));
        assert!(!is_unterminated("abc"));
    }
}
