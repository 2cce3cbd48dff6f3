//! Symbol table: one entry per distinct token, holding how it is classified
//! and how it is rendered in Python.

mod entry;

pub use entry::{
    ASSIGNMENT_PRECEDENCE, BinaryOp, Bracket, CONCAT_PRECEDENCE, Function, Keyword, Section,
    Strategy, Symbol, SymbolId, SymbolKind, UnaryOp, Variable,
};

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Initializer of a never-assigned scalar.
pub const EMPTY_VALUE: &str = "AwkEmptyVarInstance";

/// Initializer of an associative array.
pub const EMPTY_ARRAY: &str = "defaultdict(AwkEmptyVar.instance)";

/// Key of the newline terminator token.
pub const NEWLINE: &str = "\n";

const BUILTIN_SCALARS: &[&str] = &[
    "ARGC", "ARGIND", "CONVFMT", "FILENAME", "FNR", "FS", "NF", "NR", "OFMT", "OFS", "ORS",
    "RS", "RLENGTH", "RSTART",
];

const BUILTIN_ARRAYS: &[&str] = &["ARGV", "ENVIRON"];

/// Translator knobs the runtime reads, in the `awkpy` namespace.
const AWKPY_SCALARS: &[&str] = &["wait_for_pipe_close", "support_RS", "blocksize", "local_environ"];

const BUILTIN_FUNCTIONS: &[(&str, &str, Strategy)] = &[
    ("atan2", "math.atan2", Strategy::Call),
    ("close", "self._close_file", Strategy::Call),
    ("cos", "math.cos", Strategy::Call),
    ("exp", "math.exp", Strategy::Call),
    ("fflush", "self.awkpy__fflush", Strategy::Call),
    ("gsub", "gsub", Strategy::Sub { global: true }),
    ("index", "find", Strategy::Index),
    ("int", "int", Strategy::Call),
    ("length", "len", Strategy::Length),
    ("log", "math.log", Strategy::Call),
    ("match", "self._match", Strategy::Match),
    ("rand", "random.random", Strategy::Call),
    ("sin", "math.sin", Strategy::Call),
    ("split", "self._to_array", Strategy::Split),
    ("sprintf", "self.sprintf", Strategy::Sprintf),
    ("sqrt", "math.sqrt", Strategy::Call),
    ("srand", "random.seed", Strategy::Call),
    ("sub", "sub", Strategy::Sub { global: false }),
    ("substr", "self._substr", Strategy::Substr),
    ("system", "self._system", Strategy::Call),
    ("tolower", "lower", Strategy::Method("lower")),
    ("toupper", "upper", Strategy::Method("upper")),
    ("awkpy::to_string", "self.awkpy__to_string", Strategy::Call),
];

const KEYWORDS: &[(&str, Keyword, &str)] = &[
    ("break", Keyword::Break, "break"),
    ("continue", Keyword::Continue, "continue"),
    ("delete", Keyword::Delete, "del"),
    ("do", Keyword::Do, "while"),
    ("exit", Keyword::Exit, "raise AwkExit"),
    ("for", Keyword::For, "for"),
    ("function", Keyword::Function, "def"),
    ("getline", Keyword::Getline, "getline"),
    ("if", Keyword::If, "if"),
    ("next", Keyword::Next, "raise AwkNext"),
    ("nextfile", Keyword::NextFile, "raise AwkNextFile"),
    ("print", Keyword::Print, "print"),
    ("printf", Keyword::Printf, "print"),
    ("return", Keyword::Return, "return"),
    ("while", Keyword::While, "while"),
];

const SECTIONS: &[(&str, Section)] = &[
    ("BEGIN", Section::Begin),
    ("BEGINFILE", Section::BeginFile),
    ("ENDFILE", Section::EndFile),
    ("END", Section::End),
];

/// (token, python, source precedence, target precedence, kind)
const BINARY_OPERATORS: &[(&str, &str, u8, u8, BinaryOp)] = &[
    ("**", "**", 4, 4, BinaryOp::Arithmetic),
    ("^", "**", 4, 4, BinaryOp::Arithmetic),
    ("*", "*", 6, 6, BinaryOp::Arithmetic),
    ("/", "/", 6, 6, BinaryOp::Arithmetic),
    ("%", "%", 6, 6, BinaryOp::Arithmetic),
    ("<", "<", 9, 14, BinaryOp::Comparison),
    ("<=", "<=", 9, 14, BinaryOp::Comparison),
    ("==", "==", 9, 14, BinaryOp::Comparison),
    ("!=", "!=", 9, 14, BinaryOp::Comparison),
    (">", ">", 9, 14, BinaryOp::Comparison),
    (">=", ">=", 9, 14, BinaryOp::Comparison),
    ("|", "|", 9, 9, BinaryOp::Pipe),
    (">>", ">>", 9, 9, BinaryOp::Append),
    ("~", "~", 15, 15, BinaryOp::Match),
    ("!~", "!~", 15, 15, BinaryOp::NotMatch),
    ("in", " in ", 16, 16, BinaryOp::In),
    ("&&", " and ", 17, 17, BinaryOp::And),
    ("||", " or ", 18, 18, BinaryOp::Or),
    ("?", "?", 19, 19, BinaryOp::Question),
    (":", ":", 19, 19, BinaryOp::Colon),
    ("=", "=", 20, 20, BinaryOp::Assign),
    ("+=", "+=", 20, 20, BinaryOp::Assign),
    ("-=", "-=", 20, 20, BinaryOp::Assign),
    ("*=", "*=", 20, 20, BinaryOp::Assign),
    ("/=", "/=", 20, 20, BinaryOp::Assign),
    ("%=", "%=", 20, 20, BinaryOp::Assign),
    ("^=", "**=", 20, 20, BinaryOp::Assign),
    ("**=", "**=", 20, 20, BinaryOp::Assign),
];

/// Arena of symbols plus the key index. Entries are never removed, only
/// reclassified in place.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: Vec<Symbol>,
    index: HashMap<String, SymbolId>,
    string_regexes: HashMap<SymbolId, SymbolId>,
    regex_count: usize,
    range_count: usize,
    end_of_input: SymbolId,
    newline: SymbolId,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            entries: Vec::with_capacity(128),
            index: HashMap::with_capacity(128),
            string_regexes: HashMap::new(),
            regex_count: 0,
            range_count: 0,
            end_of_input: SymbolId(0),
            newline: SymbolId(0),
        };
        table.populate();
        table
    }

    fn populate(&mut self) {
        self.end_of_input = self.push(Symbol::new("<end of input>", SymbolKind::EndOfInput, ""));

        let brackets = [
            ("{", Bracket::OpenBrace, ":"),
            ("(", Bracket::OpenParen, "("),
            (")", Bracket::CloseParen, ")"),
            ("[", Bracket::OpenBracket, "["),
            ("]", Bracket::CloseBracket, "]"),
        ];
        for (token, bracket, emit) in brackets {
            self.insert(Symbol::new(token, SymbolKind::Bracket(bracket), emit).with_precedence(1, 1));
        }

        self.insert(Symbol::new(
            "}",
            SymbolKind::Terminator {
                consume: false,
                collapse: false,
            },
            "",
        ));
        self.insert(Symbol::new(
            ";",
            SymbolKind::Terminator {
                consume: true,
                collapse: false,
            },
            "",
        ));
        self.newline = self.insert(Symbol::new(
            NEWLINE,
            SymbolKind::Terminator {
                consume: true,
                collapse: true,
            },
            "",
        ));
        self.insert(Symbol::new(",", SymbolKind::Comma, ","));

        self.insert(Symbol::new("$", SymbolKind::FieldRef(None), "self._FLDS").with_precedence(2, 2));
        self.insert(Symbol::new("$0", SymbolKind::FieldRef(Some(0)), "self._FLDS[0]"));

        self.insert(
            Symbol::new("++", SymbolKind::Unary(UnaryOp::Increment), "inc").with_precedence(3, 3),
        );
        self.insert(
            Symbol::new("--", SymbolKind::Unary(UnaryOp::Decrement), "dec").with_precedence(3, 3),
        );
        self.insert(Symbol::new("!", SymbolKind::Unary(UnaryOp::Not), "not").with_precedence(5, 14));

        for (token, unary, binary) in [("-", UnaryOp::Minus, 7), ("+", UnaryOp::Plus, 7)] {
            let u = self.push(Symbol::new(token, SymbolKind::Unary(unary), token).with_precedence(5, 5));
            let b = self.push(
                Symbol::new(token, SymbolKind::Binary(BinaryOp::Arithmetic), token)
                    .with_precedence(binary, binary),
            );
            self.insert(Symbol::new(token, SymbolKind::Ambiguous { unary: u, binary: b }, token));
        }

        for (token, emit, source, target, op) in BINARY_OPERATORS {
            self.insert(Symbol::new(*token, SymbolKind::Binary(*op), *emit).with_precedence(*source, *target));
        }

        for name in BUILTIN_SCALARS {
            self.insert_builtin_variable(name, format!("self.{}", name), false);
        }
        for name in BUILTIN_ARRAYS {
            self.insert_builtin_variable(name, format!("self.{}", name), true);
        }
        for name in AWKPY_SCALARS {
            self.insert_builtin_variable(&format!("awkpy::{}", name), format!("self.awkpy__{}", name), false);
        }

        for (token, emit, strategy) in BUILTIN_FUNCTIONS {
            let library = emit
                .split_once('.')
                .map(|(module, _)| module)
                .filter(|module| *module != "self")
                .map(str::to_string);
            self.insert(Symbol::new(
                *token,
                SymbolKind::Function(Function {
                    strategy: *strategy,
                    library,
                }),
                *emit,
            ));
        }

        for (token, keyword, emit) in KEYWORDS {
            self.insert(Symbol::new(*token, SymbolKind::Statement(*keyword), *emit));
        }
        self.insert(Symbol::new("else", SymbolKind::Reserved, "else"));

        for (token, section) in SECTIONS {
            self.insert(Symbol::new(*token, SymbolKind::Section(*section), section.method_name()));
        }
    }

    fn insert_builtin_variable(&mut self, token: &str, emit: String, is_array: bool) {
        self.insert(Symbol::new(
            token,
            SymbolKind::Variable(Variable {
                built_in: true,
                is_array,
                is_scalar: !is_array,
            }),
            emit,
        ));
    }

    fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.entries.len());
        self.entries.push(symbol);
        id
    }

    /// Add an entry and index it by its token.
    pub fn insert(&mut self, symbol: Symbol) -> SymbolId {
        let key = symbol.token.clone();
        let id = self.push(symbol);
        self.index.insert(key, id);
        id
    }

    pub fn get(&self, token: &str) -> Option<SymbolId> {
        self.index.get(token).copied()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.entries[id.0]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.entries[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.entries.iter().enumerate().map(|(i, s)| (SymbolId(i), s))
    }

    pub fn end_of_input(&self) -> SymbolId {
        self.end_of_input
    }

    pub fn newline(&self) -> SymbolId {
        self.newline
    }

    /// Words that are never namespace-decorated.
    pub fn is_reserved(&self, word: &str) -> bool {
        self.get(word).is_some_and(|id| {
            matches!(
                self.symbol(id).kind,
                SymbolKind::Statement(_)
                    | SymbolKind::Reserved
                    | SymbolKind::Section(_)
                    | SymbolKind::Binary(BinaryOp::In)
                    | SymbolKind::Function(Function {
                        strategy: Strategy::Call
                            | Strategy::Method(_)
                            | Strategy::Index
                            | Strategy::Match
                            | Strategy::Length
                            | Strategy::Substr
                            | Strategy::Split
                            | Strategy::Sub { .. }
                            | Strategy::Sprintf,
                        ..
                    })
            )
        })
    }

    /// Intern a user variable. `target_prefix` comes from its namespace.
    pub fn variable(&mut self, key: &str, target_prefix: &str, name: &str) -> SymbolId {
        if let Some(id) = self.get(key) {
            return id;
        }
        self.insert(
            Symbol::new(
                key,
                SymbolKind::Variable(Variable::default()),
                format!("{}{}", target_prefix, python_name(name)),
            )
            .with_init(EMPTY_VALUE),
        )
    }

    /// Comments are carried through to the output, never looked up.
    pub fn insert_comment(&mut self, text: &str, own_line: bool) -> SymbolId {
        self.push(Symbol::new(text, SymbolKind::Comment { own_line }, text))
    }

    /// A regex literal. Every occurrence gets its own compiled instance.
    pub fn new_regex(&mut self, body: &str) -> SymbolId {
        let seq = self.regex_count;
        self.regex_count += 1;
        self.push(
            Symbol::new(format!("/{}/", body), SymbolKind::Regex, format!("self._re_{}", seq))
                .with_init(format!("re.compile(r\"(?:{})\")", escape_raw_quotes(body))),
        )
    }

    /// The compiled regex standing in for a string literal used as a pattern.
    pub fn regex_for_string(&mut self, string: SymbolId) -> SymbolId {
        if let Some(id) = self.string_regexes.get(&string) {
            return *id;
        }
        let literal = self.symbol(string).emit.clone();
        let seq = self.regex_count;
        self.regex_count += 1;
        let id = self.push(
            Symbol::new(literal.clone(), SymbolKind::Regex, format!("self._re_{}", seq))
                .with_init(format!("re.compile(\"(?:\" + {} + \")\")", literal)),
        );
        self.string_regexes.insert(string, id);
        id
    }

    /// State flag for one `start, end` range pattern.
    pub fn new_range_flag(&mut self) -> SymbolId {
        let seq = self.range_count;
        self.range_count += 1;
        self.push(
            Symbol::new(
                format!("<range {}>", seq),
                SymbolKind::Variable(Variable {
                    built_in: false,
                    is_array: false,
                    is_scalar: true,
                }),
                format!("self._range_{}", seq),
            )
            .with_init("False"),
        )
    }

    /// Classify a variable as an array for the rest of compilation.
    pub fn mark_array(&mut self, id: SymbolId, line: usize) -> Result<()> {
        let symbol = self.symbol_mut(id);
        if let SymbolKind::Variable(v) = &mut symbol.kind {
            if v.is_scalar {
                return Err(both_error(&symbol.token, line));
            }
            if !v.is_array {
                v.is_array = true;
                symbol.init = EMPTY_ARRAY.to_string();
            }
        }
        Ok(())
    }

    pub fn mark_scalar(&mut self, id: SymbolId, line: usize) -> Result<()> {
        let symbol = self.symbol_mut(id);
        if let SymbolKind::Variable(v) = &mut symbol.kind {
            if v.is_array {
                return Err(both_error(&symbol.token, line));
            }
            v.is_scalar = true;
        }
        Ok(())
    }

    pub fn is_array(&self, id: SymbolId) -> bool {
        self.symbol(id).variable().is_some_and(|v| v.is_array)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "class", "def", "del",
    "elif", "except", "finally", "from", "global", "import", "is", "lambda", "nonlocal", "not",
    "or", "pass", "raise", "try", "with", "yield",
];

/// AWK identifiers that are Python keywords get a trailing underscore.
pub fn python_name(name: &str) -> String {
    if PYTHON_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

fn both_error(token: &str, line: usize) -> Error {
    Error::semantic(format!(
        "{} is used as both an array and a scalar value (line {})",
        token, line
    ))
}

/// A raw string cannot contain a bare `"`; escape unescaped ones.
fn escape_raw_quotes(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut backslashes = 0;
    for c in body.chars() {
        if c == '"' && backslashes % 2 == 0 {
            out.push('\\');
        }
        if c == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
        out.push(c);
    }
    out
}
