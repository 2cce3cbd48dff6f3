/// Index of an entry in the symbol table. Tokens share entries, so every
/// occurrence of an identifier sees the same flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) usize);

/// Precedence the emitter gives to adjacency concatenation.
pub const CONCAT_PRECEDENCE: u8 = 8;

/// Everything at or above this precedence is an assignment.
pub const ASSIGNMENT_PRECEDENCE: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    OpenBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Increment,
    Decrement,
    Minus,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Arithmetic,
    Comparison,
    And,
    Or,
    Match,
    NotMatch,
    In,
    Pipe,
    Append,
    Question,
    Colon,
    Assign,
}

/// Per-variable classification. `is_array` and `is_scalar` are never both set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Variable {
    pub built_in: bool,
    pub is_array: bool,
    pub is_scalar: bool,
}

/// How a call to a function is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `emit(args...)`
    Call,
    /// `str(args[0]).method(args[1..])`
    Method(&'static str),
    Index,
    Match,
    Length,
    Substr,
    Split,
    Sub { global: bool },
    Sprintf,
    /// A function defined in the program itself.
    User,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub strategy: Strategy,
    /// Python module the emitted call needs imported.
    pub library: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Break,
    Continue,
    Delete,
    Do,
    Exit,
    For,
    Function,
    Getline,
    If,
    Next,
    NextFile,
    Print,
    Printf,
    Return,
    While,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Begin,
    BeginFile,
    MainLoop,
    EndFile,
    End,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Begin,
        Section::BeginFile,
        Section::MainLoop,
        Section::EndFile,
        Section::End,
    ];

    /// Name of the generated method overriding the runtime's no-op.
    pub fn method_name(self) -> &'static str {
        match self {
            Section::Begin => "BEGIN",
            Section::BeginFile => "BEGINFILE",
            Section::MainLoop => "MAINLOOP",
            Section::EndFile => "ENDFILE",
            Section::End => "END",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Bracket(Bracket),
    /// `$N` when the index is literal, bare `$` otherwise.
    FieldRef(Option<usize>),
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Resolved to one of the two by whether an operand precedes it.
    Ambiguous { unary: SymbolId, binary: SymbolId },
    Variable(Variable),
    Regex,
    Function(Function),
    Statement(Keyword),
    /// `else`
    Reserved,
    Terminator { consume: bool, collapse: bool },
    Section(Section),
    String,
    Number,
    Comma,
    Comment { own_line: bool },
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Source spelling after namespace decoration; also the table key.
    pub token: String,
    pub kind: SymbolKind,
    pub source_precedence: u8,
    pub target_precedence: u8,
    /// Python rendering.
    pub emit: String,
    /// Python initializer emitted in `__init__`, empty when none is needed.
    pub init: String,
}

impl Symbol {
    pub fn new(token: impl Into<String>, kind: SymbolKind, emit: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind,
            source_precedence: 0,
            target_precedence: 0,
            emit: emit.into(),
            init: String::new(),
        }
    }

    pub fn with_precedence(mut self, source: u8, target: u8) -> Self {
        self.source_precedence = source;
        self.target_precedence = target;
        self
    }

    pub fn with_init(mut self, init: impl Into<String>) -> Self {
        self.init = init.into();
        self
    }

    /// True if this token can begin an operand.
    pub fn starts_operand(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::String
                | SymbolKind::Number
                | SymbolKind::Variable(_)
                | SymbolKind::FieldRef(_)
                | SymbolKind::Regex
                | SymbolKind::Function(_)
                | SymbolKind::Bracket(Bracket::OpenParen)
                | SymbolKind::Statement(Keyword::Getline)
        )
    }

    pub fn is_operator(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Unary(_) | SymbolKind::Binary(_) | SymbolKind::Ambiguous { .. } | SymbolKind::Comma
        )
    }

    pub fn variable(&self) -> Option<&Variable> {
        match &self.kind {
            SymbolKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self.kind, SymbolKind::Terminator { .. })
    }

    pub fn is_end(&self) -> bool {
        self.kind == SymbolKind::EndOfInput
    }

    pub fn is_bracket(&self, bracket: Bracket) -> bool {
        self.kind == SymbolKind::Bracket(bracket)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == SymbolKind::Statement(keyword)
    }

    pub fn is_binary(&self, op: BinaryOp) -> bool {
        self.kind == SymbolKind::Binary(op)
    }

    /// Python's operator binds weaker than AWK's, so the operand needs parentheses.
    pub fn needs_grouping(&self) -> bool {
        self.target_precedence > self.source_precedence
    }
}
