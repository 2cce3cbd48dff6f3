use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Location in AWK source for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// All error types for awkpy
#[derive(Error, Debug)]
pub enum Error {
    #[error("lexer error at {location}: {message}")]
    Lexer {
        message: String,
        location: SourceLocation,
    },

    #[error("syntax error at {location}: found \"{found}\" expected {message} near {window}")]
    Syntax {
        message: String,
        found: String,
        window: String,
        location: SourceLocation,
    },

    #[error("semantic error: {message}")]
    Semantic { message: String },

    #[error("cannot read {}: {source}", path.display())]
    Include {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    Usage { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    pub fn lexer(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Lexer {
            message: message.into(),
            location: SourceLocation::new(line, column),
        }
    }

    pub fn syntax(
        message: impl Into<String>,
        found: impl Into<String>,
        window: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self::Syntax {
            message: message.into(),
            found: found.into(),
            window: window.into(),
            location,
        }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic {
            message: message.into(),
        }
    }

    pub fn include(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Include {
            path: path.into(),
            source,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}

/// Result type alias for awkpy operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location() {
        let loc = SourceLocation::new(10, 5);
        assert_eq!(loc.line, 10);
        assert_eq!(loc.column, 5);
        assert_eq!(format!("{}", loc), "line 10, column 5");
    }

    #[test]
    fn test_lexer_error() {
        let err = Error::lexer("unrecognised token @", 1, 5);
        assert!(matches!(err, Error::Lexer { .. }));
        let msg = format!("{}", err);
        assert!(msg.contains("lexer error"));
        assert!(msg.contains("unrecognised token @"));
    }

    #[test]
    fn test_syntax_error_shows_window() {
        let err = Error::syntax(
            "'}'",
            "<end of input>",
            "x = 1 >>><end of input><<<",
            SourceLocation::new(3, 1),
        );
        assert!(matches!(err, Error::Syntax { .. }));
        let msg = format!("{}", err);
        assert!(msg.contains("line 3"));
        assert!(msg.contains("expected '}'"));
        assert!(msg.contains(">>><end of input><<<"));
    }

    #[test]
    fn test_semantic_error() {
        let err = Error::semantic("x is used as both an array and a scalar value");
        assert!(matches!(err, Error::Semantic { .. }));
        assert!(format!("{}", err).contains("both an array and a scalar"));
    }

    #[test]
    fn test_include_error_names_file() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::include("lib.awk", io_err);
        let msg = format!("{}", err);
        assert!(msg.contains("lib.awk"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(format!("{}", err).contains("I/O error"));
    }

    #[test]
    fn test_regex_error() {
        let re_err = regex::Regex::new("[invalid").unwrap_err();
        let err: Error = re_err.into();
        assert!(matches!(err, Error::Regex(_)));
        assert!(format!("{}", err).contains("regex error"));
    }
}
