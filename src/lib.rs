//! awkpy - an AWK to Python translator in Rust
//!
//! This crate compiles AWK programs into standalone Python 3 source. The
//! compiler makes a single pass over the token stream and writes Python
//! straight into per-section buckets, which are then assembled into one
//! class deriving from the `awkpy_runtime` base.
//!
//! # Example
//!
//! ```
//! let python = awkpy::compile(r#"BEGIN { print "Hello, World!" }"#).unwrap();
//!
//! assert!(python.contains("class AwkPyTranslated(AwkpyRuntimeWrapper):"));
//! assert!(python.contains("def BEGIN(self):"));
//! assert!(python.contains("print(\"Hello, World!\", sep=self.OFS, end=self.ORS)"));
//! ```
//!
//! # Several Sources
//!
//! ```
//! use awkpy::{Compiler, Source};
//!
//! let mut compiler = Compiler::new().unwrap();
//! compiler.preset_variable("limit=3").unwrap();
//! compiler.add_source(Source::Inline("function twice(n) { return n * 2 }")).unwrap();
//! compiler.add_source(Source::Inline("$1 > limit { print twice($1) }")).unwrap();
//! let python = compiler.finish().unwrap();
//!
//! assert!(python.contains("# -v limit=3"));
//! assert!(python.contains("self.limit = 3"));
//! assert!(python.contains("def twice(self, n=AwkEmptyVarInstance):"));
//! ```
//!
//! # Errors
//!
//! ```
//! use awkpy::Error;
//!
//! let err = awkpy::compile("BEGIN { x = 1").unwrap_err();
//! assert!(matches!(err, Error::Syntax { .. }));
//! ```

pub mod args;
pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod namespace;
pub mod runner;
pub mod sprintf;
pub mod symbols;

pub use compiler::{Compiler, Diagnostic, Source};
pub use config::{CompileOptions, Config};
pub use error::{Error, Result, SourceLocation};
pub use lexer::{Lexer, Token};

/// Translates one AWK program to Python with default options.
pub fn compile(source: &str) -> Result<String> {
    let mut compiler = Compiler::new()?;
    compiler.add_source(Source::Inline(source))?;
    compiler.finish()
}
