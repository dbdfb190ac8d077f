//! Vine Compiler
//!
//! Compiles Vine template source — HTML-ish markup plus `{...}` directive
//! spans — into an executable PHP program fragment. Literal text passes
//! through untouched; directives become code segments wrapped in `<?php ?>`
//! markers.
//!
//! ```text
//! source → Scanner → BlockCompiler (single pass) → collapse → PHP text
//! ```
//!
//! The compiler performs no I/O and keeps no state across compilations;
//! every call builds a fresh session.
//!
//! # Example
//!
//! ```
//! let php = vine_compiler::compile("<p>{$name}</p>", "hello.vine").unwrap();
//! assert!(php.contains("echo $name;"));
//! ```

mod buffer;
mod cursor;
mod directive;
mod emit;
mod parser;

use parser::{BlockCompiler, Until};
use vine_lexer::Scanner;

/// Compilation error with the logical source name and position information.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub source: String,
    pub line: usize,
    pub column: usize,
    pub kind: ErrorKind,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.source, self.line, self.column, self.kind
        )
    }
}

impl std::error::Error for CompileError {}

/// The nature of a compilation failure. All variants abort the whole
/// compilation; there is no partial output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("unterminated directive: missing '{close}' before end of input")]
    UnterminatedDirective { close: char },

    #[error("closing directive '/{found}' has no matching open directive")]
    StrayCloser { found: String },

    #[error(
        "closing directive '/{found}' does not match '{expected}' opened at {opened_line}:{opened_column}"
    )]
    MismatchedCloser {
        found: String,
        expected: String,
        opened_line: usize,
        opened_column: usize,
    },

    #[error("unclosed directives at end of input: {list}")]
    UnclosedDirectives { list: String },

    #[error(
        "closing tag '</{found}>' does not match opening tag '<{expected}>' opened at {opened_line}:{opened_column}"
    )]
    MismatchedTag {
        found: String,
        expected: String,
        opened_line: usize,
        opened_column: usize,
    },

    #[error("missing closing tag '</{expected}>' before end of input")]
    UnclosedTag { expected: String },

    #[error("unterminated quoted attribute value")]
    UnterminatedQuote,

    #[error("unexpected {found} in element attributes")]
    UnexpectedInTag { found: String },

    #[error("parse stalled at {token}: cursor failed to advance")]
    Stalled { token: String },
}

/// Compiler configuration. The directive delimiter pair is configurable but
/// fixed for the whole compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compiler {
    open: char,
    close: char,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A compiler with the default `{` `}` delimiters.
    pub fn new() -> Self {
        Self {
            open: '{',
            close: '}',
        }
    }

    /// Use a custom directive delimiter pair.
    pub fn delimiters(mut self, open: char, close: char) -> Self {
        self.open = open;
        self.close = close;
        self
    }

    /// Compile one source buffer. `name` is a logical source name used only
    /// in diagnostics.
    pub fn compile(&self, source: &str, name: &str) -> Result<String, CompileError> {
        let tokens = Scanner::with_delimiters(source, self.open, self.close).scan();
        let mut session = BlockCompiler::new(name, self.open, self.close, tokens);
        session.compile_block(&Until::Eof)?;
        session.finish()
    }
}

/// Compile with the default delimiters.
pub fn compile(source: &str, name: &str) -> Result<String, CompileError> {
    Compiler::new().compile(source, name)
}
