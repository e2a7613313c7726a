//! Centralised error hierarchy for the **Quill interpreter**.
//!
//! Every subsystem (scanner, parser, environment, evaluator, builtins) reports
//! failures through one of the variants defined here.  All of them are fatal to
//! the program being run: nothing in the interpreter catches a `QuillError` and
//! carries on, it unwinds through `?` to whoever called
//! [`Interpreter::interpret`](crate::interpreter::Interpreter::interpret).
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuillError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error, reported at the offending token.
    #[error("[line {line}] Error at {lexeme}: {message}")]
    Parse {
        message: String,
        lexeme: String,
        line: usize,
    },

    /// Operand/operator mismatch, non-boolean condition and similar.
    #[error("Type error: {0}")]
    Type(String),

    /// The target of a call did not evaluate to something callable.
    #[error("Type error: '{callee}' is not callable (found {kind})")]
    NotCallable { callee: String, kind: &'static str },

    /// Argument count differs from parameter count.
    #[error("Arity error: '{name}' expects {expected} argument(s) but got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Undefined identifier, record type, member or global function.
    #[error("Lookup error: undefined '{0}'")]
    Undefined(String),

    /// A global function, record type or method declared twice.
    #[error("Lookup error: {kind} '{name}' is already declared")]
    Duplicate { kind: &'static str, name: String },

    /// Array or string index outside `0..length`.
    #[error("Index error: index {index} out of bounds for length {length}")]
    Bounds { index: i64, length: usize },

    /// Any other evaluation failure (division by zero, failed assertion, …).
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Broken interpreter invariant, e.g. popping an empty frame stack.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl QuillError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        QuillError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.  `lexeme` is the offending token
    /// text; an empty lexeme means the parser ran into the end of input.
    pub fn parse<S: Into<String>>(line: usize, lexeme: &str, msg: S) -> Self {
        let message: String = msg.into();
        let lexeme: String = if lexeme.is_empty() {
            "end".to_owned()
        } else {
            format!("'{}'", lexeme)
        };

        info!("Creating Parse error: line={}, at={}, msg={}", line, lexeme, message);

        QuillError::Parse {
            message,
            lexeme,
            line,
        }
    }

    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Type error: {}", message);

        QuillError::Type(message)
    }

    pub fn undefined<S: Into<String>>(name: S) -> Self {
        let name: String = name.into();

        info!("Creating Undefined error: {}", name);

        QuillError::Undefined(name)
    }

    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: {}", message);

        QuillError::Runtime(message)
    }

    /// Is this a front-end (scan/parse) failure rather than a runtime one?
    pub fn is_static(&self) -> bool {
        matches!(self, QuillError::Lex { .. } | QuillError::Parse { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, QuillError>;
