//! Lispy - a minimal tree-walking interpreter for a Scheme subset
//!
//! This crate reads parenthesized prefix expressions into a small value model and
//! evaluates them by direct recursion against a chain of environments:
//!
//! ```scheme
//! (define square (lambda (x) (* x x)))
//! (square 5)                      ; 25
//! (if (> 3 2) (quote yes) 0)      ; yes
//! (map abs (list -1 2.5 -3))      ; (1 2.5 3)
//! ```
//!
//! ## Language
//!
//! Atoms are integers, floats or symbols; everything else is a list. The special forms
//! are `quote`, `if`, `define`, `set!` and `lambda`. Only `#f` is false: `0` and `()` are
//! both true in a conditional. A closure body is a single expression; sequencing goes
//! through the `begin` procedure.
//!
//! There is no tail-call elimination. Evaluation depth is bounded by the host stack, so
//! deeply recursive programs can overflow it.
//!
//! ## Modules
//!
//! - `scheme`: tokenizer and reader
//! - `ast`: the value model and printer
//! - `evaluator`: environments, special forms and procedure application
//! - `builtinops`: the primitive procedures and host math namespace
//! - `repl`: the interactive driver (feature `repl`)
//!
//! ## Example
//!
//! ```
//! use lispy::ast::Value;
//! use lispy::eval_str;
//! use lispy::evaluator::create_global_env;
//!
//! let env = create_global_env();
//! eval_str("(define x 5)", &env).unwrap();
//! assert_eq!(eval_str("(+ x 1)", &env).unwrap(), Value::Integer(6));
//! ```

use thiserror::Error;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Input ended before the expression was complete (empty input, unclosed parens)
    Incomplete,
    /// A `)` appeared where an expression was expected
    UnexpectedCloseParen,
    /// Extra tokens found after a complete expression
    TrailingContent,
    /// The text could not be split into tokens
    InvalidSyntax,
    /// Lists nested deeper than [`MAX_PARSE_DEPTH`]
    TooDeep,
}

/// A structured error describing a parsing failure.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// The problematic token, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, found: Option<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            found,
        }
    }

    /// Create a ParseError with a kind and message but no offending token
    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(found) = &self.found {
            write!(f, " (found '{found}')")?;
        }
        Ok(())
    }
}

/// Maximum list nesting accepted by the reader
pub const MAX_PARSE_DEPTH: usize = 1000;

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("ParseError: {0}")]
    ParseError(ParseError),
    #[error("Unbound variable: {0}")]
    UnboundVariable(String),
    #[error("Not callable: {0}")]
    NotCallable(String),
    #[error("MalformedForm: {form}: {message}")]
    MalformedForm {
        form: &'static str,
        message: String,
    },
    #[error("{}", format_arity_error(.expected, .got, .expression))]
    ArityError {
        expected: usize,
        got: usize,
        expression: Option<String>,
    },
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("EvaluationError: {0}")]
    EvalError(String),
}

fn format_arity_error(expected: &usize, got: &usize, expression: &Option<String>) -> String {
    match expression {
        Some(expr) => {
            format!("ArityError: expression {expr}: expected {expected} arguments, got {got}")
        }
        None => format!("ArityError: function expected {expected} arguments but got {got}"),
    }
}

impl Error {
    /// Create an ArityError without expression context
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityError with expression context
    pub fn arity_error_with_expr(expected: usize, got: usize, expression: String) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: Some(expression),
        }
    }

    pub(crate) fn malformed(form: &'static str, message: impl Into<String>) -> Self {
        Error::MalformedForm {
            form,
            message: message.into(),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::ParseError(err)
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod scheme;

#[cfg(feature = "repl")]
pub mod repl;

/// Parse one expression from `input` and evaluate it in `env`.
pub fn eval_str(input: &str, env: &evaluator::Environment) -> Result<ast::Value, Error> {
    let expr = scheme::parse_scheme(input)?;
    evaluator::eval(&expr, env)
}
