//! Compiler error types.
//!
//! Every fallible operation in the compiler returns `Result<T, CompileError>`.
//! The crate boundary (see `lib.rs`) collapses this into `Result<T, String>`
//! for callers via `.map_err(|e| e.to_string())`, so library and CLI
//! consumers see one flat error type regardless of which internal stage
//! failed.

use std::fmt;

/// A single compile-time failure. The first one raised aborts compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Parens, braces, or brackets did not balance while splitting the program.
    UnbalancedDelimiters { snippet: String },
    /// A built-in or user-defined call got the wrong number of arguments.
    ArityMismatch {
        operator: String,
        expected: usize,
        got: usize,
    },
    /// An operator received an argument of the wrong type.
    TypeMismatch {
        operator: String,
        position: usize,
        expected: String,
        got: String,
    },
    /// `return`'s expression type did not match the enclosing function's
    /// declared return type.
    ReturnTypeMismatch {
        function: String,
        expected: String,
        got: String,
    },
    /// `var` redeclared a name already live in the innermost block.
    Redeclaration { name: String },
    /// `set`/`inc`/`dec`/a bare reference used a name with no binding.
    UndeclaredVariable { name: String },
    /// A compound expression's keyword did not match any known form.
    UnknownKeyword { keyword: String },
    /// A `function`/`var` type annotation did not name a known type.
    UnknownType { name: String },
    /// A name required to start with a letter did not.
    InvalidIdentifier { name: String },
    /// `break`/`continue` used with no enclosing `while`.
    LoopControlOutsideLoop { keyword: String },
    /// `if`/`while`'s condition evaluated to something other than `INT`.
    ConditionNotInt { keyword: String },
    /// A `block(...)` argument's raw text was not `{ ... }`.
    MalformedBlock { snippet: String },
    /// Catch-all for malformed surface syntax not covered above.
    Syntax(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnbalancedDelimiters { snippet } => {
                write!(f, "unbalanced parentheses in expression: {}", snippet)
            }
            CompileError::ArityMismatch {
                operator,
                expected,
                got,
            } => write!(
                f,
                "expected {} argument(s) for {}, got {}",
                expected, operator, got
            ),
            CompileError::TypeMismatch {
                operator,
                position,
                expected,
                got,
            } => write!(
                f,
                "{}: argument {} must be of type {}, got {}",
                operator, position, expected, got
            ),
            CompileError::ReturnTypeMismatch {
                function,
                expected,
                got,
            } => write!(
                f,
                "return type mismatch in function '{}': expected {}, got {}",
                function, expected, got
            ),
            CompileError::Redeclaration { name } => {
                write!(f, "Redeclaration Error: '{}'", name)
            }
            CompileError::UndeclaredVariable { name } => {
                write!(f, "'{}' is undeclared", name)
            }
            CompileError::UnknownKeyword { keyword } => {
                write!(f, "unknown keyword '{}'", keyword)
            }
            CompileError::UnknownType { name } => {
                write!(f, "unknown type '{}'", name)
            }
            CompileError::InvalidIdentifier { name } => {
                write!(f, "identifier must start with a letter: '{}'", name)
            }
            CompileError::LoopControlOutsideLoop { keyword } => {
                write!(f, "'{}' used outside of a loop", keyword)
            }
            CompileError::ConditionNotInt { keyword } => {
                write!(f, "{} condition must be of type INT", keyword)
            }
            CompileError::MalformedBlock { snippet } => {
                write!(f, "expected a brace-delimited block, got: {}", snippet)
            }
            CompileError::Syntax(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CompileError {}
