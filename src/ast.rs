//! Expression tree produced by the parser.
//!
//! A special case is baked in at this level rather than deferred to the
//! evaluator: when an argument position expects a brace-delimited *block*,
//! the parser keeps it as raw text (`Expr::Block`) instead of recursing into
//! it. Blocks are re-parsed on demand by the evaluator (`eval.rs`), which
//! mirrors the single-pass, no-AST-reuse architecture this language was
//! distilled from.

/// One node of the parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A bare token: an identifier, an integer literal, or a quoted string.
    Atom(String),
    /// A raw `{ ... }` substring, kept unparsed until the evaluator needs it.
    Block(String),
    /// `keyword(arg, arg, ...)`.
    Call { keyword: String, args: Vec<Expr> },
}

impl Expr {
    pub fn call(keyword: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call {
            keyword: keyword.into(),
            args,
        }
    }
}
