//! Type system: the finite tag set and the generic argument-signature checker.
//!
//! Base types in the language. `Undef` doubles as "no value" (void) and as
//! the tombstone a `String` binding is rewritten to once its value has been
//! moved out from under it (see `ownership.rs`).
use crate::error::CompileError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value / void. Also the post-move state of a `String` binding.
    Undef,
    /// 32-bit integer.
    Int,
    /// Non-owning pointer into the data section (never freed).
    StringLit,
    /// Heap-owned string; must be freed exactly once before its slot dies.
    String,
}

impl Type {
    pub fn from_name(name: &str) -> Option<Type> {
        match name {
            "UNDEF" => Some(Type::Undef),
            "INT" => Some(Type::Int),
            "STRING_LIT" => Some(Type::StringLit),
            "STRING" => Some(Type::String),
            _ => None,
        }
    }

    /// A `String` or `STRING_LIT` value, own-or-borrowed, is "string-like"
    /// for the purposes of built-ins that accept either (e.g. `Concat`).
    pub fn is_string_like(self) -> bool {
        matches!(self, Type::String | Type::StringLit)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Type::Undef => "UNDEF",
            Type::Int => "INT",
            Type::StringLit => "STRING_LIT",
            Type::String => "STRING",
        };
        write!(f, "{}", s)
    }
}

/// The value produced by evaluating an expression: either a concrete `Type`,
/// or `Block`, the non-value marker control-flow constructs (`if`, `while`,
/// `block`) return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalType {
    Value(Type),
    Block,
}

impl EvalType {
    /// Unwrap a concrete value type, or raise a type error naming `context`
    /// as the operator that required one.
    pub fn require_value(self, context: &str) -> Result<Type, CompileError> {
        match self {
            EvalType::Value(t) => Ok(t),
            EvalType::Block => Err(CompileError::TypeMismatch {
                operator: context.to_string(),
                position: 0,
                expected: "a value".to_string(),
                got: "BLOCK".to_string(),
            }),
        }
    }
}

impl fmt::Display for EvalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalType::Value(t) => write!(f, "{}", t),
            EvalType::Block => write!(f, "BLOCK"),
        }
    }
}

/// One slot of an expected call signature: either a single required type, or
/// a set of acceptable ones (e.g. built-ins that take `STRING` or
/// `STRING_LIT` interchangeably).
#[derive(Debug, Clone, Copy)]
pub enum ExpectedType {
    Exact(Type),
    OneOf(&'static [Type]),
}

impl ExpectedType {
    fn accepts(self, ty: Type) -> bool {
        match self {
            ExpectedType::Exact(t) => t == ty,
            ExpectedType::OneOf(ts) => ts.contains(&ty),
        }
    }
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedType::Exact(t) => write!(f, "{}", t),
            ExpectedType::OneOf(ts) => {
                let names: Vec<String> = ts.iter().map(|t| t.to_string()).collect();
                write!(f, "{}", names.join("|"))
            }
        }
    }
}

/// Check arity, then check each observed type against the expected
/// signature in order. The caller is responsible for having already
/// reversed whichever list needs reversing (see spec §4.2's "important
/// ordering rule": call arguments are evaluated in reverse source order, so
/// the observed-type list and the declared signature must be compared with
/// one of the two reversed back to source order).
pub fn check_signature(
    operator: &str,
    observed: &[Type],
    expected: &[ExpectedType],
) -> Result<(), CompileError> {
    if observed.len() != expected.len() {
        return Err(CompileError::ArityMismatch {
            operator: operator.to_string(),
            expected: expected.len(),
            got: observed.len(),
        });
    }
    for (i, (obs, exp)) in observed.iter().zip(expected.iter()).enumerate() {
        if !exp.accepts(*obs) {
            return Err(CompileError::TypeMismatch {
                operator: operator.to_string(),
                position: i + 1,
                expected: exp.to_string(),
                got: obs.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_round_trips_display() {
        for name in ["UNDEF", "INT", "STRING_LIT", "STRING"] {
            let ty = Type::from_name(name).unwrap();
            assert_eq!(ty.to_string(), name);
        }
        assert_eq!(Type::from_name("BOGUS"), None);
    }

    #[test]
    fn check_signature_arity_mismatch() {
        let err = check_signature("add", &[Type::Int], &[ExpectedType::Exact(Type::Int); 2])
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::ArityMismatch {
                operator: "add".to_string(),
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn check_signature_type_mismatch_reports_position() {
        let err = check_signature(
            "add",
            &[Type::Int, Type::String],
            &[ExpectedType::Exact(Type::Int), ExpectedType::Exact(Type::Int)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::TypeMismatch {
                operator: "add".to_string(),
                position: 2,
                expected: "INT".to_string(),
                got: "STRING".to_string(),
            }
        );
    }

    #[test]
    fn check_signature_one_of_accepts_either() {
        let sig = [ExpectedType::OneOf(&[Type::String, Type::StringLit])];
        assert!(check_signature("print", &[Type::String], &sig).is_ok());
        assert!(check_signature("print", &[Type::StringLit], &sig).is_ok());
        assert!(check_signature("print", &[Type::Int], &sig).is_err());
    }
}
