//! Surface splitter and parser.
//!
//! Out of scope for the evaluator per spec, but its interface has to exist
//! somewhere: it turns source text into `ast::Expr` trees. Comments (`;` to
//! end of line) are stripped while splitting; single-quoted string literals
//! are tracked as opaque spans so that punctuation inside them never affects
//! paren/brace/bracket balance.

use crate::ast::Expr;
use crate::error::CompileError;

const COMMENT_CHAR: char = ';';

/// Split a program (or a block's interior) into a sequence of raw top-level
/// expression strings. An "expression" here is either a bare atom or a
/// complete `kw(...)` call; the two are told apart by paren depth returning
/// to zero either at a `)` or at trailing whitespace.
pub fn split_expressions(text: &str) -> Result<Vec<String>, CompileError> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut in_comment = false;

    for c in text.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            continue;
        }
        if in_string {
            cur.push(c);
            if c == '\'' {
                in_string = false;
            }
            continue;
        }
        match c {
            COMMENT_CHAR => {
                in_comment = true;
            }
            '\'' => {
                in_string = true;
                cur.push(c);
            }
            '(' => {
                depth += 1;
                cur.push(c);
            }
            ')' => {
                depth -= 1;
                cur.push(c);
                if depth == 0 {
                    flush(&mut out, &mut cur);
                } else if depth < 0 {
                    return Err(CompileError::UnbalancedDelimiters {
                        snippet: text.to_string(),
                    });
                }
            }
            c if depth == 0 && c.is_whitespace() => {
                flush(&mut out, &mut cur);
            }
            c => cur.push(c),
        }
    }
    flush(&mut out, &mut cur);

    if depth != 0 {
        return Err(CompileError::UnbalancedDelimiters {
            snippet: text.to_string(),
        });
    }
    Ok(out)
}

fn flush(out: &mut Vec<String>, cur: &mut String) {
    let trimmed = cur.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    cur.clear();
}

/// Split `kw(...)`'s argument string on top-level commas, respecting paren,
/// brace, and bracket nesting plus quoted-string spans.
fn split_argstr(argstr: &str) -> Result<Vec<String>, CompileError> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut paren_depth: i32 = 0;
    let mut brace_depth: i32 = 0;
    let mut bracket_depth: i32 = 0;
    let mut in_string = false;

    for c in argstr.chars() {
        if in_string {
            cur.push(c);
            if c == '\'' {
                in_string = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_string = true;
                cur.push(c);
            }
            '(' => {
                paren_depth += 1;
                cur.push(c);
            }
            ')' => {
                paren_depth -= 1;
                cur.push(c);
            }
            '{' => {
                brace_depth += 1;
                cur.push(c);
            }
            '}' => {
                brace_depth -= 1;
                cur.push(c);
            }
            '[' => {
                bracket_depth += 1;
                cur.push(c);
            }
            ']' => {
                bracket_depth -= 1;
                cur.push(c);
            }
            ',' if paren_depth == 0 && brace_depth == 0 && bracket_depth == 0 => {
                out.push(cur.trim().to_string());
                cur.clear();
            }
            c => cur.push(c),
        }
    }

    if paren_depth != 0 || brace_depth != 0 || bracket_depth != 0 {
        return Err(CompileError::UnbalancedDelimiters {
            snippet: argstr.to_string(),
        });
    }

    let rest = cur.trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    Ok(out)
}

/// Split `kw(argstr)` into its keyword and the raw argument-list text.
fn split_kw_argstr(expr: &str) -> Result<(String, String), CompileError> {
    let open = expr.find('(').ok_or_else(|| CompileError::Syntax(format!(
        "expected '(' in expression: {}",
        expr
    )))?;
    let kw = expr[..open].trim().to_string();
    if !expr.ends_with(')') {
        return Err(CompileError::UnbalancedDelimiters {
            snippet: expr.to_string(),
        });
    }
    let argstr = expr[open + 1..expr.len() - 1].trim().to_string();
    Ok((kw, argstr))
}

/// Parse one raw expression string into an `Expr` tree.
///
/// `( )` anywhere in the text marks a compound `kw(args)` form; anything
/// else is a bare atom. An argument whose trimmed text starts with `{` is
/// kept verbatim as `Expr::Block` rather than recursed into.
pub fn parse_expr(text: &str) -> Result<Expr, CompileError> {
    let text = text.trim();
    // A single-quoted string literal is always an atom, even when its
    // contents contain '(' / ')' — it must never be re-examined for the
    // compound `kw(...)` shape below.
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        return Ok(Expr::Atom(text.to_string()));
    }
    if !text.contains('(') {
        return Ok(Expr::Atom(text.to_string()));
    }

    let (kw, argstr) = split_kw_argstr(text)?;
    let raw_args = if argstr.is_empty() {
        Vec::new()
    } else {
        split_argstr(&argstr)?
    };

    let mut args = Vec::with_capacity(raw_args.len());
    for raw in raw_args {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            if !trimmed.ends_with('}') {
                return Err(CompileError::MalformedBlock {
                    snippet: trimmed.to_string(),
                });
            }
            args.push(Expr::Block(trimmed.to_string()));
        } else {
            args.push(parse_expr(trimmed)?);
        }
    }

    Ok(Expr::call(kw, args))
}

/// Parse an entire program (or the text between a block's outer braces)
/// into a sequence of expressions, in source order.
pub fn parse_program(text: &str) -> Result<Vec<Expr>, CompileError> {
    split_expressions(text)?
        .into_iter()
        .map(|s| parse_expr(&s))
        .collect()
}

/// Parse a `[n1:T1, n2:T2, ...]` parameter-list argument (the `[]` delimiters
/// are stripped; an empty list is `[]`).
pub fn parse_param_list(raw: &str) -> Result<Vec<(String, String)>, CompileError> {
    let raw = raw.trim();
    if !raw.starts_with('[') || !raw.ends_with(']') {
        return Err(CompileError::Syntax(format!(
            "expected a bracketed parameter list, got: {}",
            raw
        )));
    }
    let inner = raw[1..raw.len() - 1].trim();
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    let mut params = Vec::new();
    for entry in split_argstr(inner)? {
        let (name, ty) = entry.split_once(':').ok_or_else(|| {
            CompileError::Syntax(format!("expected 'name:TYPE' in parameter list, got: {}", entry))
        })?;
        params.push((name.trim().to_string(), ty.trim().to_string()));
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_sequential_calls_with_no_separator() {
        let exprs = split_expressions("print_i(n) inc(n)").unwrap();
        assert_eq!(exprs, vec!["print_i(n)", "inc(n)"]);
    }

    #[test]
    fn strips_inline_comments() {
        let exprs = split_expressions("exit(0) ; stop here\nprint_i(1)").unwrap();
        assert_eq!(exprs, vec!["exit(0)", "print_i(1)"]);
    }

    #[test]
    fn rejects_unbalanced_parens() {
        let err = split_expressions("exit(add(1, 2)").unwrap_err();
        assert!(matches!(err, CompileError::UnbalancedDelimiters { .. }));
    }

    #[test]
    fn parses_nested_call() {
        let expr = parse_expr("exit(add(2, 3))").unwrap();
        assert_eq!(
            expr,
            Expr::call(
                "exit",
                vec![Expr::call(
                    "add",
                    vec![Expr::Atom("2".to_string()), Expr::Atom("3".to_string())]
                )]
            )
        );
    }

    #[test]
    fn keeps_block_argument_raw() {
        let expr = parse_expr("while(lt(n, 3), { print_i(n) inc(n) })").unwrap();
        match expr {
            Expr::Call { keyword, args } => {
                assert_eq!(keyword, "while");
                assert_eq!(args.len(), 2);
                assert_eq!(args[1], Expr::Block("{ print_i(n) inc(n) }".to_string()));
            }
            _ => panic!("expected a call"),
        }
    }

    #[test]
    fn quoted_string_with_punctuation_does_not_confuse_splitting() {
        let expr = parse_expr("println('hello, (world)')").unwrap();
        match expr {
            Expr::Call { keyword, args } => {
                assert_eq!(keyword, "println");
                assert_eq!(args, vec![Expr::Atom("'hello, (world)'".to_string())]);
            }
            _ => panic!("expected a call"),
        }
    }

    #[test]
    fn parses_param_list() {
        let params = parse_param_list("[a:INT, b:INT]").unwrap();
        assert_eq!(
            params,
            vec![
                ("a".to_string(), "INT".to_string()),
                ("b".to_string(), "INT".to_string())
            ]
        );
        assert_eq!(parse_param_list("[]").unwrap(), Vec::new());
    }
}
