//! Driver: wires the parser, evaluator, literal pool, and function table
//! together and concatenates their output into one assembly file.
//!
//! Layout, in order: file header, data-section preamble, the literal pool,
//! text-section preamble, the shared builtin-exit routine, every compiled
//! function body (in definition order, so a function can call one declared
//! after it), the `_start` entry label, the compiled top-level program, and
//! a default exit in case the program falls off the end without calling
//! `exit` itself.

use crate::error::CompileError;
use crate::eval::Compiler;
use crate::parser;
use crate::templates;
use std::io;
use std::path::Path;

/// Default output path per the driver contract.
pub const OUTFILE: &str = "out.asm";

/// Compile a whole program's source text into assembly.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let exprs = parser::parse_program(source)?;

    let mut compiler = Compiler::new();
    let main_asm = compiler.eval_program(&exprs)?;

    let mut out = String::new();
    out.push_str(&templates::header());
    out.push_str(&templates::data_section_preamble());
    out.push_str(&compiler.literals().render());
    out.push_str(&templates::text_section_preamble());
    out.push_str(&templates::builtin_exit_snippet());
    for body in compiler.functions().bodies_in_order() {
        out.push_str(body);
    }
    out.push_str(&templates::start_label());
    out.push_str(&main_asm);
    out.push_str(&templates::default_exit());
    Ok(out)
}

/// Compile `source` and write the result to `path`.
pub fn compile_to_file(source: &str, path: &Path) -> Result<(), String> {
    let asm = compile(source).map_err(|e| e.to_string())?;
    write_output(path, &asm).map_err(|e| format!("{}: {}", path.display(), e))
}

fn write_output(path: &Path, asm: &str) -> io::Result<()> {
    std::fs::write(path, asm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_emits_sections_in_order() {
        let asm = compile("exit(5)").unwrap();
        let data = asm.find(".data").unwrap();
        let text = asm.find(".text").unwrap();
        let do_exit = asm.find("do_exit:").unwrap();
        let start = asm.find("_start:").unwrap();
        assert!(data < text);
        assert!(text < do_exit);
        assert!(do_exit < start);
    }

    #[test]
    fn compile_rejects_unbalanced_source() {
        let err = compile("exit(add(1, 2)").unwrap_err();
        assert!(matches!(err, CompileError::UnbalancedDelimiters { .. }));
    }
}
