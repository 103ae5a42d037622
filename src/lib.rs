//! `sx86c`: a single-pass compiler for a small S-expression imperative
//! language, emitting 32-bit x86 (AT&T/GAS) assembly text.
//!
//! The pipeline is: [`parser`] splits and parses source text into
//! [`ast::Expr`] trees, [`eval::Compiler`] walks that tree once — resolving
//! symbols against [`env::Environment`], checking types through [`types`],
//! tracking string ownership through [`ownership`], and rendering fragments
//! from [`templates`] — and [`driver`] assembles the pieces (literal pool,
//! function bodies, `main`) into one assembly file per the driver contract.

pub mod ast;
pub mod driver;
pub mod env;
pub mod error;
pub mod eval;
pub mod function_table;
pub mod literal_pool;
pub mod ownership;
pub mod parser;
pub mod templates;
pub mod types;

use std::path::Path;

/// Compile `source` and return the full assembly text that would be written
/// to the output file. Funnels every internal [`error::CompileError`] to a
/// plain `String` at this boundary, so callers don't need to depend on the
/// error enum's shape.
pub fn compile_source(source: &str) -> Result<String, String> {
    driver::compile(source).map_err(|e| e.to_string())
}

/// Compile the file at `path` and return the assembly text.
pub fn compile_file(path: &Path) -> Result<String, String> {
    let source = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    compile_source(&source)
}
