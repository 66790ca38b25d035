//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and composable:
//! - `frontend::lexer` performs lexical analysis and produces a flat token stream.
//! - `frontend::parser` owns all syntactic knowledge and returns the syntax tree.
//! - `frontend::sema` holds the symbol tables, the constant evaluator and the
//!   initializer flattener used during lowering.
//! - `ir::lowering` walks the syntax tree and emits three-operand linear IR.
//! - `ir::interp` executes that IR directly (the reference consumer).
//! - `backend::riscv` translates the IR into RISC-V assembly text.
//! - `driver` orchestrates the phases behind the CLI.

pub mod backend;
pub mod common;
pub mod driver;
pub mod frontend;
pub mod ir;

use common::error::CompileResult;
use ir::ir::LinearCode;

/// Compile a full source text down to linear IR.
///
/// This is the front half of the pipeline shared by every output mode; the
/// caller picks a consumer (assembly generation, interpretation, printing).
pub fn compile_to_ir(source: &str) -> CompileResult<LinearCode> {
    let tokens = frontend::lexer::Lexer::new(source).tokenize()?;
    let tree = frontend::parser::Parser::new(tokens).parse()?;
    ir::lowering::Lowerer::new().lower(&tree)
}
