//! myl Code Generation
//!
//! Pass 2 of the compiler: turns the IR produced by `myl-frontend` into
//! NASM source for Windows x64.

pub mod abi;
pub mod asm;
pub mod emit;
pub mod errors;
pub mod regalloc;
pub mod value;

pub use abi::{FrameLayout, FrameSize};
pub use asm::{AsmInst, AsmLine, AsmProgram, DataEntry, Directive, Operand, Reg};
pub use emit::{fold, CodeGenerator};
pub use errors::CodegenError;
pub use value::{EvalValue, Variable};

use log::debug;
use myl_common::CompileResult;
use myl_frontend::{CompilationContext, Frontend};

/// Run pass 2 over a lowered compilation unit
///
/// `ctx` is borrowed mutably because emission records which functions
/// have returned a value.
pub fn generate(ctx: &mut CompilationContext) -> CompileResult<AsmProgram> {
    CodeGenerator::new(ctx).generate()
}

/// Compile myl source text to NASM assembly text
pub fn compile(source: &str, filename: &str) -> CompileResult<String> {
    let mut ctx = Frontend::lower_source(source, filename)?;
    debug!("{}: {} IR instructions", filename, ctx.instructions.len());
    let program = generate(&mut ctx)?;
    Ok(program.to_string())
}
