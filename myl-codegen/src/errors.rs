//! Code generation error types

use myl_common::{CompileError, IntWidth, SourceLocation};
use myl_frontend::Opcode;
use thiserror::Error;

/// Failures detected while emitting assembly from IR
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodegenError {
    #[error("Operator {op} requires operands of the same width, got {left} and {right}")]
    WidthMismatch {
        op: Opcode,
        left: IntWidth,
        right: IntWidth,
    },

    #[error("Operator {op} does not support {kind} operands")]
    UnsupportedOperand { op: Opcode, kind: &'static str },

    #[error("Cannot store {kind} into {target} variable '{name}'")]
    UnsupportedStore {
        name: String,
        target: String,
        kind: &'static str,
    },

    #[error("Function '{0}' declares a return type but never returns a value")]
    MissingReturnValue(String),

    #[error("Function '{0}' has no return type but returns a value")]
    UnexpectedReturnValue(String),

    #[error("Evaluation stack is empty at {0}")]
    StackUnderflow(Opcode),

    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("Division by zero in constant expression")]
    DivisionByZero,

    #[error("{0} outside of a function")]
    OutsideFunction(Opcode),

    #[error("{0} is missing its operand")]
    MissingOperand(Opcode),

    #[error("{0} without an open argument list")]
    UnbalancedCall(Opcode),

    #[error("'main' is reserved for the entry point when 'boot' is defined")]
    ReservedEntryPoint,
}

impl CodegenError {
    /// Attach the source location of the instruction being emitted
    pub fn at(self, location: Option<SourceLocation>) -> CompileError {
        CompileError::codegen_error(self.to_string(), location)
    }
}
