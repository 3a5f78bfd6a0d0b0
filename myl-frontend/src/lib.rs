//! myl compiler - Frontend
//!
//! This crate provides the frontend components of the myl compiler:
//! - Lexer: turns source text into tokens, one at a time
//! - Parser: recursive descent over those tokens, one statement at a time
//! - AST: statement and expression trees
//! - IR: the flat instruction list and pass 1 lowering into it

pub mod ast;
pub mod ir;
pub mod lexer;
pub mod lower;
pub mod parser;

pub use ast::{
    BinaryOp, CompareOp, Expression, ExpressionKind, LogicalOp, Statement, StatementKind, UnaryOp,
    WhenCase,
};
pub use ir::{CompilationContext, Function, IrInstruction, IrOperand, Opcode};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, Parser};

use log::debug;
use myl_common::CompileError;

/// High-level frontend interface
pub struct Frontend;

impl Frontend {
    /// Parse and lower a whole translation unit into IR
    ///
    /// Each top-level statement is lowered as soon as it is parsed; the AST
    /// is dropped afterwards.
    pub fn lower_source(source: &str, filename: &str) -> Result<CompilationContext, CompileError> {
        let mut parser = Parser::new(Lexer::with_filename(source, filename))?;
        let mut context = CompilationContext::new();

        while let Some(statement) = parser.parse_statement()? {
            context.lower_top_level(&statement)?;
        }

        debug!(
            "Lowered {} into {} IR instructions, {} functions",
            filename,
            context.instructions.len(),
            context.functions.len()
        );
        Ok(context)
    }

    /// Parse every top-level statement without lowering
    pub fn parse_source(source: &str, filename: &str) -> Result<Vec<Statement>, CompileError> {
        let mut parser = Parser::new(Lexer::with_filename(source, filename))?;
        let mut statements = Vec::new();
        while let Some(statement) = parser.parse_statement()? {
            statements.push(statement);
        }
        Ok(statements)
    }

    /// Tokenize source code (for debugging)
    pub fn tokenize_source(source: &str, filename: &str) -> Result<Vec<Token>, CompileError> {
        Lexer::with_filename(source, filename).tokenize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontend_lower_simple_function() {
        let source = "def main(): i32\n  return 42\nend\n";
        let ctx = Frontend::lower_source(source, "main.myl").unwrap();

        assert!(ctx.function("main").is_some());
        assert_eq!(ctx.instructions[0].opcode, Opcode::StartProc);
        assert_eq!(ctx.instructions[0].text(), Some("main"));
        assert_eq!(
            ctx.instructions[0].location.as_ref().map(|l| l.filename.as_str()),
            Some("main.myl")
        );
    }

    #[test]
    fn test_frontend_tokenize() {
        let tokens = Frontend::tokenize_source("i32 x = 42", "t.myl").unwrap();

        // i32, x, =, 42, EOF
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].kind, TokenKind::I32);
        assert_eq!(tokens[3].text, "42");
    }

    #[test]
    fn test_frontend_parse_source() {
        let statements = Frontend::parse_source("extern puts\ndef f()\nend", "t.myl").unwrap();
        assert_eq!(statements.len(), 2);
        assert!(matches!(statements[1].kind, StatementKind::Def { .. }));
    }

    #[test]
    fn test_error_carries_filename() {
        let err = Frontend::lower_source("def f(\nend", "bad.myl").unwrap_err();
        assert_eq!(err.location().map(|l| l.filename.as_str()), Some("bad.myl"));
    }
}
