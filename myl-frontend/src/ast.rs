//! Abstract Syntax Tree definitions for myl
//!
//! The parser builds one tree per top-level statement; pass 1 lowers it into
//! IR immediately and then drops it. Each composite node owns its children.

use crate::lexer::Token;
use myl_common::{IntWidth, SourceLocation, StorageKind};
use std::fmt;

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Relational and equality operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        write!(f, "{}", op_str)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
        };
        write!(f, "{}", op_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// Identifier, integer, decimal or string token
    Literal(Token),

    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    Compare {
        op: CompareOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Parsed but never lowered
    Logical {
        op: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// `if c then a else b`; parsed but never lowered
    Ternary {
        condition: Box<Expression>,
        then_value: Box<Expression>,
        else_value: Box<Expression>,
    },

    Call {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn new(kind: ExpressionKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    VarDecl {
        var_type: StorageKind,
        name: String,
        init: Option<Expression>,
    },

    /// `else_branch` is an `Else` for `else`, or a nested `If` for `elif`
    If {
        condition: Expression,
        then_block: Vec<Statement>,
        else_branch: Option<Box<Statement>>,
    },

    Else(Vec<Statement>),

    Def {
        name: String,
        body: Vec<Statement>,
        return_type: Option<IntWidth>,
        public: bool,
    },

    Call {
        name: String,
        args: Vec<Expression>,
    },

    Extern(String),

    /// Parsed but never lowered
    Include(String),

    Return(Option<Expression>),

    /// `do ... end`
    Block(Vec<Statement>),

    /// Parsed but never lowered
    When {
        subject: String,
        cases: Vec<WhenCase>,
    },
}

/// One arm of a `when`; `pattern` is `None` for the `_` default arm
#[derive(Debug, Clone, PartialEq)]
pub struct WhenCase {
    pub pattern: Option<Token>,
    pub body: Statement,
}

impl Statement {
    pub fn new(kind: StatementKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}
