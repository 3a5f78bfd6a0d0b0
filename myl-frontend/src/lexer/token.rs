//! Token definitions for the myl scanner
//!
//! This module defines token kinds and the Token struct.

use myl_common::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// myl token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    Identifier,
    Digit,
    Decimal,
    String,

    // Keywords
    Def, If, Elif, Else, Then, End, Extern, Include, Return, Pub,
    Do, When,
    I8, I16, I32, I64, Float, Double, Float64,

    // Punctuation
    LeftParen,      // (
    RightParen,     // )
    Star,           // *
    Slash,          // /
    Dash,           // -
    Plus,           // +
    Comma,          // ,
    Dot,            // .
    Colon,          // :
    Question,       // ?
    Eq,             // =
    FatArrow,       // =>
    Not,            // !
    Greater,        // >
    Less,           // <
    BitwiseOr,      // |
    BitwiseAnd,     // &

    // Two-character operators
    IsEq,           // ==
    IsNotEq,        // !=
    GreaterEq,      // >=
    LessEq,         // <=
    Or,             // ||
    And,            // &&

    EndOfFile,
}

impl TokenKind {
    /// Type keywords that may start a variable declaration
    pub fn is_var_type(&self) -> bool {
        matches!(
            self,
            TokenKind::I8
                | TokenKind::I16
                | TokenKind::I32
                | TokenKind::I64
                | TokenKind::Float
                | TokenKind::Double
                | TokenKind::Float64
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Digit => write!(f, "integer literal"),
            TokenKind::Decimal => write!(f, "decimal literal"),
            TokenKind::String => write!(f, "string literal"),

            // Keywords
            TokenKind::Def => write!(f, "'def'"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::Elif => write!(f, "'elif'"),
            TokenKind::Else => write!(f, "'else'"),
            TokenKind::Then => write!(f, "'then'"),
            TokenKind::End => write!(f, "'end'"),
            TokenKind::Extern => write!(f, "'extern'"),
            TokenKind::Include => write!(f, "'include'"),
            TokenKind::Return => write!(f, "'return'"),
            TokenKind::Pub => write!(f, "'pub'"),
            TokenKind::Do => write!(f, "'do'"),
            TokenKind::When => write!(f, "'when'"),
            TokenKind::I8 => write!(f, "'i8'"),
            TokenKind::I16 => write!(f, "'i16'"),
            TokenKind::I32 => write!(f, "'i32'"),
            TokenKind::I64 => write!(f, "'i64'"),
            TokenKind::Float => write!(f, "'float'"),
            TokenKind::Double => write!(f, "'double'"),
            TokenKind::Float64 => write!(f, "'float64'"),

            // Punctuation - show the symbol
            TokenKind::LeftParen => write!(f, "'('"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Dash => write!(f, "'-'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::FatArrow => write!(f, "'=>'"),
            TokenKind::Not => write!(f, "'!'"),
            TokenKind::Greater => write!(f, "'>'"),
            TokenKind::Less => write!(f, "'<'"),
            TokenKind::BitwiseOr => write!(f, "'|'"),
            TokenKind::BitwiseAnd => write!(f, "'&'"),
            TokenKind::IsEq => write!(f, "'=='"),
            TokenKind::IsNotEq => write!(f, "'!='"),
            TokenKind::GreaterEq => write!(f, "'>='"),
            TokenKind::LessEq => write!(f, "'<='"),
            TokenKind::Or => write!(f, "'||'"),
            TokenKind::And => write!(f, "'&&'"),

            TokenKind::EndOfFile => write!(f, "EOF"),
        }
    }
}

/// A token with its raw lexeme and start location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Self { kind, text: text.into(), location }
    }

    pub fn eof(location: SourceLocation) -> Self {
        Self::new(TokenKind::EndOfFile, "", location)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier | TokenKind::Digit | TokenKind::Decimal => {
                write!(f, "{} '{}' at {}", self.kind, self.text, self.location)
            }
            TokenKind::String => write!(f, "\"{}\" at {}", self.text, self.location),
            _ => write!(f, "{} at {}", self.kind, self.location),
        }
    }
}
