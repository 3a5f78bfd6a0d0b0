//! Parse error types for the myl parser

use crate::lexer::Token;
use myl_common::{CompileError, SourceLocation};

/// Parse error types specific to the parser
#[derive(Debug, Clone)]
pub enum ParseError {
    /// A specific token was required and another one was found
    UnexpectedToken {
        expected: String,
        found: Token,
    },
    /// Structurally valid tokens forming an invalid statement
    InvalidStatement {
        message: String,
        location: SourceLocation,
    },
    InvalidType {
        message: String,
        location: SourceLocation,
    },
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnexpectedToken { expected, found } => CompileError::Syntax {
                location: found.location,
                expected,
                found: found.kind.to_string(),
            },
            ParseError::InvalidStatement { message, location } => {
                CompileError::parse_error(message, location)
            }
            ParseError::InvalidType { message, location } => {
                CompileError::parse_error(message, location)
            }
        }
    }
}
