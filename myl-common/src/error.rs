//! Error handling for the myl compiler
//!
//! Every inconsistency the compiler detects is fatal: the first error unwinds
//! out of the whole compilation through `Result` propagation, and the driver
//! reports it. There is no warning tier.

use crate::source_loc::SourceLocation;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Main compiler error type that encompasses all phases of compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Malformed literal or unterminated string in the scanner
    #[error("Lexical error at {location}: {message}")]
    Lex {
        location: SourceLocation,
        message: String,
    },

    /// A specific token kind was required but another one was found
    #[error("Syntax error at {location}: expected {expected}, found {found}")]
    Syntax {
        location: SourceLocation,
        expected: String,
        found: String,
    },

    #[error("Parse error at {location}: {message}")]
    Parse {
        location: SourceLocation,
        message: String,
    },

    /// Raised while lowering the AST into IR
    #[error("Semantic error at {location}: {message}")]
    Semantic {
        location: SourceLocation,
        message: String,
    },

    /// Raised while emitting assembly from IR
    #[error("Code generation error{}: {message}", at(.location))]
    Codegen {
        location: Option<SourceLocation>,
        message: String,
    },

    #[error("IO error: {message}")]
    Io { message: String },
}

fn at(location: &Option<SourceLocation>) -> String {
    match location {
        Some(location) => format!(" at {location}"),
        None => String::new(),
    }
}

impl CompileError {
    /// Create a lexer error
    pub fn lex_error(message: impl Into<String>, location: SourceLocation) -> Self {
        CompileError::Lex { location, message: message.into() }
    }

    /// Create a parse error
    pub fn parse_error(message: impl Into<String>, location: SourceLocation) -> Self {
        CompileError::Parse { location, message: message.into() }
    }

    /// Create a semantic error
    pub fn semantic_error(message: impl Into<String>, location: SourceLocation) -> Self {
        CompileError::Semantic { location, message: message.into() }
    }

    /// Create a codegen error
    pub fn codegen_error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        CompileError::Codegen { location, message: message.into() }
    }

    /// The source location the error points at, if any
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            CompileError::Lex { location, .. }
            | CompileError::Syntax { location, .. }
            | CompileError::Parse { location, .. }
            | CompileError::Semantic { location, .. } => Some(location),
            CompileError::Codegen { location, .. } => location.as_ref(),
            CompileError::Io { .. } => None,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::Io {
            message: err.to_string(),
        }
    }
}
