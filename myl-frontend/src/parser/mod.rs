//! myl Recursive Descent Parser
//!
//! Pulls tokens from the scanner one at a time and keeps a single token of
//! lookahead. The driver asks for one top-level statement at a time with
//! [`Parser::parse_statement`]; there is no error recovery.

pub mod errors;
pub mod expressions;
pub mod statements;

use crate::lexer::{Lexer, Token, TokenKind};
use myl_common::{CompileError, SourceLocation};

pub use errors::ParseError;

/// myl parser
pub struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    /// Create a parser and prime the lookahead token
    pub fn new(mut lexer: Lexer) -> Result<Self, CompileError> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Peek at current token without consuming
    pub(crate) fn peek(&self) -> &Token {
        &self.current
    }

    /// Return the current token and pull the next one from the scanner
    pub(crate) fn advance(&mut self) -> Result<Token, CompileError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub(crate) fn check_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.current.kind)
    }

    /// Consume token if it matches expected kind
    pub(crate) fn match_token(&mut self, kind: TokenKind) -> Result<bool, CompileError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Expect and consume a specific token kind
    pub(crate) fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, CompileError> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.unexpected(format!("{} in {}", kind, context)))
        }
    }

    /// Syntax error describing what should have been at the current token
    pub(crate) fn unexpected(&self, expected: impl Into<String>) -> CompileError {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: self.current.clone(),
        }
        .into()
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.current.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_reports_expected_and_found() {
        let mut parser = Parser::new(Lexer::new("def 42")).unwrap();
        parser.expect(TokenKind::Def, "definition").unwrap();
        let err = parser.expect(TokenKind::Identifier, "definition").unwrap_err();
        match err {
            CompileError::Syntax { expected, found, .. } => {
                assert_eq!(expected, "identifier in definition");
                assert_eq!(found, "integer literal");
            }
            other => panic!("Expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_advance_returns_previous_token() {
        let mut parser = Parser::new(Lexer::new("extern puts")).unwrap();
        let first = parser.advance().unwrap();
        assert_eq!(first.kind, TokenKind::Extern);
        assert!(parser.check(TokenKind::Identifier));
        assert!(parser.match_token(TokenKind::Identifier).unwrap());
        assert!(parser.check(TokenKind::EndOfFile));
    }

    #[test]
    fn test_lex_error_surfaces_through_parser() {
        assert!(matches!(
            Parser::new(Lexer::new("1.2.3")),
            Err(CompileError::Lex { .. })
        ));
    }
}
