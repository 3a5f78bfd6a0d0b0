//! Identifier, number and string scanning

use crate::lexer::{Lexer, Token, TokenKind};
use myl_common::{CompileError, SourceLocation};

impl Lexer {
    /// Scan an alphanumeric/underscore run and resolve it against the keyword table
    pub(crate) fn tokenize_identifier(&mut self, location: SourceLocation) -> Token {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let word = self.lexeme_from(start);
        let kind = self.keyword(&word).unwrap_or(TokenKind::Identifier);
        Token::new(kind, word, location)
    }

    /// Scan a run of digits and dots; the number of dots picks the literal kind
    pub(crate) fn tokenize_number(&mut self, location: SourceLocation) -> Result<Token, CompileError> {
        let start = self.position;
        let mut dots = 0;
        while let Some(ch) = self.current_char() {
            match ch {
                '0'..='9' => {}
                '.' => dots += 1,
                _ => break,
            }
            self.advance();
        }

        let text = self.lexeme_from(start);
        match dots {
            0 => Ok(Token::new(TokenKind::Digit, text, location)),
            1 => Ok(Token::new(TokenKind::Decimal, text, location)),
            _ => Err(CompileError::lex_error(
                format!("Malformed numeric literal '{text}': more than one decimal point"),
                location,
            )),
        }
    }

    /// Scan a double-quoted string; no escape sequences are recognised
    pub(crate) fn tokenize_string(&mut self, location: SourceLocation) -> Result<Token, CompileError> {
        self.advance(); // opening quote
        let start = self.position;

        loop {
            match self.current_char() {
                Some('"') => break,
                Some(_) => {
                    self.advance();
                }
                None => {
                    return Err(CompileError::lex_error("Unterminated string literal", location));
                }
            }
        }

        let text = self.lexeme_from(start);
        self.advance(); // closing quote
        Ok(Token::new(TokenKind::String, text, location))
    }
}
