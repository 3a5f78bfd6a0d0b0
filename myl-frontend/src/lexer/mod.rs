//! myl Scanner
//!
//! Turns source text into tokens on demand. The parser pulls one token at a
//! time through [`Lexer::next_token`]; whitespace and characters that start
//! no token are skipped silently.

pub mod literals;
pub mod token;

pub use token::{Token, TokenKind};

use myl_common::{CompileError, SourceLocation};
use std::collections::HashMap;

/// myl scanner
pub struct Lexer {
    pub(crate) input: Vec<char>,
    pub(crate) position: usize,
    pub(crate) line: u32,
    pub(crate) column: u32,
    filename: String,
    keywords: HashMap<&'static str, TokenKind>,
}

impl Lexer {
    /// Create a new lexer over anonymous input
    pub fn new(input: &str) -> Self {
        Self::with_filename(input, "<input>")
    }

    /// Create a lexer whose locations name `filename`
    pub fn with_filename(input: &str, filename: &str) -> Self {
        let mut lexer = Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            filename: filename.to_string(),
            keywords: HashMap::new(),
        };

        lexer.initialize_keywords();
        lexer
    }

    fn initialize_keywords(&mut self) {
        let keywords = [
            ("def", TokenKind::Def),
            ("if", TokenKind::If),
            ("elif", TokenKind::Elif),
            ("else", TokenKind::Else),
            ("then", TokenKind::Then),
            ("end", TokenKind::End),
            ("extern", TokenKind::Extern),
            ("include", TokenKind::Include),
            ("return", TokenKind::Return),
            ("pub", TokenKind::Pub),
            ("do", TokenKind::Do),
            ("when", TokenKind::When),
            ("i8", TokenKind::I8),
            ("i16", TokenKind::I16),
            ("i32", TokenKind::I32),
            ("i64", TokenKind::I64),
            ("float", TokenKind::Float),
            ("double", TokenKind::Double),
            ("float64", TokenKind::Float64),
        ];

        self.keywords.extend(keywords);
    }

    pub(crate) fn keyword(&self, word: &str) -> Option<TokenKind> {
        self.keywords.get(word).copied()
    }

    /// Get current character
    pub(crate) fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Advance to next character
    pub(crate) fn advance(&mut self) -> Option<char> {
        let ch = self.current_char()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        SourceLocation::new(&self.filename, self.line, self.column)
    }

    /// Raw text between `start` and the current position
    pub(crate) fn lexeme_from(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    /// Return the next token, or an EOF token once the input is exhausted
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        loop {
            let location = self.current_location();
            let start = self.position;

            let Some(ch) = self.current_char() else {
                return Ok(Token::eof(location));
            };

            if ch == '"' {
                return self.tokenize_string(location);
            }
            if ch.is_alphabetic() || ch == '_' {
                return Ok(self.tokenize_identifier(location));
            }
            if ch.is_ascii_digit() {
                return self.tokenize_number(location);
            }

            self.advance();
            let kind = match ch {
                '(' => TokenKind::LeftParen,
                ')' => TokenKind::RightParen,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '-' => TokenKind::Dash,
                '+' => TokenKind::Plus,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                ':' => TokenKind::Colon,
                '?' => TokenKind::Question,
                '=' => match self.current_char() {
                    Some('=') => self.take(TokenKind::IsEq),
                    Some('>') => self.take(TokenKind::FatArrow),
                    _ => TokenKind::Eq,
                },
                '!' => self.either('=', TokenKind::IsNotEq, TokenKind::Not),
                '>' => self.either('=', TokenKind::GreaterEq, TokenKind::Greater),
                '<' => self.either('=', TokenKind::LessEq, TokenKind::Less),
                '|' => self.either('|', TokenKind::Or, TokenKind::BitwiseOr),
                '&' => self.either('&', TokenKind::And, TokenKind::BitwiseAnd),
                // whitespace and anything unrecognised
                _ => continue,
            };

            return Ok(Token::new(kind, self.lexeme_from(start), location));
        }
    }

    /// Consume the pending second character of an operator
    fn take(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Two-character operator if the next character is `second`, else the single one
    fn either(&mut self, second: char, double: TokenKind, single: TokenKind) -> TokenKind {
        if self.current_char() == Some(second) {
            self.take(double)
        } else {
            single
        }
    }

    /// Scan the whole input, including the trailing EOF token
    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::EndOfFile;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}
