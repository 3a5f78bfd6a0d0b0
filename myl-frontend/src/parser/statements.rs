//! Statement parsing for myl

use crate::ast::*;
use crate::lexer::{Token, TokenKind};
use crate::parser::errors::ParseError;
use crate::parser::Parser;
use myl_common::{CompileError, IntWidth, StorageKind};

impl Parser {
    /// Parse the next statement, or `None` at end of input
    pub fn parse_statement(&mut self) -> Result<Option<Statement>, CompileError> {
        let location = self.current_location();

        let kind = match self.peek().kind {
            TokenKind::EndOfFile => return Ok(None),
            TokenKind::Extern => self.parse_extern_statement()?,
            TokenKind::Def => self.parse_def_statement(false)?,
            TokenKind::Pub => {
                self.advance()?;
                if !self.check(TokenKind::Def) {
                    return Err(self.unexpected("'def' after 'pub'"));
                }
                self.parse_def_statement(true)?
            }
            TokenKind::Identifier => self.parse_call_statement()?,
            kind if kind.is_var_type() => self.parse_var_statement()?,
            TokenKind::If => {
                self.advance()?;
                self.parse_if_statement()?
            }
            TokenKind::Else => self.parse_else_statement()?,
            TokenKind::Include => self.parse_include_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::When => self.parse_when_statement()?,
            TokenKind::Do => {
                self.advance()?;
                let block = self.parse_block(&[TokenKind::End])?;
                self.expect(TokenKind::End, "do block")?;
                StatementKind::Block(block)
            }
            _ => return Err(self.unexpected("statement")),
        };

        Ok(Some(Statement::new(kind, location)))
    }

    /// Parse statements until one of `endings` is the current token (not consumed)
    pub(crate) fn parse_block(&mut self, endings: &[TokenKind]) -> Result<Vec<Statement>, CompileError> {
        let mut statements = Vec::new();
        loop {
            if self.check_any(endings) {
                return Ok(statements);
            }
            match self.parse_statement()? {
                Some(statement) => statements.push(statement),
                None => {
                    let expected: Vec<String> = endings.iter().map(|k| k.to_string()).collect();
                    return Err(self.unexpected(expected.join(" or ")));
                }
            }
        }
    }

    /// `[pub] def name() [: type] ... end`
    fn parse_def_statement(&mut self, public: bool) -> Result<StatementKind, CompileError> {
        self.expect(TokenKind::Def, "function definition")?;
        let name = self.expect(TokenKind::Identifier, "function definition")?;
        self.expect(TokenKind::LeftParen, "function definition")?;
        self.expect(TokenKind::RightParen, "function definition")?;

        let return_type = if self.match_token(TokenKind::Colon)? {
            let token = self.advance()?;
            Some(return_width(&token)?)
        } else {
            None
        };

        let body = self.parse_block(&[TokenKind::End])?;
        self.expect(TokenKind::End, "function definition")?;

        Ok(StatementKind::Def {
            name: name.text,
            body,
            return_type,
            public,
        })
    }

    /// `type name [= expr]`
    fn parse_var_statement(&mut self) -> Result<StatementKind, CompileError> {
        let type_token = self.advance()?;
        let var_type = match type_token.kind {
            TokenKind::I8 => StorageKind::Int(IntWidth::I8),
            TokenKind::I16 => StorageKind::Int(IntWidth::I16),
            TokenKind::I32 => StorageKind::Int(IntWidth::I32),
            TokenKind::I64 => StorageKind::Int(IntWidth::I64),
            _ => StorageKind::Float,
        };
        let name = self.expect(TokenKind::Identifier, "variable declaration")?;

        let init = if self.match_token(TokenKind::Eq)? {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(StatementKind::VarDecl {
            var_type,
            name: name.text,
            init,
        })
    }

    /// Everything after `if`/`elif`; an `elif` becomes a nested `If` sharing the final `end`
    fn parse_if_statement(&mut self) -> Result<StatementKind, CompileError> {
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Then, "if statement")?;
        let then_block = self.parse_block(&[TokenKind::Elif, TokenKind::Else, TokenKind::End])?;

        let else_branch = match self.peek().kind {
            TokenKind::Else => {
                let location = self.current_location();
                let kind = self.parse_else_statement()?;
                Some(Box::new(Statement::new(kind, location)))
            }
            TokenKind::Elif => {
                let location = self.advance()?.location;
                let kind = self.parse_if_statement()?;
                Some(Box::new(Statement::new(kind, location)))
            }
            _ => {
                self.expect(TokenKind::End, "if statement")?;
                None
            }
        };

        Ok(StatementKind::If {
            condition,
            then_block,
            else_branch,
        })
    }

    /// `else ... end`
    fn parse_else_statement(&mut self) -> Result<StatementKind, CompileError> {
        self.expect(TokenKind::Else, "else branch")?;
        let block = self.parse_block(&[TokenKind::End])?;
        self.expect(TokenKind::End, "else branch")?;
        Ok(StatementKind::Else(block))
    }

    fn parse_call_statement(&mut self) -> Result<StatementKind, CompileError> {
        let name = self.expect(TokenKind::Identifier, "call statement")?;
        if !self.check(TokenKind::LeftParen) {
            return Err(self.unexpected(format!("'(' after '{}'", name.text)));
        }
        let args = self.parse_call_arguments()?;
        Ok(StatementKind::Call { name: name.text, args })
    }

    fn parse_extern_statement(&mut self) -> Result<StatementKind, CompileError> {
        self.expect(TokenKind::Extern, "extern declaration")?;
        let name = self.expect(TokenKind::Identifier, "extern declaration")?;
        Ok(StatementKind::Extern(name.text))
    }

    fn parse_include_statement(&mut self) -> Result<StatementKind, CompileError> {
        self.expect(TokenKind::Include, "include")?;
        let path = self.expect(TokenKind::String, "include")?;
        Ok(StatementKind::Include(path.text))
    }

    /// `return [expr]`; the value is present only when an expression can start here
    fn parse_return_statement(&mut self) -> Result<StatementKind, CompileError> {
        self.expect(TokenKind::Return, "return statement")?;
        let value = if self.at_expression_start() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(StatementKind::Return(value))
    }

    /// `when name <literal> => stmt ... [_ => stmt] end`
    fn parse_when_statement(&mut self) -> Result<StatementKind, CompileError> {
        self.expect(TokenKind::When, "when statement")?;
        let subject = self.expect(TokenKind::Identifier, "when statement")?;

        let mut cases = Vec::new();
        let mut seen_default = false;

        while !self.check(TokenKind::End) {
            let pattern = match self.peek().kind {
                TokenKind::Identifier | TokenKind::Digit | TokenKind::Decimal | TokenKind::String => {
                    self.advance()?
                }
                _ => return Err(self.unexpected("case literal or 'end' in when statement")),
            };
            self.expect(TokenKind::FatArrow, "when case")?;
            let body = match self.parse_statement()? {
                Some(statement) => statement,
                None => return Err(self.unexpected("statement in when case")),
            };

            let is_default = pattern.kind == TokenKind::Identifier && pattern.text == "_";
            if is_default {
                if seen_default {
                    return Err(ParseError::InvalidStatement {
                        message: "When statement can only have one default case".to_string(),
                        location: pattern.location,
                    }
                    .into());
                }
                seen_default = true;
                cases.push(WhenCase { pattern: None, body });
            } else {
                if seen_default {
                    return Err(ParseError::InvalidStatement {
                        message: "Default case has to be the last case".to_string(),
                        location: pattern.location,
                    }
                    .into());
                }
                cases.push(WhenCase { pattern: Some(pattern), body });
            }
        }

        self.expect(TokenKind::End, "when statement")?;
        Ok(StatementKind::When {
            subject: subject.text,
            cases,
        })
    }
}

fn return_width(token: &Token) -> Result<IntWidth, CompileError> {
    match token.kind {
        TokenKind::I8 => Ok(IntWidth::I8),
        TokenKind::I16 => Ok(IntWidth::I16),
        TokenKind::I32 => Ok(IntWidth::I32),
        TokenKind::I64 => Ok(IntWidth::I64),
        _ => Err(ParseError::InvalidType {
            message: format!("Invalid return type {}, expected one of i8, i16, i32, i64", token.kind),
            location: token.location.clone(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse_statement_from_str(input: &str) -> Result<Statement, CompileError> {
        let mut parser = Parser::new(Lexer::new(input))?;
        match parser.parse_statement()? {
            Some(statement) => Ok(statement),
            None => panic!("Expected a statement"),
        }
    }

    #[test]
    fn test_parse_def_with_return_type() {
        let stmt = parse_statement_from_str("pub def main(): i32\n return 0\nend").unwrap();
        match stmt.kind {
            StatementKind::Def { name, body, return_type, public } => {
                assert_eq!(name, "main");
                assert_eq!(return_type, Some(IntWidth::I32));
                assert!(public);
                assert_eq!(body.len(), 1);
                assert!(matches!(body[0].kind, StatementKind::Return(Some(_))));
            }
            _ => panic!("Expected def"),
        }
    }

    #[test]
    fn test_pub_requires_def() {
        let err = parse_statement_from_str("pub extern foo").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn test_invalid_return_type() {
        let err = parse_statement_from_str("def f(): float\nend").unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn test_var_declarations() {
        let stmt = parse_statement_from_str("i16 count = 3 + 4").unwrap();
        match stmt.kind {
            StatementKind::VarDecl { var_type, name, init } => {
                assert_eq!(var_type, StorageKind::Int(IntWidth::I16));
                assert_eq!(name, "count");
                assert!(init.is_some());
            }
            _ => panic!("Expected variable declaration"),
        }

        let stmt = parse_statement_from_str("float64 ratio").unwrap();
        assert!(matches!(
            stmt.kind,
            StatementKind::VarDecl { var_type: StorageKind::Float, init: None, .. }
        ));
    }

    #[test]
    fn test_if_else() {
        let stmt = parse_statement_from_str("if x == 5 then\n return 1\nelse\n return 0\nend").unwrap();
        match stmt.kind {
            StatementKind::If { then_block, else_branch, .. } => {
                assert_eq!(then_block.len(), 1);
                let else_branch = else_branch.expect("else branch");
                assert!(matches!(else_branch.kind, StatementKind::Else(ref b) if b.len() == 1));
            }
            _ => panic!("Expected if"),
        }
    }

    #[test]
    fn test_elif_nests_an_if() {
        let source = "if x == 1 then\n f()\nelif x == 2 then\n g()\nelse\n h()\nend";
        let stmt = parse_statement_from_str(source).unwrap();
        match stmt.kind {
            StatementKind::If { else_branch: Some(branch), .. } => match branch.kind {
                StatementKind::If { else_branch: Some(inner), .. } => {
                    assert!(matches!(inner.kind, StatementKind::Else(_)));
                }
                _ => panic!("Expected nested if for elif"),
            },
            _ => panic!("Expected if with else branch"),
        }
    }

    #[test]
    fn test_if_without_else_consumes_end() {
        let mut parser = Parser::new(Lexer::new("if a == b then\nend\nextern puts")).unwrap();
        let first = parser.parse_statement().unwrap().unwrap();
        assert!(matches!(first.kind, StatementKind::If { else_branch: None, .. }));
        let second = parser.parse_statement().unwrap().unwrap();
        assert!(matches!(second.kind, StatementKind::Extern(ref n) if n == "puts"));
        assert!(parser.parse_statement().unwrap().is_none());
    }

    #[test]
    fn test_bare_return_before_end() {
        let stmt = parse_statement_from_str("def f()\n return\nend").unwrap();
        match stmt.kind {
            StatementKind::Def { body, .. } => {
                assert!(matches!(body[0].kind, StatementKind::Return(None)));
            }
            _ => panic!("Expected def"),
        }
    }

    #[test]
    fn test_call_statement_requires_parens() {
        let err = parse_statement_from_str("foo 1").unwrap_err();
        match err {
            CompileError::Syntax { expected, .. } => assert_eq!(expected, "'(' after 'foo'"),
            other => panic!("Expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_when_statement() {
        let source = "when x\n 1 => f()\n 2 => g()\n _ => h()\nend";
        let stmt = parse_statement_from_str(source).unwrap();
        match stmt.kind {
            StatementKind::When { subject, cases } => {
                assert_eq!(subject, "x");
                assert_eq!(cases.len(), 3);
                assert!(cases[2].pattern.is_none());
            }
            _ => panic!("Expected when"),
        }
    }

    #[test]
    fn test_when_rejects_second_default() {
        let err = parse_statement_from_str("when x\n _ => f()\n _ => g()\nend").unwrap_err();
        match err {
            CompileError::Parse { message, .. } => assert!(message.contains("one default")),
            other => panic!("Expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_when_default_must_be_last() {
        let err = parse_statement_from_str("when x\n _ => f()\n 1 => g()\nend").unwrap_err();
        match err {
            CompileError::Parse { message, .. } => assert!(message.contains("last")),
            other => panic!("Expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_include_and_do_block() {
        let stmt = parse_statement_from_str("include \"std.myl\"").unwrap();
        assert!(matches!(stmt.kind, StatementKind::Include(ref p) if p == "std.myl"));

        let stmt = parse_statement_from_str("do\n i8 a = 1\n i8 b = 2\nend").unwrap();
        assert!(matches!(stmt.kind, StatementKind::Block(ref b) if b.len() == 2));
    }

    #[test]
    fn test_unterminated_block() {
        let err = parse_statement_from_str("def f()\n i32 x = 1").unwrap_err();
        match err {
            CompileError::Syntax { expected, found, .. } => {
                assert_eq!(expected, "'end'");
                assert_eq!(found, "EOF");
            }
            other => panic!("Expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_statement_start() {
        let err = parse_statement_from_str("42").unwrap_err();
        match err {
            CompileError::Syntax { expected, .. } => assert_eq!(expected, "statement"),
            other => panic!("Expected syntax error, got {other:?}"),
        }
    }
}
