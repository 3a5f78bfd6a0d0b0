//! Expression parsing for myl
//!
//! Precedence, loosest first: ternary, `||`, `&&`, equality, relational,
//! additive, multiplicative, unary, primary. Binary levels are
//! left-associative.

use crate::ast::*;
use crate::lexer::TokenKind;
use crate::parser::Parser;
use myl_common::CompileError;

impl Parser {
    /// Parse expression (top level)
    pub fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        if self.check(TokenKind::If) {
            return self.parse_ternary_expression();
        }
        self.parse_logical_or_expression()
    }

    /// `if cond then a else b`
    fn parse_ternary_expression(&mut self) -> Result<Expression, CompileError> {
        let location = self.expect(TokenKind::If, "conditional expression")?.location;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::Then, "conditional expression")?;
        let then_value = self.parse_expression()?;
        self.expect(TokenKind::Else, "conditional expression")?;
        let else_value = self.parse_expression()?;

        Ok(Expression::new(
            ExpressionKind::Ternary {
                condition: Box::new(condition),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
            location,
        ))
    }

    fn parse_logical_or_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_logical_and_expression()?;

        while self.match_token(TokenKind::Or)? {
            let right = self.parse_logical_and_expression()?;
            left = logical(LogicalOp::Or, left, right);
        }

        Ok(left)
    }

    fn parse_logical_and_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_equality_expression()?;

        while self.match_token(TokenKind::And)? {
            let right = self.parse_equality_expression()?;
            left = logical(LogicalOp::And, left, right);
        }

        Ok(left)
    }

    fn parse_equality_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_relational_expression()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::IsEq => CompareOp::Equal,
                TokenKind::IsNotEq => CompareOp::NotEqual,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational_expression()?;
            left = compare(op, left, right);
        }

        Ok(left)
    }

    fn parse_relational_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_additive_expression()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Less => CompareOp::Less,
                TokenKind::LessEq => CompareOp::LessEqual,
                TokenKind::Greater => CompareOp::Greater,
                TokenKind::GreaterEq => CompareOp::GreaterEqual,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive_expression()?;
            left = compare(op, left, right);
        }

        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_multiplicative_expression()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Dash => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative_expression()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_unary_expression()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary_expression()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// `!x` or `-x`. In a chain of prefixes only the innermost one is kept,
    /// so `!!x` parses as `!x`.
    fn parse_unary_expression(&mut self) -> Result<Expression, CompileError> {
        let op = match self.peek().kind {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Dash => UnaryOp::Neg,
            _ => return self.parse_primary_expression(),
        };
        let location = self.advance()?.location;
        let operand = self.parse_unary_expression()?;

        if matches!(operand.kind, ExpressionKind::Unary { .. }) {
            return Ok(operand);
        }

        Ok(Expression::new(
            ExpressionKind::Unary {
                op,
                operand: Box::new(operand),
            },
            location,
        ))
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, CompileError> {
        match self.peek().kind {
            TokenKind::LeftParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "parenthesized expression")?;
                Ok(expr)
            }
            TokenKind::Identifier => {
                let name = self.advance()?;
                if self.check(TokenKind::LeftParen) {
                    let args = self.parse_call_arguments()?;
                    Ok(Expression::new(
                        ExpressionKind::Call { name: name.text, args },
                        name.location,
                    ))
                } else {
                    let location = name.location.clone();
                    Ok(Expression::new(ExpressionKind::Literal(name), location))
                }
            }
            TokenKind::Digit | TokenKind::Decimal | TokenKind::String => {
                let token = self.advance()?;
                let location = token.location.clone();
                Ok(Expression::new(ExpressionKind::Literal(token), location))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `( [expr {, expr}] )`
    pub(crate) fn parse_call_arguments(&mut self) -> Result<Vec<Expression>, CompileError> {
        self.expect(TokenKind::LeftParen, "call arguments")?;

        let mut args = Vec::new();
        if self.match_token(TokenKind::RightParen)? {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            if !self.match_token(TokenKind::Comma)? {
                break;
            }
        }

        self.expect(TokenKind::RightParen, "call arguments")?;
        Ok(args)
    }

    /// Whether the current token can begin an expression
    pub(crate) fn at_expression_start(&self) -> bool {
        self.check_any(&[
            TokenKind::LeftParen,
            TokenKind::Not,
            TokenKind::Dash,
            TokenKind::Identifier,
            TokenKind::Digit,
            TokenKind::Decimal,
            TokenKind::String,
        ])
    }
}

fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    let location = left.location.clone();
    Expression::new(
        ExpressionKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        location,
    )
}

fn compare(op: CompareOp, left: Expression, right: Expression) -> Expression {
    let location = left.location.clone();
    Expression::new(
        ExpressionKind::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        location,
    )
}

fn logical(op: LogicalOp, left: Expression, right: Expression) -> Expression {
    let location = left.location.clone();
    Expression::new(
        ExpressionKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        location,
    )
}
