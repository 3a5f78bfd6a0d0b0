//! Pass 1: AST to IR lowering
//!
//! A single depth-first, left-to-right walk: operands before operators,
//! then-block before else-block. The only side effects besides appending
//! instructions are registering functions and tracking nesting depth.

use crate::ast::*;
use crate::ir::{CompilationContext, Function, IrInstruction, IrOperand, Opcode};
use crate::lexer::TokenKind;
use log::{debug, trace};
use myl_common::{CompileError, CompileResult, SourceLocation, StorageKind};

impl CompilationContext {
    /// Lower one statement parsed at the top level of the translation unit
    pub fn lower_top_level(&mut self, statement: &Statement) -> CompileResult<()> {
        match &statement.kind {
            StatementKind::Def { .. }
            | StatementKind::Extern(_)
            | StatementKind::Include(_)
            | StatementKind::When { .. } => self.lower_statement(statement),
            _ => Err(CompileError::semantic_error(
                format!("{} is not allowed at the top level", describe(&statement.kind)),
                statement.location.clone(),
            )),
        }
    }

    pub fn lower_statement(&mut self, statement: &Statement) -> CompileResult<()> {
        let location = &statement.location;

        match &statement.kind {
            StatementKind::Def { name, body, return_type, public } => {
                if self.scope_depth > 0 {
                    return Err(CompileError::semantic_error(
                        format!("Function '{}' cannot be defined inside another function", name),
                        location.clone(),
                    ));
                }
                if self.functions.contains_key(name) {
                    return Err(CompileError::semantic_error(
                        format!("Function '{}' is already defined", name),
                        location.clone(),
                    ));
                }

                debug!("Lowering function '{}' (return {:?}, public: {})", name, return_type, public);
                self.functions.insert(name.clone(), Function::new(name.clone(), *return_type));

                let start = if *public { Opcode::StartPubProc } else { Opcode::StartProc };
                self.emit(start, IrOperand::Text(name.clone()), location);
                self.lower_block(body)?;
                self.add(IrInstruction::bare(Opcode::CloseStack));
                self.emit(Opcode::EndProc, IrOperand::Text(name.clone()), location);
            }

            StatementKind::VarDecl { var_type, name, init } => {
                match init {
                    Some(expr) => self.lower_expression(expr)?,
                    None => {
                        let (opcode, zero) = match var_type {
                            StorageKind::Float => (Opcode::MovFloatConst, IrOperand::Float(0.0)),
                            StorageKind::Int(_) => (Opcode::MovIntConst, IrOperand::Int(0)),
                        };
                        self.emit(opcode, zero, location);
                    }
                }
                self.emit(Opcode::store_for(*var_type), IrOperand::Text(name.clone()), location);
            }

            StatementKind::If { condition, then_block, else_branch } => {
                self.lower_condition(condition)?;

                let then_label = self.gen_label();
                let else_label = else_branch.as_ref().map(|_| self.gen_label());
                let end_label = self.gen_label();
                trace!("if labels: then={} else={:?} end={}", then_label, else_label, end_label);

                self.add(label_instruction(Opcode::JmpEq, &then_label));
                let fallthrough = else_label.as_deref().unwrap_or(&end_label);
                self.add(label_instruction(Opcode::Jmp, fallthrough));

                self.add(label_instruction(Opcode::If, &then_label));
                self.lower_block(then_block)?;

                if let (Some(else_label), Some(else_branch)) = (&else_label, else_branch) {
                    self.add(label_instruction(Opcode::Jmp, &end_label));
                    self.add(label_instruction(Opcode::Else, else_label));
                    self.scope_depth += 1;
                    let result = self.lower_statement(else_branch);
                    self.scope_depth -= 1;
                    result?;
                }

                self.add(label_instruction(Opcode::EndIf, &end_label));
            }

            StatementKind::Else(block) | StatementKind::Block(block) => {
                self.lower_block(block)?;
            }

            StatementKind::Call { name, args } => {
                self.lower_call(name, args, location)?;
                self.add(IrInstruction::bare(Opcode::Discard));
            }

            StatementKind::Extern(name) => {
                self.emit(Opcode::Extern, IrOperand::Text(name.clone()), location);
            }

            StatementKind::Return(value) => {
                if let Some(expr) = value {
                    self.lower_expression(expr)?;
                }
                self.emit(Opcode::Return, IrOperand::None, location);
            }

            // Accepted by the parser, no code
            StatementKind::Include(path) => trace!("include \"{}\" ignored", path),
            StatementKind::When { subject, .. } => trace!("when {} ignored", subject),
        }

        Ok(())
    }

    fn lower_block(&mut self, block: &[Statement]) -> CompileResult<()> {
        self.scope_depth += 1;
        let result = block.iter().try_for_each(|statement| self.lower_statement(statement));
        self.scope_depth -= 1;
        result
    }

    /// Conditions must compare; logical and ternary conditions lower to nothing
    fn lower_condition(&mut self, condition: &Expression) -> CompileResult<()> {
        match &condition.kind {
            ExpressionKind::Compare { .. } => self.lower_expression(condition),
            ExpressionKind::Logical { .. } | ExpressionKind::Ternary { .. } => Ok(()),
            _ => Err(CompileError::semantic_error(
                "Condition of an if statement must be a comparison",
                condition.location.clone(),
            )),
        }
    }

    pub fn lower_expression(&mut self, expr: &Expression) -> CompileResult<()> {
        let location = &expr.location;

        match &expr.kind {
            ExpressionKind::Literal(token) => self.lower_literal(token.kind, &token.text, false, location),

            ExpressionKind::Unary { op, operand } => match (op, &operand.kind) {
                (UnaryOp::Neg, ExpressionKind::Literal(token))
                    if matches!(token.kind, TokenKind::Digit | TokenKind::Decimal) =>
                {
                    self.lower_literal(token.kind, &token.text, true, location)
                }
                (UnaryOp::Neg, _) => {
                    self.lower_expression(operand)?;
                    self.emit(Opcode::Neg, IrOperand::None, location);
                    Ok(())
                }
                (UnaryOp::Not, _) => {
                    self.lower_expression(operand)?;
                    self.emit(Opcode::Not, IrOperand::None, location);
                    Ok(())
                }
            },

            ExpressionKind::Binary { op, left, right } => {
                self.lower_expression(left)?;
                self.lower_expression(right)?;
                let opcode = match op {
                    BinaryOp::Add => Opcode::Add,
                    BinaryOp::Sub => Opcode::Sub,
                    BinaryOp::Mul => Opcode::Mul,
                    BinaryOp::Div => Opcode::Div,
                };
                self.emit(opcode, IrOperand::None, location);
                Ok(())
            }

            ExpressionKind::Compare { op, left, right } => {
                self.lower_expression(left)?;
                self.lower_expression(right)?;
                self.emit(Opcode::Cmp, IrOperand::Text(op.to_string()), location);
                Ok(())
            }

            ExpressionKind::Call { name, args } => self.lower_call(name, args, location),

            ExpressionKind::Logical { .. } | ExpressionKind::Ternary { .. } => Ok(()),
        }
    }

    fn lower_call(&mut self, name: &str, args: &[Expression], location: &SourceLocation) -> CompileResult<()> {
        self.emit(Opcode::BeginCall, IrOperand::Text(name.to_string()), location);
        for arg in args {
            self.lower_expression(arg)?;
            self.emit(Opcode::PushArgument, IrOperand::None, &arg.location);
        }
        self.emit(Opcode::Call, IrOperand::Text(name.to_string()), location);
        Ok(())
    }

    fn lower_literal(
        &mut self,
        kind: TokenKind,
        text: &str,
        negate: bool,
        location: &SourceLocation,
    ) -> CompileResult<()> {
        let (opcode, operand) = match kind {
            TokenKind::Digit => {
                // parse with the sign so that i64::MIN is representable
                let signed = if negate { format!("-{}", text) } else { text.to_string() };
                let value: i64 = signed.parse().map_err(|_| {
                    CompileError::semantic_error(
                        format!("Integer literal '{}' is out of range", signed),
                        location.clone(),
                    )
                })?;
                (Opcode::MovIntConst, IrOperand::Int(value))
            }
            TokenKind::Decimal => {
                let value: f32 = text.parse().map_err(|_| {
                    CompileError::semantic_error(
                        format!("Invalid decimal literal '{}'", text),
                        location.clone(),
                    )
                })?;
                (Opcode::MovFloatConst, IrOperand::Float(if negate { -value } else { value }))
            }
            TokenKind::String => (Opcode::LoadString, IrOperand::Text(text.to_string())),
            _ => (Opcode::LoadVar, IrOperand::Text(text.to_string())),
        };

        self.emit(opcode, operand, location);
        Ok(())
    }

    fn emit(&mut self, opcode: Opcode, operand: IrOperand, location: &SourceLocation) {
        self.add(IrInstruction::new(opcode, operand, Some(location.clone())));
    }
}

fn label_instruction(opcode: Opcode, label: &str) -> IrInstruction {
    IrInstruction::new(opcode, IrOperand::Text(label.to_string()), None)
}

fn describe(kind: &StatementKind) -> &'static str {
    match kind {
        StatementKind::VarDecl { .. } => "Variable declaration",
        StatementKind::If { .. } => "If statement",
        StatementKind::Else(_) => "Else branch",
        StatementKind::Def { .. } => "Function definition",
        StatementKind::Call { .. } => "Call statement",
        StatementKind::Extern(_) => "Extern declaration",
        StatementKind::Include(_) => "Include",
        StatementKind::Return(_) => "Return statement",
        StatementKind::Block(_) => "Do block",
        StatementKind::When { .. } => "When statement",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn lower(source: &str) -> CompileResult<CompilationContext> {
        let mut parser = Parser::new(Lexer::new(source))?;
        let mut ctx = CompilationContext::new();
        while let Some(statement) = parser.parse_statement()? {
            ctx.lower_top_level(&statement)?;
        }
        Ok(ctx)
    }

    fn listing(ctx: &CompilationContext) -> Vec<String> {
        ctx.instructions.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_function_shell() {
        let ctx = lower("pub def boot(): i32\n return 0\nend").unwrap();
        assert_eq!(
            listing(&ctx),
            vec![
                "START_PUB_PROC boot",
                "MOV_INT_CONST 0",
                "RETURN",
                "CLOSE_STACK",
                "END_PROC boot",
            ]
        );
        let function = ctx.function("boot").unwrap();
        assert_eq!(function.return_width, Some(myl_common::IntWidth::I32));
        assert!(!function.has_returned);
    }

    #[test]
    fn test_operands_before_operator() {
        let ctx = lower("def f()\n i64 x = a + 2 * b\nend").unwrap();
        assert_eq!(
            listing(&ctx)[1..7],
            [
                "LOAD_VAR a",
                "MOV_INT_CONST 2",
                "LOAD_VAR b",
                "MUL",
                "ADD",
                "STORE_INT64 x",
            ]
        );
    }

    #[test]
    fn test_declaration_without_initializer_stores_zero() {
        let ctx = lower("def f()\n i8 a\n float b\nend").unwrap();
        assert_eq!(
            listing(&ctx)[1..5],
            ["MOV_INT_CONST 0", "STORE_INT8 a", "MOV_FLOAT_CONST 0.0", "STORE_FLOAT64 b"]
        );
    }

    #[test]
    fn test_negative_literal_folds() {
        let ctx = lower("def f()\n i32 a = -5\n i32 b = -a\nend").unwrap();
        assert_eq!(
            listing(&ctx)[1..6],
            ["MOV_INT_CONST -5", "STORE_INT32 a", "LOAD_VAR a", "NEG", "STORE_INT32 b"]
        );
    }

    #[test]
    fn test_most_negative_literal() {
        let ctx = lower("def f()\n i64 a = -9223372036854775808\nend").unwrap();
        assert_eq!(ctx.instructions[1].operand, IrOperand::Int(i64::MIN));

        let err = lower("def f()\n i64 a = 9223372036854775808\nend").unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_if_else_labels() {
        let ctx = lower("def f(): i32\n if x == 5 then\n return 1\n else\n return 0\n end\nend").unwrap();
        assert_eq!(
            listing(&ctx)[1..15],
            [
                "LOAD_VAR x",
                "MOV_INT_CONST 5",
                "CMP ==",
                "JMPEQ L0",
                "JMP L1",
                "IF L0",
                "MOV_INT_CONST 1",
                "RETURN",
                "JMP L2",
                "ELSE L1",
                "MOV_INT_CONST 0",
                "RETURN",
                "ENDIF L2",
                "CLOSE_STACK",
            ]
        );
    }

    #[test]
    fn test_if_without_else_jumps_to_end() {
        let ctx = lower("def f()\n if x < 1 then\n g()\n end\nend").unwrap();
        assert_eq!(
            listing(&ctx)[4..11],
            ["JMPEQ L0", "JMP L1", "IF L0", "BEGIN_CALL g", "CALL g", "DISCARD", "ENDIF L1"]
        );
    }

    #[test]
    fn test_call_arguments() {
        let ctx = lower("extern puts\ndef f()\n puts(\"hi\", 3)\nend").unwrap();
        assert_eq!(
            listing(&ctx)[..9],
            [
                "EXTERN puts",
                "START_PROC f",
                "BEGIN_CALL puts",
                "LOAD_STRING hi",
                "PUSH_ARGUMENT",
                "MOV_INT_CONST 3",
                "PUSH_ARGUMENT",
                "CALL puts",
                "DISCARD",
            ]
        );
    }

    #[test]
    fn test_nested_call_opens_its_own_argument_list() {
        let ctx = lower("def f()\n p(1, q(2))\nend").unwrap();
        assert_eq!(
            listing(&ctx)[1..10],
            [
                "BEGIN_CALL p",
                "MOV_INT_CONST 1",
                "PUSH_ARGUMENT",
                "BEGIN_CALL q",
                "MOV_INT_CONST 2",
                "PUSH_ARGUMENT",
                "CALL q",
                "PUSH_ARGUMENT",
                "CALL p",
            ]
        );
    }

    #[test]
    fn test_unlowered_constructs_emit_nothing() {
        let ctx = lower("include \"x.myl\"\nwhen x\n 1 => f()\nend").unwrap();
        assert!(ctx.instructions.is_empty());
    }

    #[test]
    fn test_top_level_statement_rejected() {
        let err = lower("i32 x = 1").unwrap_err();
        match err {
            CompileError::Semantic { message, .. } => assert!(message.contains("top level")),
            other => panic!("Expected semantic error, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_def_rejected() {
        let err = lower("def f()\n def g()\n end\nend").unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn test_duplicate_def_rejected() {
        let err = lower("def f()\nend\ndef f()\nend").unwrap_err();
        match err {
            CompileError::Semantic { message, .. } => assert!(message.contains("already defined")),
            other => panic!("Expected semantic error, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_value_condition_rejected() {
        let err = lower("def f()\n if x then\n end\nend").unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn test_logical_condition_lowers_no_compare() {
        let ctx = lower("def f()\n if a == 1 && b == 2 then\n end\nend").unwrap();
        assert!(!ctx.instructions.iter().any(|i| i.opcode == Opcode::Cmp));
        assert!(ctx.instructions.iter().any(|i| i.opcode == Opcode::JmpEq));
    }
}
