//! Arithmetic, negation, logical not and comparison templates

use super::CodeGenerator;
use crate::asm::{AsmInst, Operand, Reg};
use crate::errors::CodegenError;
use crate::value::{const_width, EvalValue};
use log::trace;
use myl_common::{CompileResult, IntWidth};
use myl_frontend::Opcode;

/// Evaluate `left op right` for two constants
///
/// Integer division always produces a float, so `7 / 2` folds to `3.5`.
pub fn fold(op: Opcode, left: &EvalValue, right: &EvalValue) -> Result<EvalValue, CodegenError> {
    match (left, right) {
        (EvalValue::Int(a), EvalValue::Int(b)) => match op {
            Opcode::Add => Ok(EvalValue::Int(a.wrapping_add(*b))),
            Opcode::Sub => Ok(EvalValue::Int(a.wrapping_sub(*b))),
            Opcode::Mul => Ok(EvalValue::Int(a.wrapping_mul(*b))),
            Opcode::Div if *b == 0 => Err(CodegenError::DivisionByZero),
            Opcode::Div => Ok(EvalValue::Float((*a as f64 / *b as f64) as f32)),
            _ => Err(CodegenError::UnsupportedOperand { op, kind: left.describe() }),
        },
        _ => {
            let (a, b) = match (as_float(left), as_float(right)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(CodegenError::UnsupportedOperand { op, kind: left.describe() }),
            };
            match op {
                Opcode::Add => Ok(EvalValue::Float(a + b)),
                Opcode::Sub => Ok(EvalValue::Float(a - b)),
                Opcode::Mul => Ok(EvalValue::Float(a * b)),
                Opcode::Div if b == 0.0 => Err(CodegenError::DivisionByZero),
                Opcode::Div => Ok(EvalValue::Float(a / b)),
                _ => Err(CodegenError::UnsupportedOperand { op, kind: left.describe() }),
            }
        }
    }
}

fn as_float(value: &EvalValue) -> Option<f32> {
    match value {
        EvalValue::Int(v) => Some(*v as f32),
        EvalValue::Float(f) => Some(*f),
        _ => None,
    }
}

impl CodeGenerator<'_> {
    pub(crate) fn binary(&mut self, op: Opcode) -> CompileResult<()> {
        let right = self.pop_value(op)?;
        let left = self.pop_value(op)?;

        if left.is_constant() && right.is_constant() {
            let value = fold(op, &left, &right).map_err(|e| self.fail(e))?;
            trace!("folded {:?} {} {:?} into {:?}", left, op, right, value);
            self.stack.push(value);
            return Ok(());
        }

        let width = self.operand_width(op, &left, &right)?;
        self.relocate_accumulator();

        let acc = Operand::reg(Reg::Rax, width);
        match op {
            Opcode::Add | Opcode::Sub => {
                self.load_into(Reg::Rdx, width, &right, op)?;
                self.load_into(Reg::Rax, width, &left, op)?;
                let src = Operand::reg(Reg::Rdx, width);
                self.push(if op == Opcode::Add {
                    AsmInst::Add(acc, src)
                } else {
                    AsmInst::Sub(acc, src)
                });
            }
            Opcode::Mul => {
                self.load_into(Reg::R11, width, &right, op)?;
                self.load_into(Reg::Rax, width, &left, op)?;
                let src = Operand::reg(Reg::R11, width);
                // no two-operand form for bytes
                self.push(if width == IntWidth::I8 {
                    AsmInst::Imul1(src)
                } else {
                    AsmInst::Imul(acc, src)
                });
            }
            Opcode::Div => {
                self.load_into(Reg::R11, width, &right, op)?;
                self.load_into(Reg::Rax, width, &left, op)?;
                self.push(match width {
                    IntWidth::I8 => AsmInst::Cbw,
                    IntWidth::I16 => AsmInst::Cwd,
                    IntWidth::I32 => AsmInst::Cdq,
                    IntWidth::I64 => AsmInst::Cqo,
                });
                self.push(AsmInst::Idiv(Operand::reg(Reg::R11, width)));
            }
            _ => return Err(self.fail(CodegenError::UnsupportedOperand { op, kind: "arithmetic" })),
        }

        self.stack.push(EvalValue::Register { reg: Reg::Rax, width });
        Ok(())
    }

    pub(crate) fn negate(&mut self) -> CompileResult<()> {
        let op = Opcode::Neg;
        let value = self.pop_value(op)?;
        let width = match value {
            EvalValue::Int(v) => {
                self.stack.push(EvalValue::Int(v.wrapping_neg()));
                return Ok(());
            }
            EvalValue::Float(f) => {
                self.stack.push(EvalValue::Float(-f));
                return Ok(());
            }
            ref other => self.require_int(op, other)?,
        };

        self.relocate_accumulator();
        self.load_into(Reg::Rax, width, &value, op)?;
        self.push(AsmInst::Neg(Operand::reg(Reg::Rax, width)));
        self.stack.push(EvalValue::Register { reg: Reg::Rax, width });
        Ok(())
    }

    pub(crate) fn logical_not(&mut self) -> CompileResult<()> {
        let op = Opcode::Not;
        let value = self.pop_value(op)?;
        let width = match value {
            EvalValue::Int(v) => {
                self.stack.push(EvalValue::Int((v == 0) as i64));
                return Ok(());
            }
            EvalValue::Float(f) => {
                self.stack.push(EvalValue::Int((f == 0.0) as i64));
                return Ok(());
            }
            ref other => self.require_int(op, other)?,
        };

        self.relocate_accumulator();
        self.load_into(Reg::Rax, width, &value, op)?;
        let acc = Operand::reg(Reg::Rax, width);
        let low = Operand::reg(Reg::Rax, IntWidth::I8);
        self.push(AsmInst::Test(acc.clone(), acc));
        self.push(AsmInst::Sete(low.clone()));
        match width {
            IntWidth::I8 => {}
            IntWidth::I16 => {
                self.push(AsmInst::Movzx(Operand::reg(Reg::Rax, IntWidth::I16), low));
            }
            // writing eax clears the upper half as well
            IntWidth::I32 | IntWidth::I64 => {
                self.push(AsmInst::Movzx(Operand::reg(Reg::Rax, IntWidth::I32), low));
            }
        }
        self.stack.push(EvalValue::Register { reg: Reg::Rax, width });
        Ok(())
    }

    /// Emit `cmp` for the two topmost values; the branch that follows reads the flags
    pub(crate) fn compare(&mut self) -> CompileResult<()> {
        let op = Opcode::Cmp;
        let right = self.pop_value(op)?;
        let left = self.pop_value(op)?;

        let width = match (&left, &right) {
            (EvalValue::Int(a), EvalValue::Int(b)) => {
                if const_width(*a) == IntWidth::I64 || const_width(*b) == IntWidth::I64 {
                    IntWidth::I64
                } else {
                    IntWidth::I32
                }
            }
            _ => self.operand_width(op, &left, &right)?,
        };

        let lhs = self.pool.pop();
        self.load_into(lhs, width, &left, op)?;
        let rhs = self.pool.pop();
        self.load_into(rhs, width, &right, op)?;
        self.push(AsmInst::Cmp(Operand::reg(lhs, width), Operand::reg(rhs, width)));
        self.pool.reset();
        Ok(())
    }

    /// Common width of two operands, at least one of which is not a constant
    fn operand_width(
        &self,
        op: Opcode,
        left: &EvalValue,
        right: &EvalValue,
    ) -> CompileResult<IntWidth> {
        match (left, right) {
            (EvalValue::Int(_), other) | (other, EvalValue::Int(_)) => self.require_int(op, other),
            _ => {
                let l = self.require_int(op, left)?;
                let r = self.require_int(op, right)?;
                if l != r {
                    return Err(self.fail(CodegenError::WidthMismatch { op, left: l, right: r }));
                }
                Ok(l)
            }
        }
    }

    fn require_int(&self, op: Opcode, value: &EvalValue) -> CompileResult<IntWidth> {
        match value.int_width() {
            Some(width) => Ok(width),
            None => Err(self.fail(CodegenError::UnsupportedOperand { op, kind: value.describe() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::CodeGenerator;
    use myl_frontend::Frontend;

    fn text(source: &str) -> Vec<String> {
        let mut ctx = Frontend::lower_source(source, "test.myl").unwrap();
        let program = CodeGenerator::new(&mut ctx).generate().unwrap();
        program.text.iter().map(|l| l.to_string().trim().to_string()).collect()
    }

    #[test]
    fn test_fold_integers() {
        assert_eq!(
            fold(Opcode::Add, &EvalValue::Int(5), &EvalValue::Int(3)),
            Ok(EvalValue::Int(8))
        );
        assert_eq!(
            fold(Opcode::Mul, &EvalValue::Int(-4), &EvalValue::Int(3)),
            Ok(EvalValue::Int(-12))
        );
    }

    #[test]
    fn test_fold_division_yields_float() {
        assert_eq!(
            fold(Opcode::Div, &EvalValue::Int(7), &EvalValue::Int(2)),
            Ok(EvalValue::Float(3.5))
        );
    }

    #[test]
    fn test_fold_mixed_uses_float() {
        assert_eq!(
            fold(Opcode::Add, &EvalValue::Int(1), &EvalValue::Float(0.5)),
            Ok(EvalValue::Float(1.5))
        );
    }

    #[test]
    fn test_fold_division_by_zero() {
        assert_eq!(
            fold(Opcode::Div, &EvalValue::Int(1), &EvalValue::Int(0)),
            Err(CodegenError::DivisionByZero)
        );
    }

    #[test]
    fn test_add_template() {
        let lines = text("def f()\n i16 a = 1\n i16 b = a + 2\nend");
        assert!(lines.contains(&"mov dx, 2".to_string()));
        assert!(lines.contains(&"mov ax, word [rbp - 2]".to_string()));
        assert!(lines.contains(&"add ax, dx".to_string()));
        assert!(lines.contains(&"mov word [rbp - 4], ax".to_string()));
    }

    #[test]
    fn test_byte_multiply_uses_one_operand_form() {
        let lines = text("def f()\n i8 a = 3\n i8 b = a * a\nend");
        assert!(lines.contains(&"imul r11b".to_string()));
    }

    #[test]
    fn test_divide_sign_extends_per_width() {
        let lines = text("def f()\n i64 a = 9\n i64 b = a / 3\nend");
        let cqo = lines.iter().position(|l| l == "cqo").unwrap();
        assert_eq!(lines[cqo + 1], "idiv r11");
    }

    #[test]
    fn test_constant_operands_fold() {
        let lines = text("def f()\n i32 a = 0 - 4\nend");
        assert!(lines.contains(&"mov dword [rbp - 4], -4".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("sub ") && !l.contains("rsp")));
    }

    #[test]
    fn test_negate_variable() {
        let lines = text("def f()\n i64 a = 2\n i64 b = -a\nend");
        assert!(lines.contains(&"mov rax, qword [rbp - 8]".to_string()));
        assert!(lines.contains(&"neg rax".to_string()));
    }

    #[test]
    fn test_not_variable() {
        let lines = text("def f()\n i32 a = 0\n i32 b = !a\nend");
        assert!(lines.contains(&"test eax, eax".to_string()));
        assert!(lines.contains(&"sete al".to_string()));
        assert!(lines.contains(&"movzx eax, al".to_string()));
    }

    #[test]
    fn test_width_mismatch_is_reported() {
        let mut ctx =
            Frontend::lower_source("def f()\n i8 a = 1\n i64 b = 2\n i64 c = a + b\nend", "t.myl")
                .unwrap();
        let err = CodeGenerator::new(&mut ctx).generate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("I8") && message.contains("I64"), "{}", message);
    }
}
