//! Calls and their stack-slot arguments
//!
//! Arguments are queued per call between `BEGIN_CALL` and `CALL` and only
//! written to their slots right before the `call` instruction. A call
//! nested inside an argument list therefore finishes before any slot of the
//! enclosing call is written.

use super::CodeGenerator;
use crate::abi::{arg_slot_disp, ARG_SLOT_SIZE, RETURN_REG, STACK_PTR};
use crate::asm::{AsmInst, Operand, Reg};
use crate::errors::CodegenError;
use crate::value::{const_width, EvalValue};
use log::trace;
use myl_common::{CompileResult, IntWidth, StorageKind};
use myl_frontend::Opcode;

impl CodeGenerator<'_> {
    pub(crate) fn begin_call(&mut self) -> CompileResult<()> {
        self.current_function(Opcode::BeginCall)?;
        self.pending_calls.push(Vec::new());
        Ok(())
    }

    /// Queue the topmost value as the next argument of the innermost open call
    pub(crate) fn push_argument(&mut self) -> CompileResult<()> {
        let op = Opcode::PushArgument;
        if self.pending_calls.is_empty() {
            return Err(self.fail(CodegenError::UnbalancedCall(op)));
        }

        let value = match self.pop_value(op)? {
            // a later argument may reuse the register
            EvalValue::Register { reg, width } => self.spill(reg, width),
            other => other,
        };
        trace!("queued argument {}", value.describe());
        if let Some(args) = self.pending_calls.last_mut() {
            args.push(value);
        }
        Ok(())
    }

    pub(crate) fn call(&mut self, name: &str) -> CompileResult<()> {
        let Some(args) = self.pending_calls.pop() else {
            return Err(self.fail(CodegenError::UnbalancedCall(Opcode::Call)));
        };

        // rax and the scratch registers do not survive the call
        for index in 0..self.stack.len() {
            if let EvalValue::Register { reg, width } = self.stack[index] {
                let spilled = self.spill(reg, width);
                self.stack[index] = spilled;
            }
        }

        self.pool.reset();
        let mut offset = 0;
        for value in &args {
            self.write_argument(offset, value)?;
            offset += ARG_SLOT_SIZE;
        }
        self.push(AsmInst::Call(name.to_string()));
        self.pool.reset();

        let return_width = self.ctx.function(name).and_then(|f| f.return_width);
        self.call_result_pushed = match return_width {
            Some(width) => {
                self.stack.push(EvalValue::Register { reg: RETURN_REG, width });
                true
            }
            None => false,
        };
        Ok(())
    }

    /// Drop the result of a call made as a statement
    pub(crate) fn discard(&mut self) {
        if self.call_result_pushed {
            self.stack.pop();
            self.call_result_pushed = false;
        }
    }

    /// Write `value` to the argument slot `offset` bytes above the shadow space
    fn write_argument(&mut self, offset: u32, value: &EvalValue) -> CompileResult<()> {
        let width = match value {
            EvalValue::Int(v) => const_width(*v),
            EvalValue::Str(_) => IntWidth::I64,
            EvalValue::Float(_) | EvalValue::Local { kind: StorageKind::Float, .. } => IntWidth::I32,
            EvalValue::Local { kind: StorageKind::Int(width), .. } => *width,
            EvalValue::Register { width, .. } => *width,
        };

        let reg = self.pool.pop();
        self.load_into(reg, width, value, Opcode::PushArgument)?;
        let slot = Operand::Mem { width, base: STACK_PTR, disp: arg_slot_disp(offset) };
        self.push(AsmInst::Mov(slot, Operand::reg(reg, width)));
        trace!("argument {} in slot rsp + {}", value.describe(), arg_slot_disp(offset));
        Ok(())
    }

    /// Move a register value into a fresh frame slot
    fn spill(&mut self, reg: Reg, width: IntWidth) -> EvalValue {
        let offset = self.next_offset + width.size_in_bytes();
        self.next_offset = offset;
        self.push(AsmInst::Mov(Operand::local(width, offset), Operand::reg(reg, width)));
        trace!("spilled {} to rbp - {}", reg.name(width), offset);
        EvalValue::Local { kind: StorageKind::Int(width), offset }
    }
}

#[cfg(test)]
mod tests {
    use crate::emit::CodeGenerator;
    use myl_frontend::Frontend;
    use pretty_assertions::assert_eq;

    fn text(source: &str) -> Vec<String> {
        let mut ctx = Frontend::lower_source(source, "test.myl").unwrap();
        let program = CodeGenerator::new(&mut ctx).generate().unwrap();
        program.text.iter().map(|l| l.to_string().trim().to_string()).collect()
    }

    fn position(lines: &[String], line: &str) -> usize {
        lines.iter().position(|l| l == line).unwrap_or_else(|| panic!("missing '{}' in {:?}", line, lines))
    }

    #[test]
    fn test_arguments_fill_slots_in_order() {
        let lines = text("extern puts\ndef f()\n puts(\"a\", 7)\nend");
        assert!(lines.contains(&"lea rcx, [rel lc0]".to_string()));
        assert!(lines.contains(&"mov qword [rsp + 32], rcx".to_string()));
        assert!(lines.contains(&"mov r8d, 7".to_string()));
        assert!(lines.contains(&"mov dword [rsp + 40], r8d".to_string()));
        assert!(lines.contains(&"call puts".to_string()));
    }

    #[test]
    fn test_call_result_used_as_value() {
        let lines = text("def g(): i32\n return 4\nend\ndef f()\n i32 a = g()\nend");
        let call = position(&lines, "call g");
        assert_eq!(lines[call + 1], "mov dword [rbp - 4], eax");
    }

    #[test]
    fn test_statement_call_discards_result() {
        let mut ctx =
            Frontend::lower_source("def g(): i32\n return 4\nend\ndef f()\n g()\n i32 a = 1\nend", "t.myl")
                .unwrap();
        let program = CodeGenerator::new(&mut ctx).generate().unwrap();
        assert!(program.to_string().contains("mov dword [rbp - 4], 1"));
    }

    #[test]
    fn test_slot_offset_resets_after_call() {
        let lines = text("extern p\ndef f()\n p(1)\n p(2)\nend");
        let slots = lines.iter().filter(|l| l.starts_with("mov dword [rsp + 32]")).count();
        assert_eq!(slots, 2);
    }

    #[test]
    fn test_nested_call_result_is_spilled_before_outer_call() {
        let lines = text("extern f\ndef g(): i32\n return 7\nend\ndef h()\n f(1, g())\nend");
        let inner = position(&lines, "call g");
        assert_eq!(lines[inner + 1], "mov dword [rbp - 4], eax");
        assert_eq!(
            lines[inner + 2..inner + 7],
            [
                "mov ecx, 1",
                "mov dword [rsp + 32], ecx",
                "mov r8d, dword [rbp - 4]",
                "mov dword [rsp + 40], r8d",
                "call f",
            ]
        );
    }

    #[test]
    fn test_nested_call_arguments_do_not_clobber_outer_slots() {
        let lines = text("extern f\ndef g(): i32\n return 7\nend\ndef h()\n f(1, g(2), 3)\nend");
        let inner = position(&lines, "call g");
        let outer = position(&lines, "call f");
        assert_eq!(lines[inner - 2..inner], ["mov ecx, 2", "mov dword [rsp + 32], ecx"]);

        // every slot of f is written after g has returned
        let outer_slots: Vec<&str> = lines[inner..outer]
            .iter()
            .filter(|l| l.contains("[rsp + "))
            .map(|l| l.as_str())
            .collect();
        assert_eq!(
            outer_slots,
            ["mov dword [rsp + 32], ecx", "mov dword [rsp + 40], r8d", "mov dword [rsp + 48], r9d"]
        );
        assert!(lines[..inner].iter().all(|l| !l.contains("[rsp + 40]")));
    }

    #[test]
    fn test_pending_value_survives_call() {
        let source = "def g(): i32\n return 7\nend\ndef h(): i32\n i32 a = 2\n i32 b = 3\n return a * b + g()\nend";
        let lines = text(source);
        let call = position(&lines, "call g");
        assert_eq!(lines[call - 2..call], ["imul eax, r11d", "mov dword [rbp - 12], eax"]);
        assert_eq!(
            lines[call + 1..call + 4],
            ["mov edx, eax", "mov eax, dword [rbp - 12]", "add eax, edx"]
        );
        // the spill slot is part of the frame
        assert!(lines.contains(&"sub rsp, 44".to_string()));
    }

    #[test]
    fn test_relocated_value_survives_call() {
        let source = "def g(): i32\n return 7\nend\ndef h(): i32\n i32 a = 2\n return a * a + (a * a + g())\nend";
        let lines = text(source);
        let call = position(&lines, "call g");
        assert!(lines.contains(&"mov rcx, rax".to_string()));
        assert_eq!(
            lines[call - 2..call],
            ["mov dword [rbp - 8], ecx", "mov dword [rbp - 12], eax"]
        );
        assert!(lines[call..].contains(&"mov eax, dword [rbp - 8]".to_string()));
        assert!(lines[call..].contains(&"mov eax, dword [rbp - 12]".to_string()));
    }
}
