//! Local variable slots: stores and loads

use super::CodeGenerator;
use crate::asm::{AsmInst, Operand, Reg};
use crate::errors::CodegenError;
use crate::value::{fits_imm32, EvalValue, Variable};
use log::trace;
use myl_common::{CompileResult, IntWidth, StorageKind};
use myl_frontend::Opcode;

impl CodeGenerator<'_> {
    /// Pop the initializer and write it to a fresh slot for `name`
    pub(crate) fn store(&mut self, op: Opcode, kind: StorageKind, name: &str) -> CompileResult<()> {
        self.current_function(op)?;
        let value = self.pop_value(op)?;
        let offset = self.next_offset + kind.slot_size();

        match kind {
            StorageKind::Int(width) => self.store_int(op, name, width, offset, &value)?,
            StorageKind::Float => self.store_float(name, offset, &value)?,
        }

        trace!("local '{}' ({}) at rbp - {}", name, kind, offset);
        self.next_offset = offset;
        self.locals.push(Variable {
            name: name.to_string(),
            offset,
            kind,
            constant: value.is_constant().then_some(value),
        });
        self.pool.reset();
        Ok(())
    }

    fn store_int(
        &mut self,
        op: Opcode,
        name: &str,
        width: IntWidth,
        offset: u32,
        value: &EvalValue,
    ) -> CompileResult<()> {
        let slot = Operand::local(width, offset);
        let acc = Operand::reg(Reg::Rax, width);

        let constant = match value {
            EvalValue::Int(v) => Some(width.wrap(*v)),
            EvalValue::Float(f) => Some(width.wrap(*f as i64)),
            _ => None,
        };
        if let Some(v) = constant {
            if fits_imm32(v) {
                self.push(AsmInst::Mov(slot, Operand::Imm(v)));
            } else {
                // no 64-bit immediate form for memory destinations
                self.push(AsmInst::Mov(acc.clone(), Operand::Imm(v)));
                self.push(AsmInst::Mov(slot, acc));
            }
            return Ok(());
        }

        match value {
            EvalValue::Local { kind: StorageKind::Int(_), .. } | EvalValue::Register { .. } => {
                self.load_into(Reg::Rax, width, value, op)?;
                self.push(AsmInst::Mov(slot, acc));
            }
            EvalValue::Str(label) if width == IntWidth::I64 => {
                self.push(AsmInst::Lea(acc.clone(), Operand::data(None, label.as_str())));
                self.push(AsmInst::Mov(slot, acc));
            }
            other => {
                return Err(self.fail(CodegenError::UnsupportedStore {
                    name: name.to_string(),
                    target: width.to_string(),
                    kind: other.describe(),
                }));
            }
        }
        Ok(())
    }

    /// Floats move through `xmm0`; constants come from the data section
    fn store_float(&mut self, name: &str, offset: u32, value: &EvalValue) -> CompileResult<()> {
        let xmm = Operand::reg(Reg::Xmm0, IntWidth::I32);
        let source = match value {
            EvalValue::Float(f) => {
                Operand::data(Some(IntWidth::I32), self.interner.intern_float(*f))
            }
            EvalValue::Int(v) => {
                Operand::data(Some(IntWidth::I32), self.interner.intern_float(*v as f32))
            }
            EvalValue::Local { kind: StorageKind::Float, offset: src } => {
                Operand::local(IntWidth::I32, *src)
            }
            other => {
                return Err(self.fail(CodegenError::UnsupportedStore {
                    name: name.to_string(),
                    target: StorageKind::Float.to_string(),
                    kind: other.describe(),
                }));
            }
        };

        self.push(AsmInst::Movss(xmm.clone(), source));
        self.push(AsmInst::Movss(Operand::local(IntWidth::I32, offset), xmm));
        Ok(())
    }

    /// Push a reference to the most recent declaration of `name`
    pub(crate) fn load_var(&mut self, name: &str) -> CompileResult<()> {
        let value = match self.locals.iter().rev().find(|v| v.name == name) {
            Some(var) => EvalValue::Local { kind: var.kind, offset: var.offset },
            None => return Err(self.fail(CodegenError::UndefinedVariable(name.to_string()))),
        };
        self.stack.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::emit::CodeGenerator;
    use myl_common::{CompileResult, IntWidth, StorageKind};
    use myl_frontend::Frontend;

    fn generate(source: &str) -> CompileResult<crate::asm::AsmProgram> {
        let mut ctx = Frontend::lower_source(source, "test.myl")?;
        CodeGenerator::new(&mut ctx).generate()
    }

    fn text(source: &str) -> Vec<String> {
        let program = generate(source).unwrap();
        program.text.iter().map(|l| l.to_string().trim().to_string()).collect()
    }

    #[test]
    fn test_offsets_increase_by_slot_size() {
        let program = generate("def f()\n i8 a\n i32 b\n float c\n i16 d\nend").unwrap();
        let offsets: Vec<u32> = program.frames[0].locals.iter().map(|v| v.offset).collect();
        assert_eq!(offsets, vec![1, 5, 9, 11]);
        assert_eq!(program.frames[0].locals[2].kind, StorageKind::Float);
    }

    #[test]
    fn test_large_constant_goes_through_rax() {
        let lines = text("def f()\n i64 a = 5000000000\nend");
        assert!(lines.contains(&"mov rax, 5000000000".to_string()));
        assert!(lines.contains(&"mov qword [rbp - 8], rax".to_string()));
    }

    #[test]
    fn test_constant_wraps_to_slot_width() {
        let lines = text("def f()\n i8 a = 300\nend");
        assert!(lines.contains(&"mov byte [rbp - 1], 44".to_string()));
    }

    #[test]
    fn test_float_store_uses_xmm0() {
        let program = generate("def f()\n float r = 2.5\nend").unwrap();
        let rendered = program.to_string();
        assert!(rendered.contains("lc0: dd 2.5"));
        assert!(rendered.contains("movss xmm0, dword [rel lc0]"));
        assert!(rendered.contains("movss dword [rbp - 4], xmm0"));
    }

    #[test]
    fn test_string_into_qword() {
        let lines = text("def f()\n i64 s = \"hi\"\nend");
        assert!(lines.contains(&"lea rax, [rel lc0]".to_string()));
        assert!(lines.contains(&"mov qword [rbp - 8], rax".to_string()));
    }

    #[test]
    fn test_string_into_narrow_slot_fails() {
        let err = generate("def f()\n i32 s = \"hi\"\nend").unwrap_err();
        assert!(err.to_string().contains("Cannot store string into I32 variable 's'"));
    }

    #[test]
    fn test_redeclaration_shadows() {
        let program = generate("def f()\n i32 a = 1\n i64 a = a\nend").unwrap();
        let rendered = program.to_string();
        assert!(rendered.contains("movsxd rax, dword [rbp - 4]"));
        let locals = &program.frames[0].locals;
        assert_eq!(locals[1].kind, StorageKind::Int(IntWidth::I64));
        assert_eq!(locals[1].offset, 12);
    }
}
