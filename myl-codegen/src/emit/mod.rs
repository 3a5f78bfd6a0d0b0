//! Pass 2: linear emission over the IR
//!
//! One scan over the finished instruction list. Each opcode has a fixed
//! rule; values flow between rules through the evaluation stack, and the
//! function frame is sized by back-patching once the function closes.

mod arith;
mod calls;
mod data;
mod frame;
mod locals;

pub use arith::fold;
pub use data::Interner;

use crate::abi::FrameFixups;
use crate::asm::{AsmInst, AsmLine, AsmProgram, Directive, Operand, Reg};
use crate::errors::CodegenError;
use crate::regalloc::RegisterPool;
use crate::value::{normalize_int_literal, EvalValue, Variable};
use log::{debug, trace};
use myl_common::{CompileError, CompileResult, IntWidth, SourceLocation, StorageKind};
use myl_frontend::{CompilationContext, IrInstruction, IrOperand, Opcode};

/// Emits one compilation unit
pub struct CodeGenerator<'a> {
    ctx: &'a mut CompilationContext,
    program: AsmProgram,
    globals: Vec<String>,
    externs: Vec<String>,
    interner: Interner,

    /// Evaluation stack
    stack: Vec<EvalValue>,
    /// Locals of the current function, in declaration order
    locals: Vec<Variable>,
    /// Bytes of locals allocated so far in the current function
    next_offset: u32,
    pool: RegisterPool,
    fixups: FrameFixups,
    /// Queued arguments of every call whose `BEGIN_CALL` has been seen,
    /// innermost last
    pending_calls: Vec<Vec<EvalValue>>,
    /// Whether the last `call` left its result on the stack
    call_result_pushed: bool,

    current_function: Option<String>,
    /// Source location of the instruction being emitted
    location: Option<SourceLocation>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(ctx: &'a mut CompilationContext) -> Self {
        Self {
            ctx,
            program: AsmProgram::default(),
            globals: Vec::new(),
            externs: Vec::new(),
            interner: Interner::default(),
            stack: Vec::new(),
            locals: Vec::new(),
            next_offset: 0,
            pool: RegisterPool::new(),
            fixups: FrameFixups::default(),
            pending_calls: Vec::new(),
            call_result_pushed: false,
            current_function: None,
            location: None,
        }
    }

    /// Run the emission pass and assemble the output sections
    pub fn generate(mut self) -> CompileResult<AsmProgram> {
        let instructions = std::mem::take(&mut self.ctx.instructions);
        let result = instructions
            .iter()
            .try_for_each(|instruction| self.emit_instruction(instruction));
        self.ctx.instructions = instructions;
        result?;

        self.emit_entry_point()?;
        Ok(self.finish())
    }

    fn emit_instruction(&mut self, inst: &IrInstruction) -> CompileResult<()> {
        self.location = inst.location.clone();
        trace!("emit: {}", inst);

        match inst.opcode {
            Opcode::StartProc | Opcode::StartPubProc => {
                let name = text_operand(inst)?;
                self.start_proc(name, inst.opcode == Opcode::StartPubProc);
                Ok(())
            }
            Opcode::CloseStack => self.close_stack(),
            Opcode::EndProc => self.end_proc(),

            Opcode::MovIntConst => match inst.operand {
                IrOperand::Int(value) => {
                    self.stack.push(EvalValue::Int(normalize_int_literal(value)));
                    Ok(())
                }
                _ => Err(self.fail(CodegenError::MissingOperand(inst.opcode))),
            },
            Opcode::MovFloatConst => match inst.operand {
                IrOperand::Float(value) => {
                    self.stack.push(EvalValue::Float(value));
                    Ok(())
                }
                _ => Err(self.fail(CodegenError::MissingOperand(inst.opcode))),
            },
            Opcode::LoadString => {
                let label = self.interner.intern_string(text_operand(inst)?);
                self.stack.push(EvalValue::Str(label));
                Ok(())
            }
            Opcode::LoadVar => self.load_var(text_operand(inst)?),

            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => self.binary(inst.opcode),
            Opcode::Neg => self.negate(),
            Opcode::Not => self.logical_not(),
            Opcode::Cmp => self.compare(),

            Opcode::If | Opcode::Else | Opcode::EndIf => {
                self.label(text_operand(inst)?);
                Ok(())
            }
            Opcode::JmpEq => {
                self.push(AsmInst::Je(text_operand(inst)?.to_string()));
                Ok(())
            }
            Opcode::Jmp => {
                // unreachable after a return
                if !self.last_is_ret() {
                    self.push(AsmInst::Jmp(text_operand(inst)?.to_string()));
                }
                Ok(())
            }

            Opcode::StoreInt8
            | Opcode::StoreInt16
            | Opcode::StoreInt32
            | Opcode::StoreInt64
            | Opcode::StoreFloat64 => {
                let kind = inst
                    .opcode
                    .store_kind()
                    .ok_or_else(|| self.fail(CodegenError::MissingOperand(inst.opcode)))?;
                self.store(inst.opcode, kind, text_operand(inst)?)
            }

            Opcode::BeginCall => self.begin_call(),
            Opcode::PushArgument => self.push_argument(),
            Opcode::Call => self.call(text_operand(inst)?),
            Opcode::Discard => {
                self.discard();
                Ok(())
            }
            Opcode::Extern => {
                add_unique(&mut self.externs, text_operand(inst)?);
                Ok(())
            }
            Opcode::Return => self.emit_return(),
        }
    }

    /// Setup directives first, then data, then code
    fn finish(mut self) -> AsmProgram {
        let mut setup = vec![Directive::Bits(64), Directive::DefaultRel];
        setup.extend(self.globals.into_iter().map(Directive::Global));
        setup.extend(self.externs.into_iter().map(Directive::Extern));

        self.program.setup = setup;
        self.program.data = self.interner.into_entries();
        debug!(
            "codegen: {} text lines, {} data entries",
            self.program.text.len(),
            self.program.data.len()
        );
        self.program
    }

    /// Append an instruction and return its line index
    pub(crate) fn push(&mut self, inst: AsmInst) -> usize {
        self.program.text.push(AsmLine::Inst(inst));
        self.program.text.len() - 1
    }

    pub(crate) fn label(&mut self, name: &str) {
        self.program.text.push(AsmLine::Label(name.to_string()));
    }

    pub(crate) fn last_is_ret(&self) -> bool {
        matches!(self.program.text.last(), Some(AsmLine::Inst(AsmInst::Ret)))
    }

    pub(crate) fn fail(&self, err: CodegenError) -> CompileError {
        err.at(self.location.clone())
    }

    pub(crate) fn pop_value(&mut self, op: Opcode) -> CompileResult<EvalValue> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.fail(CodegenError::StackUnderflow(op))),
        }
    }

    pub(crate) fn current_function(&self, op: Opcode) -> CompileResult<String> {
        match &self.current_function {
            Some(name) => Ok(name.clone()),
            None => Err(self.fail(CodegenError::OutsideFunction(op))),
        }
    }

    /// Move a pending accumulator result out of the way before `rax` is reused
    pub(crate) fn relocate_accumulator(&mut self) {
        for index in 0..self.stack.len() {
            if let EvalValue::Register { reg: Reg::Rax, width } = self.stack[index] {
                let target = self.pool.pop();
                if target == Reg::Rax {
                    continue;
                }
                trace!("relocating pending rax into {}", target);
                self.push(AsmInst::Mov(
                    Operand::reg(target, IntWidth::I64),
                    Operand::reg(Reg::Rax, IntWidth::I64),
                ));
                self.stack[index] = EvalValue::Register { reg: target, width };
            }
        }
    }

    /// Bring `value` into the `width` view of `reg`, sign-extending or
    /// truncating integers as needed
    pub(crate) fn load_into(
        &mut self,
        reg: Reg,
        width: IntWidth,
        value: &EvalValue,
        op: Opcode,
    ) -> CompileResult<()> {
        let dst = Operand::reg(reg, width);

        match value {
            EvalValue::Int(v) => {
                self.push(AsmInst::Mov(dst, Operand::Imm(width.wrap(*v))));
            }
            EvalValue::Local { kind: StorageKind::Int(src_width), offset } => {
                let offset = *offset;
                let inst = sized_move(dst, *src_width, width, |w| Operand::local(w, offset));
                self.push(inst);
            }
            EvalValue::Register { reg: src, width: src_width } => {
                if *src == reg && src_width.size_in_bytes() >= width.size_in_bytes() {
                    return Ok(());
                }
                let src = *src;
                let inst = sized_move(dst, *src_width, width, |w| Operand::reg(src, w));
                self.push(inst);
            }
            EvalValue::Str(label) if width == IntWidth::I64 => {
                self.push(AsmInst::Lea(dst, Operand::data(None, label.as_str())));
            }
            EvalValue::Float(f) if width == IntWidth::I32 => {
                let label = self.interner.intern_float(*f);
                self.push(AsmInst::Mov(dst, Operand::data(Some(IntWidth::I32), label)));
            }
            EvalValue::Local { kind: StorageKind::Float, offset } if width == IntWidth::I32 => {
                self.push(AsmInst::Mov(dst, Operand::local(IntWidth::I32, *offset)));
            }
            other => {
                return Err(self.fail(CodegenError::UnsupportedOperand {
                    op,
                    kind: other.describe(),
                }));
            }
        }
        Ok(())
    }
}

/// `mov`, `movsx` or `movsxd` from a `src_width` source into `dst`
fn sized_move(
    dst: Operand,
    src_width: IntWidth,
    width: IntWidth,
    src: impl Fn(IntWidth) -> Operand,
) -> AsmInst {
    if src_width.size_in_bytes() < width.size_in_bytes() {
        if src_width == IntWidth::I32 {
            AsmInst::Movsxd(dst, src(src_width))
        } else {
            AsmInst::Movsx(dst, src(src_width))
        }
    } else {
        // same width, or narrowing: read the low bytes
        AsmInst::Mov(dst, src(width))
    }
}

fn text_operand(inst: &IrInstruction) -> CompileResult<&str> {
    match inst.text() {
        Some(text) => Ok(text),
        None => Err(CodegenError::MissingOperand(inst.opcode).at(inst.location.clone())),
    }
}

fn add_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}
