//! Function prologues, epilogues, returns and the `boot` entry trampoline

use super::{add_unique, CodeGenerator};
use crate::abi::{
    frame_size, FrameFixups, FrameLayout, FrameSize, ENTRY_STACK_RESERVE, FRAME_PTR, RETURN_REG,
    STACK_PTR,
};
use crate::asm::{AsmInst, AsmLine, Operand, Reg};
use crate::errors::CodegenError;
use log::debug;
use myl_common::{CompileResult, IntWidth};
use myl_frontend::Opcode;

/// User function the generated `main` calls
pub const BOOT_FUNCTION: &str = "boot";
pub const ENTRY_POINT: &str = "main";
pub const EXIT_PROCESS: &str = "ExitProcess";

impl CodeGenerator<'_> {
    pub(crate) fn start_proc(&mut self, name: &str, public: bool) {
        self.stack.clear();
        self.locals.clear();
        self.next_offset = 0;
        self.pool.reset();
        self.fixups = FrameFixups::default();
        self.pending_calls.clear();
        self.call_result_pushed = false;
        self.current_function = Some(name.to_string());

        if public {
            add_unique(&mut self.globals, name);
        }
        debug!("codegen: function '{}'{}", name, if public { " (public)" } else { "" });

        self.label(name);
        let start = self.push(AsmInst::Push(FRAME_PTR));
        self.push(AsmInst::Mov(
            Operand::reg(FRAME_PTR, IntWidth::I64),
            Operand::reg(STACK_PTR, IntWidth::I64),
        ));
        self.push(AsmInst::AllocFrame(FrameSize::Pending));
        self.fixups.record_prologue(start);
    }

    /// Size the frame now that every local is known, or drop it entirely
    pub(crate) fn close_stack(&mut self) -> CompileResult<()> {
        let function = self.current_function(Opcode::CloseStack)?;

        let size = if self.next_offset == 0 {
            for index in self.fixups.elided_lines() {
                self.program.text.remove(index);
            }
            debug!("codegen: '{}' has no locals, frame elided", function);
            None
        } else {
            let size = frame_size(self.next_offset);
            if let Some(index) = self.fixups.alloc_index() {
                self.program.text[index] =
                    AsmLine::Inst(AsmInst::AllocFrame(FrameSize::Resolved(size)));
            }
            self.push(AsmInst::Add(
                Operand::reg(STACK_PTR, IntWidth::I64),
                Operand::Imm(size as i64),
            ));
            self.push(AsmInst::Leave);
            debug!("codegen: '{}' frame is {} bytes", function, size);
            Some(size)
        };

        self.program.frames.push(FrameLayout {
            function,
            size,
            locals: std::mem::take(&mut self.locals),
        });
        self.fixups = FrameFixups::default();
        Ok(())
    }

    pub(crate) fn end_proc(&mut self) -> CompileResult<()> {
        let name = self.current_function(Opcode::EndProc)?;
        let missing_return = self
            .ctx
            .function(&name)
            .is_some_and(|f| f.return_width.is_some() && !f.has_returned);
        if missing_return {
            return Err(self.fail(CodegenError::MissingReturnValue(name)));
        }

        if !self.last_is_ret() {
            self.push(AsmInst::Ret);
        }
        self.current_function = None;
        Ok(())
    }

    pub(crate) fn emit_return(&mut self) -> CompileResult<()> {
        let name = self.current_function(Opcode::Return)?;
        let return_width = self.ctx.function(&name).and_then(|f| f.return_width);

        if let Some(value) = self.stack.pop() {
            let Some(width) = return_width else {
                return Err(self.fail(CodegenError::UnexpectedReturnValue(name)));
            };
            self.load_into(RETURN_REG, width, &value, Opcode::Return)?;
            if let Some(function) = self.ctx.function_mut(&name) {
                function.has_returned = true;
            }
        }

        let release = self.push(AsmInst::Leave);
        self.fixups.record_release(release);
        self.push(AsmInst::Ret);
        Ok(())
    }

    /// Prepend `main`, which calls `boot` and exits with its result
    pub(crate) fn emit_entry_point(&mut self) -> CompileResult<()> {
        if self.ctx.function(BOOT_FUNCTION).is_none() {
            return Ok(());
        }
        if self.ctx.function(ENTRY_POINT).is_some() {
            return Err(CodegenError::ReservedEntryPoint.at(None));
        }

        let mut text = vec![
            AsmLine::Label(ENTRY_POINT.to_string()),
            AsmLine::Inst(AsmInst::Sub(
                Operand::reg(STACK_PTR, IntWidth::I64),
                Operand::Imm(ENTRY_STACK_RESERVE as i64),
            )),
            AsmLine::Inst(AsmInst::Call(BOOT_FUNCTION.to_string())),
            AsmLine::Inst(AsmInst::Mov(
                Operand::reg(Reg::Rcx, IntWidth::I32),
                Operand::reg(RETURN_REG, IntWidth::I32),
            )),
            AsmLine::Inst(AsmInst::Call(EXIT_PROCESS.to_string())),
        ];
        text.append(&mut self.program.text);
        self.program.text = text;

        self.globals.retain(|g| g != ENTRY_POINT);
        self.globals.insert(0, ENTRY_POINT.to_string());
        add_unique(&mut self.externs, EXIT_PROCESS);
        debug!("codegen: entry point '{}' calls '{}'", ENTRY_POINT, BOOT_FUNCTION);
        Ok(())
    }
}
