//! x86-64 Assembly Definitions
//!
//! Register, operand and instruction model for the NASM text the backend
//! emits. Everything renders through `Display`; nothing is built by string
//! concatenation outside this module.

use crate::abi::{FrameLayout, FrameSize};
use myl_common::IntWidth;
use std::fmt;

/// Registers the backend touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Rax,
    Rcx,
    Rdx,
    R8,
    R9,
    R10,
    R11,
    Rsp,
    Rbp,
    Xmm0,
}

impl Reg {
    /// Name of the `width`-sized view of this register
    pub fn name(&self, width: IntWidth) -> &'static str {
        use IntWidth::*;
        match (self, width) {
            (Reg::Rax, I8) => "al",
            (Reg::Rax, I16) => "ax",
            (Reg::Rax, I32) => "eax",
            (Reg::Rax, I64) => "rax",
            (Reg::Rcx, I8) => "cl",
            (Reg::Rcx, I16) => "cx",
            (Reg::Rcx, I32) => "ecx",
            (Reg::Rcx, I64) => "rcx",
            (Reg::Rdx, I8) => "dl",
            (Reg::Rdx, I16) => "dx",
            (Reg::Rdx, I32) => "edx",
            (Reg::Rdx, I64) => "rdx",
            (Reg::R8, I8) => "r8b",
            (Reg::R8, I16) => "r8w",
            (Reg::R8, I32) => "r8d",
            (Reg::R8, I64) => "r8",
            (Reg::R9, I8) => "r9b",
            (Reg::R9, I16) => "r9w",
            (Reg::R9, I32) => "r9d",
            (Reg::R9, I64) => "r9",
            (Reg::R10, I8) => "r10b",
            (Reg::R10, I16) => "r10w",
            (Reg::R10, I32) => "r10d",
            (Reg::R10, I64) => "r10",
            (Reg::R11, I8) => "r11b",
            (Reg::R11, I16) => "r11w",
            (Reg::R11, I32) => "r11d",
            (Reg::R11, I64) => "r11",
            (Reg::Rsp, _) => "rsp",
            (Reg::Rbp, _) => "rbp",
            (Reg::Xmm0, _) => "xmm0",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name(IntWidth::I64))
    }
}

/// Instruction operand
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Sized register view, e.g. `eax`
    Reg(Reg, IntWidth),
    Imm(i64),
    /// `width [base +/- disp]`
    Mem { width: IntWidth, base: Reg, disp: i32 },
    /// RIP-relative data label, `[rel lc0]`
    Data { width: Option<IntWidth>, label: String },
}

impl Operand {
    pub fn reg(reg: Reg, width: IntWidth) -> Self {
        Operand::Reg(reg, width)
    }

    /// Local slot `offset` bytes below the frame pointer
    pub fn local(width: IntWidth, offset: u32) -> Self {
        Operand::Mem { width, base: Reg::Rbp, disp: -(offset as i32) }
    }

    pub fn data(width: Option<IntWidth>, label: impl Into<String>) -> Self {
        Operand::Data { width, label: label.into() }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(reg, width) => write!(f, "{}", reg.name(*width)),
            Operand::Imm(value) => write!(f, "{}", value),
            Operand::Mem { width, base, disp } => {
                write!(f, "{} [{}", width.ptr_keyword(), base)?;
                match disp {
                    0 => {}
                    d if *d < 0 => write!(f, " - {}", -(*d as i64))?,
                    d => write!(f, " + {}", d)?,
                }
                write!(f, "]")
            }
            Operand::Data { width: Some(width), label } => {
                write!(f, "{} [rel {}]", width.ptr_keyword(), label)
            }
            Operand::Data { width: None, label } => write!(f, "[rel {}]", label),
        }
    }
}

/// x86-64 instructions emitted by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum AsmInst {
    // Data movement
    Mov(Operand, Operand),
    Movsx(Operand, Operand),
    Movsxd(Operand, Operand),
    Movzx(Operand, Operand),
    Movss(Operand, Operand),
    Lea(Operand, Operand),

    // Arithmetic
    Add(Operand, Operand),
    Sub(Operand, Operand),
    /// One-operand form: `ax = al * src`
    Imul1(Operand),
    Imul(Operand, Operand),
    Idiv(Operand),
    Neg(Operand),
    Cbw,
    Cwd,
    Cdq,
    Cqo,

    // Tests
    Cmp(Operand, Operand),
    Test(Operand, Operand),
    Sete(Operand),

    // Control flow
    Jmp(String),
    Je(String),
    Call(String),
    Ret,

    // Frame
    Push(Reg),
    Leave,
    /// `sub rsp, N` whose size is known only when the function closes
    AllocFrame(FrameSize),
}

impl fmt::Display for AsmInst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmInst::Mov(dst, src) => write!(f, "mov {}, {}", dst, src),
            AsmInst::Movsx(dst, src) => write!(f, "movsx {}, {}", dst, src),
            AsmInst::Movsxd(dst, src) => write!(f, "movsxd {}, {}", dst, src),
            AsmInst::Movzx(dst, src) => write!(f, "movzx {}, {}", dst, src),
            AsmInst::Movss(dst, src) => write!(f, "movss {}, {}", dst, src),
            AsmInst::Lea(dst, src) => write!(f, "lea {}, {}", dst, src),

            AsmInst::Add(dst, src) => write!(f, "add {}, {}", dst, src),
            AsmInst::Sub(dst, src) => write!(f, "sub {}, {}", dst, src),
            AsmInst::Imul1(src) => write!(f, "imul {}", src),
            AsmInst::Imul(dst, src) => write!(f, "imul {}, {}", dst, src),
            AsmInst::Idiv(src) => write!(f, "idiv {}", src),
            AsmInst::Neg(dst) => write!(f, "neg {}", dst),
            AsmInst::Cbw => write!(f, "cbw"),
            AsmInst::Cwd => write!(f, "cwd"),
            AsmInst::Cdq => write!(f, "cdq"),
            AsmInst::Cqo => write!(f, "cqo"),

            AsmInst::Cmp(a, b) => write!(f, "cmp {}, {}", a, b),
            AsmInst::Test(a, b) => write!(f, "test {}, {}", a, b),
            AsmInst::Sete(dst) => write!(f, "sete {}", dst),

            AsmInst::Jmp(label) => write!(f, "jmp {}", label),
            AsmInst::Je(label) => write!(f, "je {}", label),
            AsmInst::Call(name) => write!(f, "call {}", name),
            AsmInst::Ret => write!(f, "ret"),

            AsmInst::Push(reg) => write!(f, "push {}", reg),
            AsmInst::Leave => write!(f, "leave"),
            AsmInst::AllocFrame(size) => write!(f, "sub rsp, {}", size),
        }
    }
}

/// One line of the code section
#[derive(Debug, Clone, PartialEq)]
pub enum AsmLine {
    Label(String),
    Inst(AsmInst),
}

impl fmt::Display for AsmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmLine::Label(name) => write!(f, "{}:", name),
            AsmLine::Inst(inst) => write!(f, "    {}", inst),
        }
    }
}

/// Setup-section directive
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Bits(u8),
    DefaultRel,
    Global(String),
    Extern(String),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Bits(bits) => write!(f, "bits {}", bits),
            Directive::DefaultRel => write!(f, "default rel"),
            Directive::Global(name) => write!(f, "global {}", name),
            Directive::Extern(name) => write!(f, "extern {}", name),
        }
    }
}

/// Interned literal in the data section
#[derive(Debug, Clone, PartialEq)]
pub enum DataEntry {
    Str { label: String, text: String },
    Float { label: String, value: f32 },
}

impl fmt::Display for DataEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataEntry::Str { label, text } => write!(f, "{}: db {}", label, string_bytes(text)),
            DataEntry::Float { label, value } => write!(f, "{}: dd {}", label, float_literal(*value)),
        }
    }
}

/// `db` operands for `text` plus its terminator. Control characters and
/// double quotes cannot appear inside a NASM string, so they become numbers.
fn string_bytes(text: &str) -> String {
    let mut parts = Vec::new();
    let mut run = String::new();
    for ch in text.chars() {
        if ch.is_control() || ch == '"' {
            if !run.is_empty() {
                parts.push(format!("\"{}\"", run));
                run.clear();
            }
            let mut buf = [0u8; 4];
            parts.extend(ch.encode_utf8(&mut buf).bytes().map(|b| b.to_string()));
        } else {
            run.push(ch);
        }
    }
    if !run.is_empty() {
        parts.push(format!("\"{}\"", run));
    }
    parts.push("0".to_string());
    parts.join(", ")
}

fn float_literal(value: f32) -> String {
    if value.is_nan() {
        return "__QNaN__".to_string();
    }
    if value.is_infinite() {
        let sign = if value.is_sign_negative() { "-" } else { "" };
        return format!("{}__Infinity__", sign);
    }
    let mut text = value.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// A complete output file: setup directives, data section, code section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsmProgram {
    pub setup: Vec<Directive>,
    pub data: Vec<DataEntry>,
    pub text: Vec<AsmLine>,
    /// Frame of every function, in emission order; not rendered
    pub frames: Vec<FrameLayout>,
}

impl fmt::Display for AsmProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for directive in &self.setup {
            writeln!(f, "{}", directive)?;
        }

        if !self.data.is_empty() {
            writeln!(f)?;
            writeln!(f, "section .data")?;
            for entry in &self.data {
                writeln!(f, "{}", entry)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "section .text")?;
        for line in &self.text {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
