//! Flat intermediate representation
//!
//! Pass 1 appends [`IrInstruction`]s to a [`CompilationContext`]; pass 2 in
//! the backend walks the finished list once. Nothing else from the AST
//! survives between the two passes.

use myl_common::{IntWidth, LabelId, SourceLocation, StorageKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // Functions
    StartProc,
    StartPubProc,
    CloseStack,
    EndProc,

    // Evaluation stack loads
    MovIntConst,
    MovFloatConst,
    LoadString,
    LoadVar,

    // Operators
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Not,
    Cmp,

    // Control flow
    If,
    Else,
    EndIf,
    Jmp,
    JmpEq,

    // Locals
    StoreInt8,
    StoreInt16,
    StoreInt32,
    StoreInt64,
    StoreFloat64,

    // Calls
    /// Opens the argument list of the next `Call`
    BeginCall,
    PushArgument,
    Call,
    /// Drop the value a call-as-statement may have left behind
    Discard,
    Extern,
    Return,
}

impl Opcode {
    /// Store opcode for a declared variable kind
    pub fn store_for(kind: StorageKind) -> Opcode {
        match kind {
            StorageKind::Int(IntWidth::I8) => Opcode::StoreInt8,
            StorageKind::Int(IntWidth::I16) => Opcode::StoreInt16,
            StorageKind::Int(IntWidth::I32) => Opcode::StoreInt32,
            StorageKind::Int(IntWidth::I64) => Opcode::StoreInt64,
            StorageKind::Float => Opcode::StoreFloat64,
        }
    }

    /// The storage kind written by a store opcode
    pub fn store_kind(&self) -> Option<StorageKind> {
        match self {
            Opcode::StoreInt8 => Some(StorageKind::Int(IntWidth::I8)),
            Opcode::StoreInt16 => Some(StorageKind::Int(IntWidth::I16)),
            Opcode::StoreInt32 => Some(StorageKind::Int(IntWidth::I32)),
            Opcode::StoreInt64 => Some(StorageKind::Int(IntWidth::I64)),
            Opcode::StoreFloat64 => Some(StorageKind::Float),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::StartProc => "START_PROC",
            Opcode::StartPubProc => "START_PUB_PROC",
            Opcode::CloseStack => "CLOSE_STACK",
            Opcode::EndProc => "END_PROC",
            Opcode::MovIntConst => "MOV_INT_CONST",
            Opcode::MovFloatConst => "MOV_FLOAT_CONST",
            Opcode::LoadString => "LOAD_STRING",
            Opcode::LoadVar => "LOAD_VAR",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Neg => "NEG",
            Opcode::Not => "NOT",
            Opcode::Cmp => "CMP",
            Opcode::If => "IF",
            Opcode::Else => "ELSE",
            Opcode::EndIf => "ENDIF",
            Opcode::Jmp => "JMP",
            Opcode::JmpEq => "JMPEQ",
            Opcode::StoreInt8 => "STORE_INT8",
            Opcode::StoreInt16 => "STORE_INT16",
            Opcode::StoreInt32 => "STORE_INT32",
            Opcode::StoreInt64 => "STORE_INT64",
            Opcode::StoreFloat64 => "STORE_FLOAT64",
            Opcode::BeginCall => "BEGIN_CALL",
            Opcode::PushArgument => "PUSH_ARGUMENT",
            Opcode::Call => "CALL",
            Opcode::Discard => "DISCARD",
            Opcode::Extern => "EXTERN",
            Opcode::Return => "RETURN",
        };
        write!(f, "{}", name)
    }
}

/// Literal payload of an instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrOperand {
    None,
    /// Names, labels, string literal text and comparison operators
    Text(String),
    Int(i64),
    /// Float constants are single precision
    Float(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrInstruction {
    pub opcode: Opcode,
    pub operand: IrOperand,
    /// Source token the instruction came from, for diagnostics
    pub location: Option<SourceLocation>,
}

impl IrInstruction {
    pub fn new(opcode: Opcode, operand: IrOperand, location: Option<SourceLocation>) -> Self {
        Self { opcode, operand, location }
    }

    /// Instruction with no operand and no source token
    pub fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, IrOperand::None, None)
    }

    /// Text operand, if any
    pub fn text(&self) -> Option<&str> {
        match &self.operand {
            IrOperand::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for IrInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            IrOperand::None => write!(f, "{}", self.opcode),
            IrOperand::Text(text) => write!(f, "{} {}", self.opcode, text),
            IrOperand::Int(value) => write!(f, "{} {}", self.opcode, value),
            IrOperand::Float(value) => write!(f, "{} {:?}", self.opcode, value),
        }
    }
}

/// Function symbol-table entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// `None` for functions without a declared return type
    pub return_width: Option<IntWidth>,
    /// Set by pass 2 when a `return` produced a value
    pub has_returned: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, return_width: Option<IntWidth>) -> Self {
        Self {
            name: name.into(),
            return_width,
            has_returned: false,
        }
    }
}

/// State of one compilation unit, shared by both passes
#[derive(Debug, Default)]
pub struct CompilationContext {
    pub instructions: Vec<IrInstruction>,
    pub functions: HashMap<String, Function>,
    next_label: LabelId,
    pub(crate) scope_depth: u32,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, instruction: IrInstruction) {
        self.instructions.push(instruction);
    }

    /// Fresh control-flow label, `L0`, `L1`, ...
    pub fn gen_label(&mut self) -> String {
        let id = self.next_label;
        self.next_label += 1;
        format!("L{}", id)
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_unique_and_ordered() {
        let mut ctx = CompilationContext::new();
        assert_eq!(ctx.gen_label(), "L0");
        assert_eq!(ctx.gen_label(), "L1");
        assert_eq!(ctx.gen_label(), "L2");
    }

    #[test]
    fn test_store_opcode_mapping() {
        for kind in [
            StorageKind::Int(IntWidth::I8),
            StorageKind::Int(IntWidth::I16),
            StorageKind::Int(IntWidth::I32),
            StorageKind::Int(IntWidth::I64),
            StorageKind::Float,
        ] {
            assert_eq!(Opcode::store_for(kind).store_kind(), Some(kind));
        }
        assert_eq!(Opcode::Add.store_kind(), None);
    }

    #[test]
    fn test_instruction_display() {
        let inst = IrInstruction::new(Opcode::StoreInt32, IrOperand::Text("x".into()), None);
        assert_eq!(inst.to_string(), "STORE_INT32 x");
        assert_eq!(IrInstruction::bare(Opcode::Return).to_string(), "RETURN");
        let inst = IrInstruction::new(Opcode::MovFloatConst, IrOperand::Float(1.0), None);
        assert_eq!(inst.to_string(), "MOV_FLOAT_CONST 1.0");
    }
}
