//! Evaluation stack values
//!
//! Pass 2 tracks what each pending expression currently is rather than
//! where it lives at runtime. Variable references stay symbolic until an
//! operator consumes them, so their memory operand is rendered from the
//! slot recorded at that point.

use crate::asm::Reg;
use myl_common::{IntWidth, StorageKind};

#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    /// Integer constant, already range-normalised
    Int(i64),
    /// Floating constant (single precision)
    Float(f32),
    /// Label of an interned string
    Str(String),
    /// Local variable slot
    Local { kind: StorageKind, offset: u32 },
    /// Value held in a sized register view
    Register { reg: Reg, width: IntWidth },
}

impl EvalValue {
    pub fn is_constant(&self) -> bool {
        matches!(self, EvalValue::Int(_) | EvalValue::Float(_))
    }

    /// Integer width of a non-constant integer value
    pub fn int_width(&self) -> Option<IntWidth> {
        match self {
            EvalValue::Local { kind: StorageKind::Int(width), .. } => Some(*width),
            EvalValue::Register { width, .. } => Some(*width),
            _ => None,
        }
    }

    /// Short description used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            EvalValue::Int(_) => "integer constant",
            EvalValue::Float(_) => "float constant",
            EvalValue::Str(_) => "string",
            EvalValue::Local { kind: StorageKind::Float, .. } => "float variable",
            EvalValue::Local { .. } => "integer variable",
            EvalValue::Register { .. } => "register",
        }
    }
}

/// Local variable symbol-table entry
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// Bytes below the frame pointer
    pub offset: u32,
    pub kind: StorageKind,
    /// Value stored at declaration, when it was a constant
    pub constant: Option<EvalValue>,
}

/// Map unsigned-looking 32-bit literals onto their signed 32-bit value
pub fn normalize_int_literal(value: i64) -> i64 {
    if value > i32::MAX as i64 && value <= u32::MAX as i64 {
        value as u32 as i32 as i64
    } else {
        value
    }
}

/// Narrowest of I32/I64 that holds `value` as an immediate
pub fn const_width(value: i64) -> IntWidth {
    if fits_imm32(value) {
        IntWidth::I32
    } else {
        IntWidth::I64
    }
}

/// Whether `value` can be encoded as a sign-extended 32-bit immediate
pub fn fits_imm32(value: i64) -> bool {
    i32::try_from(value).is_ok()
}
