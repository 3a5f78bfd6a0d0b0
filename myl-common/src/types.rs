//! Common types used throughout the compiler
//!
//! This module defines data types that are shared across both compiler
//! passes: integer widths and the storage kinds of local variables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label identifier for code generation
pub type LabelId = u32;

/// Integer widths supported by myl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

impl IntWidth {
    /// Get the size in bytes
    pub fn size_in_bytes(&self) -> u32 {
        match self {
            IntWidth::I8 => 1,
            IntWidth::I16 => 2,
            IntWidth::I32 => 4,
            IntWidth::I64 => 8,
        }
    }

    /// NASM size keyword used for memory operands of this width
    pub fn ptr_keyword(&self) -> &'static str {
        match self {
            IntWidth::I8 => "byte",
            IntWidth::I16 => "word",
            IntWidth::I32 => "dword",
            IntWidth::I64 => "qword",
        }
    }

    /// Reinterpret a value as a two's-complement integer of this width
    pub fn wrap(&self, value: i64) -> i64 {
        match self {
            IntWidth::I8 => value as i8 as i64,
            IntWidth::I16 => value as i16 as i64,
            IntWidth::I32 => value as i32 as i64,
            IntWidth::I64 => value,
        }
    }
}

impl fmt::Display for IntWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntWidth::I8 => write!(f, "I8"),
            IntWidth::I16 => write!(f, "I16"),
            IntWidth::I32 => write!(f, "I32"),
            IntWidth::I64 => write!(f, "I64"),
        }
    }
}

/// How a local variable is stored in its frame slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    Int(IntWidth),
    /// Declared as a 64-bit float but stored in a 4-byte single-precision slot
    Float,
}

impl StorageKind {
    /// Bytes reserved in the frame for one variable of this kind
    pub fn slot_size(&self) -> u32 {
        match self {
            StorageKind::Int(width) => width.size_in_bytes(),
            StorageKind::Float => 4,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Int(width) => write!(f, "{width}"),
            StorageKind::Float => write!(f, "F64"),
        }
    }
}
