//! Windows x64 ABI pieces used by the backend
//!
//! Frames are `rbp`-based. Every frame reserves the 32-byte shadow space
//! plus the bytes of its locals; call arguments are written to stack slots
//! above the shadow space rather than to the argument registers.

use crate::asm::Reg;
use crate::value::Variable;
use std::fmt;

/// Shadow space reserved below the return address for every callee
pub const SHADOW_SPACE: u32 = 32;

/// Stack bytes per call argument slot
pub const ARG_SLOT_SIZE: u32 = 8;

/// Register that carries integer return values
pub const RETURN_REG: Reg = Reg::Rax;

pub const FRAME_PTR: Reg = Reg::Rbp;
pub const STACK_PTR: Reg = Reg::Rsp;

/// Stack reserved by the entry trampoline before calling `boot`
pub const ENTRY_STACK_RESERVE: u32 = 40;

/// Bytes the prologue must reserve for `locals_bytes` of locals
pub fn frame_size(locals_bytes: u32) -> u32 {
    SHADOW_SPACE + locals_bytes
}

/// Displacement from `rsp` of the argument slot at `offset`
pub fn arg_slot_disp(offset: u32) -> i32 {
    (SHADOW_SPACE + offset) as i32
}

/// Immediate of the prologue's `sub rsp`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    Pending,
    Resolved(u32),
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSize::Pending => write!(f, "<pending>"),
            FrameSize::Resolved(size) => write!(f, "{}", size),
        }
    }
}

/// Final frame of one emitted function
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    pub function: String,
    /// `None` when the frame was elided
    pub size: Option<u32>,
    /// In declaration order
    pub locals: Vec<Variable>,
}

/// Number of lines in `push rbp` / `mov rbp, rsp` / `sub rsp, N`
pub const PROLOGUE_LEN: usize = 3;

/// Code-section line indices revisited when the current function closes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameFixups {
    /// Index of `push rbp`
    pub prologue: Option<usize>,
    /// Indices of `leave` lines emitted ahead of a `ret`
    pub releases: Vec<usize>,
}

impl FrameFixups {
    pub fn record_prologue(&mut self, index: usize) {
        self.prologue = Some(index);
    }

    pub fn record_release(&mut self, index: usize) {
        self.releases.push(index);
    }

    /// Index of the `sub rsp` placeholder
    pub fn alloc_index(&self) -> Option<usize> {
        self.prologue.map(|start| start + PROLOGUE_LEN - 1)
    }

    /// Every line that disappears when the frame is elided, highest index first
    pub fn elided_lines(&self) -> Vec<usize> {
        let mut lines: Vec<usize> = self
            .prologue
            .into_iter()
            .flat_map(|start| start..start + PROLOGUE_LEN)
            .chain(self.releases.iter().copied())
            .collect();
        lines.sort_unstable_by(|a, b| b.cmp(a));
        lines
    }
}
