//! Scratch Register Pool
//!
//! A fixed free list of caller-saved registers. Each entry hands out all of
//! its sized views at once (`rcx`/`ecx`/`cx`/`cl`), so the 64-bit and 32-bit
//! pools always move in lock-step. When the list runs dry the accumulator is
//! returned instead; the caller accepts that it may be clobbered.

use crate::asm::Reg;
use log::{debug, trace};

/// Pool order; `pop` hands these out front to back
pub const SCRATCH_REGISTERS: [Reg; 4] = [Reg::Rcx, Reg::R8, Reg::R9, Reg::R10];

#[derive(Debug, Clone)]
pub struct RegisterPool {
    /// Reversed so that `Vec::pop` takes from the front of `SCRATCH_REGISTERS`
    free_list: Vec<Reg>,
}

impl Default for RegisterPool {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterPool {
    pub fn new() -> Self {
        Self {
            free_list: SCRATCH_REGISTERS.iter().rev().copied().collect(),
        }
    }

    /// Take the next free register, or the accumulator if none is left
    pub fn pop(&mut self) -> Reg {
        match self.free_list.pop() {
            Some(reg) => {
                trace!("pool: took {}", reg);
                reg
            }
            None => {
                debug!("pool: exhausted, falling back to rax");
                Reg::Rax
            }
        }
    }

    /// Return every register to the pool
    pub fn reset(&mut self) {
        self.free_list = SCRATCH_REGISTERS.iter().rev().copied().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_order() {
        let mut pool = RegisterPool::new();
        assert_eq!(pool.pop(), Reg::Rcx);
        assert_eq!(pool.pop(), Reg::R8);
        assert_eq!(pool.pop(), Reg::R9);
        assert_eq!(pool.pop(), Reg::R10);
        assert_eq!(pool.pop(), Reg::Rax);
    }

    #[test]
    fn test_exhaustion_falls_back_to_accumulator() {
        let mut pool = RegisterPool::new();
        for _ in 0..4 {
            pool.pop();
        }
        assert_eq!(pool.pop(), Reg::Rax);
        assert_eq!(pool.pop(), Reg::Rax);
    }

    #[test]
    fn test_reset_restores_pool() {
        let mut pool = RegisterPool::new();
        pool.pop();
        pool.pop();
        pool.reset();
        assert_eq!(pool.pop(), Reg::Rcx);
        assert_eq!(pool.pop(), Reg::R8);
    }
}
