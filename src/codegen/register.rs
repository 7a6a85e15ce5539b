//! Scratch registers.
//!
//! ## Register usage
//!
//! Expressions are evaluated with a stack discipline over the numbered
//! registers: a node evaluated at base `b` leaves its value in register `b`
//! and may use `b + 1`, `b + 2`, ... for its operands. Register 0 doubles as
//! the return value register, so `return e` evaluates `e` at base 0.
//!
//! There is no spilling. An expression whose right-leaning depth exceeds the
//! register budget is rejected with [`CodegenError::RegisterExhaustion`].

use miette::Result;
use nolog::*;

use super::{aarch64::Reg, error::CodegenError};
use crate::types::RegWidth;

/// Default number of scratch registers, `x0` to `x17`.
pub const SCRATCH_REGISTER_COUNT: u8 = 18;

/// Register budget for one compilation.
#[derive(Debug, Clone, Copy)]
pub struct ScratchRegs {
    limit: u8,
}

impl ScratchRegs {
    /// Allow registers `0..limit`.
    pub fn new(limit: u8) -> Self {
        Self { limit }
    }

    /// The `k`-th register above `base`, viewed at `width`.
    pub fn get(&self, base: u8, k: u8, width: RegWidth) -> Result<Reg> {
        let index = base.saturating_add(k);
        if index >= self.limit {
            trace!("REG " => "exhausted at {}, limit {}", index, self.limit);
            return Err(CodegenError::RegisterExhaustion {
                index,
                limit: self.limit,
            }
            .into());
        }
        Ok(Reg::new(index, width))
    }
}

impl Default for ScratchRegs {
    fn default() -> Self {
        Self::new(SCRATCH_REGISTER_COUNT)
    }
}
