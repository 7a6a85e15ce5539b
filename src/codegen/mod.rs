//! Code generator.
//!
//! This module lowers the typed AST to AArch64 assembly in a single
//! recursive pass.
//!
//! - Before the body is emitted, pre-passes over the function compute the
//!   frame size (`frame.rs`) and reserve labels for user `goto` targets
//!   (`label.rs`).
//! - `gen_stmt` emits a statement (`stmt.rs`).
//! - `gen_expr` evaluates an expression into a given base register
//!   (`expr.rs`, see `register.rs` for the register discipline).

use miette::Result;
use nolog::*;

pub mod aarch64;
pub mod error;
mod expr;
mod frame;
mod label;
pub mod register;
mod stmt;

#[cfg(test)]
mod simulate;

pub use error::CodegenError;
pub use register::SCRATCH_REGISTER_COUNT;

use crate::{ast, symtable::ScopeStack, types::Type};
use aarch64::{Function, Inst, Label, Program};
use frame::{FrameLayout, MAX_FRAME_SIZE};
use label::{CaseTable, GotoLabels, LabelGen};
use register::ScratchRegs;

/// Code generation options.
#[derive(Debug, Clone, Copy)]
pub struct CodegenOptions {
    /// Number of scratch registers available to expression evaluation.
    pub scratch_registers: u8,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            scratch_registers: SCRATCH_REGISTER_COUNT,
        }
    }
}

/// Generate assembly for a parsed program.
pub fn generate(program: &ast::Program, options: &CodegenOptions) -> Result<Program> {
    let function = match &program.function {
        Some(function) => Some(Generator::generate(function, options)?),
        None => None,
    };
    Ok(Program { function })
}

/// Targets of `break` and `continue` at the current point.
#[derive(Debug, Clone, Copy, Default)]
struct JumpTargets {
    break_target: Option<Label>,
    continue_target: Option<Label>,
}

/// Per-function generator state.
struct Generator {
    function: Function,
    ret_ty: Type,
    regs: ScratchRegs,
    layout: FrameLayout,
    /// Names mapped to slot offsets from the frame top.
    scopes: ScopeStack<i32>,
    labels: LabelGen,
    gotos: GotoLabels,
    targets: JumpTargets,
    /// Case tables of the enclosing switches, innermost last.
    switches: Vec<CaseTable>,
}

impl Generator {
    fn generate(function: &ast::Function, options: &CodegenOptions) -> Result<Function> {
        let frame_size = FrameLayout::measure(&function.body);
        if frame_size > MAX_FRAME_SIZE {
            return Err(CodegenError::FrameTooLarge {
                size: frame_size,
                limit: MAX_FRAME_SIZE,
            }
            .into());
        }
        let mut labels = LabelGen::new();
        let gotos = GotoLabels::collect(&function.body, &mut labels)?;

        let mut gen = Self {
            function: Function::new(function.name.node.clone(), frame_size),
            ret_ty: function.ty.unqualified(),
            regs: ScratchRegs::new(options.scratch_registers),
            layout: FrameLayout::new(),
            scopes: ScopeStack::new(),
            labels,
            gotos,
            targets: JumpTargets::default(),
            switches: vec![],
        };

        trace!("GEN " => "function `{}`, frame {}", function.name, frame_size);
        if frame_size > 0 {
            gen.push(Inst::SubSp(frame_size));
        }
        gen.gen_block(&function.body)?;

        gen.place(Label::Return)?;
        if frame_size > 0 {
            gen.push(Inst::AddSp(frame_size));
        }
        gen.push(Inst::Ret);
        Ok(gen.function)
    }

    fn push(&mut self, inst: Inst) {
        self.function.push(inst);
    }

    /// Start a new block at `label`.
    fn place(&mut self, label: Label) -> Result<()> {
        self.function.push_block(label).map_err(|label| {
            CodegenError::DuplicateDeclaration {
                name: label.to_string(),
                span: None,
            }
            .into()
        })
    }

    /// Address of the slot at `offset`, relative to `sp`.
    fn address(&self, offset: i32) -> i32 {
        self.function.frame_size - offset
    }

    /// Run `f` with new `break`/`continue` targets, restoring the old ones
    /// afterwards.
    fn with_targets<F>(&mut self, targets: JumpTargets, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let saved = std::mem::replace(&mut self.targets, targets);
        let result = f(self);
        self.targets = saved;
        result
    }
}
