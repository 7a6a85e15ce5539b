//! AArch64 assembly model.
//!
//! This module contains types for representing the emitted instructions and
//! the labelled blocks they are grouped into.

use std::{collections::HashMap, fmt::Display};

use key_node_list::{impl_node, KeyNodeList};

use crate::types::RegWidth;

/// General purpose register, viewed as `w` (32-bit) or `x` (64-bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg {
    /// Register number, `0..31`.
    pub index: u8,
    /// Register view.
    pub width: RegWidth,
}

impl Reg {
    /// Create a register view.
    pub const fn new(index: u8, width: RegWidth) -> Self {
        Self { index, width }
    }

    /// 32-bit view of register `index`.
    pub const fn w(index: u8) -> Self {
        Self::new(index, RegWidth::Word)
    }

    /// 64-bit view of register `index`.
    pub const fn x(index: u8) -> Self {
        Self::new(index, RegWidth::DoubleWord)
    }

    /// The same register with another view.
    pub const fn with_width(self, width: RegWidth) -> Self {
        Self::new(self.index, width)
    }
}

impl Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.width {
            RegWidth::Word => write!(f, "w{}", self.index),
            RegWidth::DoubleWord => write!(f, "x{}", self.index),
        }
    }
}

/// Condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Cond {
    Eq,
    Ne,
    /// signed less than
    Lt,
    Le,
    Gt,
    Ge,
    /// unsigned lower
    Lo,
    Ls,
    Hi,
    Hs,
}

impl Display for Cond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cond::Eq => write!(f, "eq"),
            Cond::Ne => write!(f, "ne"),
            Cond::Lt => write!(f, "lt"),
            Cond::Le => write!(f, "le"),
            Cond::Gt => write!(f, "gt"),
            Cond::Ge => write!(f, "ge"),
            Cond::Lo => write!(f, "lo"),
            Cond::Ls => write!(f, "ls"),
            Cond::Hi => write!(f, "hi"),
            Cond::Hs => write!(f, "hs"),
        }
    }
}

/// Branch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Function entry, printed as the function symbol.
    Entry,
    /// Numbered local label.
    Tag(u32),
    /// Shared epilogue.
    Return,
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Entry => write!(f, ".Lentry"),
            Label::Tag(n) => write!(f, ".L{}", n),
            Label::Return => write!(f, ".Lreturn"),
        }
    }
}

/// Instruction.
///
/// Memory operands are offsets from `sp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Inst {
    // Data transfer
    // --------------------
    /// Move register.
    Mov(Reg, Reg),
    /// Move 16-bit immediate.
    MovImm(Reg, i64),
    /// Load constant from the literal pool.
    LdrLit(Reg, i64),
    /// Sign-extend word to doubleword.
    Sxtw(Reg, Reg),

    // Arithmetic
    // --------------------
    /// Add.
    Add(Reg, Reg, Reg),
    /// Add immediate.
    AddImm(Reg, Reg, i32),
    /// Subtract.
    Sub(Reg, Reg, Reg),
    /// Subtract immediate.
    SubImm(Reg, Reg, i32),
    /// Multiply.
    Mul(Reg, Reg, Reg),
    /// Signed divide.
    Sdiv(Reg, Reg, Reg),
    /// Unsigned divide.
    Udiv(Reg, Reg, Reg),
    /// Multiply-subtract, `d = a - n * m`.
    Msub(Reg, Reg, Reg, Reg),
    /// Negate.
    Neg(Reg, Reg),

    // Bitwise
    // --------------------
    /// Bitwise not.
    Mvn(Reg, Reg),
    /// And.
    And(Reg, Reg, Reg),
    /// Or.
    Orr(Reg, Reg, Reg),
    /// Exclusive or.
    Eor(Reg, Reg, Reg),
    /// Logical shift left.
    Lsl(Reg, Reg, Reg),
    /// Logical shift right.
    Lsr(Reg, Reg, Reg),
    /// Arithmetic shift right.
    Asr(Reg, Reg, Reg),

    // Compare
    // --------------------
    /// Compare registers.
    Cmp(Reg, Reg),
    /// Compare with immediate.
    CmpImm(Reg, i32),
    /// Set to 1 if the condition holds, else 0.
    Cset(Reg, Cond),

    // Memory
    // --------------------
    /// Load word or doubleword.
    Ldr(Reg, i32),
    /// Load signed byte.
    Ldrsb(Reg, i32),
    /// Load unsigned byte.
    Ldrb(Reg, i32),
    /// Load signed halfword.
    Ldrsh(Reg, i32),
    /// Load unsigned halfword.
    Ldrh(Reg, i32),
    /// Store word or doubleword.
    Str(Reg, i32),
    /// Store byte.
    Strb(Reg, i32),
    /// Store halfword.
    Strh(Reg, i32),

    // Stack
    // --------------------
    /// Open the stack frame.
    SubSp(i32),
    /// Close the stack frame.
    AddSp(i32),

    // Control flow
    // --------------------
    /// Branch.
    B(Label),
    /// Conditional branch.
    BCond(Cond, Label),
    /// Branch if zero.
    Cbz(Reg, Label),
    /// Branch if not zero.
    Cbnz(Reg, Label),
    /// Return.
    Ret,
}

impl Display for Inst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inst::Mov(rd, rs) => write!(f, "mov {}, {}", rd, rs),
            Inst::MovImm(rd, imm) => write!(f, "mov {}, #{}", rd, imm),
            Inst::LdrLit(rd, imm) => write!(f, "ldr {}, ={}", rd, imm),
            Inst::Sxtw(rd, rs) => write!(f, "sxtw {}, {}", rd, rs),
            Inst::Add(rd, rn, rm) => write!(f, "add {}, {}, {}", rd, rn, rm),
            Inst::AddImm(rd, rn, imm) => write!(f, "add {}, {}, #{}", rd, rn, imm),
            Inst::Sub(rd, rn, rm) => write!(f, "sub {}, {}, {}", rd, rn, rm),
            Inst::SubImm(rd, rn, imm) => write!(f, "sub {}, {}, #{}", rd, rn, imm),
            Inst::Mul(rd, rn, rm) => write!(f, "mul {}, {}, {}", rd, rn, rm),
            Inst::Sdiv(rd, rn, rm) => write!(f, "sdiv {}, {}, {}", rd, rn, rm),
            Inst::Udiv(rd, rn, rm) => write!(f, "udiv {}, {}, {}", rd, rn, rm),
            Inst::Msub(rd, rn, rm, ra) => write!(f, "msub {}, {}, {}, {}", rd, rn, rm, ra),
            Inst::Neg(rd, rs) => write!(f, "neg {}, {}", rd, rs),
            Inst::Mvn(rd, rs) => write!(f, "mvn {}, {}", rd, rs),
            Inst::And(rd, rn, rm) => write!(f, "and {}, {}, {}", rd, rn, rm),
            Inst::Orr(rd, rn, rm) => write!(f, "orr {}, {}, {}", rd, rn, rm),
            Inst::Eor(rd, rn, rm) => write!(f, "eor {}, {}, {}", rd, rn, rm),
            Inst::Lsl(rd, rn, rm) => write!(f, "lsl {}, {}, {}", rd, rn, rm),
            Inst::Lsr(rd, rn, rm) => write!(f, "lsr {}, {}, {}", rd, rn, rm),
            Inst::Asr(rd, rn, rm) => write!(f, "asr {}, {}, {}", rd, rn, rm),
            Inst::Cmp(rn, rm) => write!(f, "cmp {}, {}", rn, rm),
            Inst::CmpImm(rn, imm) => write!(f, "cmp {}, #{}", rn, imm),
            Inst::Cset(rd, cond) => write!(f, "cset {}, {}", rd, cond),
            Inst::Ldr(rt, off) => write!(f, "ldr {}, [sp, #{}]", rt, off),
            Inst::Ldrsb(rt, off) => write!(f, "ldrsb {}, [sp, #{}]", rt, off),
            Inst::Ldrb(rt, off) => write!(f, "ldrb {}, [sp, #{}]", rt, off),
            Inst::Ldrsh(rt, off) => write!(f, "ldrsh {}, [sp, #{}]", rt, off),
            Inst::Ldrh(rt, off) => write!(f, "ldrh {}, [sp, #{}]", rt, off),
            Inst::Str(rt, off) => write!(f, "str {}, [sp, #{}]", rt, off),
            Inst::Strb(rt, off) => write!(f, "strb {}, [sp, #{}]", rt, off),
            Inst::Strh(rt, off) => write!(f, "strh {}, [sp, #{}]", rt, off),
            Inst::SubSp(size) => write!(f, "sub sp, sp, #{}", size),
            Inst::AddSp(size) => write!(f, "add sp, sp, #{}", size),
            Inst::B(label) => write!(f, "b {}", label),
            Inst::BCond(cond, label) => write!(f, "b.{} {}", cond, label),
            Inst::Cbz(rt, label) => write!(f, "cbz {}, {}", rt, label),
            Inst::Cbnz(rt, label) => write!(f, "cbnz {}, {}", rt, label),
            Inst::Ret => write!(f, "ret"),
        }
    }
}

impl Inst {
    /// Branch target of the instruction, if any.
    pub fn target(self) -> Option<Label> {
        match self {
            Inst::B(label) | Inst::BCond(_, label) | Inst::Cbz(_, label) | Inst::Cbnz(_, label) => {
                Some(label)
            }
            _ => None,
        }
    }
}

/// Straight-line instruction sequence following one label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    insts: Vec<Inst>,
}

impl Block {
    /// Create an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction.
    pub fn push(&mut self, inst: Inst) {
        self.insts.push(inst);
    }

    /// Instructions in order.
    pub fn insts(&self) -> impl Iterator<Item = Inst> + '_ {
        self.insts.iter().copied()
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for inst in &self.insts {
            writeln!(f, "  {}", inst)?;
        }
        Ok(())
    }
}

/// Node in the block list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    /// Block.
    pub block: Block,
    prev: Option<Label>,
    next: Option<Label>,
}

impl_node!(BlockNode { Key = Label, prev = prev, next = next });

impl BlockNode {
    /// Create a new block node.
    pub fn new(block: Block) -> Self {
        Self {
            block,
            prev: None,
            next: None,
        }
    }
}

type BlockList = KeyNodeList<Label, BlockNode, HashMap<Label, BlockNode>>;

/// Function. Blocks are laid out in emission order; control falls through
/// from one block to the next.
#[derive(Debug, Clone)]
pub struct Function {
    /// Symbol name without the leading underscore.
    pub name: String,
    /// Stack frame size in bytes, a multiple of 16.
    pub frame_size: i32,
    blocks: BlockList,
}

impl Function {
    /// Create a function with an empty entry block.
    pub fn new(name: impl Into<String>, frame_size: i32) -> Self {
        let mut blocks = BlockList::new();
        // A fresh list never rejects its first key.
        let _ = blocks.push_back(Label::Entry, BlockNode::new(Block::new()));
        Self {
            name: name.into(),
            frame_size,
            blocks,
        }
    }

    /// Start a new block at `label`. Fails with the label if it was already
    /// placed.
    pub fn push_block(&mut self, label: Label) -> Result<(), Label> {
        self.blocks
            .push_back(label, BlockNode::new(Block::new()))
            .map_err(|(label, _)| label)
    }

    /// Append an instruction to the last block.
    pub fn push(&mut self, inst: Inst) {
        if let Some(&label) = self.blocks.back_key() {
            let mut cursor = self.blocks.cursor_mut(label);
            if let Some(node) = cursor.node_mut() {
                node.block.push(inst);
            }
        }
    }

    /// Get the block placed at `label`.
    pub fn block(&self, label: Label) -> Option<&Block> {
        self.blocks.node(&label).map(|node| &node.block)
    }

    /// Label of the block laid out after `label`.
    pub fn next_label(&self, label: Label) -> Option<Label> {
        let mut cursor = self.blocks.cursor(label);
        cursor.move_next();
        cursor.key().copied()
    }

    /// Iterator over the blocks in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &Block)> + '_ {
        self.blocks.iter().map(|(&label, node)| (label, &node.block))
    }

    /// Iterator over all instructions in layout order.
    pub fn insts(&self) -> impl Iterator<Item = Inst> + '_ {
        self.iter().flat_map(|(_, block)| block.insts())
    }
}

fn write_header(f: &mut std::fmt::Formatter<'_>, name: &str) -> std::fmt::Result {
    writeln!(f, ".global _{}", name)?;
    writeln!(f, ".align 2")
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_header(f, &self.name)?;
        for (label, block) in self.iter() {
            match label {
                Label::Entry => writeln!(f, "_{}:", self.name)?,
                _ => writeln!(f, "{}:", label)?,
            }
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}

/// Assembly for one translation unit.
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// The entry function, if the unit defines one.
    pub function: Option<Function>,
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.function {
            Some(function) => write!(f, "{}", function),
            None => write_header(f, "main"),
        }
    }
}
