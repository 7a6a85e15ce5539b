//! Simulate the codegen output.
//!
//! We use this to test the generated code without an AArch64 machine. Only
//! the instructions the generator emits are modelled, and memory is only
//! addressed relative to `sp`.

use std::collections::HashMap;

use super::aarch64::{Cond, Function, Inst, Label, Program, Reg};
use crate::types::RegWidth;

/// Instructions executed before the simulation gives up.
const STEP_LIMIT: usize = 1_000_000;

/// Initial stack pointer.
const STACK_TOP: u64 = 0x8000_0000;

/// Register file. Writing a `w` view clears the upper half.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regs([u64; 32]);

impl Regs {
    /// Create a zeroed register file.
    pub fn new() -> Self {
        Self([0; 32])
    }

    /// Get the value of a register view.
    pub fn get(&self, reg: Reg) -> u64 {
        masked(self.0[reg.index as usize], reg.width)
    }

    /// Set the value of a register view.
    pub fn set(&mut self, reg: Reg, value: u64) {
        self.0[reg.index as usize] = masked(value, reg.width);
    }
}

/// Byte-addressed memory, zero where never written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    bytes: HashMap<u64, u8>,
}

impl Memory {
    /// Read `n` bytes little-endian.
    pub fn read(&self, addr: u64, n: u64) -> u64 {
        (0..n).fold(0, |acc, i| {
            let byte = self.bytes.get(&(addr + i)).copied().unwrap_or(0);
            acc | (byte as u64) << (8 * i)
        })
    }

    /// Write the low `n` bytes of `value` little-endian.
    pub fn write(&mut self, addr: u64, n: u64, value: u64) {
        for i in 0..n {
            self.bytes.insert(addr + i, (value >> (8 * i)) as u8);
        }
    }
}

/// Comparison operands and width of the last `cmp`.
#[derive(Debug, Clone, Copy)]
struct Flags {
    lhs: u64,
    rhs: u64,
    width: RegWidth,
}

impl Flags {
    fn holds(self, cond: Cond) -> bool {
        let (a, b) = (self.lhs, self.rhs);
        let (sa, sb) = match self.width {
            RegWidth::Word => (a as u32 as i32 as i64, b as u32 as i32 as i64),
            RegWidth::DoubleWord => (a as i64, b as i64),
        };
        match cond {
            Cond::Eq => a == b,
            Cond::Ne => a != b,
            Cond::Lt => sa < sb,
            Cond::Le => sa <= sb,
            Cond::Gt => sa > sb,
            Cond::Ge => sa >= sb,
            Cond::Lo => a < b,
            Cond::Ls => a <= b,
            Cond::Hi => a > b,
            Cond::Hs => a >= b,
        }
    }
}

fn masked(value: u64, width: RegWidth) -> u64 {
    match width {
        RegWidth::Word => value & 0xFFFF_FFFF,
        RegWidth::DoubleWord => value,
    }
}

fn signed(value: u64, width: RegWidth) -> i64 {
    match width {
        RegWidth::Word => value as u32 as i32 as i64,
        RegWidth::DoubleWord => value as i64,
    }
}

fn bits(width: RegWidth) -> u64 {
    match width {
        RegWidth::Word => 32,
        RegWidth::DoubleWord => 64,
    }
}

/// Machine state.
#[derive(Debug, Clone)]
pub struct Machine {
    /// Registers.
    pub regs: Regs,
    /// Memory.
    pub mem: Memory,
    /// Stack pointer.
    pub sp: u64,
    flags: Option<Flags>,
}

impl Default for Machine {
    fn default() -> Self {
        Self {
            regs: Regs::new(),
            mem: Memory::default(),
            sp: STACK_TOP,
            flags: None,
        }
    }
}

impl Machine {
    /// Execute one non-branching instruction.
    fn step(&mut self, inst: Inst) {
        let regs = &mut self.regs;
        match inst {
            Inst::Mov(rd, rs) => regs.set(rd, regs.get(rs)),
            Inst::MovImm(rd, imm) | Inst::LdrLit(rd, imm) => regs.set(rd, imm as u64),
            Inst::Sxtw(rd, rs) => regs.set(rd, regs.get(rs) as u32 as i32 as i64 as u64),
            Inst::Add(rd, rn, rm) => regs.set(rd, regs.get(rn).wrapping_add(regs.get(rm))),
            Inst::AddImm(rd, rn, imm) => regs.set(rd, regs.get(rn).wrapping_add(imm as u64)),
            Inst::Sub(rd, rn, rm) => regs.set(rd, regs.get(rn).wrapping_sub(regs.get(rm))),
            Inst::SubImm(rd, rn, imm) => regs.set(rd, regs.get(rn).wrapping_sub(imm as u64)),
            Inst::Mul(rd, rn, rm) => regs.set(rd, regs.get(rn).wrapping_mul(regs.get(rm))),
            Inst::Sdiv(rd, rn, rm) => {
                let a = signed(regs.get(rn), rd.width);
                let b = signed(regs.get(rm), rd.width);
                let q = match rd.width {
                    RegWidth::Word if b != 0 => (a as i32).wrapping_div(b as i32) as i64,
                    RegWidth::DoubleWord if b != 0 => a.wrapping_div(b),
                    _ => 0,
                };
                regs.set(rd, q as u64);
            }
            Inst::Udiv(rd, rn, rm) => {
                let b = regs.get(rm);
                regs.set(rd, if b == 0 { 0 } else { regs.get(rn) / b });
            }
            Inst::Msub(rd, rn, rm, ra) => {
                let product = regs.get(rn).wrapping_mul(regs.get(rm));
                regs.set(rd, regs.get(ra).wrapping_sub(product));
            }
            Inst::Neg(rd, rs) => regs.set(rd, regs.get(rs).wrapping_neg()),
            Inst::Mvn(rd, rs) => regs.set(rd, !regs.get(rs)),
            Inst::And(rd, rn, rm) => regs.set(rd, regs.get(rn) & regs.get(rm)),
            Inst::Orr(rd, rn, rm) => regs.set(rd, regs.get(rn) | regs.get(rm)),
            Inst::Eor(rd, rn, rm) => regs.set(rd, regs.get(rn) ^ regs.get(rm)),
            Inst::Lsl(rd, rn, rm) => {
                let shift = regs.get(rm) % bits(rd.width);
                regs.set(rd, regs.get(rn) << shift);
            }
            Inst::Lsr(rd, rn, rm) => {
                let shift = regs.get(rm) % bits(rd.width);
                regs.set(rd, regs.get(rn) >> shift);
            }
            Inst::Asr(rd, rn, rm) => {
                let shift = regs.get(rm) % bits(rd.width);
                regs.set(rd, (signed(regs.get(rn), rd.width) >> shift) as u64);
            }
            Inst::Cmp(rn, rm) => {
                self.flags = Some(Flags {
                    lhs: regs.get(rn),
                    rhs: regs.get(rm),
                    width: rn.width,
                })
            }
            Inst::CmpImm(rn, imm) => {
                self.flags = Some(Flags {
                    lhs: regs.get(rn),
                    rhs: masked(imm as u64, rn.width),
                    width: rn.width,
                })
            }
            Inst::Cset(rd, cond) => {
                let flags = self.flags.expect("cset before cmp");
                regs.set(rd, flags.holds(cond) as u64);
            }
            Inst::Ldr(rt, off) => {
                let value = self.mem.read(self.sp + off as u64, bits(rt.width) / 8);
                self.regs.set(rt, value);
            }
            Inst::Ldrsb(rt, off) => {
                let value = self.mem.read(self.sp + off as u64, 1) as u8 as i8 as i64;
                self.regs.set(rt, value as u64);
            }
            Inst::Ldrb(rt, off) => {
                let value = self.mem.read(self.sp + off as u64, 1);
                self.regs.set(rt, value);
            }
            Inst::Ldrsh(rt, off) => {
                let value = self.mem.read(self.sp + off as u64, 2) as u16 as i16 as i64;
                self.regs.set(rt, value as u64);
            }
            Inst::Ldrh(rt, off) => {
                let value = self.mem.read(self.sp + off as u64, 2);
                self.regs.set(rt, value);
            }
            Inst::Str(rt, off) => {
                let value = self.regs.get(rt);
                self.mem.write(self.sp + off as u64, bits(rt.width) / 8, value);
            }
            Inst::Strb(rt, off) => self.mem.write(self.sp + off as u64, 1, self.regs.get(rt)),
            Inst::Strh(rt, off) => self.mem.write(self.sp + off as u64, 2, self.regs.get(rt)),
            Inst::SubSp(size) => self.sp -= size as u64,
            Inst::AddSp(size) => self.sp += size as u64,
            Inst::B(_) | Inst::BCond(..) | Inst::Cbz(..) | Inst::Cbnz(..) | Inst::Ret => {
                unreachable!("branches are handled by `execute`")
            }
        }
    }

    /// Whether the branch `inst` is taken.
    fn taken(&self, inst: Inst) -> bool {
        match inst {
            Inst::B(_) => true,
            Inst::BCond(cond, _) => self.flags.expect("branch before cmp").holds(cond),
            Inst::Cbz(rt, _) => self.regs.get(rt) == 0,
            Inst::Cbnz(rt, _) => self.regs.get(rt) != 0,
            _ => false,
        }
    }

    /// Run `function` from its entry until `ret`.
    pub fn execute(&mut self, function: &Function) {
        let mut steps = 0;
        let mut current = Some(Label::Entry);
        'blocks: while let Some(label) = current {
            let block = function.block(label).expect("branch to unplaced label");
            current = function.next_label(label);
            for inst in block.insts() {
                steps += 1;
                assert!(steps <= STEP_LIMIT, "step limit exceeded");
                if inst == Inst::Ret {
                    return;
                }
                match inst.target() {
                    Some(target) => {
                        if self.taken(inst) {
                            current = Some(target);
                            continue 'blocks;
                        }
                    }
                    None => self.step(inst),
                }
            }
        }
        panic!("fell off the end of `{}`", function.name);
    }
}

/// Run the program and return `x0`.
pub fn run(program: &Program) -> u64 {
    let function = program.function.as_ref().expect("no function to run");
    let mut machine = Machine::default();
    machine.execute(function);
    assert_eq!(machine.sp, STACK_TOP, "unbalanced stack");
    machine.regs.get(Reg::x(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_writes_clear_upper_half() {
        let mut regs = Regs::new();
        regs.set(Reg::x(3), u64::MAX);
        regs.set(Reg::w(3), 5);
        assert_eq!(regs.get(Reg::x(3)), 5);
    }

    #[test]
    fn memory_is_little_endian() {
        let mut mem = Memory::default();
        mem.write(100, 4, 0x1234_5678);
        assert_eq!(mem.read(100, 1), 0x78);
        assert_eq!(mem.read(100, 4), 0x1234_5678);
        assert_eq!(mem.read(104, 4), 0);
    }

    #[test]
    fn branch_skips_to_label() {
        let mut function = Function::new("main", 0);
        function.push(Inst::MovImm(Reg::w(0), 1));
        function.push(Inst::B(Label::Tag(0)));
        function.push(Inst::MovImm(Reg::w(0), 2));
        function.push_block(Label::Tag(0)).unwrap();
        function.push(Inst::Ret);
        let program = Program {
            function: Some(function),
        };
        assert_eq!(run(&program), 1);
    }
}
