//! Expression lowering.
//!
//! `gen_expr(e, base)` leaves the value of `e` in register `base`, viewed at
//! the width of `e`'s type, and clobbers only registers at or above `base`.

use miette::Result;

use super::{
    aarch64::{Cond, Inst, Label, Reg},
    CodegenError, Generator,
};
use crate::ast::{AssignOp, BinaryOp, Expr, IncDecOp, Spanned, UnaryOp, VarRef};
use crate::types::{promote, RegWidth, StoreSuffix, Type};

impl Generator {
    pub(super) fn gen_expr(&mut self, expr: &Expr, base: u8) -> Result<()> {
        let ty = expr.ty();
        let dst = self.regs.get(base, 0, ty.register_width())?;
        match expr {
            Expr::Constant { value, .. } => self.load_imm(dst, *value),
            Expr::Var(var) => {
                let offset = self.lookup(var)?;
                self.load(dst, var.ty, offset);
            }
            Expr::Unary { op, operand, .. } => {
                self.gen_expr(operand, base)?;
                match op {
                    UnaryOp::Not => {
                        let src = dst.with_width(operand.ty().register_width());
                        self.push(Inst::CmpImm(src, 0));
                        self.push(Inst::Cset(dst, Cond::Eq));
                    }
                    UnaryOp::Neg => {
                        self.convert(base, operand.ty(), ty);
                        self.push(Inst::Neg(dst, dst));
                    }
                    UnaryOp::Complement => {
                        self.convert(base, operand.ty(), ty);
                        self.push(Inst::Mvn(dst, dst));
                    }
                }
            }
            Expr::IncDec { op, target } => self.gen_inc_dec(*op, target, base)?,
            Expr::Binary { op, lhs, rhs, .. } => match op {
                BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                    self.gen_logical(*op, lhs, rhs, base)?
                }
                BinaryOp::Comma => {
                    self.gen_expr(lhs, base)?;
                    self.gen_expr(rhs, base)?;
                    self.convert(base, rhs.ty(), ty);
                }
                _ => {
                    let op_ty = promote(lhs.ty(), rhs.ty());
                    self.gen_expr(lhs, base)?;
                    self.convert(base, lhs.ty(), op_ty);
                    self.gen_expr(rhs, base + 1)?;
                    self.convert(base + 1, rhs.ty(), op_ty);
                    self.gen_arith(*op, op_ty, base)?;
                    self.convert(base, op_ty, ty);
                }
            },
            Expr::Assign {
                op, target, value, ..
            } => {
                self.gen_assign(*op, target, value, base)?;
                self.convert(base, target.ty, ty);
            }
            Expr::Conditional {
                cond, then, els, ..
            } => {
                let else_label = self.labels.fresh();
                let end = self.labels.fresh();
                self.gen_expr(cond, base)?;
                let test = dst.with_width(cond.ty().register_width());
                self.push(Inst::Cbz(test, else_label));
                self.gen_expr(then, base)?;
                self.convert(base, then.ty(), ty);
                self.push(Inst::B(end));
                self.place(else_label)?;
                self.gen_expr(els, base)?;
                self.convert(base, els.ty(), ty);
                self.place(end)?;
            }
            Expr::Empty => {}
        }
        Ok(())
    }

    /// Apply `op` to registers `base` and `base + 1`, both holding values of
    /// type `ty`. The result replaces register `base`.
    fn gen_arith(&mut self, op: BinaryOp, ty: Type, base: u8) -> Result<()> {
        let width = ty.register_width();
        let a = self.regs.get(base, 0, width)?;
        let b = self.regs.get(base, 1, width)?;
        let inst = match op {
            BinaryOp::Add => Inst::Add(a, a, b),
            BinaryOp::Sub => Inst::Sub(a, a, b),
            BinaryOp::Mul => Inst::Mul(a, a, b),
            BinaryOp::Div if ty.signed => Inst::Sdiv(a, a, b),
            BinaryOp::Div => Inst::Udiv(a, a, b),
            BinaryOp::Mod => {
                let q = self.regs.get(base, 2, width)?;
                self.push(if ty.signed {
                    Inst::Sdiv(q, a, b)
                } else {
                    Inst::Udiv(q, a, b)
                });
                Inst::Msub(a, q, b, a)
            }
            BinaryOp::BitAnd => Inst::And(a, a, b),
            BinaryOp::BitOr => Inst::Orr(a, a, b),
            BinaryOp::BitXor => Inst::Eor(a, a, b),
            BinaryOp::Shl => Inst::Lsl(a, a, b),
            BinaryOp::Shr if ty.signed => Inst::Asr(a, a, b),
            BinaryOp::Shr => Inst::Lsr(a, a, b),
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => {
                self.push(Inst::Cmp(a, b));
                Inst::Cset(a, condition(op, ty.signed))
            }
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr | BinaryOp::Comma => {
                unreachable!("lowered with control flow")
            }
        };
        self.push(inst);
        Ok(())
    }

    /// `&&` and `||` evaluate the right operand only when the left one does
    /// not decide the result.
    fn gen_logical(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, base: u8) -> Result<()> {
        let (branch, decided): (fn(Reg, Label) -> Inst, i64) = match op {
            BinaryOp::LogicalAnd => (Inst::Cbz, 0),
            _ => (Inst::Cbnz, 1),
        };
        let decided_label = self.labels.fresh();
        let end = self.labels.fresh();
        for operand in [lhs, rhs] {
            self.gen_expr(operand, base)?;
            let reg = self.regs.get(base, 0, operand.ty().register_width())?;
            self.push(branch(reg, decided_label));
        }
        let dst = self.regs.get(base, 0, promote(lhs.ty(), rhs.ty()).register_width())?;
        self.push(Inst::MovImm(dst, 1 - decided));
        self.push(Inst::B(end));
        self.place(decided_label)?;
        self.push(Inst::MovImm(dst, decided));
        self.place(end)
    }

    fn gen_inc_dec(&mut self, op: IncDecOp, target: &VarRef, base: u8) -> Result<()> {
        let offset = self.lookup(target)?;
        let width = target.ty.register_width();
        let value = self.regs.get(base, 0, width)?;
        self.load(value, target.ty, offset);
        let updated = if op.is_postfix() {
            self.regs.get(base, 1, width)?
        } else {
            value
        };
        self.push(if op.is_increment() {
            Inst::AddImm(updated, value, 1)
        } else {
            Inst::SubImm(updated, value, 1)
        });
        self.assign_to(updated, target.ty, offset);
        Ok(())
    }

    /// Leaves the stored value of `target`, at its own type, in `base`.
    fn gen_assign(&mut self, op: AssignOp, target: &VarRef, value: &Expr, base: u8) -> Result<()> {
        let offset = self.lookup(target)?;
        match op.binary_op() {
            None => {
                self.gen_expr(value, base)?;
                self.convert(base, value.ty(), target.ty);
            }
            Some(bin) => {
                let op_ty = promote(target.ty, value.ty());
                let current = self.regs.get(base, 0, target.ty.register_width())?;
                self.load(current, target.ty, offset);
                self.convert(base, target.ty, op_ty);
                self.gen_expr(value, base + 1)?;
                self.convert(base + 1, value.ty(), op_ty);
                self.gen_arith(bin, op_ty, base)?;
                self.convert(base, op_ty, target.ty);
            }
        }
        let reg = self.regs.get(base, 0, target.ty.register_width())?;
        self.assign_to(reg, target.ty, offset);
        Ok(())
    }

    fn lookup(&self, var: &VarRef) -> Result<i32> {
        Ok(*self
            .scopes
            .lookup(var.name.node.as_str())
            .map_err(|e| CodegenError::from_scope(e, var.name.span()))?)
    }

    /// Convert the value in register `index` from `from` to `to`.
    ///
    /// Only widening moves bits: signed words are sign-extended, unsigned
    /// words are zero-extended by a 32-bit self move. Narrowing reads the
    /// low half through the `w` view and needs no instruction.
    pub(super) fn convert(&mut self, index: u8, from: Type, to: Type) {
        if from.register_width() == RegWidth::Word && to.register_width() == RegWidth::DoubleWord {
            if from.signed {
                self.push(Inst::Sxtw(Reg::x(index), Reg::w(index)));
            } else {
                self.push(Inst::Mov(Reg::w(index), Reg::w(index)));
            }
        }
    }

    /// Load the variable of type `ty` at slot `offset` into `reg`.
    pub(super) fn load(&mut self, reg: Reg, ty: Type, offset: i32) {
        let address = self.address(offset);
        let reg = reg.with_width(ty.register_width());
        self.push(match (ty.store_suffix(), ty.signed) {
            (StoreSuffix::Byte, true) => Inst::Ldrsb(reg, address),
            (StoreSuffix::Byte, false) => Inst::Ldrb(reg, address),
            (StoreSuffix::Halfword, true) => Inst::Ldrsh(reg, address),
            (StoreSuffix::Halfword, false) => Inst::Ldrh(reg, address),
            (StoreSuffix::None, _) => Inst::Ldr(reg, address),
        });
    }

    /// Store `reg` into the variable of type `ty` at slot `offset`.
    pub(super) fn store(&mut self, reg: Reg, ty: Type, offset: i32) {
        let address = self.address(offset);
        let reg = reg.with_width(ty.register_width());
        self.push(match ty.store_suffix() {
            StoreSuffix::Byte => Inst::Strb(reg, address),
            StoreSuffix::Halfword => Inst::Strh(reg, address),
            StoreSuffix::None => Inst::Str(reg, address),
        });
    }

    /// Store `reg` and leave the value as read back from memory in it, so
    /// narrow types yield their truncated value.
    fn assign_to(&mut self, reg: Reg, ty: Type, offset: i32) {
        self.store(reg, ty, offset);
        if ty.store_suffix() != StoreSuffix::None {
            self.load(reg, ty, offset);
        }
    }
}

fn condition(op: BinaryOp, signed: bool) -> Cond {
    match (op, signed) {
        (BinaryOp::Eq, _) => Cond::Eq,
        (BinaryOp::Ne, _) => Cond::Ne,
        (BinaryOp::Lt, true) => Cond::Lt,
        (BinaryOp::Le, true) => Cond::Le,
        (BinaryOp::Gt, true) => Cond::Gt,
        (BinaryOp::Ge, true) => Cond::Ge,
        (BinaryOp::Lt, false) => Cond::Lo,
        (BinaryOp::Le, false) => Cond::Ls,
        (BinaryOp::Gt, false) => Cond::Hi,
        (BinaryOp::Ge, false) => Cond::Hs,
        _ => Cond::Ne,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::codegen::{generate, simulate::run, CodegenOptions};
    use crate::parse;

    fn run_source(source: &str) -> u64 {
        let program = generate(&parse(source).unwrap(), &CodegenOptions::default()).unwrap();
        run(&program)
    }

    fn eval(source: &str) -> i32 {
        run_source(source) as i32
    }

    fn eval_expr(expr: &str) -> i32 {
        eval(&format!("int main() {{ return {}; }}", expr))
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval_expr("1 + 2 * 3"), 7);
        assert_eq!(eval_expr("(1 + 2) * 3"), 9);
        assert_eq!(eval_expr("17 / 5"), 3);
        assert_eq!(eval_expr("-17 / 5"), -3);
        assert_eq!(eval_expr("17 % 5"), 2);
        assert_eq!(eval_expr("-17 % 5"), -2);
        assert_eq!(eval_expr("-(3 - 10)"), 7);
        assert_eq!(eval_expr("~0"), -1);
        assert_eq!(eval_expr("1 << 4 | 3 & 6 ^ 1"), 16 | ((3 & 6) ^ 1));
        assert_eq!(eval_expr("-16 >> 2"), -4);
    }

    #[test]
    fn comparisons_and_not() {
        assert_eq!(eval_expr("3 < 4"), 1);
        assert_eq!(eval_expr("3 >= 4"), 0);
        assert_eq!(eval_expr("5 == 5 != 0"), 1);
        assert_eq!(eval_expr("!5"), 0);
        assert_eq!(eval_expr("!0"), 1);
    }

    #[test]
    fn unsigned_comparison_and_shift() {
        assert_eq!(eval_expr("-1 < 0u"), 0);
        assert_eq!(eval_expr("-1 < 0"), 1);
        assert_eq!(eval_expr("(0xFFFFFFF0 >> 4) == 0x0FFFFFFF"), 1);
        assert_eq!(eval_expr("4000000000u / 2u == 2000000000"), 1);
    }

    #[test]
    fn short_circuit_skips_side_effects() {
        let source = "int main() { int x = 1; 0 && (x = 5); 1 || (x = 6); return x; }";
        assert_eq!(eval(source), 1);
        let source = "int main() { int x = 1; 1 && (x = 5); 0 || (x = x + 1); return x; }";
        assert_eq!(eval(source), 6);
    }

    #[test]
    fn logical_values() {
        assert_eq!(eval_expr("2 && 3"), 1);
        assert_eq!(eval_expr("0 || 0"), 0);
        assert_eq!(eval_expr("0 || 7"), 1);
    }

    #[test]
    fn conditional_and_comma() {
        assert_eq!(eval_expr("1 ? 2 : 3"), 2);
        assert_eq!(eval_expr("0 ? 2 : 0 ? 3 : 4"), 4);
        assert_eq!(eval("int main() { int x = 0; int y = (x = 3, x + 1); return y; }"), 4);
    }

    #[test]
    fn assignment_operators() {
        let source = "int main() {
            int a = 10;
            a += 5; a -= 3; a *= 4; a /= 6; a %= 5; a <<= 3; a >>= 1; a |= 1; a &= 7; a ^= 2;
            return a;
        }";
        assert_eq!(eval(source), 7);
        assert_eq!(eval("int main() { int a; int b; a = b = 4; return a + b; }"), 8);
    }

    #[test]
    fn increment_decrement() {
        let source = "int main() { int i = 5; int a = i++; int b = ++i; int c = i--; int d = --i; return a * 1000 + b * 100 + c * 10 + d; }";
        assert_eq!(eval(source), 5000 + 700 + 70 + 5);
    }

    #[test]
    fn narrow_types_truncate() {
        assert_eq!(eval("int main() { char c = 200; return c; }"), -56);
        assert_eq!(eval("int main() { unsigned char c = 200; return c; }"), 200);
        assert_eq!(eval("int main() { short s = 70000; return s; }"), 4464);
        assert_eq!(eval("int main() { char c = 127; return ++c; }"), -128);
        assert_eq!(eval("int main() { char c; return (c = 300); }"), 44);
    }

    #[test]
    fn long_arithmetic() {
        let source = "long main() { long a = 3000000000; int b = -2; return a * b; }";
        assert_eq!(run_source(source) as i64, -6_000_000_000);
        let source = "long main() { unsigned int u = 4294967295u; long l = u; return l; }";
        assert_eq!(run_source(source) as i64, 4_294_967_295);
        let source = "int main() { long a = 1; a = a << 40; return a > 4294967296; }";
        assert_eq!(eval(source), 1);
    }

    #[test]
    fn char_literals() {
        assert_eq!(eval_expr("'a'"), 97);
        assert_eq!(eval_expr("'\\n' + 1"), 11);
    }

    fn wrapping_eval(op: &str, a: i32, b: i32) -> Option<i32> {
        Some(match op {
            "+" => a.wrapping_add(b),
            "-" => a.wrapping_sub(b),
            "*" => a.wrapping_mul(b),
            "/" => a.checked_div(b)?,
            "%" => a.checked_rem(b)?,
            "&" => a & b,
            "|" => a | b,
            "^" => a ^ b,
            "<" => (a < b) as i32,
            "==" => (a == b) as i32,
            _ => unreachable!(),
        })
    }

    proptest! {
        #[test]
        fn matches_wrapping_arithmetic(
            a in any::<i32>(),
            b in any::<i32>(),
            op in prop::sample::select(vec!["+", "-", "*", "/", "%", "&", "|", "^", "<", "=="]),
        ) {
            if let Some(expected) = wrapping_eval(op, a, b) {
                let source = format!(
                    "int main() {{ int a = {}; int b = {}; return a {} b; }}",
                    a, b, op
                );
                prop_assert_eq!(eval(&source), expected);
            }
        }
    }
}
