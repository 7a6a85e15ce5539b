//! Statement lowering.

use miette::Result;
use nolog::*;

use super::{
    aarch64::{Cond, Inst, Label, Reg},
    label::CaseTable,
    CodegenError, Generator, JumpTargets,
};
use crate::ast::{Block, BlockItem, Declaration, Expr, ForInit, Span, Spanned, Stmt};

impl Generator {
    pub(super) fn gen_block(&mut self, block: &Block) -> Result<()> {
        self.scopes.push_scope();
        let result = block.items.iter().try_for_each(|item| match item {
            BlockItem::Decl(decl) => self.gen_decl(decl),
            BlockItem::Stmt(stmt) => self.gen_stmt(stmt),
        });
        self.scopes.pop_scope();
        result
    }

    fn gen_decl(&mut self, decl: &Declaration) -> Result<()> {
        let offset = self.layout.allocate(decl.ty);
        trace!("DECL " => "`{}`: {} at {}", decl.name, decl.ty, offset);
        self.scopes
            .declare(decl.name.node.clone(), offset)
            .map_err(|e| CodegenError::from_scope(e, decl.name.span()))?;
        if let Some(init) = &decl.init {
            self.gen_expr(init, 0)?;
            let reg = self.regs.get(0, 0, decl.ty.register_width())?;
            self.convert(reg.index, init.ty(), decl.ty);
            self.store(reg, decl.ty, offset);
        }
        Ok(())
    }

    pub(super) fn gen_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Return(expr) => {
                self.gen_expr(expr, 0)?;
                self.convert(0, expr.ty(), self.ret_ty);
                self.push(Inst::B(Label::Return));
            }
            Stmt::Expr(expr) => self.gen_expr(expr, 0)?,
            Stmt::If { cond, then, els } => self.gen_if(cond, then, els.as_deref())?,
            Stmt::While { cond, body } => self.gen_while(cond, body)?,
            Stmt::DoWhile { body, cond } => self.gen_do_while(body, cond)?,
            Stmt::For {
                init,
                cond,
                post,
                body,
            } => {
                self.scopes.push_scope();
                let result = self.gen_for(init, cond, post, body);
                self.scopes.pop_scope();
                result?;
            }
            Stmt::Break(span) => {
                let target = self.targets.break_target.ok_or_else(|| {
                    CodegenError::BreakOutsideLoop {
                        span: span.span().into(),
                    }
                })?;
                self.push(Inst::B(target));
            }
            Stmt::Continue(span) => {
                let target = self.targets.continue_target.ok_or_else(|| {
                    CodegenError::ContinueOutsideLoop {
                        span: span.span().into(),
                    }
                })?;
                self.push(Inst::B(target));
            }
            Stmt::Block(block) => self.gen_block(block)?,
            Stmt::Switch { selector, body } => self.gen_switch(selector, body)?,
            Stmt::Case(span) => self.gen_case_label(span.span())?,
            Stmt::Default(span) => self.gen_case_label(span.span())?,
            Stmt::Goto(name) => {
                let target = self.goto_target(name)?;
                self.push(Inst::B(target));
            }
            Stmt::Label(name) => {
                let target = self.goto_target(name)?;
                self.place(target)?;
            }
        }
        Ok(())
    }

    fn goto_target(&self, name: &Span<String>) -> Result<Label> {
        self.gotos.get(&name.node).ok_or_else(|| {
            CodegenError::UndefinedSymbol {
                name: name.node.clone(),
                span: Some(name.span().into()),
            }
            .into()
        })
    }

    /// Evaluate `cond` and branch to `target` if it is zero.
    fn branch_if_false(&mut self, cond: &Expr, target: Label) -> Result<()> {
        self.gen_expr(cond, 0)?;
        let reg = self.regs.get(0, 0, cond.ty().register_width())?;
        self.push(Inst::Cbz(reg, target));
        Ok(())
    }

    fn gen_if(&mut self, cond: &Expr, then: &Stmt, els: Option<&Stmt>) -> Result<()> {
        match els {
            None => {
                let end = self.labels.fresh();
                self.branch_if_false(cond, end)?;
                self.gen_stmt(then)?;
                self.place(end)
            }
            Some(els) => {
                let else_label = self.labels.fresh();
                let end = self.labels.fresh();
                self.branch_if_false(cond, else_label)?;
                self.gen_stmt(then)?;
                self.push(Inst::B(end));
                self.place(else_label)?;
                self.gen_stmt(els)?;
                self.place(end)
            }
        }
    }

    fn gen_while(&mut self, cond: &Expr, body: &Stmt) -> Result<()> {
        let top = self.labels.fresh();
        let exit = self.labels.fresh();
        self.place(top)?;
        self.branch_if_false(cond, exit)?;
        let targets = JumpTargets {
            break_target: Some(exit),
            continue_target: Some(top),
        };
        self.with_targets(targets, |gen| gen.gen_stmt(body))?;
        self.push(Inst::B(top));
        self.place(exit)
    }

    fn gen_do_while(&mut self, body: &Stmt, cond: &Expr) -> Result<()> {
        let top = self.labels.fresh();
        let check = self.labels.fresh();
        let exit = self.labels.fresh();
        self.place(top)?;
        let targets = JumpTargets {
            break_target: Some(exit),
            continue_target: Some(check),
        };
        self.with_targets(targets, |gen| gen.gen_stmt(body))?;
        self.place(check)?;
        self.gen_expr(cond, 0)?;
        let reg = self.regs.get(0, 0, cond.ty().register_width())?;
        self.push(Inst::Cbnz(reg, top));
        self.place(exit)
    }

    fn gen_for(&mut self, init: &ForInit, cond: &Expr, post: &Expr, body: &Stmt) -> Result<()> {
        match init {
            ForInit::Decl(decl) => self.gen_decl(decl)?,
            ForInit::Expr(expr) => self.gen_expr(expr, 0)?,
        }
        let top = self.labels.fresh();
        let next = self.labels.fresh();
        let exit = self.labels.fresh();
        self.place(top)?;
        if !cond.is_empty() {
            self.branch_if_false(cond, exit)?;
        }
        let targets = JumpTargets {
            break_target: Some(exit),
            continue_target: Some(next),
        };
        self.with_targets(targets, |gen| gen.gen_stmt(body))?;
        self.place(next)?;
        self.gen_expr(post, 0)?;
        self.push(Inst::B(top));
        self.place(exit)
    }

    /// Compare the selector against every case value in order, then jump to
    /// `default` or past the switch. The body follows; its case labels are
    /// placed as they are reached, so control falls through between them.
    fn gen_switch(&mut self, selector: &Expr, body: &Block) -> Result<()> {
        let exit = self.labels.fresh();
        let table = CaseTable::collect(body, &mut self.labels);

        let width = selector.ty().register_width();
        self.gen_expr(selector, 0)?;
        let value = self.regs.get(0, 0, width)?;
        let case = self.regs.get(0, 1, width)?;
        for (constant, target) in table.cases() {
            self.load_imm(case, constant);
            self.push(Inst::Cmp(value, case));
            self.push(Inst::BCond(Cond::Eq, target));
        }
        self.push(Inst::B(table.default_label().unwrap_or(exit)));

        self.switches.push(table);
        let targets = JumpTargets {
            break_target: Some(exit),
            continue_target: self.targets.continue_target,
        };
        let result = self.with_targets(targets, |gen| gen.gen_block(body));
        self.switches.pop();
        result?;
        self.place(exit)
    }

    fn gen_case_label(&mut self, span: std::ops::Range<usize>) -> Result<()> {
        let label = self
            .switches
            .last_mut()
            .and_then(CaseTable::next_pending)
            .ok_or_else(|| CodegenError::CaseOutsideSwitch { span: span.into() })?;
        self.place(label)
    }

    /// Load the constant `value` into `reg`, truncated to the register view.
    pub(super) fn load_imm(&mut self, reg: Reg, value: i64) {
        let value = match reg.width {
            crate::types::RegWidth::Word => value as i32 as i64,
            crate::types::RegWidth::DoubleWord => value,
        };
        if (-65535..=65535).contains(&value) {
            self.push(Inst::MovImm(reg, value));
        } else {
            self.push(Inst::LdrLit(reg, value));
        }
    }
}
