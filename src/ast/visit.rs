//! Visitor pattern for AST nodes.
//!
//! Pre-passes override the hooks they care about and call the matching
//! `walk_*` function to keep descending.

use super::*;

pub trait Visitor<'ast>: Sized {
    fn visit_block(&mut self, block: &'ast Block) {
        walk_block(self, block);
    }
    fn visit_decl(&mut self, decl: &'ast Declaration) {
        walk_decl(self, decl);
    }
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }
    fn visit_expr(&mut self, _expr: &'ast Expr) {}
}

pub fn walk_block<'ast>(visitor: &mut impl Visitor<'ast>, block: &'ast Block) {
    for item in &block.items {
        match item {
            BlockItem::Decl(decl) => visitor.visit_decl(decl),
            BlockItem::Stmt(stmt) => visitor.visit_stmt(stmt),
        }
    }
}

pub fn walk_decl<'ast>(visitor: &mut impl Visitor<'ast>, decl: &'ast Declaration) {
    if let Some(init) = &decl.init {
        visitor.visit_expr(init);
    }
}

pub fn walk_stmt<'ast>(visitor: &mut impl Visitor<'ast>, stmt: &'ast Stmt) {
    match stmt {
        Stmt::Return(expr) | Stmt::Expr(expr) => visitor.visit_expr(expr),
        Stmt::If { cond, then, els } => {
            visitor.visit_expr(cond);
            visitor.visit_stmt(then);
            if let Some(els) = els {
                visitor.visit_stmt(els);
            }
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            visitor.visit_expr(cond);
            visitor.visit_stmt(body);
        }
        Stmt::For {
            init,
            cond,
            post,
            body,
        } => {
            match init {
                ForInit::Expr(expr) => visitor.visit_expr(expr),
                ForInit::Decl(decl) => visitor.visit_decl(decl),
            }
            visitor.visit_expr(cond);
            visitor.visit_expr(post);
            visitor.visit_stmt(body);
        }
        Stmt::Block(block) => visitor.visit_block(block),
        Stmt::Switch { selector, body } => {
            visitor.visit_expr(selector);
            visitor.visit_block(body);
        }
        Stmt::Break(_)
        | Stmt::Continue(_)
        | Stmt::Case(_)
        | Stmt::Default(_)
        | Stmt::Goto(_)
        | Stmt::Label(_) => {}
    }
}

/// Goto label definitions of a function body, in source order.
pub fn collect_labels(body: &Block) -> Vec<&Span<String>> {
    struct Labels<'ast>(Vec<&'ast Span<String>>);

    impl<'ast> Visitor<'ast> for Labels<'ast> {
        fn visit_stmt(&mut self, stmt: &'ast Stmt) {
            if let Stmt::Label(label) = stmt {
                self.0.push(label);
            }
            walk_stmt(self, stmt);
        }
    }

    let mut labels = Labels(vec![]);
    labels.visit_block(body);
    labels.0
}

/// Goto statements of a function body, in source order.
pub fn collect_gotos(body: &Block) -> Vec<&Span<String>> {
    struct Gotos<'ast>(Vec<&'ast Span<String>>);

    impl<'ast> Visitor<'ast> for Gotos<'ast> {
        fn visit_stmt(&mut self, stmt: &'ast Stmt) {
            if let Stmt::Goto(label) = stmt {
                self.0.push(label);
            }
            walk_stmt(self, stmt);
        }
    }

    let mut gotos = Gotos(vec![]);
    gotos.visit_block(body);
    gotos.0
}

/// A `case` or `default` label found in a switch body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseLabel {
    Case(i64),
    Default,
}

/// `case`/`default` labels owned by one switch body, in source order.
///
/// Descends through nested blocks, loops and conditionals but not into a
/// nested `switch`, which owns its own labels.
pub fn collect_cases(body: &Block) -> Vec<Span<CaseLabel>> {
    struct Cases(Vec<Span<CaseLabel>>);

    impl<'ast> Visitor<'ast> for Cases {
        fn visit_stmt(&mut self, stmt: &'ast Stmt) {
            match stmt {
                Stmt::Switch { .. } => {}
                Stmt::Case(value) => self.0.push(Span::new(CaseLabel::Case(value.node), value.span())),
                Stmt::Default(span) => self.0.push(Span::new(CaseLabel::Default, span.span())),
                _ => walk_stmt(self, stmt),
            }
        }
    }

    let mut cases = Cases(vec![]);
    cases.visit_block(body);
    cases.0
}
