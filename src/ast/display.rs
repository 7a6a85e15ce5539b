use std::fmt::{Display, Write};

use indenter::indented;

use super::*;

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.function {
            Some(function) => write!(f, "{}", function),
            None => Ok(()),
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {}() {}", self.ty, self.name, self.body)
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{{")?;
        for item in &self.items {
            let mut f = indented(f).with_str("    ");
            writeln!(f, "{}", item)?;
        }
        write!(f, "}}")
    }
}

impl Display for BlockItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockItem::Decl(decl) => write!(f, "{}", decl),
            BlockItem::Stmt(stmt) => write!(f, "{}", stmt),
        }
    }
}

impl Display for Declaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.ty, self.name)?;
        if let Some(init) = &self.init {
            write!(f, " = {}", init)?;
        }
        write!(f, ";")
    }
}

impl Display for ForInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForInit::Expr(expr) => write!(f, "{};", expr),
            ForInit::Decl(decl) => write!(f, "{}", decl),
        }
    }
}

/// Write a nested statement on its own indented line.
fn write_body(f: &mut std::fmt::Formatter<'_>, body: &Stmt) -> std::fmt::Result {
    match body {
        Stmt::Block(block) => write!(f, " {}", block),
        _ => {
            writeln!(f)?;
            write!(indented(f).with_str("    "), "{}", body)
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::Return(expr) => write!(f, "return {};", expr),
            Stmt::Expr(expr) => write!(f, "{};", expr),
            Stmt::If { cond, then, els } => {
                write!(f, "if ({})", cond)?;
                write_body(f, then)?;
                if let Some(els) = els {
                    writeln!(f)?;
                    write!(f, "else")?;
                    write_body(f, els)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                write!(f, "while ({})", cond)?;
                write_body(f, body)
            }
            Stmt::DoWhile { body, cond } => {
                write!(f, "do")?;
                write_body(f, body)?;
                writeln!(f)?;
                write!(f, "while ({});", cond)
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
            } => {
                write!(f, "for ({} {}; {})", init, cond, post)?;
                write_body(f, body)
            }
            Stmt::Break(_) => write!(f, "break;"),
            Stmt::Continue(_) => write!(f, "continue;"),
            Stmt::Block(block) => write!(f, "{}", block),
            Stmt::Switch { selector, body } => write!(f, "switch ({}) {}", selector, body),
            Stmt::Case(value) => write!(f, "case {}:", value),
            Stmt::Default(_) => write!(f, "default:"),
            Stmt::Goto(label) => write!(f, "goto {};", label),
            Stmt::Label(label) => write!(f, "{}:", label),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Constant { value, .. } => write!(f, "{}", value),
            Expr::Var(var) => write!(f, "{}", var),
            Expr::Unary { op, operand, .. } => write!(f, "{}{}", op, operand),
            Expr::IncDec { op, target } => match op {
                IncDecOp::PreInc => write!(f, "++{}", target),
                IncDecOp::PreDec => write!(f, "--{}", target),
                IncDecOp::PostInc => write!(f, "{}++", target),
                IncDecOp::PostDec => write!(f, "{}--", target),
            },
            Expr::Binary { op, lhs, rhs, .. } => write!(f, "({} {} {})", lhs, op, rhs),
            Expr::Assign {
                op, target, value, ..
            } => write!(f, "({} {} {})", target, op, value),
            Expr::Conditional { cond, then, els, .. } => {
                write!(f, "({} ? {} : {})", cond, then, els)
            }
            Expr::Empty => Ok(()),
        }
    }
}

impl Display for VarRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
            UnaryOp::Complement => write!(f, "~"),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Mod => write!(f, "%"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
            BinaryOp::LogicalAnd => write!(f, "&&"),
            BinaryOp::LogicalOr => write!(f, "||"),
            BinaryOp::BitAnd => write!(f, "&"),
            BinaryOp::BitOr => write!(f, "|"),
            BinaryOp::BitXor => write!(f, "^"),
            BinaryOp::Shl => write!(f, "<<"),
            BinaryOp::Shr => write!(f, ">>"),
            BinaryOp::Comma => write!(f, ","),
        }
    }
}

impl Display for AssignOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.binary_op() {
            Some(op) => write!(f, "{}=", op),
            None => write!(f, "="),
        }
    }
}
