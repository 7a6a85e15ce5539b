//! Abstract Syntax Tree.
//!
//! Nodes are built once by the parser and read-only afterwards. Every
//! expression node carries the [`Type`] resolved when it was built.
#![allow(missing_docs)]

use std::ops::Range;

use crate::types::Type;

pub(crate) mod display;
pub mod visit;

/// Program
///
/// ```text
/// Program ::= [Function]
/// ```
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub function: Option<Function>,
}

/// Function Definition
///
/// ```text
/// Function ::= TypeSpec IDENT "(" ["void"] ")" Block
/// ```
#[derive(Debug, Clone)]
pub struct Function {
    pub ty: Type,
    pub name: Span<String>,
    pub body: Block,
}

/// Block
///
/// ```text
/// Block ::= "{" {BlockItem} "}"
/// ```
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub items: Vec<BlockItem>,
}

/// Block Item
///
/// ```text
/// BlockItem ::= Declaration | Stmt
/// ```
#[derive(Debug, Clone)]
pub enum BlockItem {
    Decl(Declaration),
    Stmt(Stmt),
}

/// Declaration
///
/// ```text
/// Declaration ::= TypeSpec IDENT ["=" Expr] ";"
/// ```
#[derive(Debug, Clone)]
pub struct Declaration {
    pub ty: Type,
    pub name: Span<String>,
    pub init: Option<Expr>,
}

/// Statement
///
/// ```text
/// Stmt ::= "return" Expr ";"
///        | [Expr] ";"
///        | "if" "(" Expr ")" Stmt ["else" Stmt]
///        | "while" "(" Expr ")" Stmt
///        | "do" Stmt "while" "(" Expr ")" ";"
///        | "for" "(" (Declaration | [Expr] ";") [Expr] ";" [Expr] ")" Stmt
///        | "break" ";"
///        | "continue" ";"
///        | Block
///        | "switch" "(" Expr ")" Block
///        | "case" ["-"] LITERAL ":"
///        | "default" ":"
///        | "goto" IDENT ";"
///        | IDENT ":"
/// ```
#[derive(Debug, Clone)]
pub enum Stmt {
    Return(Expr),
    Expr(Expr),
    If {
        cond: Expr,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: ForInit,
        cond: Expr,
        post: Expr,
        body: Box<Stmt>,
    },
    Break(Span<()>),
    Continue(Span<()>),
    Block(Block),
    Switch {
        selector: Expr,
        body: Block,
    },
    Case(Span<i64>),
    Default(Span<()>),
    Goto(Span<String>),
    Label(Span<String>),
}

/// Initializer clause of a `for` loop.
#[derive(Debug, Clone)]
pub enum ForInit {
    Expr(Expr),
    Decl(Declaration),
}

/// Expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// Integer or character literal, stored as its 64-bit pattern.
    Constant { value: i64, ty: Type },
    Var(VarRef),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        ty: Type,
    },
    IncDec { op: IncDecOp, target: VarRef },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        ty: Type,
    },
    Assign {
        op: AssignOp,
        target: VarRef,
        value: Box<Expr>,
        ty: Type,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
        ty: Type,
    },
    /// Omitted expression, e.g. a missing `for` clause.
    Empty,
}

impl Expr {
    /// Resolved type of the expression.
    pub fn ty(&self) -> Type {
        match self {
            Expr::Constant { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Assign { ty, .. }
            | Expr::Conditional { ty, .. } => *ty,
            Expr::Var(var) | Expr::IncDec { target: var, .. } => var.ty,
            Expr::Empty => Type::int(),
        }
    }

    /// Whether this is the omitted expression.
    pub fn is_empty(&self) -> bool {
        matches!(self, Expr::Empty)
    }
}

/// Variable reference with the type it was declared with.
#[derive(Debug, Clone)]
pub struct VarRef {
    pub name: Span<String>,
    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Complement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl IncDecOp {
    /// Whether the operator adds one.
    pub fn is_increment(self) -> bool {
        matches!(self, IncDecOp::PreInc | IncDecOp::PostInc)
    }

    /// Whether the expression yields the value before the update.
    pub fn is_postfix(self) -> bool {
        matches!(self, IncDecOp::PostInc | IncDecOp::PostDec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Comma,
}

/// Simple and compound assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

impl AssignOp {
    /// Arithmetic operator applied before the store, `None` for plain `=`.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
            AssignOp::Shl => Some(BinaryOp::Shl),
            AssignOp::Shr => Some(BinaryOp::Shr),
            AssignOp::BitAnd => Some(BinaryOp::BitAnd),
            AssignOp::BitOr => Some(BinaryOp::BitOr),
            AssignOp::BitXor => Some(BinaryOp::BitXor),
        }
    }
}

/// Syntax units with span information.
pub trait Spanned {
    /// Start position of the syntax unit.
    fn start_pos(&self) -> usize;

    /// End position of the syntax unit.
    fn end_pos(&self) -> usize;

    /// Range of the syntax unit.
    fn span(&self) -> Range<usize> {
        self.start_pos()..self.end_pos()
    }
}

/// Attach span information to a syntax unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<T> {
    /// Start position of the syntax unit.
    pub start: usize,
    /// End position of the syntax unit.
    pub end: usize,
    /// Inner syntax unit.
    pub node: T,
}

impl<T> Span<T> {
    /// Wrap `node` with the byte range `span`.
    pub fn new(node: T, span: Range<usize>) -> Self {
        Self {
            start: span.start,
            end: span.end,
            node,
        }
    }
}

impl<T> Spanned for Span<T> {
    fn start_pos(&self) -> usize {
        self.start
    }

    fn end_pos(&self) -> usize {
        self.end
    }
}

impl<T> std::fmt::Display for Span<T>
where
    T: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.node)
    }
}
