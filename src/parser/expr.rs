use super::*;
use crate::ast::*;
use crate::types::{promote, BaseType};

/// Right binding power of assignment operators.
const ASSIGN_BP: u8 = 4;

/// Binding power of an infix operator, `(left, right)`.
///
/// Left-associative operators bind tighter on the right; assignment and the
/// conditional bind tighter on the left.
fn binop_bp(kind: TokenKind) -> Option<(u8, u8)> {
    use TokenKind::*;
    match kind {
        /* Comma */
        Comma => Some((2, 3)),
        /* Assignment */
        Assign | PlusAssign | MinusAssign | StarAssign | SlashAssign | PercentAssign
        | LeftShiftAssign | RightShiftAssign | AndAssign | OrAssign | XorAssign => Some((5, ASSIGN_BP)),
        /* Conditional, the right side is the else branch */
        Question => Some((7, ASSIGN_BP)),
        /* Logical */
        Or => Some((8, 9)),
        And => Some((10, 11)),
        /* Bitwise */
        BitOr => Some((12, 13)),
        BitXor => Some((14, 15)),
        BitAnd => Some((16, 17)),
        /* Equality */
        Equal | NotEqual => Some((18, 19)),
        /* Relational */
        LessThan | LessEqual | GreaterThan | GreaterEqual => Some((20, 21)),
        /* Shift */
        LeftShift | RightShift => Some((22, 23)),
        /* Additive */
        Plus | Minus => Some((24, 25)),
        /* Multiplicative */
        Star | Slash | Percent => Some((26, 27)),
        _ => None,
    }
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    use TokenKind::*;
    Some(match kind {
        Comma => BinaryOp::Comma,
        Or => BinaryOp::LogicalOr,
        And => BinaryOp::LogicalAnd,
        BitOr => BinaryOp::BitOr,
        BitXor => BinaryOp::BitXor,
        BitAnd => BinaryOp::BitAnd,
        Equal => BinaryOp::Eq,
        NotEqual => BinaryOp::Ne,
        LessThan => BinaryOp::Lt,
        LessEqual => BinaryOp::Le,
        GreaterThan => BinaryOp::Gt,
        GreaterEqual => BinaryOp::Ge,
        LeftShift => BinaryOp::Shl,
        RightShift => BinaryOp::Shr,
        Plus => BinaryOp::Add,
        Minus => BinaryOp::Sub,
        Star => BinaryOp::Mul,
        Slash => BinaryOp::Div,
        Percent => BinaryOp::Mod,
        _ => return None,
    })
}

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    use TokenKind::*;
    Some(match kind {
        Assign => AssignOp::Assign,
        PlusAssign => AssignOp::Add,
        MinusAssign => AssignOp::Sub,
        StarAssign => AssignOp::Mul,
        SlashAssign => AssignOp::Div,
        PercentAssign => AssignOp::Mod,
        LeftShiftAssign => AssignOp::Shl,
        RightShiftAssign => AssignOp::Shr,
        AndAssign => AssignOp::BitAnd,
        OrAssign => AssignOp::BitOr,
        XorAssign => AssignOp::BitXor,
        _ => return None,
    })
}

/// Value and type of an integer or character literal token.
pub(crate) fn literal_value(token: &Token) -> Result<(i64, Type), ParseError> {
    let text = token.text();
    if token.kind == TokenKind::CharLiteral {
        return char_value(text)
            .map(|c| (c as i64, Type::char()))
            .ok_or_else(|| ParseError::syntax("invalid character literal", token.span.clone()));
    }

    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    let suffix = &text[digits.len()..];
    let unsigned_marks = suffix.chars().filter(|c| c.eq_ignore_ascii_case(&'u')).count();
    let long_marks = suffix.len() - unsigned_marks;
    if unsigned_marks > 1 || long_marks > 2 {
        return Err(ParseError::syntax("invalid integer suffix", token.span.clone()));
    }

    let value = match token.kind {
        TokenKind::HexLiteral => u64::from_str_radix(&digits[2..], 16),
        TokenKind::OctLiteral if digits.len() > 1 => u64::from_str_radix(&digits[1..], 8),
        TokenKind::OctLiteral => Ok(0),
        _ => digits.parse::<u64>(),
    }
    .map_err(|_| ParseError::syntax("integer literal is too large", token.span.clone()))?;

    let decimal = token.kind == TokenKind::IntLiteral;
    let unsigned = unsigned_marks == 1;
    let ty = match long_marks {
        2 => Type::new(BaseType::LongLong, !unsigned),
        1 => Type::new(BaseType::Long, !unsigned),
        _ if unsigned && value <= u32::MAX as u64 => Type::uint(),
        _ if unsigned => Type::new(BaseType::Long, false),
        _ if value <= i32::MAX as u64 => Type::int(),
        _ if !decimal && value <= u32::MAX as u64 => Type::uint(),
        _ => Type::long(),
    };
    Ok((value as i64, ty))
}

/// Byte value of a quoted character literal.
fn char_value(text: &str) -> Option<u8> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let c = match chars.next()? {
        '\\' => match chars.next()? {
            'n' => b'\n',
            't' => b'\t',
            'r' => b'\r',
            '0' => 0,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'v' => 0x0b,
            c if c.is_ascii() => c as u8,
            _ => return None,
        },
        c if c.is_ascii() => c as u8,
        _ => return None,
    };
    chars.next().is_none().then_some(c)
}

impl Parser {
    /* Expressions */
    /// Parses any expression, including the comma operator.
    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(0)
    }

    /// Parses an expression without a top-level comma, as in an initializer.
    pub(super) fn parse_assignment_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(ASSIGN_BP)
    }

    /// Parses an expression whose operators bind at least `min_bp`.
    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let start = self.peek_span().start;
        let mut lhs = self.parse_unary_expr()?;

        loop {
            let Some(kind) = self.peek_kind() else {
                break;
            };
            let Some((l_bp, r_bp)) = binop_bp(kind) else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            let op_span = self.next_token("operator")?.span;

            lhs = if kind == TokenKind::Question {
                let then = self.parse_expr_bp(0)?;
                self.expect(TokenKind::Colon)?;
                let els = self.parse_expr_bp(r_bp)?;
                let ty = promote(then.ty(), els.ty());
                Expr::Conditional {
                    cond: Box::new(lhs),
                    then: Box::new(then),
                    els: Box::new(els),
                    ty,
                }
            } else if let Some(op) = assign_op(kind) {
                let Expr::Var(target) = lhs else {
                    return Err(ParseError::InvalidLvalue {
                        span: (start..op_span.start).into(),
                    }
                    .into());
                };
                let value = self.parse_expr_bp(r_bp)?;
                let ty = promote(target.ty, value.ty());
                Expr::Assign {
                    op,
                    target,
                    value: Box::new(value),
                    ty,
                }
            } else {
                let op = binary_op(kind).ok_or_else(|| ParseError::syntax("unknown operator", op_span))?;
                let rhs = self.parse_expr_bp(r_bp)?;
                let ty = promote(lhs.ty(), rhs.ty());
                Expr::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    ty,
                }
            };
        }

        Ok(lhs)
    }

    /// Parses prefix operators, which bind tighter than any infix operator.
    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::LogicalNot) => UnaryOp::Not,
            Some(TokenKind::BitwiseNot) => UnaryOp::Complement,
            Some(TokenKind::Plus) => {
                self.next_token("`+`")?;
                return self.parse_unary_expr();
            }
            Some(kind @ (TokenKind::PlusPlus | TokenKind::MinusMinus)) => {
                let start = self.next_token("operator")?.span.start;
                let operand = self.parse_unary_expr()?;
                let Expr::Var(target) = operand else {
                    return Err(ParseError::InvalidLvalue {
                        span: (start..self.last_end).into(),
                    }
                    .into());
                };
                let op = if kind == TokenKind::PlusPlus {
                    IncDecOp::PreInc
                } else {
                    IncDecOp::PreDec
                };
                return Ok(Expr::IncDec { op, target });
            }
            _ => return self.parse_postfix_expr(),
        };
        self.next_token("operator")?;
        let operand = self.parse_unary_expr()?;
        let ty = operand.ty();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            ty,
        })
    }

    /// Parses a primary expression followed by postfix `++`/`--`.
    fn parse_postfix_expr(&mut self) -> Result<Expr> {
        let start = self.peek_span().start;
        let mut expr = self.parse_primary_expr()?;
        while let Some(kind @ (TokenKind::PlusPlus | TokenKind::MinusMinus)) = self.peek_kind() {
            let op_span = self.next_token("operator")?.span;
            let Expr::Var(target) = expr else {
                return Err(ParseError::InvalidLvalue {
                    span: (start..op_span.start).into(),
                }
                .into());
            };
            let op = if kind == TokenKind::PlusPlus {
                IncDecOp::PostInc
            } else {
                IncDecOp::PostDec
            };
            expr = Expr::IncDec { op, target };
        }
        Ok(expr)
    }

    /// Parses a variable, a literal or a parenthesized expression.
    fn parse_primary_expr(&mut self) -> Result<Expr> {
        let token = self.next_token("expression")?;
        match token.kind {
            TokenKind::Identifier => {
                let ty = *self
                    .scopes
                    .lookup(token.text())
                    .map_err(|e| ParseError::from_scope(e, token.span.clone()))?;
                let name = Span::new(token.text().to_string(), token.span);
                Ok(Expr::Var(VarRef { name, ty }))
            }
            kind if kind.is_literal() => {
                let (value, ty) = literal_value(&token)?;
                Ok(Expr::Constant { value, ty })
            }
            TokenKind::LeftParen => {
                self.check_balanced(token.span)?;
                let expr = self.parse_expr_bp(0)?;
                self.expect(TokenKind::RightParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected(&token, "expression")),
        }
    }

    /// Scan ahead for the `)` matching an already consumed `(`, giving up
    /// at the end of the statement.
    fn check_balanced(&self, open: Range<usize>) -> Result<()> {
        let mut depth = 1usize;
        for token in self.tokens.iter() {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                TokenKind::Semicolon => break,
                _ => {}
            }
        }
        Err(ParseError::UnbalancedParens { span: open.into() }.into())
    }
}
