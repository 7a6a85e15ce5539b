use std::collections::HashSet;

use super::expr::literal_value;
use super::*;
use crate::ast::visit::{collect_gotos, collect_labels};
use crate::ast::*;
use crate::types::{BaseType, Qualifiers, StorageClass};

impl Parser {
    /* Functions */
    /// Parses a function definition and checks its goto labels.
    pub(super) fn parse_function(&mut self) -> Result<Function> {
        let ty = self.parse_type_specifier()?;
        let name = self.expect_identifier()?;
        if self.peek_kind() != Some(TokenKind::LeftParen) {
            return Err(ParseError::syntax("global variables are not supported", name.span()).into());
        }
        self.expect(TokenKind::LeftParen)?;
        self.eat(TokenKind::Void);
        self.expect(TokenKind::RightParen)?;
        trace!("DECL " => "function {}: {}", name, ty);

        let mut body = self.parse_block()?;
        if !matches!(body.items.last(), Some(BlockItem::Stmt(Stmt::Return(_)))) {
            trace!("DECL " => "implicit return in {}", name);
            body.items.push(BlockItem::Stmt(Stmt::Return(Expr::Constant {
                value: 0,
                ty: ty.unqualified(),
            })));
        }
        check_labels(&body)?;
        Ok(Function { ty, name, body })
    }

    /* Blocks */
    /// Parses a braced block in its own scope.
    fn parse_block(&mut self) -> Result<Block> {
        self.expect(TokenKind::LeftBrace)?;
        self.scopes.push_scope();
        let mut items = vec![];
        while !self.eat(TokenKind::RightBrace) {
            if self.tokens.is_empty() {
                self.expect(TokenKind::RightBrace)?;
            }
            items.push(self.parse_block_item()?);
        }
        self.scopes.pop_scope();
        Ok(Block { items })
    }

    fn parse_block_item(&mut self) -> Result<BlockItem> {
        match self.peek_kind() {
            Some(kind) if kind.is_type_specifier() => Ok(BlockItem::Decl(self.parse_declaration()?)),
            _ => Ok(BlockItem::Stmt(self.parse_stmt()?)),
        }
    }

    /* Declarations */
    /// Parses `type-specifiers name [= expr] ;`.
    ///
    /// The name is declared before the initializer is parsed.
    fn parse_declaration(&mut self) -> Result<Declaration> {
        let ty = self.parse_type_specifier()?;
        let name = self.expect_identifier()?;
        self.scopes
            .declare(name.node.clone(), ty)
            .map_err(|e| ParseError::from_scope(e, name.span()))?;
        trace!("DECL " => "{}: {}", name, ty);
        let init = if self.eat(TokenKind::Assign) {
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(Declaration { ty, name, init })
    }

    /// Parses a run of type, qualifier and storage-class keywords.
    fn parse_type_specifier(&mut self) -> Result<Type> {
        let start = self.peek_span().start;
        let (mut chars, mut shorts, mut ints, mut longs) = (0, 0, 0, 0);
        let mut signedness: Option<bool> = None;
        let mut qualifiers = Qualifiers::NONE;
        let mut storage: Option<StorageClass> = None;

        while let Some(kind) = self.peek_kind().filter(|k| k.is_type_specifier()) {
            let token = self.next_token("type specifier")?;
            let conflict = || -> miette::Report {
                ParseError::ConflictingTypeSpecifier {
                    span: token.span.clone().into(),
                }
                .into()
            };
            match kind {
                TokenKind::Char => chars += 1,
                TokenKind::Short => shorts += 1,
                TokenKind::Int => ints += 1,
                TokenKind::Long => longs += 1,
                TokenKind::Signed | TokenKind::Unsigned => {
                    if signedness.is_some() {
                        return Err(conflict());
                    }
                    signedness = Some(kind == TokenKind::Signed);
                }
                TokenKind::Const => qualifiers = qualifiers | Qualifiers::CONST,
                TokenKind::Volatile => qualifiers = qualifiers | Qualifiers::VOLATILE,
                TokenKind::Restrict => qualifiers = qualifiers | Qualifiers::RESTRICT,
                TokenKind::Auto | TokenKind::Static | TokenKind::Extern | TokenKind::Register => {
                    if storage.is_some() {
                        return Err(conflict());
                    }
                    storage = Some(match kind {
                        TokenKind::Auto => StorageClass::Auto,
                        TokenKind::Static => StorageClass::Static,
                        TokenKind::Extern => StorageClass::Extern,
                        _ => StorageClass::Register,
                    });
                }
                _ => {
                    return Err(ParseError::syntax(format!("unsupported type `{}`", kind), token.span.clone()).into());
                }
            }
        }

        let span = start..self.last_end.max(start);
        let base = match (chars, shorts, ints, longs) {
            (0, 0, 0, 0) if signedness.is_some() => BaseType::Int,
            (0, 0, 0, 0) => return Err(ParseError::syntax("expected a type specifier", self.peek_span()).into()),
            (1, 0, 0, 0) => BaseType::Char,
            (0, 1, 0 | 1, 0) => BaseType::Short,
            (0, 0, 1, 0) => BaseType::Int,
            (0, 0, 0 | 1, 1) => BaseType::Long,
            (0, 0, 0 | 1, 2) => BaseType::LongLong,
            _ => return Err(ParseError::ConflictingTypeSpecifier { span: span.into() }.into()),
        };
        Ok(Type {
            base,
            signed: signedness.unwrap_or(true),
            qualifiers,
            storage: storage.unwrap_or_default(),
        })
    }

    fn expect_identifier(&mut self) -> Result<Span<String>> {
        let token = self.next_token("identifier")?;
        if token.kind != TokenKind::Identifier {
            return Err(self.unexpected(&token, "identifier"));
        }
        Ok(Span::new(token.text().to_string(), token.span))
    }

    /* Statements */
    /// Parses one statement, dispatching on its leading token.
    fn parse_stmt(&mut self) -> Result<Stmt> {
        let Some(kind) = self.peek_kind() else {
            return Err(ParseError::syntax("unexpected end of input, expected statement", self.tokens.eof_span()).into());
        };
        match kind {
            TokenKind::Return => self.parse_return(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                let span = self.next_token("`break`")?.span;
                if self.breakables.is_empty() {
                    return Err(ParseError::BreakOutsideLoop { span: span.into() }.into());
                }
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Break(Span::new((), span)))
            }
            TokenKind::Continue => {
                let span = self.next_token("`continue`")?.span;
                if !self.in_loop() {
                    return Err(ParseError::ContinueOutsideLoop { span: span.into() }.into());
                }
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Continue(Span::new((), span)))
            }
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Case => self.parse_case(),
            TokenKind::Default => self.parse_default(),
            TokenKind::Goto => {
                self.next_token("`goto`")?;
                let label = self.expect_identifier()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Goto(label))
            }
            TokenKind::Identifier if self.peek_kind_at(1) == Some(TokenKind::Colon) => {
                let label = self.expect_identifier()?;
                self.expect(TokenKind::Colon)?;
                trace!("LABEL " => "{}", label);
                Ok(Stmt::Label(label))
            }
            TokenKind::Semicolon => {
                self.next_token("`;`")?;
                Ok(Stmt::Expr(Expr::Empty))
            }
            kind if kind.is_type_specifier() => Err(ParseError::syntax(
                "a declaration is not allowed here",
                self.peek_span(),
            )
            .into()),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_return(&mut self) -> Result<Stmt> {
        let span = self.expect(TokenKind::Return)?.span;
        if self.peek_kind() == Some(TokenKind::Semicolon) {
            return Err(ParseError::MissingReturnValue { span: span.into() }.into());
        }
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Return(expr))
    }

    /// Parses `( expr )`.
    fn parse_condition(&mut self) -> Result<Expr> {
        self.expect(TokenKind::LeftParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RightParen)?;
        Ok(cond)
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::If)?;
        let cond = self.parse_condition()?;
        let then = Box::new(self.parse_stmt()?);
        let els = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If { cond, then, els })
    }

    /// Parses a loop body with `break` and `continue` enabled.
    fn parse_loop_body(&mut self) -> Result<Box<Stmt>> {
        self.breakables.push(Breakable::Loop);
        let body = self.parse_stmt();
        self.breakables.pop();
        Ok(Box::new(body?))
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::While)?;
        let cond = self.parse_condition()?;
        let body = self.parse_loop_body()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_do_while(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::Do)?;
        let body = self.parse_loop_body()?;
        self.expect(TokenKind::While)?;
        let cond = self.parse_condition()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::DoWhile { body, cond })
    }

    /// Parses a `for` loop. A declaration in the initializer is scoped to
    /// the whole loop.
    fn parse_for(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LeftParen)?;
        self.scopes.push_scope();

        let init = match self.peek_kind() {
            Some(kind) if kind.is_type_specifier() => ForInit::Decl(self.parse_declaration()?),
            _ => ForInit::Expr(self.parse_optional_expr(TokenKind::Semicolon)?),
        };
        let cond = self.parse_optional_expr(TokenKind::Semicolon)?;
        let post = self.parse_optional_expr(TokenKind::RightParen)?;
        let body = self.parse_loop_body()?;

        self.scopes.pop_scope();
        Ok(Stmt::For {
            init,
            cond,
            post,
            body,
        })
    }

    /// Parses an expression that may be omitted, then the `terminator`.
    fn parse_optional_expr(&mut self, terminator: TokenKind) -> Result<Expr> {
        let expr = if self.peek_kind() == Some(terminator) {
            Expr::Empty
        } else {
            self.parse_expr()?
        };
        self.expect(terminator)?;
        Ok(expr)
    }

    fn parse_switch(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::Switch)?;
        let selector = self.parse_condition()?;
        if self.peek_kind() != Some(TokenKind::LeftBrace) {
            return Err(ParseError::syntax("switch body must be a block", self.peek_span()).into());
        }
        self.breakables.push(Breakable::Switch {
            cases: HashSet::new(),
            has_default: false,
        });
        let body = self.parse_block();
        self.breakables.pop();
        Ok(Stmt::Switch {
            selector,
            body: body?,
        })
    }

    /// Parses `case [-] literal :`.
    fn parse_case(&mut self) -> Result<Stmt> {
        let start = self.expect(TokenKind::Case)?.span.start;
        let negative = self.eat(TokenKind::Minus);
        let token = self.next_token("case value")?;
        if !token.kind.is_literal() {
            return Err(self.unexpected(&token, "integer constant"));
        }
        let (value, _) = literal_value(&token)?;
        let value = if negative { value.wrapping_neg() } else { value };
        let span = start..token.span.end;

        match self.innermost_switch() {
            Some(Breakable::Switch { cases, .. }) => {
                if !cases.insert(value) {
                    return Err(ParseError::DuplicateCase {
                        message: format!("duplicate case value `{}`", value),
                        span: span.into(),
                    }
                    .into());
                }
            }
            _ => return Err(ParseError::CaseOutsideSwitch { span: span.into() }.into()),
        }
        self.expect(TokenKind::Colon)?;
        Ok(Stmt::Case(Span::new(value, span)))
    }

    fn parse_default(&mut self) -> Result<Stmt> {
        let span = self.expect(TokenKind::Default)?.span;
        match self.innermost_switch() {
            Some(Breakable::Switch { has_default, .. }) => {
                if *has_default {
                    return Err(ParseError::DuplicateCase {
                        message: "multiple default labels in one switch".to_string(),
                        span: span.into(),
                    }
                    .into());
                }
                *has_default = true;
            }
            _ => return Err(ParseError::CaseOutsideSwitch { span: span.into() }.into()),
        }
        self.expect(TokenKind::Colon)?;
        Ok(Stmt::Default(Span::new((), span)))
    }
}

/// Reject duplicate labels and gotos to labels that do not exist.
fn check_labels(body: &Block) -> Result<()> {
    let mut defined = HashSet::new();
    for label in collect_labels(body) {
        if !defined.insert(label.node.as_str()) {
            return Err(ParseError::DuplicateDeclaration {
                name: label.node.clone(),
                span: label.span().into(),
            }
            .into());
        }
    }
    for goto in collect_gotos(body) {
        if !defined.contains(goto.node.as_str()) {
            return Err(ParseError::UndefinedSymbol {
                name: goto.node.clone(),
                span: goto.span().into(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::tests::parse;
    use super::*;

    fn body(source: &str) -> String {
        let program = parse(&format!("int main() {{ {} }}", source)).unwrap();
        program.function.unwrap().body.to_string()
    }

    fn err(source: &str) -> ParseError {
        match parse(source).unwrap_err().downcast::<ParseError>() {
            Ok(err) => err,
            Err(err) => panic!("unexpected error: {:?}", err),
        }
    }

    fn main_err(source: &str) -> ParseError {
        err(&format!("int main() {{ {} }}", source))
    }

    #[test]
    fn implicit_return() {
        let program = parse("long f(void) { long x = 1; }").unwrap();
        let function = program.function.unwrap();
        let returns = function
            .body
            .items
            .iter()
            .filter(|item| matches!(item, BlockItem::Stmt(Stmt::Return(_))))
            .count();
        assert_eq!(returns, 1);
        match function.body.items.last() {
            Some(BlockItem::Stmt(Stmt::Return(expr))) => assert_eq!(expr.ty(), Type::long()),
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn explicit_return_is_kept() {
        let program = parse("int main() { return 3; }").unwrap();
        assert_eq!(program.function.unwrap().body.items.len(), 1);
    }

    #[test]
    fn statements() {
        assert_eq!(
            body("int a = 1; if (a) a = 2; else { a = 3; } return a;"),
            "{\n    int a = 1;\n    if (a)\n        (a = 2);\n    else {\n        (a = 3);\n    }\n    return a;\n}"
        );
        assert_eq!(
            body("for (int i = 0; i < 3; i++) ; return 0;"),
            "{\n    for (int i = 0; (i < 3); i++)\n        ;\n    return 0;\n}"
        );
        assert_eq!(
            body("int i; for (;;) break; return 0;"),
            "{\n    int i;\n    for (; ; )\n        break;\n    return 0;\n}"
        );
    }

    #[test]
    fn for_scope_ends_with_loop() {
        assert!(matches!(
            main_err("for (int i = 0; i < 3; i++) {} return i;"),
            ParseError::UndefinedSymbol { name, .. } if name == "i"
        ));
    }

    #[test]
    fn shadowing_and_redeclaration() {
        body("int a = 1; { int a = 2; } return a;");
        assert!(matches!(
            main_err("int a; int a; return 0;"),
            ParseError::DuplicateDeclaration { .. }
        ));
    }

    #[test]
    fn type_specifiers() {
        let program =
            parse("int main() { unsigned long long int a; const volatile short b; register char c; signed d; return 0; }")
                .unwrap();
        let tys: Vec<_> = program
            .function
            .unwrap()
            .body
            .items
            .iter()
            .filter_map(|item| match item {
                BlockItem::Decl(decl) => Some(decl.ty.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(
            tys,
            [
                "unsigned long long",
                "const volatile short",
                "register char",
                "int"
            ]
        );
    }

    #[test]
    fn conflicting_type_specifiers() {
        for source in [
            "int int a; return 0;",
            "char long a; return 0;",
            "signed unsigned a; return 0;",
            "static extern int a; return 0;",
            "long long long a; return 0;",
        ] {
            assert!(
                matches!(main_err(source), ParseError::ConflictingTypeSpecifier { .. }),
                "{}",
                source
            );
        }
    }

    #[test]
    fn unsupported_types() {
        assert!(matches!(
            main_err("float f; return 0;"),
            ParseError::SyntaxError { message, .. } if message.contains("unsupported type")
        ));
        assert!(matches!(
            err("int x; int main() { return 0; }"),
            ParseError::SyntaxError { message, .. } if message.contains("global")
        ));
    }

    #[test]
    fn misplaced_control_flow() {
        assert!(matches!(main_err("break;"), ParseError::BreakOutsideLoop { .. }));
        assert!(matches!(main_err("continue;"), ParseError::ContinueOutsideLoop { .. }));
        assert!(matches!(
            main_err("switch (1) { case 1: continue; }"),
            ParseError::ContinueOutsideLoop { .. }
        ));
        assert!(matches!(main_err("case 1: ;"), ParseError::CaseOutsideSwitch { .. }));
        assert!(matches!(main_err("default: ;"), ParseError::CaseOutsideSwitch { .. }));
        assert!(matches!(main_err("return;"), ParseError::MissingReturnValue { .. }));
        body("while (1) { switch (2) { case 2: break; } continue; }");
        body("switch (1) { case 1: while (0) { case 2: break; } }");
    }

    #[test]
    fn duplicate_cases() {
        assert!(matches!(
            main_err("switch (1) { case 1: case -1: case 1: ; }"),
            ParseError::DuplicateCase { .. }
        ));
        assert!(matches!(
            main_err("switch (1) { default: ; default: ; }"),
            ParseError::DuplicateCase { .. }
        ));
        body("switch (1) { case 1: switch (2) { case 1: ; } }");
    }

    #[test]
    fn goto_labels() {
        body("goto end; end: return 0;");
        body("{ loop: ; } goto loop;");
        assert!(matches!(
            main_err("goto nowhere;"),
            ParseError::UndefinedSymbol { name, .. } if name == "nowhere"
        ));
        assert!(matches!(
            main_err("a: ; { a: ; }"),
            ParseError::DuplicateDeclaration { name, .. } if name == "a"
        ));
    }

    #[test]
    fn declaration_only_in_blocks() {
        assert!(matches!(
            main_err("if (1) int x = 1;"),
            ParseError::SyntaxError { .. }
        ));
    }
}
