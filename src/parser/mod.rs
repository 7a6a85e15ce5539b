//! Recursive-descent parser.
//!
//! Expressions are parsed by precedence climbing (`expr.rs`), statements and
//! declarations by plain recursive descent (`stmt.rs`). Names are resolved
//! against a [`ScopeStack`] while parsing, so every expression node leaves
//! the parser with its type already computed.

use std::collections::HashSet;
use std::ops::Range;

use miette::Result;
use nolog::*;

use crate::ast::Program;
use crate::symtable::ScopeStack;
use crate::token::{Token, TokenKind, TokenStream};
use crate::types::Type;

pub mod error;
mod expr;
mod stmt;

pub use error::ParseError;

/// Innermost construct a `break` can leave.
#[derive(Debug)]
enum Breakable {
    Loop,
    Switch {
        cases: HashSet<i64>,
        has_default: bool,
    },
}

/// Parser state.
pub struct Parser {
    tokens: TokenStream,
    scopes: ScopeStack<Type>,
    breakables: Vec<Breakable>,
    /// End of the last consumed token.
    last_end: usize,
}

impl Parser {
    /// Create a parser over a token stream.
    pub fn new(tokens: TokenStream) -> Self {
        Self {
            tokens,
            scopes: ScopeStack::new(),
            breakables: vec![],
            last_end: 0,
        }
    }

    /// Parse a whole translation unit.
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut program = Program::default();
        while let Some(token) = self.tokens.peek_front() {
            if program.function.is_some() {
                return Err(ParseError::syntax("more than one function", token.span.clone()).into());
            }
            program.function = Some(self.parse_function()?);
        }
        Ok(program)
    }
}

/// Parse utilities
impl Parser {
    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.peek_front().map(|t| t.kind)
    }

    fn peek_kind_at(&self, n: usize) -> Option<TokenKind> {
        self.tokens.peek_at(n).map(|t| t.kind)
    }

    /// Span of the next token, or the end of input.
    fn peek_span(&self) -> Range<usize> {
        match self.tokens.peek_front() {
            Some(token) => token.span.clone(),
            None => self.tokens.eof_span(),
        }
    }

    /// Consume the next token. `expected` describes what the caller wants,
    /// for the end-of-input message.
    fn next_token(&mut self, expected: &str) -> Result<Token> {
        match self.tokens.pop_front() {
            Some(token) => {
                self.last_end = token.span.end;
                Ok(token)
            }
            None => Err(ParseError::syntax(
                format!("unexpected end of input, expected {}", expected),
                self.tokens.eof_span(),
            )
            .into()),
        }
    }

    /// Predicate that tests whether the next token has kind `kind` and eats
    /// it if so.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            if let Some(token) = self.tokens.pop_front() {
                self.last_end = token.span.end;
            }
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.next_token(&format!("`{}`", kind))?;
        if token.kind != kind {
            return Err(ParseError::syntax(
                format!("expected `{}`, found `{}`", kind, token.kind),
                token.span,
            )
            .into());
        }
        Ok(token)
    }

    fn unexpected(&self, token: &Token, expected: &str) -> miette::Report {
        trace!("PARSE " => "unexpected {}", token);
        ParseError::syntax(
            format!("expected {}, found `{}`", expected, token.kind),
            token.span.clone(),
        )
        .into()
    }

    fn in_loop(&self) -> bool {
        self.breakables.iter().any(|b| matches!(b, Breakable::Loop))
    }

    fn innermost_switch(&mut self) -> Option<&mut Breakable> {
        self.breakables
            .iter_mut()
            .rev()
            .find(|b| matches!(b, Breakable::Switch { .. }))
    }
}
