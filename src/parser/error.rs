//! Error type for the parser.

use std::ops::Range;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::symtable::ScopeError;

/// Error type for the parser.
#[derive(Error, Debug, Diagnostic)]
#[allow(missing_docs)]
pub enum ParseError {
    /// malformed input
    #[error("syntax error: {message}")]
    #[diagnostic(code(subc::syntax_error))]
    SyntaxError {
        message: String,
        #[label("{message}")]
        span: SourceSpan,
    },

    /// name declared twice in one scope
    #[error("`{name}` is already declared")]
    #[diagnostic(code(subc::duplicate_declaration))]
    DuplicateDeclaration {
        name: String,
        #[label("redeclared here")]
        span: SourceSpan,
    },

    /// variable or goto label not declared
    #[error("`{name}` is not declared")]
    #[diagnostic(code(subc::undefined_symbol))]
    UndefinedSymbol {
        name: String,
        #[label("not found")]
        span: SourceSpan,
    },

    /// assignment target is not a variable
    #[error("expression is not assignable")]
    #[diagnostic(code(subc::invalid_lvalue))]
    InvalidLvalue {
        #[label("not a variable")]
        span: SourceSpan,
    },

    /// incompatible type specifiers
    #[error("conflicting type specifiers")]
    #[diagnostic(code(subc::conflicting_type_specifier))]
    ConflictingTypeSpecifier {
        #[label("conflicts with an earlier specifier")]
        span: SourceSpan,
    },

    /// break outside loop or switch
    #[error("break statement not within a loop or switch")]
    #[diagnostic(code(subc::break_outside_loop))]
    BreakOutsideLoop {
        #[label("break statement not within a loop or switch")]
        span: SourceSpan,
    },

    /// continue outside loop
    #[error("continue statement not within a loop")]
    #[diagnostic(code(subc::continue_outside_loop))]
    ContinueOutsideLoop {
        #[label("continue statement not within a loop")]
        span: SourceSpan,
    },

    /// case or default outside switch
    #[error("case label not within a switch statement")]
    #[diagnostic(code(subc::case_outside_switch))]
    CaseOutsideSwitch {
        #[label("case label not within a switch statement")]
        span: SourceSpan,
    },

    /// `return` without a value
    #[error("return statement requires a value")]
    #[diagnostic(code(subc::missing_return_value))]
    MissingReturnValue {
        #[label("missing value")]
        span: SourceSpan,
    },

    /// `(` without a matching `)` before the end of the statement
    #[error("unbalanced parentheses")]
    #[diagnostic(code(subc::unbalanced_parens))]
    UnbalancedParens {
        #[label("unclosed parenthesis")]
        span: SourceSpan,
    },

    /// repeated case value or default in one switch
    #[error("{message}")]
    #[diagnostic(code(subc::duplicate_case))]
    DuplicateCase {
        message: String,
        #[label("duplicate label")]
        span: SourceSpan,
    },
}

impl ParseError {
    pub(crate) fn syntax(message: impl Into<String>, span: Range<usize>) -> Self {
        ParseError::SyntaxError {
            message: message.into(),
            span: span.into(),
        }
    }

    pub(crate) fn from_scope(err: ScopeError, span: Range<usize>) -> Self {
        match err {
            ScopeError::Duplicate(name) => ParseError::DuplicateDeclaration {
                name,
                span: span.into(),
            },
            ScopeError::Undefined(name) => ParseError::UndefinedSymbol {
                name,
                span: span.into(),
            },
        }
    }
}
