//! Error type for the code generator.

use std::ops::Range;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::symtable::ScopeError;

/// Error type for the code generator.
#[derive(Error, Debug, Diagnostic)]
#[allow(missing_docs)]
pub enum CodegenError {
    /// expression needs more scratch registers than available
    #[error("expression too complex: needs register {index}, but only {limit} are available")]
    #[diagnostic(
        code(subc::register_exhaustion),
        help("split the expression into several statements")
    )]
    RegisterExhaustion { index: u8, limit: u8 },

    /// locals do not fit in a frame addressable from `sp`
    #[error("stack frame of {size} bytes exceeds the {limit}-byte limit")]
    #[diagnostic(
        code(subc::frame_too_large),
        help("declare fewer local variables")
    )]
    FrameTooLarge { size: i32, limit: i32 },

    /// variable or goto label not declared
    #[error("`{name}` is not declared")]
    #[diagnostic(code(subc::undefined_symbol))]
    UndefinedSymbol {
        name: String,
        #[label("not found")]
        span: Option<SourceSpan>,
    },

    /// name declared twice in one scope
    #[error("`{name}` is already declared")]
    #[diagnostic(code(subc::duplicate_declaration))]
    DuplicateDeclaration {
        name: String,
        #[label("redeclared here")]
        span: Option<SourceSpan>,
    },

    /// break outside loop or switch
    #[error("break statement not within a loop or switch")]
    #[diagnostic(code(subc::break_outside_loop))]
    BreakOutsideLoop {
        #[label("no enclosing loop or switch")]
        span: SourceSpan,
    },

    /// continue outside loop
    #[error("continue statement not within a loop")]
    #[diagnostic(code(subc::continue_outside_loop))]
    ContinueOutsideLoop {
        #[label("no enclosing loop")]
        span: SourceSpan,
    },

    /// case or default outside switch
    #[error("case label not within a switch statement")]
    #[diagnostic(code(subc::case_outside_switch))]
    CaseOutsideSwitch {
        #[label("no enclosing switch")]
        span: SourceSpan,
    },
}

impl CodegenError {
    pub(crate) fn from_scope(err: ScopeError, span: Range<usize>) -> Self {
        match err {
            ScopeError::Duplicate(name) => CodegenError::DuplicateDeclaration {
                name,
                span: Some(span.into()),
            },
            ScopeError::Undefined(name) => CodegenError::UndefinedSymbol {
                name,
                span: Some(span.into()),
            },
        }
    }
}
