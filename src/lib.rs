//! A compiler for a subset of C, targeting AArch64 assembly.
//!
//! The pipeline has three stages, each with its own diagnostic type:
//! [`lex`] produces a [`token::TokenStream`], [`parse`] builds a typed
//! [`ast::Program`], and [`compile`] lowers it to a
//! [`codegen::aarch64::Program`] whose `Display` is the assembly text.
#![deny(missing_docs)]

#[macro_use]
#[doc(hidden)]
pub mod logger_setup {
    #[macro_export]
    #[cfg(feature = "trace")]
    macro_rules! color {
        ( [trace] ) => {
            "\x1B[34m"
        };
        ( [debug] ) => {
            "\x1B[36m"
        };
        ( [info]  ) => {
            "\x1B[32m"
        };
        ( [warn]  ) => {
            "\x1B[33m"
        };
        ( [error] ) => {
            "\x1B[31m"
        };
        ( [crit]  ) => {
            "\x1B[35m"
        };
        ( [sep]   ) => {
            "\x1B[1m\x1B[2m"
        }; // +bold +dim
        ( [msg]   ) => {
            ""
        }; // default term font color
        ( [from]  ) => {
            "\x1B[90m\x1B[3m"
        }; // `[src/main.rs 101:5]` in `location_style_classic`
        ( [sep2]  ) => {
            "\x1B[90m\x1B[2m"
        }; // sep2 in default style
        ( [sep3]  ) => {
            "\x1B[90m\x1B[2m"
        }; // sep3 in default style
        ( [line]  ) => {
            "\x1B[38;5;67m\x1B[1m\x1B[2m"
        }; // line number in default style
        ( [key]   ) => {
            "\x1B[3m\x1B[1m"
        }; // +italic +bold
        ( [value] ) => {
            ""
        }; // default term font color
        ( [rm]    ) => {
            "\x1B[0m"
        }; // remove previous colors
    }
}

pub mod ast;
pub mod codegen;
pub mod parser;
pub mod symtable;
pub mod token;
pub mod types;

use miette::Result;

pub use codegen::CodegenOptions;
pub use token::lex;

/// Parse source code into a typed AST.
pub fn parse(source: &str) -> Result<ast::Program> {
    let tokens = lex(source)?;
    parser::Parser::new(tokens).parse_program()
}

/// Compile source code to AArch64 assembly.
pub fn compile(source: &str, options: &CodegenOptions) -> Result<codegen::aarch64::Program> {
    let program = parse(source)?;
    codegen::generate(&program, options)
}
