//! NeCo front end.
//!
//! This crate turns source text into a typed [`Script`]:
//! - Lexical analysis (tokenization into an arena)
//! - Typed AST definitions
//! - The combined parser and semantic analyzer
//!
//! # Example
//!
//! ```
//! use neco_core::Diagnostics;
//! use neco_parser::parse_source;
//!
//! let mut diagnostics = Diagnostics::new();
//! let script = parse_source("int a = 2 + 3 * 4\nprintLine(a)", &mut diagnostics).unwrap();
//! assert!(!diagnostics.has_errors());
//! assert_eq!(script.body.len(), 2);
//! ```

pub mod analyzer;
pub mod ast;
pub mod lexer;

pub use analyzer::analyze;
pub use ast::Script;
pub use lexer::{Lexer, Token, TokenKind, tokenize};

use bumpalo::Bump;
use neco_core::{Diagnostics, TooManyErrors};

/// Tokenize and analyze `source`.
///
/// Lexical errors are reported into `diagnostics` ahead of the analyzer's
/// own and count toward the same error ceiling.
pub fn parse_source(source: &str, diagnostics: &mut Diagnostics) -> Result<Script, TooManyErrors> {
    let arena = Bump::new();
    let (tokens, lex_errors) = tokenize(source, &arena);
    for err in lex_errors {
        diagnostics.report(err)?;
    }
    analyze(tokens, diagnostics)
}
