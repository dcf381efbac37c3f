//! Core types shared by every NeCo crate.
//!
//! - [`Span`] - source positions
//! - [`DataType`] - the type algebra
//! - [`BuiltinId`] - the built-in function table
//! - phase error types and the [`Diagnostics`] collection

pub mod arith;
pub mod builtin;
pub mod data_type;
pub mod diagnostics;
pub mod error;
pub mod span;

pub use builtin::BuiltinId;
pub use data_type::DataType;
pub use diagnostics::{DEFAULT_ERROR_LIMIT, Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{
    BinaryFormatError, CodeGenError, ConstantKind, LexError, ParseError, ParseErrorKind,
    RuntimeError, RuntimeErrorKind, SemanticError, TooManyErrors,
};
pub use span::Span;
