//! Error types for every phase of the NeCo pipeline.
//!
//! ```text
//! LexError           - tokenizer (reported into Diagnostics)
//! ParseError         - structural syntax errors (reported into Diagnostics)
//! SemanticError      - type/scope/overload errors (reported into Diagnostics)
//! TooManyErrors      - the cumulative error ceiling was exceeded
//! CodeGenError       - fatal internal-invariant violations in the generator
//! BinaryFormatError  - malformed or incompatible binary modules
//! RuntimeError       - fatal faults while executing
//! ```
//!
//! Lexical, syntax and semantic errors are recoverable per instance: they are
//! converted into [`Diagnostic`](crate::Diagnostic)s and analysis continues.
//! Everything else aborts the phase that produced it.

use thiserror::Error;

use crate::{DataType, Span};

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur during tokenization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated string")]
    UnterminatedString { span: Span },

    #[error("unterminated comment")]
    UnterminatedComment { span: Span },

    #[error("invalid escape sequence '\\{ch}'")]
    InvalidEscape { ch: char, span: Span },

    #[error("invalid number: {detail}")]
    InvalidNumber { span: Span, detail: String },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidEscape { span, .. }
            | LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of structural errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    ExpectedToken,
    UnexpectedToken,
    UnexpectedEof,
    ExpectedExpression,
    ExpectedIdentifier,
    ExpectedType,
    ExpectedStatement,
    InvalidLiteral,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::ExpectedStatement => "expected statement",
            ParseErrorKind::InvalidLiteral => "invalid literal",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural syntax error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("expected {expected}, found {found}"),
        )
    }

    pub fn unexpected_token(span: Span, token: &str) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedToken,
            span,
            format!("unexpected token: {token}"),
        )
    }

    pub fn unexpected_eof(span: Span) -> Self {
        Self::new(ParseErrorKind::UnexpectedEof, span, "unexpected end of file")
    }

    pub fn expected_identifier(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedIdentifier,
            span,
            format!("expected identifier, found {found}"),
        )
    }

    pub fn expected_expression(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedExpression,
            span,
            format!("expected expression, found {found}"),
        )
    }

    pub fn expected_type(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedType,
            span,
            format!("expected type, found {found}"),
        )
    }
}

// ============================================================================
// Semantic Errors
// ============================================================================

/// Type, scope and overload errors found while analyzing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    #[error("unknown type '{name}'")]
    UnknownType { name: String, span: Span },

    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String, span: Span },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, span: Span },

    #[error("no matching overload for '{name}({args})'")]
    NoMatchingOverload {
        name: String,
        args: String,
        span: Span,
    },

    #[error("cannot assign '{source_type}' to '{target}'")]
    TypeMismatch {
        target: DataType,
        source_type: DataType,
        span: Span,
    },

    #[error("no operator '{op}' for types '{left}' and '{right}'")]
    InvalidOperands {
        op: &'static str,
        left: DataType,
        right: DataType,
        span: Span,
    },

    #[error("no operator '{op}' for type '{operand}'")]
    InvalidUnaryOperand {
        op: &'static str,
        operand: DataType,
        span: Span,
    },

    #[error("'{name}' redeclared (originally declared at {original})")]
    Redeclaration {
        name: String,
        original: Span,
        span: Span,
    },

    #[error("variable '{name}' is read before it is initialized")]
    UninitializedRead { name: String, span: Span },

    #[error("cannot assign to constant '{name}'")]
    AssignToConstant { name: String, span: Span },

    #[error("expression is not assignable")]
    NotAssignable { span: Span },

    #[error("type '{type_name}' has no field '{field}'")]
    UnknownField {
        type_name: String,
        field: String,
        span: Span,
    },

    #[error("enum '{enum_name}' has no variant '{variant}'")]
    UnknownVariant {
        enum_name: String,
        variant: String,
        span: Span,
    },

    #[error("'{keyword}' outside of a loop")]
    OutsideLoop { keyword: &'static str, span: Span },

    #[error("'return' outside of a function")]
    ReturnOutsideFunction { span: Span },

    #[error("{what} may only be declared at top level")]
    NestedDefinition { what: &'static str, span: Span },

    #[error("more than 255 variables in one scope")]
    TooManyLocals { span: Span },

    #[error("cannot infer a complete type, found '{found}'")]
    IncompleteType { found: DataType, span: Span },

    #[error("{message}")]
    Other { message: String, span: Span },
}

impl SemanticError {
    pub fn span(&self) -> Span {
        match self {
            SemanticError::UnknownType { span, .. }
            | SemanticError::UnknownVariable { span, .. }
            | SemanticError::UnknownFunction { span, .. }
            | SemanticError::NoMatchingOverload { span, .. }
            | SemanticError::TypeMismatch { span, .. }
            | SemanticError::InvalidOperands { span, .. }
            | SemanticError::InvalidUnaryOperand { span, .. }
            | SemanticError::Redeclaration { span, .. }
            | SemanticError::UninitializedRead { span, .. }
            | SemanticError::AssignToConstant { span, .. }
            | SemanticError::NotAssignable { span }
            | SemanticError::UnknownField { span, .. }
            | SemanticError::UnknownVariant { span, .. }
            | SemanticError::OutsideLoop { span, .. }
            | SemanticError::ReturnOutsideFunction { span }
            | SemanticError::NestedDefinition { span, .. }
            | SemanticError::TooManyLocals { span }
            | SemanticError::IncompleteType { span, .. }
            | SemanticError::Other { span, .. } => *span,
        }
    }

    pub fn other(span: Span, message: impl Into<String>) -> Self {
        SemanticError::Other {
            message: message.into(),
            span,
        }
    }
}

/// The cumulative error count passed the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("too many errors (more than {limit}), aborting")]
pub struct TooManyErrors {
    pub limit: usize,
}

// ============================================================================
// Code Generation Errors
// ============================================================================

/// Which constant pool an index belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    String,
    Int,
    Float,
}

impl std::fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConstantKind::String => "string",
            ConstantKind::Int => "int",
            ConstantKind::Float => "float",
        })
    }
}

/// Fatal generator failures. These signal a broken invariant or a program
/// too large for the instruction encoding, never an authoring mistake the
/// analyzer would have reported.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodeGenError {
    #[error("line {line}: node '{kind}' cannot be lowered here")]
    UnhandledNode { kind: &'static str, line: u32 },

    #[error("more than 65,536 distinct {kind} constants (index beyond 65,535)")]
    ConstantPoolOverflow { kind: ConstantKind },

    #[error("jump distance {distance} exceeds 65535 instructions")]
    JumpOutOfRange { distance: usize },

    #[error("more than 65535 functions")]
    TooManyFunctions,

    #[error("internal error: {message}")]
    Internal { message: String },
}

// ============================================================================
// Binary Format Errors
// ============================================================================

/// A binary module could not be decoded or encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BinaryFormatError {
    #[error("bad magic number")]
    BadMagic,

    #[error("unsupported module version {major}.{minor}.{patch}")]
    UnsupportedVersion { major: u8, minor: u8, patch: u8 },

    #[error("module truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("missing segment '{tag}'")]
    MissingSegment { tag: &'static str },

    #[error("unknown opcode 0x{byte:02X} at byte {offset}")]
    UnknownOpcode { byte: u8, offset: usize },

    #[error("malformed function table")]
    MalformedFunctionTable,

    #[error("string constant contains a NUL byte")]
    EmbeddedNul,

    #[error("segment of {len} bytes does not fit a 3-byte length")]
    SegmentTooLarge { len: usize },

    #[error("string constant is not valid UTF-8")]
    InvalidUtf8,

    #[error("first line {line} does not fit the metadata byte")]
    FirstLineOutOfRange { line: u32 },
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Categories of fatal runtime faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    #[error("stack overflow")]
    StackOverflow,

    #[error("maximum call depth exceeded")]
    CallDepthExceeded,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("unwrapped a none value")]
    UnwrapNone,

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("unknown function {index}")]
    UnknownFunction { index: u16 },

    #[error("unknown builtin {id}")]
    UnknownBuiltin { id: u16 },

    #[error("invalid jump target")]
    InvalidJump,

    #[error("slot {slot} is not allocated")]
    InvalidSlot { slot: u16 },

    #[error("i/o error: {message}")]
    Io { message: String },
}

/// A fatal runtime fault tagged with the source line being executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("runtime error at line {line}: {kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: u32,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, line: u32) -> Self {
        Self { kind, line }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_error_span() {
        let span = Span::new(4, 2, 3);
        let err = SemanticError::UnknownVariable {
            name: "x".into(),
            span,
        };
        assert_eq!(err.span(), span);
        assert_eq!(err.to_string(), "unknown variable 'x'");
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::expected_token(Span::new(1, 1, 1), "')'", "'{'");
        assert_eq!(err.to_string(), "expected token: expected ')', found '{'");
    }

    #[test]
    fn runtime_error_carries_line() {
        let err = RuntimeError::new(RuntimeErrorKind::DivisionByZero, 12);
        assert_eq!(err.to_string(), "runtime error at line 12: division by zero");
    }

    #[test]
    fn pool_overflow_names_the_index_limit() {
        let err = CodeGenError::ConstantPoolOverflow {
            kind: ConstantKind::Int,
        };
        assert!(err.to_string().starts_with("more than 65,536 distinct "));
        assert!(err.to_string().ends_with("(index beyond 65,535)"));
    }

    #[test]
    fn type_mismatch_formats_types() {
        let err = SemanticError::TypeMismatch {
            target: DataType::Int,
            source_type: DataType::String,
            span: Span::default(),
        };
        assert_eq!(err.to_string(), "cannot assign 'string' to 'int'");
    }
}
