//! Statement nodes, function definitions and the analyzed script.

use neco_core::{DataType, Span};

use super::constants::ConstantHarvest;
use super::expr::Expr;

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// A braced block. `scoped` is set when the block declares variables and
/// therefore needs its own runtime scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub scoped: bool,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, scoped: bool) -> Self {
        Self { stmts, scoped }
    }
}

/// Assignment destination.
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    Variable(super::expr::Storage),
    Field { object: Expr, index: u8 },
    Index { target: Expr, index: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for its side effects; the result is discarded.
    Expr(Expr),
    /// Declaration into a slot of the current frame.
    VarDecl {
        name: String,
        slot: u8,
        ty: DataType,
        init: Option<Expr>,
    },
    Assign {
        place: Place,
        value: Expr,
    },
    Block(Block),
    /// Ordered `(condition, body)` pairs plus an optional else body.
    If {
        branches: Vec<(Expr, Block)>,
        otherwise: Option<Block>,
    },
    /// Infinite loop. `step` runs after the body and on `continue`.
    Loop {
        body: Block,
        step: Option<Box<Stmt>>,
    },
    Break,
    Continue,
    Return(Expr),
    Match {
        scrutinee: Expr,
        arms: Vec<(Expr, Block)>,
        default: Option<Block>,
    },
    Exit(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: DataType,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: DataType,
    pub body: Block,
    pub span: Span,
}

/// The analyzer's output: top-level statements, function bodies indexed by
/// call-table index, and the literals the generator will pool.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub body: Vec<Stmt>,
    pub functions: Vec<Function>,
    pub constants: ConstantHarvest,
    /// Line of the first token; every instruction stream starts counting here.
    pub first_line: u32,
}
