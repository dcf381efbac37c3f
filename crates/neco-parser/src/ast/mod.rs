//! Typed abstract syntax tree produced by the analyzer.
//!
//! The node set is closed: expressions are [`ExprKind`] variants and
//! statements are [`StmtKind`] variants, so the generator's matches are
//! checked for exhaustiveness.

mod constants;
mod expr;
mod ops;
mod stmt;

pub use constants::ConstantHarvest;
pub use expr::{Expr, ExprKind, Literal, MatchExpr, Storage};
pub use ops::{BinaryOp, Precedence, UnaryOp};
pub use stmt::{Block, Function, Param, Place, Script, Stmt, StmtKind};
