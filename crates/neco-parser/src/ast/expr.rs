//! Typed expression nodes.
//!
//! Every [`Expr`] carries the [`DataType`] the analyzer derived for it when
//! the node was built. Nodes own their children; nothing is shared.

use neco_core::{BuiltinId, DataType, Span};

use super::ops::{BinaryOp, UnaryOp};

/// Where a variable lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// Slot in the current frame's table.
    Local(u8),
    /// Slot in the globals table, read from inside a function.
    Global(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    None,
}

impl Literal {
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Int(_) => DataType::Int,
            Literal::Float(_) => DataType::Float,
            Literal::Bool(_) => DataType::Bool,
            Literal::Str(_) => DataType::String,
            Literal::None => DataType::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: DataType,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Variable {
        name: String,
        storage: Storage,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `value ?? default`
    Unwrap {
        value: Box<Expr>,
        default: Box<Expr>,
    },
    /// `condition ? then : otherwise`
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Call of a user function by table index.
    Call {
        function: u16,
        args: Vec<Expr>,
    },
    BuiltinCall {
        builtin: BuiltinId,
        args: Vec<Expr>,
    },
    /// Struct field read by declaration index.
    Field {
        object: Box<Expr>,
        index: u8,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    /// Field values in declaration order.
    StructLiteral {
        name: String,
        fields: Vec<Expr>,
    },
    /// An enum variant, by ordinal.
    EnumVariant {
        name: String,
        ordinal: u32,
    },
    List(Vec<Expr>),
    Set(Vec<Expr>),
    Match(Box<MatchExpr>),
}

/// `match (scrutinee) { v => e, ..., default => e }` in expression position.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpr {
    pub scrutinee: Expr,
    pub arms: Vec<(Expr, Expr)>,
    pub default: Expr,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: DataType, span: Span) -> Self {
        Self { kind, ty, span }
    }

    pub fn literal(lit: Literal, span: Span) -> Self {
        let ty = lit.data_type();
        Self::new(ExprKind::Literal(lit), ty, span)
    }

    /// An error placeholder. Its `Unknown` type keeps one mistake from
    /// producing a chain of follow-up errors.
    pub fn error(span: Span) -> Self {
        Self::new(ExprKind::Literal(Literal::None), DataType::Unknown, span)
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            ExprKind::Literal(lit) if !self.ty.is_unknown() => Some(lit),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        self.as_literal().is_some()
    }

    /// Visit every literal in this expression tree, outermost first.
    pub fn for_each_literal(&self, f: &mut impl FnMut(&Literal)) {
        match &self.kind {
            ExprKind::Literal(lit) => f(lit),
            ExprKind::Variable { .. } | ExprKind::EnumVariant { .. } => {}
            ExprKind::Binary { left, right, .. } => {
                left.for_each_literal(f);
                right.for_each_literal(f);
            }
            ExprKind::Unary { operand, .. } => operand.for_each_literal(f),
            ExprKind::Unwrap { value, default } => {
                value.for_each_literal(f);
                default.for_each_literal(f);
            }
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                condition.for_each_literal(f);
                then.for_each_literal(f);
                otherwise.for_each_literal(f);
            }
            ExprKind::Call { args, .. } | ExprKind::BuiltinCall { args, .. } => {
                args.iter().for_each(|a| a.for_each_literal(f));
            }
            ExprKind::Field { object, .. } => object.for_each_literal(f),
            ExprKind::Index { target, index } => {
                target.for_each_literal(f);
                index.for_each_literal(f);
            }
            ExprKind::StructLiteral { fields: items, .. }
            | ExprKind::List(items)
            | ExprKind::Set(items) => items.iter().for_each(|e| e.for_each_literal(f)),
            ExprKind::Match(m) => {
                m.scrutinee.for_each_literal(f);
                for (pattern, value) in &m.arms {
                    pattern.for_each_literal(f);
                    value.for_each_literal(f);
                }
                m.default.for_each_literal(f);
            }
        }
    }

    /// Short node name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Literal(_) => "literal",
            ExprKind::Variable { .. } => "variable",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Unwrap { .. } => "unwrap",
            ExprKind::Ternary { .. } => "ternary",
            ExprKind::Call { .. } => "call",
            ExprKind::BuiltinCall { .. } => "builtin call",
            ExprKind::Field { .. } => "field",
            ExprKind::Index { .. } => "index",
            ExprKind::StructLiteral { .. } => "struct literal",
            ExprKind::EnumVariant { .. } => "enum variant",
            ExprKind::List(_) => "list literal",
            ExprKind::Set(_) => "set literal",
            ExprKind::Match(_) => "match",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_nodes_are_not_literals() {
        let span = Span::point(1, 1);
        assert!(!Expr::error(span).is_literal());
        assert!(Expr::literal(Literal::None, span).is_literal());
        assert_eq!(Expr::literal(Literal::Int(3), span).ty, DataType::Int);
    }
}
