//! Constant folding of literal operands.
//!
//! Only pairs of the same primitive type fold. Division or remainder by a
//! zero literal is left for the VM so the fault is reported at runtime.

use neco_core::arith;

use crate::ast::{BinaryOp, Literal, UnaryOp};

pub fn fold_binary(op: BinaryOp, left: &Literal, right: &Literal) -> Option<Literal> {
    use Literal as L;
    match (left, right) {
        (L::Int(a), L::Int(b)) => fold_ints(op, *a, *b),
        (L::Float(a), L::Float(b)) => fold_floats(op, *a, *b),
        (L::Bool(a), L::Bool(b)) => fold_bools(op, *a, *b),
        (L::Str(a), L::Str(b)) => fold_strings(op, a, b),
        _ => None,
    }
}

pub fn fold_unary(op: UnaryOp, operand: &Literal) -> Option<Literal> {
    match (op, operand) {
        (UnaryOp::Neg, Literal::Int(v)) => Some(Literal::Int(v.wrapping_neg())),
        (UnaryOp::Neg, Literal::Float(v)) => Some(Literal::Float(-v)),
        (UnaryOp::Not, Literal::Bool(v)) => Some(Literal::Bool(!v)),
        _ => None,
    }
}

fn fold_ints(op: BinaryOp, a: i64, b: i64) -> Option<Literal> {
    Some(match op {
        BinaryOp::Add => Literal::Int(a.wrapping_add(b)),
        BinaryOp::Sub => Literal::Int(a.wrapping_sub(b)),
        BinaryOp::Mul => Literal::Int(a.wrapping_mul(b)),
        BinaryOp::Div => Literal::Int(arith::int_div(a, b)?),
        BinaryOp::Mod => Literal::Int(arith::int_rem(a, b)?),
        BinaryOp::Pow => Literal::Int(arith::int_pow(a, b)),
        _ => return compare(op, a.cmp(&b)),
    })
}

fn fold_floats(op: BinaryOp, a: f64, b: f64) -> Option<Literal> {
    Some(match op {
        BinaryOp::Add => Literal::Float(a + b),
        BinaryOp::Sub => Literal::Float(a - b),
        BinaryOp::Mul => Literal::Float(a * b),
        BinaryOp::Div if b != 0.0 => Literal::Float(a / b),
        BinaryOp::Mod if b != 0.0 => Literal::Float(a % b),
        BinaryOp::Pow => Literal::Float(a.powf(b)),
        _ => return compare(op, a.partial_cmp(&b)?),
    })
}

fn fold_bools(op: BinaryOp, a: bool, b: bool) -> Option<Literal> {
    Some(Literal::Bool(match op {
        BinaryOp::And => a && b,
        BinaryOp::Or => a || b,
        BinaryOp::Equal => a == b,
        BinaryOp::NotEqual => a != b,
        _ => return None,
    }))
}

fn fold_strings(op: BinaryOp, a: &str, b: &str) -> Option<Literal> {
    match op {
        BinaryOp::Add => Some(Literal::Str(format!("{a}{b}"))),
        BinaryOp::In => Some(Literal::Bool(b.contains(a))),
        _ => compare(op, a.cmp(b)),
    }
}

fn compare(op: BinaryOp, ord: std::cmp::Ordering) -> Option<Literal> {
    use std::cmp::Ordering::*;
    Some(Literal::Bool(match op {
        BinaryOp::Equal => ord == Equal,
        BinaryOp::NotEqual => ord != Equal,
        BinaryOp::Less => ord == Less,
        BinaryOp::LessEqual => ord != Greater,
        BinaryOp::Greater => ord == Greater,
        BinaryOp::GreaterEqual => ord != Less,
        _ => return None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_arithmetic() {
        assert_eq!(
            fold_binary(BinaryOp::Mul, &Literal::Int(3), &Literal::Int(4)),
            Some(Literal::Int(12))
        );
        assert_eq!(
            fold_binary(BinaryOp::Div, &Literal::Int(7), &Literal::Int(2)),
            Some(Literal::Int(3))
        );
        assert_eq!(
            fold_binary(BinaryOp::Add, &Literal::Int(i64::MAX), &Literal::Int(1)),
            Some(Literal::Int(i64::MIN))
        );
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        assert_eq!(fold_binary(BinaryOp::Div, &Literal::Int(1), &Literal::Int(0)), None);
        assert_eq!(fold_binary(BinaryOp::Mod, &Literal::Int(1), &Literal::Int(0)), None);
        assert_eq!(
            fold_binary(BinaryOp::Div, &Literal::Float(1.0), &Literal::Float(0.0)),
            None
        );
    }

    #[test]
    fn mixed_types_are_not_folded() {
        assert_eq!(
            fold_binary(BinaryOp::Add, &Literal::Int(1), &Literal::Float(1.0)),
            None
        );
    }

    #[test]
    fn comparisons_yield_bools() {
        assert_eq!(
            fold_binary(BinaryOp::LessEqual, &Literal::Float(1.5), &Literal::Float(1.5)),
            Some(Literal::Bool(true))
        );
        assert_eq!(
            fold_binary(BinaryOp::Greater, &Literal::Str("b".into()), &Literal::Str("a".into())),
            Some(Literal::Bool(true))
        );
    }

    #[test]
    fn strings_concatenate() {
        assert_eq!(
            fold_binary(BinaryOp::Add, &Literal::Str("ab".into()), &Literal::Str("cd".into())),
            Some(Literal::Str("abcd".into()))
        );
        assert_eq!(
            fold_binary(BinaryOp::In, &Literal::Str("b".into()), &Literal::Str("abc".into())),
            Some(Literal::Bool(true))
        );
    }

    #[test]
    fn booleans() {
        assert_eq!(
            fold_binary(BinaryOp::And, &Literal::Bool(true), &Literal::Bool(false)),
            Some(Literal::Bool(false))
        );
        assert_eq!(fold_unary(UnaryOp::Not, &Literal::Bool(false)), Some(Literal::Bool(true)));
        assert_eq!(fold_binary(BinaryOp::Add, &Literal::Bool(true), &Literal::Bool(true)), None);
    }

    #[test]
    fn negation() {
        assert_eq!(fold_unary(UnaryOp::Neg, &Literal::Int(5)), Some(Literal::Int(-5)));
        assert_eq!(fold_unary(UnaryOp::Neg, &Literal::Float(0.5)), Some(Literal::Float(-0.5)));
        assert_eq!(fold_unary(UnaryOp::Not, &Literal::Int(1)), None);
    }
}
