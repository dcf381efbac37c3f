//! Result types of operators.

use neco_core::DataType;

use crate::ast::{BinaryOp, UnaryOp};

/// Type of `left op right`, or `None` when the operator does not apply.
///
/// An `Unknown` operand yields `Unknown` without an error so that one
/// mistake does not cascade.
pub fn binary_result(op: BinaryOp, left: &DataType, right: &DataType) -> Option<DataType> {
    if left.is_unknown() || right.is_unknown() {
        return Some(DataType::Unknown);
    }
    match op {
        BinaryOp::Add if *left == DataType::String && *right == DataType::String => {
            Some(DataType::String)
        }
        _ if op.is_arithmetic() => match (left, right) {
            (DataType::Int, DataType::Int) => Some(DataType::Int),
            (l, r) if l.is_numeric() && r.is_numeric() => Some(DataType::Float),
            _ => None,
        },
        _ if op.is_comparison() => {
            let numeric = left.is_numeric() && right.is_numeric();
            let strings = *left == DataType::String && *right == DataType::String;
            (numeric || strings).then_some(DataType::Bool)
        }
        _ if op.is_equality() => {
            let comparable = (left.is_numeric() && right.is_numeric())
                || left.can_be_assigned(right)
                || right.can_be_assigned(left);
            comparable.then_some(DataType::Bool)
        }
        _ if op.is_logical() => {
            (*left == DataType::Bool && *right == DataType::Bool).then_some(DataType::Bool)
        }
        BinaryOp::In => {
            let ok = match right {
                DataType::List(e) | DataType::Set(e) => {
                    e.is_unknown() || e.can_be_assigned(left) || left.can_be_assigned(e)
                }
                DataType::String => *left == DataType::String,
                _ => false,
            };
            ok.then_some(DataType::Bool)
        }
        _ => None,
    }
}

pub fn unary_result(op: UnaryOp, operand: &DataType) -> Option<DataType> {
    match (op, operand) {
        (_, DataType::Unknown) => Some(DataType::Unknown),
        (UnaryOp::Neg, t) if t.is_numeric() => Some(t.clone()),
        (UnaryOp::Not, DataType::Bool) => Some(DataType::Bool),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_promotes_to_float() {
        assert_eq!(binary_result(BinaryOp::Add, &DataType::Int, &DataType::Int), Some(DataType::Int));
        assert_eq!(
            binary_result(BinaryOp::Mul, &DataType::Int, &DataType::Float),
            Some(DataType::Float)
        );
        assert_eq!(binary_result(BinaryOp::Sub, &DataType::String, &DataType::String), None);
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(
            binary_result(BinaryOp::Add, &DataType::String, &DataType::String),
            Some(DataType::String)
        );
        assert_eq!(binary_result(BinaryOp::Add, &DataType::String, &DataType::Int), None);
    }

    #[test]
    fn equality_with_none() {
        let opt = DataType::option(DataType::Int);
        assert_eq!(binary_result(BinaryOp::Equal, &opt, &DataType::None), Some(DataType::Bool));
        assert_eq!(binary_result(BinaryOp::Equal, &DataType::Int, &DataType::String), None);
    }

    #[test]
    fn membership() {
        let ints = DataType::list(DataType::Int);
        assert_eq!(binary_result(BinaryOp::In, &DataType::Int, &ints), Some(DataType::Bool));
        assert_eq!(binary_result(BinaryOp::In, &DataType::String, &ints), None);
        assert_eq!(
            binary_result(BinaryOp::In, &DataType::String, &DataType::String),
            Some(DataType::Bool)
        );
    }

    #[test]
    fn unknown_operands_do_not_cascade() {
        assert_eq!(
            binary_result(BinaryOp::And, &DataType::Unknown, &DataType::Int),
            Some(DataType::Unknown)
        );
        assert_eq!(unary_result(UnaryOp::Not, &DataType::Unknown), Some(DataType::Unknown));
    }

    #[test]
    fn logical_needs_bools() {
        assert_eq!(binary_result(BinaryOp::Or, &DataType::Int, &DataType::Bool), None);
        assert_eq!(unary_result(UnaryOp::Neg, &DataType::Bool), None);
    }
}
