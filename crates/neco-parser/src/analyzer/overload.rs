//! Overload resolution for function calls.
//!
//! ## Algorithm
//!
//! Scan the overloads in declaration order and take the first whose
//! parameter count matches and whose every parameter accepts the
//! corresponding argument (`DataType::can_be_assigned`).
//!
//! There is no ranking and no ambiguity detection: when several overloads
//! accept the arguments the earliest declared one wins, so resolution is
//! deterministic for a fixed declaration order.

use neco_core::{DataType, SemanticError, Span};

use super::symbol::{FunctionBucket, FunctionSymbol};

pub fn resolve_overload<'a>(
    name: &str,
    bucket: &'a FunctionBucket,
    arg_types: &[DataType],
    span: Span,
) -> Result<&'a FunctionSymbol, SemanticError> {
    first_match(bucket, arg_types).ok_or_else(|| SemanticError::NoMatchingOverload {
        name: name.to_string(),
        args: arg_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        span,
    })
}

fn first_match<'a>(bucket: &'a FunctionBucket, arg_types: &[DataType]) -> Option<&'a FunctionSymbol> {
    bucket.overloads().iter().find(|f| {
        f.params.len() == arg_types.len()
            && f.params
                .iter()
                .zip(arg_types)
                .all(|(param, arg)| param.can_be_assigned(arg))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::symbol::CallTarget;

    fn bucket(signatures: &[&[DataType]]) -> FunctionBucket {
        let mut bucket = FunctionBucket::new();
        for (i, params) in signatures.iter().enumerate() {
            bucket
                .insert(FunctionSymbol {
                    params: params.to_vec(),
                    return_type: DataType::None,
                    target: CallTarget::User(i as u16),
                    span: Span::point(i as u32 + 1, 1),
                })
                .unwrap();
        }
        bucket
    }

    fn target(bucket: &FunctionBucket, args: &[DataType]) -> Option<CallTarget> {
        resolve_overload("f", bucket, args, Span::default())
            .ok()
            .map(|f| f.target)
    }

    #[test]
    fn picks_by_argument_type() {
        let b = bucket(&[&[DataType::Int], &[DataType::String]]);
        assert_eq!(target(&b, &[DataType::String]), Some(CallTarget::User(1)));
        assert_eq!(target(&b, &[DataType::Int]), Some(CallTarget::User(0)));
    }

    #[test]
    fn first_declared_match_wins() {
        let b = bucket(&[&[DataType::Any], &[DataType::Int]]);
        assert_eq!(target(&b, &[DataType::Int]), Some(CallTarget::User(0)));
    }

    #[test]
    fn arity_must_match() {
        let b = bucket(&[&[DataType::Int, DataType::Int]]);
        assert_eq!(target(&b, &[DataType::Int]), None);
    }

    #[test]
    fn error_lists_argument_types() {
        let b = bucket(&[&[DataType::Int]]);
        let err = resolve_overload("f", &b, &[DataType::Bool, DataType::Float], Span::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "no matching overload for 'f(bool, float)'");
    }

    #[test]
    fn resolution_is_deterministic() {
        let b = bucket(&[&[DataType::option(DataType::Int)], &[DataType::Int]]);
        let first = target(&b, &[DataType::Int]);
        for _ in 0..10 {
            assert_eq!(target(&b, &[DataType::Int]), first);
        }
        assert_eq!(first, Some(CallTarget::User(0)));
    }
}
