//! Built-in function signatures.
//!
//! Built-ins live in ordinary overload buckets in the global scope, so user
//! functions may add overloads next to them. The collection built-ins are
//! generic over the element type; their buckets accept `List<any>` /
//! `Set<any>` and [`refine_generic`] then checks and completes the element.

use neco_core::{BuiltinId, DataType, SemanticError, Span};

use super::scope::ScopeStack;
use super::symbol::{CallTarget, FunctionBucket, FunctionSymbol, Symbol};

fn signatures() -> Vec<(BuiltinId, Vec<DataType>, DataType)> {
    use DataType as T;
    let printable = [T::String, T::Int, T::Float, T::Bool, T::Any];
    let mut sigs = Vec::new();
    for ty in &printable {
        sigs.push((BuiltinId::Print, vec![ty.clone()], T::None));
    }
    for ty in &printable {
        sigs.push((BuiltinId::PrintLine, vec![ty.clone()], T::None));
    }
    sigs.push((BuiltinId::PrintNewline, vec![], T::None));
    for ty in &printable {
        sigs.push((BuiltinId::Str, vec![ty.clone()], T::String));
    }
    sigs.extend([
        (BuiltinId::Float, vec![T::Int], T::Float),
        (BuiltinId::Int, vec![T::Float], T::Int),
        (BuiltinId::ParseInt, vec![T::String], T::option(T::Int)),
        (BuiltinId::ParseFloat, vec![T::String], T::option(T::Float)),
        (BuiltinId::Round, vec![T::Float], T::Int),
        (BuiltinId::Floor, vec![T::Float], T::Int),
        (BuiltinId::Ceil, vec![T::Float], T::Int),
        (BuiltinId::ToUpper, vec![T::String], T::String),
        (BuiltinId::ToLower, vec![T::String], T::String),
        (BuiltinId::Len, vec![T::String], T::Int),
        (BuiltinId::Len, vec![T::list(T::Any)], T::Int),
        (BuiltinId::Len, vec![T::set(T::Any)], T::Int),
        (BuiltinId::Random, vec![T::Int, T::Int], T::Int),
        (BuiltinId::RandomFloat, vec![], T::Float),
        (BuiltinId::Read, vec![], T::String),
        (BuiltinId::Append, vec![T::list(T::Any), T::Any], T::None),
        (BuiltinId::Add, vec![T::set(T::Any), T::Any], T::None),
        (BuiltinId::RemoveAt, vec![T::list(T::Any), T::Int], T::Any),
        (BuiltinId::Abs, vec![T::Int], T::Int),
        (BuiltinId::Abs, vec![T::Float], T::Float),
    ]);
    sigs
}

/// Register every built-in overload in the global scope.
pub fn register(scopes: &mut ScopeStack) -> Result<(), SemanticError> {
    let mut order: Vec<&'static str> = Vec::new();
    let mut buckets: Vec<FunctionBucket> = Vec::new();
    for (id, params, return_type) in signatures() {
        let name = id.name();
        let index = match order.iter().position(|n| *n == name) {
            Some(i) => i,
            None => {
                order.push(name);
                buckets.push(FunctionBucket::new());
                buckets.len() - 1
            }
        };
        buckets[index]
            .insert(FunctionSymbol {
                params,
                return_type,
                target: CallTarget::Builtin(id),
                span: Span::default(),
            })
            .map_err(|_| SemanticError::other(Span::default(), format!("duplicate builtin '{name}'")))?;
    }
    for (name, bucket) in order.into_iter().zip(buckets) {
        scopes.define_global(name, Symbol::Functions(bucket))?;
    }
    Ok(())
}

/// Outcome of checking a generic collection built-in.
#[derive(Debug, Clone, PartialEq)]
pub struct Refined {
    pub return_type: DataType,
    /// The container's completed type, when the call supplied a missing
    /// element type.
    pub completed: Option<DataType>,
}

/// Check the element argument of `append`/`add`/`removeAt` against the
/// container and derive the real return type.
pub fn refine_generic(
    builtin: BuiltinId,
    arg_types: &[DataType],
    return_type: DataType,
    span: Span,
) -> Result<Refined, SemanticError> {
    let container = match (builtin, arg_types.first()) {
        (BuiltinId::Append | BuiltinId::Add | BuiltinId::RemoveAt, Some(c)) => c,
        _ => {
            return Ok(Refined {
                return_type,
                completed: None,
            });
        }
    };
    let element = container.element().cloned().unwrap_or_default();

    if builtin == BuiltinId::RemoveAt {
        if element.is_unknown() {
            return Err(SemanticError::IncompleteType {
                found: container.clone(),
                span,
            });
        }
        return Ok(Refined {
            return_type: element,
            completed: None,
        });
    }

    let value = arg_types.get(1).cloned().unwrap_or_default();
    if builtin == BuiltinId::Add && !value.is_hashable() && !value.is_unknown() {
        return Err(SemanticError::other(
            span,
            format!("'{value}' values cannot be stored in a set"),
        ));
    }
    if element.is_complete() {
        if !element.can_be_assigned(&value) {
            return Err(SemanticError::TypeMismatch {
                target: element,
                source_type: value,
                span,
            });
        }
        return Ok(Refined {
            return_type,
            completed: None,
        });
    }

    let mut completed = container.clone();
    let wrapper = match container {
        DataType::Set(_) => DataType::set(value),
        _ => DataType::list(value),
    };
    completed.try_complete_from(&wrapper);
    Ok(Refined {
        return_type,
        completed: Some(completed),
    })
}
