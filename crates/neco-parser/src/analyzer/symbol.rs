//! Symbol table entries.

use bitflags::bitflags;
use neco_core::{BuiltinId, DataType, Span};
use rustc_hash::FxHashMap;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VarFlags: u8 {
        const INITIALIZED = 1 << 0;
        const CONSTANT = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableSymbol {
    pub data_type: DataType,
    pub slot: u8,
    pub flags: VarFlags,
    pub span: Span,
}

impl VariableSymbol {
    pub fn is_initialized(&self) -> bool {
        self.flags.contains(VarFlags::INITIALIZED)
    }

    pub fn is_constant(&self) -> bool {
        self.flags.contains(VarFlags::CONSTANT)
    }
}

/// What a resolved call lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTarget {
    /// Index into the script's function table.
    User(u16),
    Builtin(BuiltinId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSymbol {
    pub params: Vec<DataType>,
    pub return_type: DataType,
    pub target: CallTarget,
    pub span: Span,
}

/// All overloads sharing one name, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionBucket {
    overloads: Vec<FunctionSymbol>,
    by_signature: FxHashMap<Vec<DataType>, usize>,
}

impl FunctionBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an overload. Fails with the existing overload's span when the
    /// exact parameter list is already taken.
    pub fn insert(&mut self, symbol: FunctionSymbol) -> Result<(), Span> {
        if let Some(&existing) = self.by_signature.get(&symbol.params) {
            return Err(self.overloads[existing].span);
        }
        self.by_signature
            .insert(symbol.params.clone(), self.overloads.len());
        self.overloads.push(symbol);
        Ok(())
    }

    pub fn overloads(&self) -> &[FunctionSymbol] {
        &self.overloads
    }

    pub fn len(&self) -> usize {
        self.overloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overloads.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructSymbol {
    pub fields: Vec<(String, DataType)>,
    pub span: Span,
}

impl StructSymbol {
    pub fn field(&self, name: &str) -> Option<(u8, &DataType)> {
        self.fields
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| (i as u8, &self.fields[i].1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSymbol {
    pub variants: Vec<String>,
    pub span: Span,
}

impl EnumSymbol {
    pub fn ordinal(&self, variant: &str) -> Option<u32> {
        self.variants
            .iter()
            .position(|v| v == variant)
            .map(|i| i as u32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Variable(VariableSymbol),
    Functions(FunctionBucket),
    Struct(StructSymbol),
    Enum(EnumSymbol),
}

impl Symbol {
    pub fn span(&self) -> Span {
        match self {
            Symbol::Variable(v) => v.span,
            Symbol::Functions(b) => b.overloads().first().map(|f| f.span).unwrap_or_default(),
            Symbol::Struct(s) => s.span,
            Symbol::Enum(e) => e.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(params: Vec<DataType>, index: u16) -> FunctionSymbol {
        FunctionSymbol {
            params,
            return_type: DataType::None,
            target: CallTarget::User(index),
            span: Span::point(index as u32 + 1, 1),
        }
    }

    #[test]
    fn duplicate_signature_is_rejected() {
        let mut bucket = FunctionBucket::new();
        assert!(bucket.insert(user(vec![DataType::Int], 0)).is_ok());
        assert!(bucket.insert(user(vec![DataType::Float], 1)).is_ok());
        assert_eq!(
            bucket.insert(user(vec![DataType::Int], 2)),
            Err(Span::point(1, 1))
        );
        assert_eq!(bucket.len(), 2);
    }

    #[test]
    fn overloads_keep_declaration_order() {
        let mut bucket = FunctionBucket::new();
        bucket.insert(user(vec![DataType::Any], 0)).unwrap();
        bucket.insert(user(vec![DataType::Int], 1)).unwrap();
        let targets: Vec<_> = bucket.overloads().iter().map(|f| f.target).collect();
        assert_eq!(targets, [CallTarget::User(0), CallTarget::User(1)]);
    }

    #[test]
    fn struct_fields_by_index() {
        let point = StructSymbol {
            fields: vec![("x".into(), DataType::Int), ("y".into(), DataType::Float)],
            span: Span::default(),
        };
        assert_eq!(point.field("y"), Some((1, &DataType::Float)));
        assert_eq!(point.field("z"), None);
    }
}
