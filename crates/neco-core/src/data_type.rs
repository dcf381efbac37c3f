//! DataType - the recursive type algebra of the language.
//!
//! Every expression, variable, parameter and struct field carries a
//! [`DataType`]. Composite variants (`List`, `Set`, `Option`) own their element
//! type, so a type is a small tree.
//!
//! # Completeness
//!
//! A type is *complete* when no nested element is [`DataType::Unknown`]. An
//! empty literal such as `[]` has type `List<Unknown>`; the element is filled
//! in later from context with [`DataType::try_complete_from`].
//!
//! # Example
//!
//! ```
//! use neco_core::DataType;
//!
//! let mut empty = DataType::list(DataType::Unknown);
//! assert!(!empty.is_complete());
//!
//! assert!(empty.try_complete_from(&DataType::list(DataType::Int)));
//! assert_eq!(empty, DataType::list(DataType::Int));
//! ```

use std::fmt::{self, Display, Formatter};

/// A language type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// Not yet known (placeholder or error recovery).
    #[default]
    Unknown,
    Bool,
    Int,
    Float,
    String,
    /// Accepts any value except `Unknown`.
    Any,
    /// The type of the `none` literal and of procedures without a result.
    None,
    /// An enum, by declared name.
    Enum(String),
    /// A struct instance, by declared name.
    Object(String),
    List(Box<DataType>),
    Set(Box<DataType>),
    Option(Box<DataType>),
}

impl DataType {
    pub fn list(element: DataType) -> Self {
        DataType::List(Box::new(element))
    }

    pub fn set(element: DataType) -> Self {
        DataType::Set(Box::new(element))
    }

    pub fn option(element: DataType) -> Self {
        DataType::Option(Box::new(element))
    }

    /// Element type of a composite, `None` for scalars.
    pub fn element(&self) -> Option<&DataType> {
        match self {
            DataType::List(e) | DataType::Set(e) | DataType::Option(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, DataType::Unknown)
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    /// Primitive scalar types: the ones literals and constant folding deal with.
    #[inline]
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            DataType::Bool | DataType::Int | DataType::Float | DataType::String
        )
    }

    /// Whether values of this type can be members of a runtime set.
    pub fn is_hashable(&self) -> bool {
        self.is_primitive() || matches!(self, DataType::Enum(_) | DataType::Any)
    }

    /// `true` iff neither this type nor any nested element is `Unknown`.
    pub fn is_complete(&self) -> bool {
        match self {
            DataType::Unknown => false,
            DataType::List(e) | DataType::Set(e) | DataType::Option(e) => e.is_complete(),
            _ => true,
        }
    }

    /// Whether a value of type `source` may be stored where `self` is expected.
    ///
    /// - `Unknown` is assignable neither to nor from anything.
    /// - `Any` accepts every other type.
    /// - `Option<T>` accepts `None`, `T`, and any `Option<S>` whose element fits.
    /// - `List`/`Set` require structurally compatible elements; an `Unknown`
    ///   element on the source side is an incomplete literal and fits anything.
    /// - `Object`/`Enum` compare by declared name.
    /// - Primitives require an exact match.
    pub fn can_be_assigned(&self, source: &DataType) -> bool {
        if self.is_unknown() || source.is_unknown() {
            return false;
        }
        match (self, source) {
            (DataType::Any, _) => true,
            (DataType::Option(_), DataType::None) => true,
            (DataType::Option(target), DataType::Option(inner)) => {
                Self::element_fits(target, inner)
            }
            (DataType::Option(target), other) => target.can_be_assigned(other),
            (DataType::List(target), DataType::List(inner))
            | (DataType::Set(target), DataType::Set(inner)) => Self::element_fits(target, inner),
            (DataType::Object(a), DataType::Object(b)) | (DataType::Enum(a), DataType::Enum(b)) => {
                a == b
            }
            (target, source) => target.is_primitive_like() && target == source,
        }
    }

    fn element_fits(target: &DataType, source: &DataType) -> bool {
        source.is_unknown() || target.is_unknown() || target.can_be_assigned(source)
    }

    fn is_primitive_like(&self) -> bool {
        self.is_primitive() || matches!(self, DataType::None)
    }

    /// Fill `Unknown` positions of `self` from the matching positions of
    /// `source`.
    ///
    /// Only structurally matching shapes are completed; a mismatch leaves
    /// `self` untouched at that position. Returns whether `self` is complete
    /// afterwards.
    pub fn try_complete_from(&mut self, source: &DataType) -> bool {
        match (&mut *self, source) {
            (DataType::Unknown, s) if !s.is_unknown() => *self = s.clone(),
            (DataType::List(e), DataType::List(s))
            | (DataType::Set(e), DataType::Set(s))
            | (DataType::Option(e), DataType::Option(s)) => {
                e.try_complete_from(s);
            }
            _ => {}
        }
        self.is_complete()
    }

    /// The type both branches of a conditional can be widened to, if any.
    ///
    /// `none` combined with `T` yields `Option<T>`.
    pub fn common_with(&self, other: &DataType) -> Option<DataType> {
        if self.can_be_assigned(other) {
            return Some(self.clone());
        }
        if other.can_be_assigned(self) {
            return Some(other.clone());
        }
        match (self, other) {
            (DataType::None, t) | (t, DataType::None) if !t.is_unknown() => {
                Some(DataType::option(t.clone()))
            }
            _ => None,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Unknown => write!(f, "?unknown"),
            DataType::Bool => write!(f, "bool"),
            DataType::Int => write!(f, "int"),
            DataType::Float => write!(f, "float"),
            DataType::String => write!(f, "string"),
            DataType::Any => write!(f, "any"),
            DataType::None => write!(f, "none"),
            DataType::Enum(name) | DataType::Object(name) => write!(f, "{name}"),
            DataType::List(e) => write!(f, "List<{e}>"),
            DataType::Set(e) => write!(f, "Set<{e}>"),
            DataType::Option(e) => write!(f, "{e}?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = DataType> {
        prop_oneof![
            Just(DataType::Bool),
            Just(DataType::Int),
            Just(DataType::Float),
            Just(DataType::String),
            Just(DataType::Any),
            Just(DataType::None),
            "[A-Z][a-z]{0,4}".prop_map(DataType::Enum),
            "[A-Z][a-z]{0,4}".prop_map(DataType::Object),
        ]
    }

    fn complete_type() -> impl Strategy<Value = DataType> {
        leaf().prop_recursive(3, 12, 1, |inner| {
            prop_oneof![
                inner.clone().prop_map(DataType::list),
                inner.clone().prop_map(DataType::set),
                inner.prop_map(DataType::option),
            ]
        })
    }

    proptest! {
        #[test]
        fn every_complete_type_accepts_itself(t in complete_type()) {
            prop_assert!(t.is_complete());
            prop_assert!(t.can_be_assigned(&t));
        }

        #[test]
        fn any_accepts_every_complete_type(t in complete_type()) {
            prop_assert!(DataType::Any.can_be_assigned(&t));
        }

        #[test]
        fn unknown_is_never_assignable(t in complete_type()) {
            prop_assert!(!t.can_be_assigned(&DataType::Unknown));
            prop_assert!(!DataType::Unknown.can_be_assigned(&t));
        }
    }

    #[test]
    fn none_fits_every_option() {
        assert!(DataType::option(DataType::Int).can_be_assigned(&DataType::None));
        assert!(DataType::option(DataType::list(DataType::String)).can_be_assigned(&DataType::None));
        assert!(!DataType::Int.can_be_assigned(&DataType::None));
    }

    #[test]
    fn option_accepts_its_element() {
        let opt = DataType::option(DataType::Int);
        assert!(opt.can_be_assigned(&DataType::Int));
        assert!(!opt.can_be_assigned(&DataType::Float));
    }

    #[test]
    fn primitives_need_exact_match() {
        assert!(!DataType::Float.can_be_assigned(&DataType::Int));
        assert!(!DataType::Int.can_be_assigned(&DataType::Bool));
    }

    #[test]
    fn named_types_compare_by_name() {
        let point = DataType::Object("Point".into());
        assert!(point.can_be_assigned(&DataType::Object("Point".into())));
        assert!(!point.can_be_assigned(&DataType::Object("Line".into())));
        assert!(!point.can_be_assigned(&DataType::Enum("Point".into())));
    }

    #[test]
    fn collections_check_elements() {
        let ints = DataType::list(DataType::Int);
        assert!(ints.can_be_assigned(&DataType::list(DataType::Unknown)));
        assert!(!ints.can_be_assigned(&DataType::list(DataType::String)));
        assert!(!ints.can_be_assigned(&DataType::set(DataType::Int)));
        assert!(DataType::list(DataType::Any).can_be_assigned(&ints));
    }

    #[test]
    fn completion_fills_nested_unknowns() {
        let mut t = DataType::list(DataType::set(DataType::Unknown));
        assert!(t.try_complete_from(&DataType::list(DataType::set(DataType::Float))));
        assert_eq!(t, DataType::list(DataType::set(DataType::Float)));
    }

    #[test]
    fn completion_ignores_mismatched_shapes() {
        let mut t = DataType::list(DataType::Unknown);
        assert!(!t.try_complete_from(&DataType::set(DataType::Int)));
        assert_eq!(t, DataType::list(DataType::Unknown));
    }

    #[test]
    fn common_type_of_none_and_value_is_option() {
        assert_eq!(
            DataType::None.common_with(&DataType::Int),
            Some(DataType::option(DataType::Int))
        );
        assert_eq!(DataType::Int.common_with(&DataType::String), None);
    }

    #[test]
    fn display_formats() {
        assert_eq!(DataType::list(DataType::option(DataType::Int)).to_string(), "List<int?>");
        assert_eq!(DataType::Object("Point".into()).to_string(), "Point");
    }
}
