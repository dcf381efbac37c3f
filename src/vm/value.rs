//! Runtime values.
//!
//! Scalars are stored inline. Strings are shared immutable text; lists,
//! sets and structs are reference values, so two variables bound to the
//! same list observe each other's writes. Enum values are their ordinals.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use neco_core::RuntimeErrorKind;
use neco_core::arith::format_float;
use ordered_float::OrderedFloat;
use rustc_hash::FxHashSet;

pub type SharedList = Rc<RefCell<Vec<Value>>>;
pub type SharedSet = Rc<RefCell<FxHashSet<SetKey>>>;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(SharedList),
    Set(SharedSet),
    /// Field values in declaration order.
    Struct(SharedList),
}

/// Hashable form of a set member.
///
/// Only scalars can be members; floats hash through [`OrderedFloat`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetKey {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(Rc<str>),
}

impl SetKey {
    pub fn to_value(&self) -> Value {
        match self {
            SetKey::None => Value::None,
            SetKey::Bool(v) => Value::Bool(*v),
            SetKey::Int(v) => Value::Int(*v),
            SetKey::Float(v) => Value::Float(v.0),
            SetKey::Str(v) => Value::Str(Rc::clone(v)),
        }
    }
}

type Result<T> = std::result::Result<T, RuntimeErrorKind>;

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn empty_set() -> Self {
        Value::Set(Rc::new(RefCell::new(FxHashSet::default())))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Struct(_) => "struct",
        }
    }

    fn mismatch(&self, expected: &'static str) -> RuntimeErrorKind {
        match self {
            Value::None => RuntimeErrorKind::UnwrapNone,
            other => RuntimeErrorKind::TypeMismatch {
                expected,
                actual: other.type_name(),
            },
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(other.mismatch("int")),
        }
    }

    /// Ints widen to float.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(other.mismatch("float")),
        }
    }

    pub fn as_str(&self) -> Result<&Rc<str>> {
        match self {
            Value::Str(v) => Ok(v),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_list(&self) -> Result<&SharedList> {
        match self {
            Value::List(v) => Ok(v),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn as_set(&self) -> Result<&SharedSet> {
        match self {
            Value::Set(v) => Ok(v),
            other => Err(other.mismatch("set")),
        }
    }

    pub fn as_struct(&self) -> Result<&SharedList> {
        match self {
            Value::Struct(v) => Ok(v),
            other => Err(other.mismatch("struct")),
        }
    }

    pub fn to_key(&self) -> Result<SetKey> {
        Ok(match self {
            Value::None => SetKey::None,
            Value::Bool(v) => SetKey::Bool(*v),
            Value::Int(v) => SetKey::Int(*v),
            Value::Float(v) => SetKey::Float(OrderedFloat(*v)),
            Value::Str(v) => SetKey::Str(Rc::clone(v)),
            other => {
                return Err(RuntimeErrorKind::TypeMismatch {
                    expected: "set member",
                    actual: other.type_name(),
                });
            }
        })
    }

    /// `==` as scripts see it: numbers compare across int and float,
    /// collections by content, structs by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                matches!((self.as_float(), other.as_float()), (Ok(a), Ok(b)) if a == b)
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || {
                    let (a, b) = (a.borrow(), b.borrow());
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
                }
            }
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Struct(a), Value::Struct(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Ordering for `<`-family operators: numbers and strings.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), _) => {
                let (a, b) = (self.as_float()?, other.as_float()?);
                // NaN compares false under every operator.
                Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
            }
            _ => Err(self.mismatch("number")),
        }
    }

    /// `item in self`.
    pub fn contains(&self, item: &Value) -> Result<bool> {
        match self {
            Value::List(list) => Ok(list.borrow().iter().any(|v| v.equals(item))),
            Value::Set(set) => Ok(set.borrow().contains(&item.to_key()?)),
            Value::Str(s) => Ok(s.contains(&**item.as_str()?)),
            other => Err(other.mismatch("collection")),
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "\"{s}\""),
            other => fmt::Display::fmt(other, f),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt_nested(f)?;
    }
    f.write_str(close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => join(f, "[", &items.borrow(), "]"),
            Value::Set(set) => {
                let set = set.borrow();
                let mut keys: Vec<&SetKey> = set.iter().collect();
                keys.sort();
                let items: Vec<Value> = keys.into_iter().map(SetKey::to_value).collect();
                join(f, "{", &items, "}")
            }
            Value::Struct(fields) => join(f, "(", &fields.borrow(), ")"),
        }
    }
}
