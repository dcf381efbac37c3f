//! Built-in functions, dispatched by their numeric id.
//!
//! Each built-in pops its arguments (the last argument is on top) and
//! pushes exactly one result, `none` for the procedures.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use neco_core::{BuiltinId, RuntimeErrorKind};

use super::value::Value;
use super::vm::Vm;

type Result<T> = std::result::Result<T, RuntimeErrorKind>;

// ============================================================================
// Random Number Generation
// ============================================================================

const LCG_MULTIPLIER: u64 = 6364136223846793005;
const LCG_INCREMENT: u64 = 1442695040888963407;

/// 64-bit linear congruential generator.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Seeded from the clock when `seed` is `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let state = seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |elapsed| elapsed.as_nanos() as u64)
        });
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        // The high bits of an LCG are the better distributed ones.
        self.state.rotate_left(32)
    }

    /// Uniform in `lo..=hi`; the bounds may come in either order.
    pub fn range(&mut self, lo: i64, hi: i64) -> i64 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let span = (i128::from(hi) - i128::from(lo) + 1) as u128;
        let offset = u128::from(self.next_u64()) % span;
        (i128::from(lo) + offset as i128) as i64
    }

    /// Uniform in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

// ============================================================================
// Dispatch
// ============================================================================

impl Vm {
    pub(super) fn call_builtin(&mut self, id: u16) -> Result<()> {
        let builtin = u8::try_from(id)
            .ok()
            .and_then(|byte| BuiltinId::try_from(byte).ok())
            .ok_or(RuntimeErrorKind::UnknownBuiltin { id })?;
        let result = match builtin {
            BuiltinId::Print => {
                let value = self.pop()?;
                self.write_output(&value.to_string())?;
                Value::None
            }
            BuiltinId::PrintLine => {
                let value = self.pop()?;
                self.write_output(&format!("{value}\n"))?;
                Value::None
            }
            BuiltinId::PrintNewline => {
                self.write_output("\n")?;
                Value::None
            }
            BuiltinId::Str => Value::string(self.pop()?.to_string()),
            BuiltinId::Float => Value::Float(self.pop()?.as_float()?),
            BuiltinId::Int => Value::Int(self.pop()?.as_float()? as i64),
            BuiltinId::ParseInt => {
                let text = self.pop()?;
                text.as_str()?
                    .trim()
                    .parse::<i64>()
                    .map_or(Value::None, Value::Int)
            }
            BuiltinId::ParseFloat => {
                let text = self.pop()?;
                text.as_str()?
                    .trim()
                    .parse::<f64>()
                    .map_or(Value::None, Value::Float)
            }
            BuiltinId::Round => Value::Int(self.pop()?.as_float()?.round() as i64),
            BuiltinId::Floor => Value::Int(self.pop()?.as_float()?.floor() as i64),
            BuiltinId::Ceil => Value::Int(self.pop()?.as_float()?.ceil() as i64),
            BuiltinId::ToUpper => Value::string(self.pop()?.as_str()?.to_uppercase()),
            BuiltinId::ToLower => Value::string(self.pop()?.as_str()?.to_lowercase()),
            BuiltinId::Len => {
                let value = self.pop()?;
                let len = match &value {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.borrow().len(),
                    Value::Set(set) => set.borrow().len(),
                    other => {
                        return Err(RuntimeErrorKind::TypeMismatch {
                            expected: "string or collection",
                            actual: other.type_name(),
                        });
                    }
                };
                Value::Int(len as i64)
            }
            BuiltinId::Random => {
                let hi = self.pop()?.as_int()?;
                let lo = self.pop()?.as_int()?;
                Value::Int(self.rng.range(lo, hi))
            }
            BuiltinId::RandomFloat => Value::Float(self.rng.unit()),
            BuiltinId::Read => Value::string(self.read_line()?),
            BuiltinId::Append => {
                let item = self.pop()?;
                let list = self.pop()?;
                list.as_list()?.borrow_mut().push(item);
                Value::None
            }
            BuiltinId::Add => {
                let item = self.pop()?;
                let set = self.pop()?;
                set.as_set()?.borrow_mut().insert(item.to_key()?);
                Value::None
            }
            BuiltinId::RemoveAt => {
                let index = self.pop()?.as_int()?;
                let list = self.pop()?;
                let mut items = list.as_list()?.borrow_mut();
                let at = checked_index(index, items.len())?;
                items.remove(at)
            }
            BuiltinId::Abs => match self.pop()? {
                Value::Int(v) => Value::Int(v.wrapping_abs()),
                Value::Float(v) => Value::Float(v.abs()),
                other => {
                    return Err(RuntimeErrorKind::TypeMismatch {
                        expected: "number",
                        actual: other.type_name(),
                    });
                }
            },
        };
        self.push(result)
    }
}

/// `index` as a position in a sequence of `len` elements.
pub(super) fn checked_index(index: i64, len: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(RuntimeErrorKind::IndexOutOfBounds { index, len })
}

/// One-character string at `index`.
pub(super) fn char_at(s: &Rc<str>, index: i64) -> Result<Value> {
    let len = s.chars().count();
    let at = checked_index(index, len)?;
    Ok(s.chars()
        .nth(at)
        .map_or(Value::None, |c| Value::string(c.to_string())))
}
