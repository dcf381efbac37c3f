//! Literal harvesting with reference counts.
//!
//! The analyzer retains every literal it builds and releases the operands
//! of folded expressions, so at the end the harvest holds exactly the
//! literals the generator will reference. The counts size the pools.

use rustc_hash::FxHashMap;

use super::expr::Literal;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantHarvest {
    strings: FxHashMap<String, u32>,
    ints: FxHashMap<i64, u32>,
    floats: FxHashMap<u64, u32>,
}

impl ConstantHarvest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retain(&mut self, lit: &Literal) {
        match lit {
            Literal::Str(s) => *self.strings.entry(s.clone()).or_default() += 1,
            Literal::Int(v) => *self.ints.entry(*v).or_default() += 1,
            Literal::Float(v) => *self.floats.entry(v.to_bits()).or_default() += 1,
            Literal::Bool(_) | Literal::None => {}
        }
    }

    pub fn release(&mut self, lit: &Literal) {
        fn dec<K: std::hash::Hash + Eq>(map: &mut FxHashMap<K, u32>, key: &K) {
            if let Some(count) = map.get_mut(key) {
                *count -= 1;
                if *count == 0 {
                    map.remove(key);
                }
            }
        }
        match lit {
            Literal::Str(s) => dec(&mut self.strings, s),
            Literal::Int(v) => dec(&mut self.ints, v),
            Literal::Float(v) => dec(&mut self.floats, &v.to_bits()),
            Literal::Bool(_) | Literal::None => {}
        }
    }

    /// References held to a literal.
    pub fn count(&self, lit: &Literal) -> u32 {
        match lit {
            Literal::Str(s) => self.strings.get(s).copied().unwrap_or(0),
            Literal::Int(v) => self.ints.get(v).copied().unwrap_or(0),
            Literal::Float(v) => self.floats.get(&v.to_bits()).copied().unwrap_or(0),
            Literal::Bool(_) | Literal::None => 0,
        }
    }

    /// Distinct strings, ints and floats currently retained.
    pub fn distinct(&self) -> (usize, usize, usize) {
        (self.strings.len(), self.ints.len(), self.floats.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_drops_unreferenced_values() {
        let mut harvest = ConstantHarvest::new();
        harvest.retain(&Literal::Int(2));
        harvest.retain(&Literal::Int(3));
        harvest.retain(&Literal::Int(2));
        harvest.release(&Literal::Int(3));
        assert_eq!(harvest.count(&Literal::Int(2)), 2);
        assert_eq!(harvest.count(&Literal::Int(3)), 0);
        assert_eq!(harvest.distinct(), (0, 1, 0));
    }

    #[test]
    fn bools_are_not_pooled() {
        let mut harvest = ConstantHarvest::new();
        harvest.retain(&Literal::Bool(true));
        assert_eq!(harvest.distinct(), (0, 0, 0));
    }
}
