//! Constant pools.
//!
//! Strings, ints and floats live in three independent pools, each indexed
//! from 0 and deduplicated on insertion. Values are interned lazily as the
//! generator references them, so a pool holds exactly the distinct values
//! the emitted code loads.

use neco_core::{CodeGenError, ConstantKind};
use rustc_hash::FxHashMap;

/// Largest number of values one pool can index.
pub const MAX_POOL_LEN: usize = u16::MAX as usize + 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    strings: Vec<String>,
    ints: Vec<i64>,
    floats: Vec<f64>,
    string_index: FxHashMap<String, u16>,
    int_index: FxHashMap<i64, u16>,
    /// Keyed by bit pattern so `-0.0`, `0.0` and NaN payloads stay distinct.
    float_index: FxHashMap<u64, u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool with room for the given number of strings, ints and
    /// floats.
    pub fn with_capacity((strings, ints, floats): (usize, usize, usize)) -> Self {
        Self {
            strings: Vec::with_capacity(strings),
            ints: Vec::with_capacity(ints),
            floats: Vec::with_capacity(floats),
            string_index: FxHashMap::with_capacity_and_hasher(strings, Default::default()),
            int_index: FxHashMap::with_capacity_and_hasher(ints, Default::default()),
            float_index: FxHashMap::with_capacity_and_hasher(floats, Default::default()),
        }
    }

    /// Rebuild a pool from decoded value lists.
    ///
    /// Duplicates are kept at their position so indices in decoded code stay
    /// valid; the dedup maps point at the first occurrence.
    pub fn from_parts(strings: Vec<String>, ints: Vec<i64>, floats: Vec<f64>) -> Self {
        let mut pool = Self {
            strings,
            ints,
            floats,
            ..Self::default()
        };
        for (i, s) in pool.strings.iter().enumerate().take(MAX_POOL_LEN) {
            pool.string_index.entry(s.clone()).or_insert(i as u16);
        }
        for (i, v) in pool.ints.iter().enumerate().take(MAX_POOL_LEN) {
            pool.int_index.entry(*v).or_insert(i as u16);
        }
        for (i, v) in pool.floats.iter().enumerate().take(MAX_POOL_LEN) {
            pool.float_index.entry(v.to_bits()).or_insert(i as u16);
        }
        pool
    }

    pub fn intern_string(&mut self, value: &str) -> Result<u16, CodeGenError> {
        if let Some(&idx) = self.string_index.get(value) {
            return Ok(idx);
        }
        let idx = next_index(self.strings.len(), ConstantKind::String)?;
        self.strings.push(value.to_string());
        self.string_index.insert(value.to_string(), idx);
        Ok(idx)
    }

    pub fn intern_int(&mut self, value: i64) -> Result<u16, CodeGenError> {
        if let Some(&idx) = self.int_index.get(&value) {
            return Ok(idx);
        }
        let idx = next_index(self.ints.len(), ConstantKind::Int)?;
        self.ints.push(value);
        self.int_index.insert(value, idx);
        Ok(idx)
    }

    pub fn intern_float(&mut self, value: f64) -> Result<u16, CodeGenError> {
        if let Some(&idx) = self.float_index.get(&value.to_bits()) {
            return Ok(idx);
        }
        let idx = next_index(self.floats.len(), ConstantKind::Float)?;
        self.floats.push(value);
        self.float_index.insert(value.to_bits(), idx);
        Ok(idx)
    }

    pub fn string(&self, index: u16) -> Option<&str> {
        self.strings.get(usize::from(index)).map(String::as_str)
    }

    pub fn int(&self, index: u16) -> Option<i64> {
        self.ints.get(usize::from(index)).copied()
    }

    pub fn float(&self, index: u16) -> Option<f64> {
        self.floats.get(usize::from(index)).copied()
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn ints(&self) -> &[i64] {
        &self.ints
    }

    pub fn floats(&self) -> &[f64] {
        &self.floats
    }

    /// Total number of pooled values across all three pools.
    pub fn len(&self) -> usize {
        self.strings.len() + self.ints.len() + self.floats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn next_index(len: usize, kind: ConstantKind) -> Result<u16, CodeGenError> {
    u16::try_from(len).map_err(|_| CodeGenError::ConstantPoolOverflow { kind })
}
