//! Fixed-width key-state vector.
//!
//! One bit per logical key, ordered by `kflag`.  The length is fixed by the
//! compiled layout; a vector is rebuilt from scratch for every touch frame and
//! is always sent whole, never as a diff.

use std::fmt;

/// The pressed/released state of every logical key in one frame.
///
/// Index `i` holds the state of the key whose `kflag` is `i`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct KeyStateVector {
    bits: Vec<bool>,
}

/// A single key whose state differs between two vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChange {
    /// Index of the key (its `kflag`).
    pub kflag: usize,
    /// `true` if the key became active, `false` if it was released.
    pub active: bool,
}

impl KeyStateVector {
    /// Creates an all-released vector of `len` keys.
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![false; len],
        }
    }

    /// Wraps an existing bit list.
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Builds a vector of `len` keys with exactly the given indices active.
    ///
    /// Indices at or beyond `len` are ignored.
    pub fn from_active<I>(len: usize, active: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut vector = Self::new(len);
        for index in active {
            vector.set(index);
        }
        vector
    }

    /// Number of keys in the vector.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns `true` when the vector covers no keys at all.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Marks key `index` as active.  Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize) {
        if let Some(bit) = self.bits.get_mut(index) {
            *bit = true;
        }
    }

    /// Returns whether key `index` is active (`false` when out of range).
    pub fn is_set(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    /// Iterates over the indices of all active keys in ascending order.
    pub fn active(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(index, &bit)| bit.then_some(index))
    }

    /// Returns `true` if no key is active.
    pub fn none_active(&self) -> bool {
        !self.bits.iter().any(|&bit| bit)
    }

    /// Raw bit slice in `kflag` order.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Lists every key whose bit differs from `previous`.
    ///
    /// A `previous` vector of a different length is treated as all-released,
    /// so every active key in `self` is reported.
    pub fn changes_from(&self, previous: &KeyStateVector) -> Vec<KeyChange> {
        let comparable = previous.len() == self.len();
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(kflag, &active)| {
                let before = comparable && previous.bits[kflag];
                (before != active).then_some(KeyChange { kflag, active })
            })
            .collect()
    }
}

impl fmt::Display for KeyStateVector {
    /// Renders the vector as a fixed-width `'0'`/`'1'` string in `kflag` order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in &self.bits {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
