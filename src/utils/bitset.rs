//! A growable bit vector keyed by small integer indices.
//!
//! Block and value handles in the IR are dense arena indices, so sets of them
//! (live-block sets, visited sets, interference rows) are stored as bit vectors
//! rather than hash sets.
//!
//! # Example
//!
//! ```rust,ignore
//! use irscope::utils::BitSet;
//!
//! let mut set = BitSet::new(8);
//! assert!(set.insert(3));
//! assert!(!set.insert(3));
//! set.insert(70); // grows on demand
//!
//! assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 70]);
//! ```

use std::fmt;

/// A growable set of `usize` indices backed by 64-bit words.
///
/// Inserting past the current capacity grows the set; queries past the
/// capacity simply report absence.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    /// Creates an empty set able to hold `capacity` indices without growing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
        }
    }

    /// Returns `true` if no index is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Adds `index` to the set. Returns `true` if it was not present before.
    pub fn insert(&mut self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        !was_set
    }

    /// Removes `index` from the set. Returns `true` if it was present.
    pub fn remove(&mut self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        match self.words.get_mut(word) {
            Some(w) if *w & mask != 0 => {
                *w &= !mask;
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if `index` is in the set.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Returns the number of indices in the set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Removes every index.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Adds every index of `other` to `self`.
    ///
    /// Returns `true` if `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (a, &b) in self.words.iter_mut().zip(&other.words) {
            let old = *a;
            *a |= b;
            changed |= old != *a;
        }
        changed
    }

    /// Returns `true` if the two sets share at least one index.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(&a, &b)| a & b != 0)
    }

    /// Iterates over the set indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(i * 64 + bit)
            })
        })
    }

    #[inline]
    fn locate(index: usize) -> (usize, u64) {
        (index / 64, 1u64 << (index % 64))
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = BitSet::default();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_insert_reports_novelty() {
        let mut set = BitSet::new(10);
        assert!(set.is_empty());
        assert!(set.insert(4));
        assert!(!set.insert(4));
        assert!(set.contains(4));
        assert!(!set.contains(5));
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn test_bitset_grows_past_capacity() {
        let mut set = BitSet::new(4);
        set.insert(200);
        assert!(set.contains(200));
        assert!(!set.contains(199));
        assert!(!set.contains(10_000));
    }

    #[test]
    fn test_bitset_remove() {
        let mut set: BitSet = [1, 65, 130].into_iter().collect();
        assert!(set.remove(65));
        assert!(!set.remove(65));
        assert!(!set.remove(5000));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 130]);
    }

    #[test]
    fn test_bitset_union_and_intersects() {
        let mut a: BitSet = [1, 2].into_iter().collect();
        let b: BitSet = [2, 100].into_iter().collect();
        assert!(a.intersects(&b));
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 100]);

        let c: BitSet = [7].into_iter().collect();
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_bitset_iter_crosses_words() {
        let set: BitSet = [0, 63, 64, 127, 128].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 63, 64, 127, 128]);
        set.iter().for_each(|i| assert!(set.contains(i)));
    }
}
