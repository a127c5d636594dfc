//! Fixed-capacity bit set used to de-duplicate pair callbacks.

/// Bit set over `[0, capacity)`, backed by 64-bit words.
#[derive(Clone, Debug, Default)]
pub struct BitSet {
    words: Vec<u64>,
    capacity: usize,
}

impl BitSet {
    /// Create an empty set able to hold `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            capacity,
        }
    }

    /// Number of addressable bits.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Set bit `index`. Returns true if it was previously unset.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        match self.words.get_mut(word) {
            Some(w) => {
                let fresh = *w & mask == 0;
                *w |= mask;
                fresh
            }
            None => false,
        }
    }

    /// True if bit `index` is set.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Test bit `index` and set it. Returns whether it was already set.
    ///
    /// Indices past the capacity always report unset.
    #[inline]
    pub fn test_and_set(&mut self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        match self.words.get_mut(word) {
            Some(w) => {
                let seen = *w & mask != 0;
                *w |= mask;
                seen
            }
            None => false,
        }
    }

    /// Clear bit `index`.
    #[inline]
    pub fn remove(&mut self, index: usize) {
        let (word, mask) = Self::locate(index);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !mask;
        }
    }

    /// Clear every bit, keeping the allocation.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Clear the bits below `len`, rounded up to a whole word.
    pub fn clear_prefix(&mut self, len: usize) {
        let words = len.div_ceil(64).min(self.words.len());
        self.words[..words].fill(0);
    }

    /// Resize to `capacity` bits. All bits are cleared.
    pub fn resize(&mut self, capacity: usize) {
        self.words.clear();
        self.words.resize(capacity.div_ceil(64), 0);
        self.capacity = capacity;
    }

    #[inline]
    fn locate(index: usize) -> (usize, u64) {
        (index / 64, 1u64 << (index % 64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_contains_remove() {
        let mut set = BitSet::with_capacity(130);
        assert!(set.insert(0));
        assert!(set.insert(129));
        assert!(!set.insert(129));
        assert!(set.contains(0));
        assert!(set.contains(129));
        assert!(!set.contains(64));
        set.remove(129);
        assert!(!set.contains(129));
    }

    #[test]
    fn test_test_and_set() {
        let mut set = BitSet::with_capacity(16);
        assert!(!set.test_and_set(5));
        assert!(set.test_and_set(5));
    }

    #[test]
    fn test_clear_and_resize() {
        let mut set = BitSet::with_capacity(8);
        set.insert(3);
        set.clear();
        assert!(!set.contains(3));

        set.insert(3);
        set.resize(1000);
        assert_eq!(set.capacity(), 1000);
        assert!(!set.contains(3));
        assert!(set.insert(999));
    }

    #[test]
    fn test_clear_prefix() {
        let mut set = BitSet::with_capacity(300);
        set.insert(10);
        set.insert(70);
        set.insert(200);
        set.clear_prefix(65);
        assert!(!set.contains(10));
        assert!(!set.contains(70));
        assert!(set.contains(200));

        set.clear_prefix(10_000);
        assert!(!set.contains(200));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut set = BitSet::with_capacity(10);
        assert!(!set.contains(500));
        assert!(!set.insert(500));
        assert!(!set.test_and_set(500));
    }
}
