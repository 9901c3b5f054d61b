//! A growable bit array used to deduplicate spatial-hash query results.

/// A bit array that grows to fit the highest index ever set.
///
/// Backed by one byte per bit rather than packed bits: query results are
/// deduplicated by a handful of set/get calls per step, not iterated bit by
/// bit, so the byte-per-bit layout trades a little memory for simplicity.
#[derive(Debug, Clone, Default)]
pub struct BitArray {
    bits: Vec<bool>,
}

impl BitArray {
    /// Create a bit array with `n` bits, all cleared.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            bits: vec![false; n],
        }
    }

    /// Clear every bit without shrinking the backing storage.
    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|bit| *bit = false);
    }

    /// Get the `i`-th bit, growing (as unset) if `i` is out of range.
    pub fn get(&self, i: usize) -> bool {
        self.bits.get(i).copied().unwrap_or(false)
    }

    /// Set the `i`-th bit, growing the backing storage if necessary.
    pub fn set(&mut self, i: usize) {
        if i >= self.bits.len() {
            self.bits.resize(i + 1, false);
        }
        self.bits[i] = true;
    }

    /// Set the `i`-th bit if unset; returns `true` if it was already set.
    ///
    /// Used by the broad-phase to both test and mark an id in one call.
    pub fn test_and_set(&mut self, i: usize) -> bool {
        let was_set = self.get(i);
        self.set(i);
        was_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut bits = BitArray::with_capacity(4);
        assert!(!bits.get(2));
        bits.set(2);
        assert!(bits.get(2));
        assert!(!bits.get(3));
    }

    #[test]
    fn clear_resets_all_bits() {
        let mut bits = BitArray::with_capacity(4);
        bits.set(0);
        bits.set(3);
        bits.clear();
        assert!(!bits.get(0));
        assert!(!bits.get(3));
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut bits = BitArray::with_capacity(1);
        bits.set(10);
        assert!(bits.get(10));
        assert!(!bits.get(5));
    }

    #[test]
    fn test_and_set_reports_prior_state() {
        let mut bits = BitArray::with_capacity(2);
        assert!(!bits.test_and_set(1));
        assert!(bits.test_and_set(1));
    }
}
