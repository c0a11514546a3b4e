use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A fixed-length, immutable bit vector used as a perceptual hash.
///
/// Storage is word-at-a-time (`u64`) the way the teacher's `VideoHash`
/// packs its DCT hash bits into `[usize; HASH_WORDS]`, except the length
/// here is not fixed at compile time: `hashResolution` is a runtime
/// `SimilarityConfig` field, so two `BitHash`es may legitimately have
/// different lengths (and `distance` rejects that case rather than
/// silently truncating).
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct BitHash {
    words: Vec<u64>,
    bit_len: usize,
}

impl BitHash {
    /// Build a `BitHash` from `bit_len` bits, where bit `i` is true iff
    /// `bits(i)` returns true. Bits beyond `bit_len` in the final word are
    /// always zero.
    pub fn from_bits(bit_len: usize, mut bits: impl FnMut(usize) -> bool) -> Self {
        let word_count = bit_len.div_ceil(64);
        let mut words = vec![0u64; word_count];
        for i in 0..bit_len {
            if bits(i) {
                words[i / 64] |= 1u64 << (i % 64);
            }
        }
        Self { words, bit_len }
    }

    pub fn zero(bit_len: usize) -> Self {
        Self::from_bits(bit_len, |_| false)
    }

    pub fn all_ones(bit_len: usize) -> Self {
        Self::from_bits(bit_len, |_| true)
    }

    #[must_use]
    pub const fn bit_len(&self) -> usize {
        self.bit_len
    }

    #[must_use]
    pub fn get(&self, i: usize) -> bool {
        (self.words[i / 64] >> (i % 64)) & 1 == 1
    }

    /// The Hamming distance between `self` and `other`: the count of bit
    /// positions at which they differ. Processes full 64-bit words with
    /// `u64::count_ones`, falling back to a byte-wise count for any
    /// trailing bits that do not fill a complete word (spec.md §4.1).
    pub fn distance(&self, other: &Self) -> CoreResult<u32> {
        if self.bit_len != other.bit_len {
            return Err(CoreError::BitlenMismatch {
                lhs: self.bit_len,
                rhs: other.bit_len,
            });
        }

        let mut acc = 0u32;
        for (a, b) in self.words.iter().zip(other.words.iter()) {
            acc += (a ^ b).count_ones();
        }
        Ok(acc)
    }

    /// Normalized Hamming distance, in `[0, 1]`.
    pub fn normalized_distance(&self, other: &Self) -> CoreResult<f64> {
        if self.bit_len == 0 {
            return Ok(0.0);
        }
        Ok(f64::from(self.distance(other)?) / self.bit_len as f64)
    }
}

impl AsRef<BitHash> for BitHash {
    fn as_ref(&self) -> &Self {
        self
    }
}

#[cfg(test)]
pub mod test_util {
    use super::BitHash;
    use rand::Rng;

    impl BitHash {
        /// Flip random bits in a clone of `self` until it reaches exactly
        /// `target_distance` away. Mirrors the teacher's
        /// `VideoHash::hash_with_spatial_distance` test helper.
        pub fn with_distance(&self, target_distance: u32, rng: &mut impl Rng) -> Self {
            assert!(target_distance as usize <= self.bit_len);
            let mut words = self.words.clone();
            let mut curr = 0u32;
            while curr < target_distance {
                let word_idx = rng.gen_range(0..words.len());
                let bit_idx = rng.gen_range(0..64u32.min(self.bit_len as u32 - word_idx as u32 * 64));
                words[word_idx] ^= 1u64 << bit_idx;
                curr = words
                    .iter()
                    .zip(self.words.iter())
                    .map(|(a, b)| (a ^ b).count_ones())
                    .sum();
            }
            Self {
                words,
                bit_len: self.bit_len,
            }
        }

        pub fn random(bit_len: usize, rng: &mut impl Rng) -> Self {
            Self::from_bits(bit_len, |_| rng.gen_bool(0.5))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn distance_to_self_is_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let h = BitHash::random(256, &mut rng);
        assert_eq!(h.distance(&h).unwrap(), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            let a = BitHash::random(192, &mut rng);
            let b = BitHash::random(192, &mut rng);
            assert_eq!(a.distance(&b).unwrap(), b.distance(&a).unwrap());
        }
    }

    #[test]
    fn distance_bounded_by_bitlen() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let a = BitHash::random(128, &mut rng);
            let b = BitHash::random(128, &mut rng);
            let d = a.distance(&b).unwrap();
            assert!(d <= 128);
        }
    }

    #[test]
    fn mismatched_lengths_error() {
        let a = BitHash::zero(64);
        let b = BitHash::zero(128);
        assert_eq!(
            a.distance(&b),
            Err(CoreError::BitlenMismatch { lhs: 64, rhs: 128 })
        );
    }

    #[test]
    fn zero_and_all_ones_are_maximally_distant() {
        let a = BitHash::zero(256);
        let b = BitHash::all_ones(256);
        assert_eq!(a.distance(&b).unwrap(), 256);
    }

    #[test]
    fn trailing_partial_word_is_masked_to_zero() {
        // 70 bits needs 2 words; the top 58 bits of the second word must
        // stay zero even when every requested bit is set.
        let h = BitHash::all_ones(70);
        assert_eq!(h.distance(&BitHash::zero(70)).unwrap(), 70);
    }

    #[test]
    fn with_distance_hits_target_exactly() {
        let mut rng = StdRng::seed_from_u64(4);
        let base = BitHash::random(256, &mut rng);
        for target in [0u32, 1, 17, 100] {
            let other = base.with_distance(target, &mut rng);
            assert_eq!(base.distance(&other).unwrap(), target);
        }
    }
}
