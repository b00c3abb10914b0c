//! K-mer representation and codec
//!
//! A k-mer is packed into a single `u64`, 2 bits per symbol, with the first
//! symbol of the window in the lowest bits. Bits above `2 * k` are always
//! zero. The k-mer length is a runtime property of [`KmerCodec`], which owns
//! every operation that needs to know it.

use crate::constants::{is_valid_k, kmer_mask, BITS_PER_SYMBOL, MAX_K, MIN_K, WORD_BITS};
use crate::encoding::{Alphabet, Dna, EncodingError};
use crate::error::GraphError;
use std::fmt;
use std::marker::PhantomData;

/// A packed k-mer word
///
/// Ordering is the ordering of the packed integer, which is what
/// canonicalization compares.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Kmer(u64);

impl Kmer {
    /// Wrap a packed word. The caller guarantees no bits beyond `2 * k` are set.
    #[inline]
    pub const fn from_word(word: u64) -> Self {
        Self(word)
    }

    /// The packed word
    #[inline]
    pub const fn word(self) -> u64 {
        self.0
    }
}

impl From<Kmer> for u64 {
    fn from(kmer: Kmer) -> Self {
        kmer.0
    }
}

impl fmt::Debug for Kmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kmer({:#018x})", self.0)
    }
}

/// Packs, unpacks and transforms k-mers of a fixed length over alphabet `A`
pub struct KmerCodec<A: Alphabet = Dna> {
    k: usize,
    mask: u64,
    _alphabet: PhantomData<A>,
}

impl<A: Alphabet> Clone for KmerCodec<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: Alphabet> Copy for KmerCodec<A> {}

impl<A: Alphabet> fmt::Debug for KmerCodec<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KmerCodec").field("k", &self.k).finish()
    }
}

impl<A: Alphabet> KmerCodec<A> {
    /// Create a codec for k-mers of length `k`
    ///
    /// # Errors
    /// Returns [`GraphError::Configuration`] if `k` does not fit a single word.
    pub fn new(k: usize) -> Result<Self, GraphError> {
        if !is_valid_k(k) {
            return Err(GraphError::Configuration(format!(
                "k must be in range [{}, {}] to fit a {}-bit word, got k={}",
                MIN_K, MAX_K, WORD_BITS, k
            )));
        }
        Ok(Self {
            k,
            mask: kmer_mask(k),
            _alphabet: PhantomData,
        })
    }

    /// K-mer length
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Mask covering the `2 * k` meaningful bits
    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// True if no bits beyond `2 * k` are set
    #[inline]
    pub fn is_well_formed(&self, kmer: Kmer) -> bool {
        kmer.0 & !self.mask == 0
    }

    /// Pack a window of exactly `k` symbols
    ///
    /// # Errors
    /// Returns an error if the window length differs from `k` or a symbol is
    /// outside the alphabet.
    pub fn encode(&self, window: &[u8]) -> Result<Kmer, EncodingError> {
        if window.len() != self.k {
            return Err(EncodingError::LengthMismatch {
                expected: self.k,
                actual: window.len(),
            });
        }

        let mut bits = 0u64;
        for (i, &symbol) in window.iter().enumerate() {
            let code = A::encode(symbol).ok_or(EncodingError::InvalidSymbol {
                symbol: symbol as char,
                position: i,
            })?;
            bits |= (code as u64) << (i * BITS_PER_SYMBOL);
        }
        Ok(Kmer(bits))
    }

    /// Unpack a k-mer into its (upper-case) symbols
    pub fn decode(&self, kmer: Kmer) -> String {
        (0..self.k)
            .map(|pos| A::decode(self.symbol_at(kmer, pos)) as char)
            .collect()
    }

    /// 2-bit code of the symbol at `pos` (0 = first symbol of the window)
    #[inline]
    pub fn symbol_at(&self, kmer: Kmer, pos: usize) -> u8 {
        debug_assert!(pos < self.k, "Position {} out of bounds for k={}", pos, self.k);
        ((kmer.0 >> (pos * BITS_PER_SYMBOL)) & 0b11) as u8
    }

    /// Reverse complement, computed on the packed word
    ///
    /// Complements every slot, reverses the 2-bit groups of the whole word,
    /// then shifts the `k` meaningful symbols back down.
    #[inline]
    pub fn reverse_complement(&self, kmer: Kmer) -> Kmer {
        let mut x = A::complement_word(kmer.0);
        // Swap adjacent 2-bit pairs
        x = ((x >> 2) & 0x3333_3333_3333_3333u64) | ((x & 0x3333_3333_3333_3333u64) << 2);
        // Swap adjacent 4-bit nibbles
        x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0Fu64) | ((x & 0x0F0F_0F0F_0F0F_0F0Fu64) << 4);
        x = x.swap_bytes();
        x >>= WORD_BITS - self.k * BITS_PER_SYMBOL;
        Kmer(x)
    }

    /// Minimum of the k-mer and its reverse complement
    #[inline]
    pub fn canonical(&self, kmer: Kmer) -> Kmer {
        kmer.min(self.reverse_complement(kmer))
    }

    /// Drop the first symbol and append `code` after the last one
    #[inline]
    pub fn push_back(&self, kmer: Kmer, code: u8) -> Kmer {
        let top = (self.k - 1) * BITS_PER_SYMBOL;
        Kmer((kmer.0 >> BITS_PER_SYMBOL) | (((code & 0b11) as u64) << top))
    }

    /// Drop the last symbol and prepend `code` before the first one
    #[inline]
    pub fn push_front(&self, kmer: Kmer, code: u8) -> Kmer {
        Kmer(((kmer.0 << BITS_PER_SYMBOL) | (code & 0b11) as u64) & self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(k: usize) -> KmerCodec {
        KmerCodec::new(k).unwrap()
    }

    /// Deterministic pseudo-random k-mers
    fn sample_kmers(codec: &KmerCodec, n: usize) -> Vec<Kmer> {
        let mut rng_state: u64 = 42;
        (0..n)
            .map(|_| {
                rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
                Kmer::from_word(rng_state & codec.mask())
            })
            .collect()
    }

    #[test]
    fn test_codec_rejects_bad_k() {
        assert!(matches!(KmerCodec::<Dna>::new(0), Err(GraphError::Configuration(_))));
        assert!(matches!(KmerCodec::<Dna>::new(32), Err(GraphError::Configuration(_))));
        assert!(KmerCodec::<Dna>::new(31).is_ok());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let c = codec(31);
        let window = "ACGTACGTACGTACGTACGTACGTACGTACG";
        let kmer = c.encode(window.as_bytes()).unwrap();
        assert_eq!(c.decode(kmer), window);
        assert!(c.is_well_formed(kmer));

        let c = codec(7);
        for window in ["AAAAAAA", "TTTTTTT", "GATTACA", "ACGTGCA"] {
            assert_eq!(c.decode(c.encode(window.as_bytes()).unwrap()), window);
        }
    }

    #[test]
    fn test_encode_case_insensitive() {
        let c = codec(5);
        assert_eq!(c.encode(b"acgtg").unwrap(), c.encode(b"ACGTG").unwrap());
    }

    #[test]
    fn test_encode_errors() {
        let c = codec(5);
        assert_eq!(
            c.encode(b"ACGT"),
            Err(EncodingError::LengthMismatch { expected: 5, actual: 4 })
        );
        assert_eq!(
            c.encode(b"ACNTG"),
            Err(EncodingError::InvalidSymbol { symbol: 'N', position: 2 })
        );
    }

    #[test]
    fn test_reverse_complement() {
        let c = codec(5);
        let kmer = c.encode(b"ACGTG").unwrap();
        assert_eq!(c.decode(c.reverse_complement(kmer)), "CACGT");

        let c = codec(7);
        let kmer = c.encode(b"ACGTACG").unwrap();
        assert_eq!(c.decode(c.reverse_complement(kmer)), "CGTACGT");

        let c = codec(31);
        let kmer = c.encode(b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAC").unwrap();
        assert_eq!(c.decode(c.reverse_complement(kmer)), "GTTTTTTTTTTTTTTTTTTTTTTTTTTTTTT");
    }

    #[test]
    fn test_reverse_complement_is_involution() {
        for k in [1, 2, 5, 16, 30, 31] {
            let c = codec(k);
            for kmer in sample_kmers(&c, 200) {
                let rc = c.reverse_complement(kmer);
                assert!(c.is_well_formed(rc));
                assert_eq!(c.reverse_complement(rc), kmer);
            }
        }
    }

    #[test]
    fn test_canonical_properties() {
        for k in [3, 21, 31] {
            let c = codec(k);
            for kmer in sample_kmers(&c, 500) {
                let canon = c.canonical(kmer);
                assert_eq!(c.canonical(canon), canon);
                assert_eq!(c.canonical(c.reverse_complement(kmer)), canon);
                assert!(canon <= kmer && canon <= c.reverse_complement(kmer));
            }
        }
    }

    #[test]
    fn test_push_back_and_front() {
        let c = codec(5);
        let kmer = c.encode(b"ACGTG").unwrap();
        assert_eq!(c.decode(c.push_back(kmer, 0b00)), "CGTGA");
        assert_eq!(c.decode(c.push_front(kmer, 0b10)), "TACGT");
        assert_eq!(c.push_front(c.push_back(kmer, 0b11), c.symbol_at(kmer, 0)), kmer);
    }

    #[test]
    fn test_symbol_at() {
        let c = codec(5);
        let kmer = c.encode(b"ACGTG").unwrap();
        assert_eq!(c.symbol_at(kmer, 0), 0b00);
        assert_eq!(c.symbol_at(kmer, 1), 0b01);
        assert_eq!(c.symbol_at(kmer, 2), 0b11);
        assert_eq!(c.symbol_at(kmer, 3), 0b10);
    }

    #[test]
    fn test_kmer_ordering_is_word_ordering() {
        let c = codec(5);
        let a = c.encode(b"AAAAA").unwrap();
        let t = c.encode(b"TTTTT").unwrap();
        assert!(a < t);
        assert_eq!(u64::from(a), 0);
    }
}
