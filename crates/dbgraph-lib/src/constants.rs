//! Constants and configuration defaults for graph construction
//!
//! K-mers are packed at 2 bits per symbol into a single `u64` word, so the
//! largest supported k is bounded by the word width.

/// Bits used to encode one nucleotide
pub const BITS_PER_SYMBOL: usize = 2;

/// Number of symbols in the nucleotide alphabet
pub const ALPHABET_SIZE: usize = 4;

/// Width of the packed k-mer word in bits
pub const WORD_BITS: usize = u64::BITS as usize;

/// Default k-mer length
pub const DEFAULT_K: usize = 31;

/// Maximum k-mer length: the whole canonical k-mer must fit one word so that
/// the word alone identifies a node in the emitted edge list
pub const MAX_K: usize = 31;

/// Minimum k-mer length supported
pub const MIN_K: usize = 1;

/// Default seed for the shard hash
pub const DEFAULT_SEED: u64 = 1;

/// Default number of reads a worker extracts between two exchange rounds
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

/// Check if a k-mer size is valid
#[inline]
pub const fn is_valid_k(k: usize) -> bool {
    k >= MIN_K && k <= MAX_K
}

/// Mask with the low `2 * k` bits set
#[inline]
pub const fn kmer_mask(k: usize) -> u64 {
    if k * BITS_PER_SYMBOL >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << (k * BITS_PER_SYMBOL)) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_k() {
        assert!(is_valid_k(1));
        assert!(is_valid_k(21));
        assert!(is_valid_k(30));
        assert!(is_valid_k(31));

        assert!(!is_valid_k(0));
        assert!(!is_valid_k(32));
        assert!(!is_valid_k(63));
    }

    #[test]
    fn test_kmer_mask() {
        assert_eq!(kmer_mask(1), 0b11);
        assert_eq!(kmer_mask(4), 0xFF);
        assert_eq!(kmer_mask(31), (1u64 << 62) - 1);
        assert_eq!(kmer_mask(32), u64::MAX);
    }

    #[test]
    fn test_default_k_fits_word() {
        assert!(DEFAULT_K * BITS_PER_SYMBOL <= WORD_BITS);
        assert!(is_valid_k(DEFAULT_K));
    }
}
