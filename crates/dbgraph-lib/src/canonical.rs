//! Strand canonicalization policies
//!
//! A k-mer and its reverse complement describe the same double-stranded
//! locus. A [`CanonicalizationPolicy`] picks which of the two strands keys the
//! node; the other strand's observations are folded in by flipping them.

use crate::kmer::Kmer;

/// Which strand of a k-mer was chosen as canonical
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// The k-mer as read is canonical
    Forward,
    /// The reverse complement is canonical
    Reverse,
}

impl Orientation {
    /// True when the observed k-mer had to be flipped
    #[inline]
    pub fn is_reverse(self) -> bool {
        matches!(self, Orientation::Reverse)
    }
}

/// Chooses the canonical strand of a k-mer.
///
/// Implementations must be consistent: swapping the arguments must select the
/// same k-mer, so that a k-mer and its reverse complement share one key.
pub trait CanonicalizationPolicy: Send + Sync {
    /// Pick between a k-mer and its reverse complement
    fn orient(&self, forward: Kmer, reverse: Kmer) -> Orientation;

    /// The canonical k-mer and the orientation that produced it
    #[inline]
    fn canonicalize(&self, forward: Kmer, reverse: Kmer) -> (Kmer, Orientation) {
        match self.orient(forward, reverse) {
            Orientation::Forward => (forward, Orientation::Forward),
            Orientation::Reverse => (reverse, Orientation::Reverse),
        }
    }
}

/// Numerically smaller packed word wins; ties (palindromes) stay forward
#[derive(Debug, Clone, Copy, Default)]
pub struct LexLess;

impl CanonicalizationPolicy for LexLess {
    #[inline]
    fn orient(&self, forward: Kmer, reverse: Kmer) -> Orientation {
        if reverse < forward {
            Orientation::Reverse
        } else {
            Orientation::Forward
        }
    }
}
