//! Edge-presence records and neighbor decoding
//!
//! A node's record is one byte:
//!
//! ```text
//!   bit:  7   6   5   4   3   2   1   0
//!        [ outgoing  (j) ][ incoming  (i) ]
//! ```
//!
//! Bit `i` set means some read contained `s_i + kmer`, i.e. an edge from the
//! k-mer formed by prepending symbol code `i` to the node's first k-1
//! symbols. Bit `4 + j` set means an edge to the k-mer formed by appending
//! symbol code `j` after the node's last k-1 symbols. Both refer to the
//! canonical orientation of the node.
//!
//! Records only ever grow by bitwise OR, so merging is idempotent,
//! commutative and associative.

use crate::encoding::{Alphabet, Dna};
use crate::kmer::{Kmer, KmerCodec};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

const INCOMING_MASK: u8 = 0x0F;
const OUTGOING_SHIFT: u8 = 4;

/// Accumulated edge-presence bits of one node
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EdgeRecord(u8);

impl EdgeRecord {
    /// A record with no extensions observed
    pub const EMPTY: EdgeRecord = EdgeRecord(0);

    /// Wrap raw record bits
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw record bits
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Record for a single observation with the given flanking symbol codes
    #[inline]
    pub fn from_extensions(incoming: Option<u8>, outgoing: Option<u8>) -> Self {
        let mut bits = 0u8;
        if let Some(code) = incoming {
            bits |= 1 << (code & 0b11);
        }
        if let Some(code) = outgoing {
            bits |= 1 << (OUTGOING_SHIFT + (code & 0b11));
        }
        Self(bits)
    }

    /// OR another record into this one
    #[inline]
    pub fn merge(&mut self, other: EdgeRecord) {
        self.0 |= other.0;
    }

    /// True if an incoming extension by symbol `code` was observed
    #[inline]
    pub fn has_incoming(self, code: u8) -> bool {
        self.0 & (1 << (code & 0b11)) != 0
    }

    /// True if an outgoing extension by symbol `code` was observed
    #[inline]
    pub fn has_outgoing(self, code: u8) -> bool {
        self.0 & (1 << (OUTGOING_SHIFT + (code & 0b11))) != 0
    }

    /// Incoming bits, one per symbol code
    #[inline]
    pub fn incoming(self) -> u8 {
        self.0 & INCOMING_MASK
    }

    /// Outgoing bits, one per symbol code
    #[inline]
    pub fn outgoing(self) -> u8 {
        self.0 >> OUTGOING_SHIFT
    }

    /// Number of distinct incoming extensions
    #[inline]
    pub fn in_degree(self) -> u32 {
        self.incoming().count_ones()
    }

    /// Number of distinct outgoing extensions
    #[inline]
    pub fn out_degree(self) -> u32 {
        self.outgoing().count_ones()
    }

    /// True if no extension was observed
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EdgeRecord {
    type Output = EdgeRecord;

    #[inline]
    fn bitor(self, rhs: EdgeRecord) -> EdgeRecord {
        EdgeRecord(self.0 | rhs.0)
    }
}

impl BitOrAssign for EdgeRecord {
    #[inline]
    fn bitor_assign(&mut self, rhs: EdgeRecord) {
        self.merge(rhs);
    }
}

impl fmt::Debug for EdgeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeRecord(in={:04b}, out={:04b})", self.incoming(), self.outgoing())
    }
}

/// Reconstructs neighbor k-mers from a node and its record
///
/// Neighbors come back in raw form (the orientation implied by the node's
/// canonical strand), not canonicalized. Decoding needs nothing but the node
/// itself, so it parallelizes trivially over a shard.
pub struct NeighborDecoder<A: Alphabet = Dna> {
    codec: KmerCodec<A>,
}

impl<A: Alphabet> Clone for NeighborDecoder<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: Alphabet> Copy for NeighborDecoder<A> {}

impl<A: Alphabet> NeighborDecoder<A> {
    /// Create a decoder for the codec's k
    pub fn new(codec: KmerCodec<A>) -> Self {
        Self { codec }
    }

    /// Predecessor k-mers of `kmer` recorded in `record`
    pub fn in_neighbors(&self, kmer: Kmer, record: EdgeRecord) -> impl Iterator<Item = Kmer> {
        let codec = self.codec;
        (0..A::SIZE as u8)
            .filter(move |&code| record.has_incoming(code))
            .map(move |code| codec.push_front(kmer, code))
    }

    /// Successor k-mers of `kmer` recorded in `record`
    pub fn out_neighbors(&self, kmer: Kmer, record: EdgeRecord) -> impl Iterator<Item = Kmer> {
        let codec = self.codec;
        (0..A::SIZE as u8)
            .filter(move |&code| record.has_outgoing(code))
            .map(move |code| codec.push_back(kmer, code))
    }
}
