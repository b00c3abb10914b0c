//! Sliding-window k-mer extraction from reads
//!
//! Each window of `k` consecutive valid symbols yields one
//! [`KmerOccurrence`] together with the symbols immediately before and after
//! it, which become the node's incoming and outgoing extensions.
//!
//! Bytes outside the alphabet (e.g. `N`) are not an error here: every window
//! that covers one is skipped, and a flanking invalid byte is reported as a
//! missing neighbor. The rest of the read is still used.

use crate::encoding::{Alphabet, Dna};
use crate::kmer::{Kmer, KmerCodec};

/// One k-mer window of a read with its flanking symbols (2-bit codes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerOccurrence {
    /// The k-mer as read (not canonicalized)
    pub kmer: Kmer,
    /// Symbol preceding the window, if any
    pub predecessor: Option<u8>,
    /// Symbol following the window, if any
    pub successor: Option<u8>,
}

/// Produces k-mer occurrences from reads
pub struct KmerExtractor<A: Alphabet = Dna> {
    codec: KmerCodec<A>,
}

impl<A: Alphabet> Clone for KmerExtractor<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: Alphabet> Copy for KmerExtractor<A> {}

impl<A: Alphabet> KmerExtractor<A> {
    /// Create an extractor for the codec's k
    pub fn new(codec: KmerCodec<A>) -> Self {
        Self { codec }
    }

    /// The codec used to pack windows
    pub fn codec(&self) -> &KmerCodec<A> {
        &self.codec
    }

    /// Lazily iterate the k-mer windows of `read`
    ///
    /// Reads shorter than `k` yield nothing. The iterator is `Clone`, so a
    /// partially consumed sequence can be restarted from any point.
    pub fn kmers<'a>(&self, read: &'a [u8]) -> ReadKmers<'a, A> {
        ReadKmers {
            codec: self.codec,
            read,
            next_base: 0,
            filled: 0,
            word: Kmer::default(),
        }
    }

    /// Number of windows a read of this length would have if fully valid
    pub fn num_windows(&self, read_len: usize) -> usize {
        (read_len + 1).saturating_sub(self.codec.k())
    }
}

/// Iterator over the k-mer windows of one read
pub struct ReadKmers<'a, A: Alphabet = Dna> {
    codec: KmerCodec<A>,
    read: &'a [u8],
    /// Index of the next byte to shift into the window
    next_base: usize,
    /// Consecutive valid symbols currently in the window, capped at k
    filled: usize,
    word: Kmer,
}

impl<A: Alphabet> Clone for ReadKmers<'_, A> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec,
            read: self.read,
            next_base: self.next_base,
            filled: self.filled,
            word: self.word,
        }
    }
}

impl<A: Alphabet> ReadKmers<'_, A> {
    #[inline]
    fn flank(&self, index: usize) -> Option<u8> {
        self.read.get(index).and_then(|&b| A::encode(b))
    }
}

impl<A: Alphabet> Iterator for ReadKmers<'_, A> {
    type Item = KmerOccurrence;

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.codec.k();
        while self.next_base < self.read.len() {
            let symbol = self.read[self.next_base];
            self.next_base += 1;

            let Some(code) = A::encode(symbol) else {
                self.filled = 0;
                continue;
            };

            self.word = self.codec.push_back(self.word, code);
            self.filled = (self.filled + 1).min(k);
            if self.filled < k {
                continue;
            }

            let start = self.next_base - k;
            let predecessor = match start {
                0 => None,
                _ => self.flank(start - 1),
            };
            return Some(KmerOccurrence {
                kmer: self.word,
                predecessor,
                successor: self.flank(self.next_base),
            });
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.read.len() - self.next_base;
        let k = self.codec.k();
        // A full window needs k - filled more symbols before the first yield
        let upper = (remaining + self.filled + 1).saturating_sub(k);
        (0, Some(upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(k: usize) -> KmerExtractor {
        KmerExtractor::new(KmerCodec::new(k).unwrap())
    }

    fn decode_all(ex: &KmerExtractor, read: &[u8]) -> Vec<(String, Option<char>, Option<char>)> {
        let codec = ex.codec();
        ex.kmers(read)
            .map(|occ| {
                (
                    codec.decode(occ.kmer),
                    occ.predecessor.map(|c| Dna::decode(c) as char),
                    occ.successor.map(|c| Dna::decode(c) as char),
                )
            })
            .collect()
    }

    #[test]
    fn test_windows_and_flanks() {
        let ex = extractor(3);
        let got = decode_all(&ex, b"ACGTA");
        assert_eq!(
            got,
            vec![
                ("ACG".to_string(), None, Some('T')),
                ("CGT".to_string(), Some('A'), Some('A')),
                ("GTA".to_string(), Some('C'), None),
            ]
        );
    }

    #[test]
    fn test_window_count() {
        let ex = extractor(31);
        let read = vec![b'A'; 40];
        assert_eq!(ex.kmers(&read).count(), 10);
        assert_eq!(ex.num_windows(40), 10);
        assert_eq!(ex.num_windows(31), 1);
        assert_eq!(ex.num_windows(30), 0);
    }

    #[test]
    fn test_short_read_is_empty() {
        let ex = extractor(31);
        assert_eq!(ex.kmers(b"ACGT").count(), 0);
        assert_eq!(ex.kmers(b"").count(), 0);
    }

    #[test]
    fn test_exact_length_read_has_no_flanks() {
        let ex = extractor(5);
        let got: Vec<_> = ex.kmers(b"GATTA").collect();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].predecessor, None);
        assert_eq!(got[0].successor, None);
    }

    #[test]
    fn test_invalid_symbol_skips_windows() {
        let ex = extractor(3);
        // Windows covering N are dropped; flanks next to N are absent
        let got = decode_all(&ex, b"ACGNTTCA");
        assert_eq!(
            got,
            vec![
                ("ACG".to_string(), None, None),
                ("TTC".to_string(), None, Some('A')),
                ("TCA".to_string(), Some('T'), None),
            ]
        );
    }

    #[test]
    fn test_all_invalid_read() {
        let ex = extractor(3);
        assert_eq!(ex.kmers(b"NNNNNNNN").count(), 0);
    }

    #[test]
    fn test_lowercase_accepted() {
        let ex = extractor(3);
        let upper: Vec<_> = ex.kmers(b"ACGTA").collect();
        let lower: Vec<_> = ex.kmers(b"acgta").collect();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let ex = extractor(4);
        let mut iter = ex.kmers(b"ACGTACGTAC");
        iter.next();
        let snapshot = iter.clone();
        let rest: Vec<_> = iter.collect();
        let replay: Vec<_> = snapshot.collect();
        assert_eq!(rest, replay);
        assert_eq!(ex.kmers(b"ACGTACGTAC").count(), 7);
    }

    #[test]
    fn test_homopolymer_32_yields_two_windows() {
        let ex = extractor(31);
        let read = vec![b'A'; 32];
        let got: Vec<_> = ex.kmers(&read).collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].kmer, got[1].kmer);
        assert_eq!(got[0].predecessor, None);
        assert_eq!(got[0].successor, Some(0b00));
        assert_eq!(got[1].predecessor, Some(0b00));
        assert_eq!(got[1].successor, None);
    }
}
