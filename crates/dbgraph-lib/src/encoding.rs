//! DNA nucleotide encoding
//!
//! Symbols are packed in 2 bits each. The DNA alphabet uses the encoding
//!
//! - A (65/97)  -> 00
//! - C (67/99)  -> 01
//! - G (71/103) -> 11
//! - T (84/116) -> 10
//!
//! so that complementing a symbol is a single XOR with `0b10`, and
//! complementing a whole packed word is a single XOR with `0xAAAA...`.

use crate::constants::{ALPHABET_SIZE, BITS_PER_SYMBOL, WORD_BITS};
use thiserror::Error;

/// Error type for encoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input byte is not a symbol of the alphabet
    #[error("Invalid symbol {symbol:?} at position {position}")]
    InvalidSymbol {
        /// Offending byte
        symbol: char,
        /// Position of the byte in the window
        position: usize,
    },
    /// The input window length does not match the k-mer length
    #[error("K-mer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// Expected k-mer length
        expected: usize,
        /// Actual window length
        actual: usize,
    },
}

/// A 4-symbol alphabet packed at 2 bits per symbol.
///
/// Implementors describe how raw bytes map to symbol codes and how codes
/// complement each other. The packing itself (2 bits per symbol) is fixed.
pub trait Alphabet: Copy + Send + Sync + 'static {
    /// Number of distinct symbols
    const SIZE: usize = ALPHABET_SIZE;

    /// Map a raw byte to its 2-bit code, `None` if it is not in the alphabet
    fn encode(symbol: u8) -> Option<u8>;

    /// Map a 2-bit code back to its (upper-case) byte
    fn decode(code: u8) -> u8;

    /// Complement of a 2-bit code
    fn complement(code: u8) -> u8;

    /// Complement every symbol slot of a packed word.
    ///
    /// Slots above the k-mer length are complemented too; callers shift or
    /// mask them away.
    #[inline]
    fn complement_word(word: u64) -> u64 {
        let mut out = 0u64;
        for slot in 0..WORD_BITS / BITS_PER_SYMBOL {
            let shift = slot * BITS_PER_SYMBOL;
            let code = ((word >> shift) & 0b11) as u8;
            out |= (Self::complement(code) as u64) << shift;
        }
        out
    }
}

/// The nucleotide alphabet {A, C, G, T}, case-insensitive on input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dna;

impl Alphabet for Dna {
    #[inline]
    fn encode(symbol: u8) -> Option<u8> {
        encode_base(symbol).ok()
    }

    #[inline]
    fn decode(code: u8) -> u8 {
        decode_base(code)
    }

    #[inline]
    fn complement(code: u8) -> u8 {
        complement_base(code)
    }

    #[inline]
    fn complement_word(word: u64) -> u64 {
        // XOR with 0xAAAA... (10 repeating) flips A<->T, C<->G
        word ^ 0xAAAA_AAAA_AAAA_AAAAu64
    }
}

/// Encode a single DNA nucleotide to 2 bits
///
/// A -> 00, C -> 01, G -> 11, T -> 10
#[inline]
pub const fn encode_base(base: u8) -> Result<u8, EncodingError> {
    match base {
        b'A' | b'a' => Ok(0b00),
        b'C' | b'c' => Ok(0b01),
        b'G' | b'g' => Ok(0b11),
        b'T' | b't' => Ok(0b10),
        _ => Err(EncodingError::InvalidSymbol { symbol: base as char, position: 0 }),
    }
}

/// Decode a 2-bit value to DNA nucleotide (uppercase)
#[inline]
pub const fn decode_base(bits: u8) -> u8 {
    match bits & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b11 => b'G',
        _ => b'T',
    }
}

/// Get the complement of a DNA base (encoded)
#[inline]
pub const fn complement_base(bits: u8) -> u8 {
    // A(00) <-> T(10), C(01) <-> G(11)
    bits ^ 0b10
}
