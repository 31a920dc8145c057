use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Number of bits packed into each word.
pub const WORD_BITS: usize = 64;

/// Returns the number of words needed to hold `bits` bits.
pub fn words_for(bits: usize) -> usize {
    bits.div_ceil(WORD_BITS)
}

/// A fixed-width packed bit vector.
///
/// Bit `i` lives in word `i / 64` at position `i % 64` (least significant
/// bit first). Bits past `bits` in the last word are always zero, so two
/// vectors of the same width compare equal iff they carry the same bits.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawVector")]
pub struct BinaryVector {
    bits: usize,
    words: Vec<u64>,
}

#[derive(Deserialize)]
struct RawVector {
    bits: usize,
    words: Vec<u64>,
}

impl TryFrom<RawVector> for BinaryVector {
    type Error = IndexError;

    fn try_from(raw: RawVector) -> Result<Self, Self::Error> {
        Self::from_words(raw.bits, raw.words)
    }
}

impl BinaryVector {
    /// Creates an all-zero vector of the given width.
    pub fn zeros(bits: usize) -> Self {
        Self {
            bits,
            words: vec![0; words_for(bits)],
        }
    }

    /// Creates a vector from raw words.
    ///
    /// The word count must match `bits`, and any bits set past the width
    /// are rejected rather than silently dropped.
    pub fn from_words(bits: usize, words: Vec<u64>) -> Result<Self, IndexError> {
        if bits == 0 {
            return Err(IndexError::InvalidInput("zero-width vector".into()));
        }
        let want = words_for(bits);
        if words.len() != want {
            return Err(IndexError::InvalidInput(format!(
                "{} words for {bits} bits, want {want}",
                words.len()
            )));
        }
        if let Some(last) = words.last() {
            if last & !tail_mask(bits) != 0 {
                return Err(IndexError::InvalidInput(format!(
                    "bits set past width {bits}"
                )));
            }
        }
        Ok(Self { bits, words })
    }

    /// Parses the hex form produced by [`BinaryVector::to_hex`].
    pub fn from_hex(bits: usize, s: &str) -> Result<Self, IndexError> {
        if bits == 0 {
            return Err(IndexError::InvalidInput("zero-width vector".into()));
        }
        let bytes = hex::decode(s.trim())
            .map_err(|e| IndexError::InvalidInput(format!("hex: {e}")))?;
        if bytes.len() != bits.div_ceil(8) {
            return Err(IndexError::LengthMismatch {
                got: bytes.len() * 8,
                want: bits,
            });
        }

        let mut words = vec![0u64; words_for(bits)];
        for (i, b) in bytes.iter().enumerate() {
            words[i / 8] |= (*b as u64) << ((i % 8) * 8);
        }
        Self::from_words(bits, words)
    }

    /// Renders the vector as lowercase hex: each word as little-endian
    /// bytes, words in order, truncated to `ceil(bits / 8)` bytes.
    pub fn to_hex(&self) -> String {
        let n_bytes = self.bits.div_ceil(8);
        let bytes: Vec<u8> = self
            .words
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .take(n_bytes)
            .collect();
        hex::encode(bytes)
    }

    /// Returns the width in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Returns the packed words.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Returns the number of packed words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Returns bit `i`, or false when `i` is past the width.
    pub fn get(&self, i: usize) -> bool {
        if i >= self.bits {
            return false;
        }
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    /// Sets bit `i`. The caller guarantees `i < bits`.
    pub(crate) fn set(&mut self, i: usize) {
        debug_assert!(i < self.bits);
        self.words[i / WORD_BITS] |= 1 << (i % WORD_BITS);
    }

    /// Returns the number of set bits.
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }
}

fn tail_mask(bits: usize) -> u64 {
    match bits % WORD_BITS {
        0 => u64::MAX,
        r => (1u64 << r) - 1,
    }
}

impl fmt::Debug for BinaryVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinaryVector({}:{})", self.bits, self.to_hex())
    }
}

impl fmt::Display for BinaryVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
