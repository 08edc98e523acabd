// Fixed-length bit list with SSZ-style serialization

use crate::error::AggregationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Fixed-length list of bits, one per committee member.
///
/// Bits are stored little-endian within each byte: bit `i` lives in byte
/// `i / 8` at position `i % 8`. Storage bytes past `len` are always clear.
///
/// The serialized form (see [`Bitlist::from_bytes`]) appends a single
/// sentinel bit right after the last data bit, which is how the list length
/// travels on the wire:
///
/// ```
/// use attestation_maxcover::Bitlist;
///
/// let bits = Bitlist::from_bytes(&[0b0000_1010, 0b1]).unwrap();
/// assert_eq!(bits.len(), 8);
/// assert_eq!(bits.count(), 2);
/// assert!(bits.get(1) && bits.get(3));
/// assert_eq!(bits.to_bytes(), vec![0b0000_1010, 0b1]);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Bitlist {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitlist {
    /// Creates an all-clear list of `len` bits.
    pub fn with_len(len: usize) -> Self {
        Self {
            bytes: vec![0u8; len.div_ceil(8)],
            len,
        }
    }

    /// Parses the serialized (sentinel-terminated) form.
    ///
    /// An empty slice decodes to the empty list. Any other slice must have a
    /// non-zero last byte, whose highest set bit marks the length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AggregationError> {
        let Some(&last) = bytes.last() else {
            return Ok(Self::default());
        };
        if last == 0 {
            return Err(AggregationError::MalformedBitlist {
                reason: "last byte is zero, length sentinel missing".to_string(),
            });
        }

        let sentinel = 7 - last.leading_zeros() as usize;
        let len = (bytes.len() - 1) * 8 + sentinel;

        let mut data = bytes.to_vec();
        if let Some(tail) = data.last_mut() {
            *tail &= !(1u8 << sentinel);
        }
        data.truncate(len.div_ceil(8));

        Ok(Self { bytes: data, len })
    }

    /// Returns the serialized form, including the length sentinel.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.bytes.clone();
        out.resize(self.len / 8 + 1, 0);
        out[self.len / 8] |= 1u8 << (self.len % 8);
        out
    }

    /// Creates a list of `len` bits with the given indices set.
    pub fn from_indices(len: usize, indices: &[usize]) -> Result<Self, AggregationError> {
        let mut bits = Self::with_len(len);
        for &index in indices {
            bits.set(index, true)?;
        }
        Ok(bits)
    }

    /// Number of bits in the list (not the number of set bits).
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns bit `index`; out-of-range indices read as clear.
    pub fn get(&self, index: usize) -> bool {
        index < self.len && (self.bytes[index / 8] >> (index % 8)) & 1 == 1
    }

    pub fn set(&mut self, index: usize, value: bool) -> Result<(), AggregationError> {
        if index >= self.len {
            return Err(AggregationError::BitIndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let mask = 1u8 << (index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
        Ok(())
    }

    /// Population count.
    pub fn count(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// True if no bit is set.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    /// Indices of set bits, ascending.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&i| self.get(i))
    }

    pub fn and(&self, other: &Self) -> Result<Self, AggregationError> {
        self.zip_with(other, |a, b| a & b)
    }

    pub fn or(&self, other: &Self) -> Result<Self, AggregationError> {
        self.zip_with(other, |a, b| a | b)
    }

    /// Bits set in `self` and clear in `other`.
    pub fn and_not(&self, other: &Self) -> Result<Self, AggregationError> {
        self.zip_with(other, |a, b| a & !b)
    }

    /// True if some bit is set in both lists.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.bytes
            .iter()
            .zip(&other.bytes)
            .any(|(a, b)| a & b != 0)
    }

    /// True if every bit set in `other` is also set in `self`.
    pub fn contains(&self, other: &Self) -> bool {
        other.bytes.iter().enumerate().all(|(i, b)| {
            let a = self.bytes.get(i).copied().unwrap_or(0);
            b & !a == 0
        })
    }

    /// Population count of `self AND NOT other`, without allocating.
    pub fn count_and_not(&self, other: &Self) -> usize {
        self.bytes
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let b = other.bytes.get(i).copied().unwrap_or(0);
                (a & !b).count_ones() as usize
            })
            .sum()
    }

    /// In-place OR. Callers guarantee equal lengths.
    pub(crate) fn union_with(&mut self, other: &Self) {
        debug_assert_eq!(self.len, other.len, "union of bitlists of different length");
        for (a, b) in self.bytes.iter_mut().zip(&other.bytes) {
            *a |= b;
        }
    }

    fn zip_with(&self, other: &Self, op: impl Fn(u8, u8) -> u8) -> Result<Self, AggregationError> {
        if self.len != other.len {
            // operand positions: self is 0, other is 1
            return Err(AggregationError::LengthMismatch {
                index: 1,
                expected: self.len,
                found: other.len,
            });
        }
        let bytes = self
            .bytes
            .iter()
            .zip(&other.bytes)
            .map(|(&a, &b)| op(a, b))
            .collect();
        Ok(Self {
            bytes,
            len: self.len,
        })
    }
}

impl fmt::Display for Bitlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for Bitlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = hex::encode(self.to_bytes());
        f.debug_struct("Bitlist")
            .field("len", &self.len)
            .field("count", &self.count())
            .field("bytes", &format_args!("0x{encoded}"))
            .finish()
    }
}

impl Serialize for Bitlist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_bytes().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bitlist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}
