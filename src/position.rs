//! Bit cursor arithmetic.
//!
//! A position is kept as `(byte, bit)` with `bit` always in `0..8`, so the
//! stream can tell cheaply whether a move stays inside the cached byte.

use crate::{Error, Result};

/// A bit position inside a stream: byte offset plus intra-byte index.
///
/// Bit 0 of a byte is its least significant bit and the first one read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitPosition {
    byte: u64,
    bit: u8,
}

impl BitPosition {
    /// Position at bit 0.
    pub const ZERO: Self = Self { byte: 0, bit: 0 };

    /// Splits an absolute bit index into byte offset and bit index.
    #[inline]
    pub fn from_bit_index(index: u64) -> Self {
        Self { byte: index / 8, bit: (index % 8) as u8 }
    }

    /// Start of the given byte.
    #[inline]
    pub fn from_byte(byte: u64) -> Self {
        Self { byte, bit: 0 }
    }

    /// Absolute bit index `byte * 8 + bit`.
    ///
    /// Fails with `IntegerOverflow` for byte offsets beyond `u64::MAX / 8`.
    #[inline]
    pub fn bit_index(&self) -> Result<u64> {
        self.byte
            .checked_mul(8)
            .and_then(|b| b.checked_add(u64::from(self.bit)))
            .ok_or(Error::IntegerOverflow)
    }

    #[inline]
    pub fn byte(&self) -> u64 {
        self.byte
    }

    #[inline]
    pub fn bit(&self) -> u8 {
        self.bit
    }

    #[inline]
    pub fn is_byte_aligned(&self) -> bool {
        self.bit == 0
    }

    /// Moves forward by `bits`, re-normalising the bit index into `0..8`.
    pub fn advanced(&self, bits: u64) -> Result<Self> {
        let carry = u64::from(self.bit) + bits % 8;
        let byte = self
            .byte
            .checked_add(bits / 8)
            .and_then(|b| b.checked_add(carry / 8))
            .ok_or(Error::IntegerOverflow)?;
        Ok(Self { byte, bit: (carry % 8) as u8 })
    }

    /// Moves by a signed number of bits.
    ///
    /// Moving before bit 0 fails with `NegativePosition` carrying the
    /// would-be absolute index.
    pub fn offset_by(&self, delta: i64) -> Result<Self> {
        let target = i128::from(self.byte) * 8 + i128::from(self.bit) + i128::from(delta);
        if target < 0 {
            return Err(Error::NegativePosition(target));
        }
        let index = u64::try_from(target).map_err(|_| Error::IntegerOverflow)?;
        Ok(Self::from_bit_index(index))
    }

    /// Number of bytes touched by `[self, self + bits)`, counting partial ones.
    pub fn bytes_spanned(&self, bits: u64) -> Result<u64> {
        let total = bits.checked_add(u64::from(self.bit)).ok_or(Error::IntegerOverflow)?;
        Ok(total.div_ceil(8))
    }
}
