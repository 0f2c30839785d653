//! Fixed-width unsigned integers and the bit source/sink capability.
//!
//! A value is stored in exactly `count` bits, least significant bit first.
//! `count == 0` stores nothing and reads back as 0. The tiered codec in
//! [`crate::varint`] is built from these two operations only.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::bit_buffer::{self, Word};
use crate::{Error, Result};

/// Something bits can be read from at a cursor.
pub trait BitSource {
    /// Reads exactly `count` bits into `buf` starting at bit `offset`.
    ///
    /// Fails with `PrematureEndOfStream` if fewer bits are available.
    fn read_bits_into(&mut self, buf: &mut [Word], offset: u64, count: u64) -> Result<()>;

    /// Bits left before the end, if the source knows. Lets readers reject
    /// oversized widths before allocating a buffer for them.
    fn remaining_bits(&mut self) -> Result<Option<u64>> {
        Ok(None)
    }
}

/// Something bits can be written to at a cursor.
pub trait BitSink {
    /// Writes exactly `count` bits from `buf` starting at bit `offset`.
    fn write_bits_from(&mut self, buf: &[Word], offset: u64, count: u64) -> Result<()>;
}

impl<T: BitSource + ?Sized> BitSource for &mut T {
    fn read_bits_into(&mut self, buf: &mut [Word], offset: u64, count: u64) -> Result<()> {
        (**self).read_bits_into(buf, offset, count)
    }

    fn remaining_bits(&mut self) -> Result<Option<u64>> {
        (**self).remaining_bits()
    }
}

impl<T: BitSink + ?Sized> BitSink for &mut T {
    fn write_bits_from(&mut self, buf: &[Word], offset: u64, count: u64) -> Result<()> {
        (**self).write_bits_from(buf, offset, count)
    }
}

/// Words of `value`, zero-padded to hold `count` bits.
pub(crate) fn to_words(value: &BigUint, count: u64) -> Result<Vec<Word>> {
    let mut words = value.to_u64_digits();
    words.resize(bit_buffer::words_for_bits(count)?.max(words.len()), 0);
    Ok(words)
}

/// Value of a little-endian word buffer.
pub(crate) fn from_words(words: &[Word]) -> BigUint {
    BigUint::from_bytes_le(&bit_buffer::words_to_bytes(words))
}

/// Writes `value` in exactly `count` bits.
///
/// Fails with `ValueTooWide` if `value >= 2^count`; nothing is written then.
pub fn encode<W: BitSink + ?Sized>(sink: &mut W, value: &BigUint, count: u64) -> Result<()> {
    let bits = value.bits();
    if bits > count {
        return Err(Error::ValueTooWide { bits, width: count });
    }
    if count == 0 {
        return Ok(());
    }
    let words = to_words(value, count)?;
    sink.write_bits_from(&words, 0, count)
}

/// Reads an unsigned integer of exactly `count` bits.
pub fn decode<R: BitSource + ?Sized>(source: &mut R, count: u64) -> Result<BigUint> {
    if count == 0 {
        return Ok(BigUint::zero());
    }
    if let Some(remaining) = source.remaining_bits()? {
        if count > remaining {
            return Err(Error::PrematureEndOfStream);
        }
    }
    let mut words = vec![0; bit_buffer::words_for_bits(count)?];
    source.read_bits_into(&mut words, 0, count)?;
    Ok(from_words(&words))
}

/// [`encode`] for values known to fit a machine word (`count <= 64`).
pub fn encode_u64<W: BitSink + ?Sized>(sink: &mut W, value: u64, count: u32) -> Result<()> {
    if count > 64 {
        return encode(sink, &BigUint::from(value), u64::from(count));
    }
    let bits = u64::from(u64::BITS - value.leading_zeros());
    if bits > u64::from(count) {
        return Err(Error::ValueTooWide { bits, width: u64::from(count) });
    }
    if count == 0 {
        return Ok(());
    }
    sink.write_bits_from(&[value], 0, u64::from(count))
}

/// [`decode`] for `count <= 64`.
pub fn decode_u64<R: BitSource + ?Sized>(source: &mut R, count: u32) -> Result<u64> {
    if count > 64 {
        return decode(source, u64::from(count))?
            .to_u64()
            .ok_or(Error::IntegerOverflow);
    }
    if count == 0 {
        return Ok(0);
    }
    let mut word = [0u64];
    source.read_bits_into(&mut word, 0, u64::from(count))?;
    Ok(word[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBits;

    fn round_trip(value: &BigUint, count: u64) -> BigUint {
        let mut bits = MemoryBits::new();
        encode(&mut bits, value, count).unwrap();
        assert_eq!(bits.bit_len(), count);
        bits.rewind();
        decode(&mut bits, count).unwrap()
    }

    #[test]
    fn zero_width_is_omitted() {
        let mut bits = MemoryBits::new();
        encode(&mut bits, &BigUint::zero(), 0).unwrap();
        assert_eq!(bits.bit_len(), 0);
        assert_eq!(decode(&mut bits, 0).unwrap(), BigUint::zero());
    }

    #[test]
    fn values_of_various_widths() {
        for (value, count) in [(0u64, 1u64), (1, 1), (5, 3), (0xAB, 8), (511, 9), (65_536, 17)] {
            let v = BigUint::from(value);
            assert_eq!(round_trip(&v, count), v, "{value} in {count} bits");
        }
        let big = (BigUint::from(1u8) << 200u32) - 1u8;
        assert_eq!(round_trip(&big, 200), big);
        assert_eq!(round_trip(&big, 333), big);
    }

    #[test]
    fn lsb_first_layout() {
        let mut bits = MemoryBits::new();
        encode(&mut bits, &BigUint::from(0b110u8), 3).unwrap();
        encode(&mut bits, &BigUint::from(1u8), 6).unwrap();
        assert_eq!(bits.into_bytes(), vec![0b0000_1110, 0]);
    }

    #[test]
    fn too_wide_value_rejected() {
        let mut bits = MemoryBits::new();
        assert_eq!(
            encode(&mut bits, &BigUint::from(8u8), 3).unwrap_err(),
            Error::ValueTooWide { bits: 4, width: 3 }
        );
        assert_eq!(
            encode_u64(&mut bits, 1, 0).unwrap_err(),
            Error::ValueTooWide { bits: 1, width: 0 }
        );
        assert_eq!(bits.bit_len(), 0);
    }

    #[test]
    fn oversized_read_fails_before_allocating() {
        let mut bits = MemoryBits::from_bytes(&[0xFF]);
        assert_eq!(decode(&mut bits, u64::MAX).unwrap_err(), Error::PrematureEndOfStream);
        assert_eq!(decode(&mut bits, 9).unwrap_err(), Error::PrematureEndOfStream);
        assert_eq!(bits.position(), 0);
        assert_eq!(decode(&mut bits, 8).unwrap(), BigUint::from(0xFFu8));
    }

    #[test]
    fn u64_helpers() {
        let mut bits = MemoryBits::new();
        encode_u64(&mut bits, u64::MAX, 64).unwrap();
        encode_u64(&mut bits, 0b101, 3).unwrap();
        bits.rewind();
        assert_eq!(decode_u64(&mut bits, 64).unwrap(), u64::MAX);
        assert_eq!(decode_u64(&mut bits, 3).unwrap(), 0b101);
        assert_eq!(decode_u64(&mut bits, 0).unwrap(), 0);
    }
}
