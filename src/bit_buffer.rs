//! Bit-exact copies between byte storage and word buffers.
//!
//! Both sides use the same layout: logical bit `i` lives in unit `i / W` at
//! bit `i % W`, bit 0 least significant. A `[u64]` word buffer is therefore
//! bit-for-bit identical to its little-endian byte image, which is what lets
//! the stream move data between file bytes and word buffers at independent,
//! unaligned offsets.
//!
//! Copies run in chunks of up to 64 bits. Bits outside the target range are
//! never touched, bits beyond the source range are masked off.

use crate::{Error, Result};

/// Word type of in-memory bit buffers.
pub type Word = u64;

/// Bits per [`Word`].
pub const WORD_BITS: u32 = Word::BITS;

/// Mask with the low `n` bits set (`n <= 64`).
#[inline]
pub(crate) fn mask64(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Number of words needed for `bits` bits.
#[inline]
pub fn words_for_bits(bits: u64) -> Result<usize> {
    usize::try_from(bits.div_ceil(u64::from(WORD_BITS))).map_err(|_| Error::IntegerOverflow)
}

/// A storage unit of a bit buffer.
pub trait Unit: Copy {
    const BITS: u32;
    fn to_u64(self) -> u64;
    /// Truncating conversion.
    fn from_u64(value: u64) -> Self;
}

impl Unit for u8 {
    const BITS: u32 = 8;
    #[inline(always)]
    fn to_u64(self) -> u64 {
        u64::from(self)
    }
    #[inline(always)]
    fn from_u64(value: u64) -> Self {
        value as u8
    }
}

impl Unit for u32 {
    const BITS: u32 = 32;
    #[inline(always)]
    fn to_u64(self) -> u64 {
        u64::from(self)
    }
    #[inline(always)]
    fn from_u64(value: u64) -> Self {
        value as u32
    }
}

impl Unit for u64 {
    const BITS: u32 = 64;
    #[inline(always)]
    fn to_u64(self) -> u64 {
        self
    }
    #[inline(always)]
    fn from_u64(value: u64) -> Self {
        value
    }
}

/// Random access to the bits of a buffer.
pub trait BitStore {
    /// Capacity in bits.
    fn bit_len(&self) -> u64;

    /// Reads `n` bits (`1..=64`) starting at `offset`, LSB first.
    fn load(&self, offset: u64, n: u32) -> u64;

    /// Writes the low `n` bits (`1..=64`) of `value` starting at `offset`.
    /// All other bits of the buffer stay unchanged.
    fn store(&mut self, offset: u64, n: u32, value: u64);
}

impl<T: Unit> BitStore for [T] {
    #[inline]
    fn bit_len(&self) -> u64 {
        self.len() as u64 * u64::from(T::BITS)
    }

    fn load(&self, offset: u64, n: u32) -> u64 {
        debug_assert!((1..=64).contains(&n), "chunk must be 1..=64 bits, got {n}");
        let unit_bits = u64::from(T::BITS);
        let mut result = 0u64;
        let mut got = 0u32;
        while got < n {
            let at = offset + u64::from(got);
            let idx = (at / unit_bits) as usize;
            let shift = (at % unit_bits) as u32;
            let take = (T::BITS - shift).min(n - got);
            let part = (self[idx].to_u64() >> shift) & mask64(take);
            result |= part << got;
            got += take;
        }
        result
    }

    fn store(&mut self, offset: u64, n: u32, value: u64) {
        debug_assert!((1..=64).contains(&n), "chunk must be 1..=64 bits, got {n}");
        let unit_bits = u64::from(T::BITS);
        let mut put = 0u32;
        while put < n {
            let at = offset + u64::from(put);
            let idx = (at / unit_bits) as usize;
            let shift = (at % unit_bits) as u32;
            let take = (T::BITS - shift).min(n - put);
            let m = mask64(take) << shift;
            let unit = self[idx].to_u64();
            let bits = ((value >> put) & mask64(take)) << shift;
            self[idx] = T::from_u64((unit & !m) | bits);
            put += take;
        }
    }
}

/// Checks that `offset + len` bits fit into a buffer of `available` bits.
pub fn ensure_capacity(offset: u64, len: u64, available: u64) -> Result<()> {
    let needed = offset.checked_add(len).ok_or(Error::IntegerOverflow)?;
    if needed > available {
        return Err(Error::BufferTooSmall { needed, available });
    }
    Ok(())
}

/// Copies `len` bits from `src` at `src_offset` into `dst` at `dst_offset`.
///
/// Offsets are independent and need not be byte or word aligned. Bits of
/// `dst` outside `[dst_offset, dst_offset + len)` are preserved.
pub fn copy_bits<S, D>(src: &S, src_offset: u64, dst: &mut D, dst_offset: u64, len: u64) -> Result<()>
where
    S: BitStore + ?Sized,
    D: BitStore + ?Sized,
{
    ensure_capacity(src_offset, len, src.bit_len())?;
    ensure_capacity(dst_offset, len, dst.bit_len())?;
    let mut done = 0u64;
    while done < len {
        let n = (len - done).min(64) as u32;
        let chunk = src.load(src_offset + done, n);
        dst.store(dst_offset + done, n, chunk);
        done += u64::from(n);
    }
    Ok(())
}

/// Little-endian byte image of a word buffer.
pub fn words_to_bytes(words: &[Word]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Word buffer holding the given little-endian bytes, zero-padded.
pub fn bytes_to_words(bytes: &[u8]) -> Vec<Word> {
    bytes
        .chunks(8)
        .map(|chunk| {
            let mut le = [0u8; 8];
            le[..chunk.len()].copy_from_slice(chunk);
            Word::from_le_bytes(le)
        })
        .collect()
}
