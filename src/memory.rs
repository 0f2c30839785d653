//! In-memory bit buffer with a cursor.
//!
//! Same bit layout as a [`crate::BitStream`] over a byte store, so the byte
//! image of a `MemoryBits` can be written to a file and read back by a stream
//! (and vice versa). Used to run the codec without any storage.

use crate::bit_buffer::{self, Word};
use crate::fixed_width::{BitSink, BitSource};
use crate::{Error, Result};

/// Growable word buffer with a bit cursor and a logical length in bits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryBits {
    words: Vec<Word>,
    /// Logical length in bits; bits at or beyond it are zero.
    len: u64,
    pos: u64,
}

impl MemoryBits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader over stored bytes; the cursor starts at bit 0.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            words: bit_buffer::bytes_to_words(bytes),
            len: bytes.len() as u64 * 8,
            pos: 0,
        }
    }

    /// Logical length in bits.
    pub fn bit_len(&self) -> u64 {
        self.len
    }

    /// Cursor position in bits.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Moves the cursor. Positions past the end are allowed; writing there
    /// zero-fills the gap.
    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Bit at the cursor, `None` at the end. Advances on success.
    pub fn read_bit(&mut self) -> Option<bool> {
        if self.pos >= self.len {
            return None;
        }
        let bit = (self.words[(self.pos / 64) as usize] >> (self.pos % 64)) & 1 == 1;
        self.pos += 1;
        Some(bit)
    }

    pub fn write_bit(&mut self, value: bool) -> Result<()> {
        self.write_bits_from(&[Word::from(value)], 0, 1)
    }

    /// Drops everything from bit `len` on.
    pub fn truncate(&mut self, len: u64) {
        if len >= self.len {
            return;
        }
        let keep = (len.div_ceil(64)) as usize;
        self.words.truncate(keep);
        if len % 64 != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= bit_buffer::mask64((len % 64) as u32);
            }
        }
        self.len = len;
        self.pos = self.pos.min(len);
    }

    /// Backing words; bits at or beyond [`Self::bit_len`] are zero.
    pub fn as_words(&self) -> &[Word] {
        &self.words
    }

    /// Little-endian byte image, `ceil(bit_len / 8)` bytes; unused high bits
    /// of the last byte are zero.
    pub fn into_bytes(self) -> Vec<u8> {
        let mut bytes = bit_buffer::words_to_bytes(&self.words);
        bytes.truncate(self.len.div_ceil(8) as usize);
        bytes
    }

    fn reserve_bits(&mut self, end: u64) -> Result<()> {
        let words = bit_buffer::words_for_bits(end)?;
        if words > self.words.len() {
            self.words.resize(words, 0);
        }
        Ok(())
    }
}

impl BitSource for MemoryBits {
    fn read_bits_into(&mut self, buf: &mut [Word], offset: u64, count: u64) -> Result<()> {
        let end = self.pos.checked_add(count).ok_or(Error::IntegerOverflow)?;
        if end > self.len {
            return Err(Error::PrematureEndOfStream);
        }
        bit_buffer::copy_bits(&self.words[..], self.pos, buf, offset, count)?;
        self.pos = end;
        Ok(())
    }

    fn remaining_bits(&mut self) -> Result<Option<u64>> {
        Ok(Some(self.len.saturating_sub(self.pos)))
    }
}

impl BitSink for MemoryBits {
    fn write_bits_from(&mut self, buf: &[Word], offset: u64, count: u64) -> Result<()> {
        bit_buffer::ensure_capacity(offset, count, bit_buffer::BitStore::bit_len(buf))?;
        let end = self.pos.checked_add(count).ok_or(Error::IntegerOverflow)?;
        self.reserve_bits(end)?;
        bit_buffer::copy_bits(buf, offset, &mut self.words[..], self.pos, count)?;
        self.pos = end;
        self.len = self.len.max(end);
        Ok(())
    }
}
