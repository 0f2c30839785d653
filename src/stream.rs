//! Bit-addressable random-access stream over a byte store.
//!
//! The stream keeps a bit cursor and a one-byte write-back cache for the byte
//! under it. Sub-byte reads and writes work on the cache; the byte goes back
//! to storage when the cursor leaves it, on [`BitStream::flush`] and on
//! [`BitStream::close`]. So there is never more than one byte of pending
//! writes.
//!
//! Every public operation takes the stream's lock for its whole duration;
//! a `BitStream` can be shared between threads behind an `Arc`. The only
//! work done outside the lock is rearranging freshly fetched bytes into the
//! caller's word buffer in [`BitStream::read`] and [`BitStream::read_fully`].
//!
//! Dropping a stream without `flush`/`close` loses a pending partial byte.
//!
//! # Beispiel
//!
//! ```
//! use bitfile::{BitStream, CodecParams};
//! use num_bigint::BigUint;
//!
//! let stream = BitStream::in_memory();
//! stream.write_bit(true).unwrap();
//! stream.write_varint(&BigUint::from(264u32), CodecParams::default()).unwrap();
//! stream.truncate_to_size(false).unwrap();
//!
//! stream.seek(0).unwrap();
//! assert_eq!(stream.read_bit().unwrap(), Some(true));
//! assert_eq!(stream.read_varint(CodecParams::default()).unwrap(), BigUint::from(264u32));
//! assert_eq!(stream.into_inner().unwrap().into_inner().len(), 3);
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace, warn};
use num_bigint::BigUint;
use parking_lot::{Mutex, MutexGuard};

use crate::backing::Backing;
use crate::bit_buffer::{self, BitStore, Word};
use crate::cache::{low_mask, ByteCache};
use crate::codepoint::{self, ByteIo};
use crate::fixed_width::{self, BitSink, BitSource};
use crate::params::CodecParams;
use crate::position::BitPosition;
use crate::varint;
use crate::{Error, Result};

/// Raw bytes fetched for a bulk read, copied into the caller's buffer after
/// the lock is released.
struct Fetched {
    bytes: Vec<u8>,
    /// Bit index of the first requested bit within `bytes[0]`.
    first_bit: u8,
    /// Bits actually available, `<=` the requested length.
    bits: u64,
}

/// State guarded by the stream lock.
struct StreamCore<S> {
    storage: S,
    pos: BitPosition,
    cache: ByteCache,
    /// Byte offset of the storage cursor, `None` when unknown.
    storage_pos: Option<u64>,
}

impl<S: Backing> StreamCore<S> {
    fn new(storage: S) -> Self {
        Self { storage, pos: BitPosition::ZERO, cache: ByteCache::EMPTY, storage_pos: None }
    }

    // --- Storage access (seeks only when the storage cursor is elsewhere) ---

    fn seek_storage(&mut self, byte: u64) -> Result<()> {
        if self.storage_pos != Some(byte) {
            trace!("storage seek {:?} -> {byte}", self.storage_pos);
            self.storage_pos = None;
            self.storage.seek(SeekFrom::Start(byte))?;
            self.storage_pos = Some(byte);
        }
        Ok(())
    }

    /// Reads as many bytes as storage has at `byte`, up to `buf.len()`.
    fn read_storage(&mut self, byte: u64, buf: &mut [u8]) -> Result<usize> {
        self.seek_storage(byte)?;
        let mut got = 0;
        while got < buf.len() {
            match self.storage.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.storage_pos = None;
                    return Err(e.into());
                }
            }
        }
        self.storage_pos = Some(byte + got as u64);
        Ok(got)
    }

    fn write_storage(&mut self, byte: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.seek_storage(byte)?;
        if let Err(e) = self.storage.write_all(data) {
            self.storage_pos = None;
            return Err(e.into());
        }
        self.storage_pos = Some(byte + data.len() as u64);
        Ok(())
    }

    fn stored_byte(&mut self, byte: u64) -> Result<Option<u8>> {
        let mut buf = [0u8];
        Ok((self.read_storage(byte, &mut buf)? == 1).then_some(buf[0]))
    }

    // --- Cache ---

    /// Completes the cache from storage. False if the byte is past the end
    /// and holds no pending bits.
    fn fill_cache(&mut self) -> Result<bool> {
        if self.cache.is_complete() {
            return Ok(true);
        }
        match self.stored_byte(self.pos.byte())? {
            Some(stored) => self.cache.fill_from(stored),
            // Wie in write_changes: ein offenes Byte hinter dem Ende ist mit 0 aufgefuellt.
            None if self.cache.is_dirty() => self.cache.fill_from(0),
            None => return Ok(false),
        }
        Ok(true)
    }

    /// Writes dirty cached bits back, merged with the bits already stored.
    fn write_changes(&mut self) -> Result<()> {
        if !self.cache.is_dirty() {
            return Ok(());
        }
        if !self.cache.is_complete() {
            // Hinter dem Ende: unbekannte Bits werden 0.
            let stored = self.stored_byte(self.pos.byte())?.unwrap_or(0);
            self.cache.fill_from(stored);
        }
        trace!("write back byte {} = {:#04x}", self.pos.byte(), self.cache.byte());
        self.write_storage(self.pos.byte(), &[self.cache.byte()])?;
        self.cache.mark_clean();
        Ok(())
    }

    /// Moves the cursor; leaving the current byte flushes and drops the cache.
    fn move_to(&mut self, target: BitPosition) -> Result<()> {
        if target.byte() != self.pos.byte() {
            self.write_changes()?;
            self.cache.invalidate();
        }
        self.pos = target;
        Ok(())
    }

    fn advance(&mut self, bits: u64) -> Result<()> {
        let target = self.pos.advanced(bits)?;
        self.move_to(target)
    }

    /// Bits between the cursor and the end of the data, counting a pending
    /// byte that has not reached storage yet.
    fn available_bits(&mut self) -> Result<u64> {
        let mut len = self.storage.byte_len()?;
        if self.cache.is_dirty() {
            len = len.max(self.pos.byte() + 1);
        }
        let end = len.checked_mul(8).ok_or(Error::IntegerOverflow)?;
        Ok(end.saturating_sub(self.pos.bit_index()?))
    }

    // --- Bits and bytes ---

    fn read_bit(&mut self) -> Result<Option<bool>> {
        let index = self.pos.bit();
        if self.cache.bit(index).is_none() && !self.fill_cache()? {
            return Ok(None);
        }
        let Some(value) = self.cache.bit(index) else {
            return Ok(None);
        };
        self.advance(1)?;
        Ok(Some(value))
    }

    fn write_bit(&mut self, value: bool) -> Result<()> {
        self.cache.set_bit(self.pos.bit(), value);
        self.advance(1)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.pos.is_byte_aligned() {
            if self.cache.is_complete() {
                let byte = self.cache.byte();
                self.advance(8)?;
                return Ok(Some(byte));
            }
            if !self.cache.is_dirty() {
                let Some(byte) = self.stored_byte(self.pos.byte())? else {
                    return Ok(None);
                };
                self.cache.invalidate();
                self.pos = self.pos.advanced(8)?;
                return Ok(Some(byte));
            }
        }
        if self.available_bits()? < 8 {
            return Ok(None);
        }
        let mut word = [0 as Word];
        self.read_bits_into(&mut word, 0, 8)?;
        Ok(Some(word[0] as u8))
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.pos.is_byte_aligned() {
            // Ganzes Byte wird ueberschrieben: offene Cache-Bits sind damit hinfaellig.
            self.write_storage(self.pos.byte(), &[byte])?;
            self.cache.invalidate();
            self.pos = self.pos.advanced(8)?;
            return Ok(());
        }
        self.write_words(&[Word::from(byte)], 0, 8)
    }

    // --- Bulk transfer ---

    /// Fetches the raw bytes covering up to `len` bits at the cursor and
    /// advances the cursor past the bits obtained. `None` if no bit is left.
    fn fetch(&mut self, len: u64) -> Result<Option<Fetched>> {
        let start = self.pos;
        if len == 0 {
            return Ok(Some(Fetched { bytes: Vec::new(), first_bit: 0, bits: 0 }));
        }
        // Offene Bits zuerst zurueckschreiben, dann ist der Speicher die einzige Quelle.
        self.write_changes()?;

        let stored = self.storage.byte_len()?;
        let want = start.bytes_spanned(len)?.min(stored.saturating_sub(start.byte()));
        let mut bytes = vec![0u8; usize::try_from(want).map_err(|_| Error::IntegerOverflow)?];
        let got = self.read_storage(start.byte(), &mut bytes)?;
        bytes.truncate(got);

        let available = (got as u64 * 8).saturating_sub(u64::from(start.bit()));
        if available == 0 {
            return Ok(None);
        }
        let bits = available.min(len);
        let end = start.advanced(bits)?;
        self.move_to(end)?;
        if !self.cache.is_complete() {
            if let Some(&byte) = bytes.get((end.byte() - start.byte()) as usize) {
                self.cache = ByteCache::loaded(byte);
            }
        }
        Ok(Some(Fetched { bytes, first_bit: start.bit(), bits }))
    }

    /// Writes `len` bits from `buf` at `offset` to the cursor position.
    fn write_words(&mut self, buf: &[Word], offset: u64, len: u64) -> Result<()> {
        bit_buffer::ensure_capacity(offset, len, buf.bit_len())?;
        if len == 0 {
            return Ok(());
        }
        let start = self.pos;
        let first = u64::from(start.bit());

        if first + len < 8 {
            // Bleibt im aktuellen Byte: nur Cache.
            let chunk = buf.load(offset, len as u32) as u8;
            let mask = low_mask(len as u32) << first;
            self.cache.set_bits(mask, chunk << first);
            self.pos = start.advanced(len)?;
            return Ok(());
        }

        let span = usize::try_from(start.bytes_spanned(len)?).map_err(|_| Error::IntegerOverflow)?;
        let mut bytes = vec![0u8; span];
        bit_buffer::copy_bits(buf, offset, &mut bytes[..], first, len)?;
        if first > 0 {
            let prefix = low_mask(first as u32);
            if !self.cache.covers(prefix) {
                self.fill_cache()?;
            }
            bytes[0] |= self.cache.byte() & prefix;
        }

        let total = first + len;
        let full = (total / 8) as usize;
        let tail = (total % 8) as u32;
        self.write_storage(start.byte(), &bytes[..full])?;

        // Das alte Cache-Byte ist komplett ueberschrieben; der Rest wartet im Cache.
        self.cache = if tail > 0 { ByteCache::pending(bytes[full], tail) } else { ByteCache::EMPTY };
        self.pos = start.advanced(len)?;
        Ok(())
    }

    // --- Size ---

    fn truncate_to_size(&mut self, fill_with_ones: bool) -> Result<()> {
        let len = if self.pos.is_byte_aligned() {
            // Das Byte unter dem Cursor faellt weg, also auch seine offenen Bits.
            self.cache.invalidate();
            self.pos.byte()
        } else {
            let rest = !low_mask(u32::from(self.pos.bit()));
            self.cache.set_bits(rest, if fill_with_ones { 0xFF } else { 0 });
            self.write_changes()?;
            self.pos.byte() + 1
        };
        debug!("truncate to {len} bytes (cursor at bit {})", self.pos.bit_index()?);
        self.storage.truncate(len)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.write_changes()?;
        self.storage.flush()?;
        Ok(())
    }
}

impl<S: Backing> BitSource for StreamCore<S> {
    fn read_bits_into(&mut self, buf: &mut [Word], offset: u64, count: u64) -> Result<()> {
        bit_buffer::ensure_capacity(offset, count, buf.bit_len())?;
        let Some(fetched) = self.fetch(count)? else {
            return Err(Error::PrematureEndOfStream);
        };
        bit_buffer::copy_bits(&fetched.bytes[..], u64::from(fetched.first_bit), buf, offset, fetched.bits)?;
        if fetched.bits < count {
            return Err(Error::PrematureEndOfStream);
        }
        Ok(())
    }

    fn remaining_bits(&mut self) -> Result<Option<u64>> {
        Ok(Some(self.available_bits()?))
    }
}

impl<S: Backing> BitSink for StreamCore<S> {
    fn write_bits_from(&mut self, buf: &[Word], offset: u64, count: u64) -> Result<()> {
        self.write_words(buf, offset, count)
    }
}

impl<S: Backing> ByteIo for StreamCore<S> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        self.read_byte()
    }

    fn put_byte(&mut self, byte: u8) -> Result<()> {
        self.write_byte(byte)
    }
}

/// Random-access bit stream over a [`Backing`] byte store.
///
/// Bit 0 of every byte is its least significant bit and comes first.
pub struct BitStream<S: Backing> {
    inner: Mutex<StreamCore<S>>,
}

impl BitStream<File> {
    /// Opens `path` for reading and writing, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path)?;
        debug!("opened {} read-write", path.display());
        Ok(Self::new(file))
    }

    /// Opens an existing file read-only; writes fail with an I/O error.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!("opened {} read-only", path.display());
        Ok(Self::new(file))
    }

    /// Creates `path`, discarding any previous content.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(true).open(path)?;
        debug!("created {}", path.display());
        Ok(Self::new(file))
    }
}

impl BitStream<Cursor<Vec<u8>>> {
    /// Empty stream backed by memory.
    pub fn in_memory() -> Self {
        Self::new(Cursor::new(Vec::new()))
    }

    /// Memory-backed stream over existing bytes, cursor at bit 0.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(Cursor::new(bytes))
    }
}

impl<S: Backing> BitStream<S> {
    /// Wraps a backing store. The cursor starts at bit 0.
    pub fn new(storage: S) -> Self {
        Self { inner: Mutex::new(StreamCore::new(storage)) }
    }

    fn lock(&self) -> MutexGuard<'_, StreamCore<S>> {
        self.inner.lock()
    }

    // --- Cursor ---

    /// Moves the cursor to absolute bit `bit_pos`. Positions past the end are
    /// allowed; writing there zero-fills the gap.
    pub fn seek(&self, bit_pos: u64) -> Result<()> {
        self.lock().move_to(BitPosition::from_bit_index(bit_pos))
    }

    /// Moves the cursor by `delta` bits. Fails with `NegativePosition` before
    /// anything changes if the target is before bit 0.
    pub fn seek_relative(&self, delta: i64) -> Result<()> {
        let mut core = self.lock();
        let target = core.pos.offset_by(delta)?;
        core.move_to(target)
    }

    /// Moves the cursor to the start of byte `byte`.
    pub fn seek_byte(&self, byte: u64) -> Result<()> {
        self.lock().move_to(BitPosition::from_byte(byte))
    }

    /// Absolute bit index of the cursor.
    pub fn bit_position(&self) -> Result<u64> {
        self.lock().pos.bit_index()
    }

    /// Byte offset of the cursor; the bit index within that byte is dropped.
    pub fn byte_position(&self) -> u64 {
        self.lock().pos.byte()
    }

    /// Cursor as byte offset and bit index.
    pub fn position(&self) -> BitPosition {
        self.lock().pos
    }

    // --- Size ---

    /// Storage length in bytes, including a pending byte not yet written back.
    pub fn byte_len(&self) -> Result<u64> {
        let mut core = self.lock();
        core.write_changes()?;
        Ok(core.storage.byte_len()?)
    }

    /// Cuts the storage right after the cursor's byte.
    ///
    /// If the cursor is inside a byte, its remaining bits are first set to
    /// `fill_with_ones` and the byte is kept; otherwise the storage ends at
    /// the cursor.
    pub fn truncate_to_size(&self, fill_with_ones: bool) -> Result<()> {
        self.lock().truncate_to_size(fill_with_ones)
    }

    /// Writes a pending partial byte back and flushes the backing store.
    pub fn flush(&self) -> Result<()> {
        self.lock().flush()
    }

    /// Flushes, then releases the backing store.
    ///
    /// Release is attempted even if the flush failed; the storage is dropped
    /// either way. The first error is returned.
    pub fn close(self) -> Result<()> {
        let mut core = self.inner.into_inner();
        let flushed = core.write_changes();
        let released = core.storage.release();
        if let Err(e) = &released {
            warn!("releasing backing store failed: {e}");
        }
        debug!("closed stream at bit {:?}", core.pos.bit_index().ok());
        drop(core);
        flushed.and(released.map_err(Error::from))
    }

    /// Flushes and hands back the backing store.
    pub fn into_inner(self) -> Result<S> {
        let mut core = self.inner.into_inner();
        core.flush()?;
        Ok(core.storage)
    }

    // --- Bits and bytes ---

    /// Reads one bit; `None` at the end of the data (cursor unchanged).
    pub fn read_bit(&self) -> Result<Option<bool>> {
        self.lock().read_bit()
    }

    pub fn write_bit(&self, value: bool) -> Result<()> {
        self.lock().write_bit(value)
    }

    /// Reads 8 bits; `None` if fewer than 8 are left (cursor unchanged).
    pub fn read_byte(&self) -> Result<Option<u8>> {
        self.lock().read_byte()
    }

    pub fn write_byte(&self, byte: u8) -> Result<()> {
        self.lock().write_byte(byte)
    }

    /// Reads one UTF-8 encoded scalar value; `None` at the end of the data.
    pub fn read_char(&self) -> Result<Option<char>> {
        codepoint::read_char(&mut *self.lock())
    }

    pub fn write_char(&self, c: char) -> Result<()> {
        codepoint::write_char(&mut *self.lock(), c)
    }

    // --- Bulk transfer ---

    /// Reads up to `len` bits into `buf` starting at bit `offset` of `buf`.
    ///
    /// Returns the number of bits obtained, or `None` if not a single bit was
    /// left. A short read is not an error. Bits of `buf` outside the
    /// transferred range are left alone.
    pub fn read(&self, buf: &mut [Word], offset: u64, len: u64) -> Result<Option<u64>> {
        bit_buffer::ensure_capacity(offset, len, buf.bit_len())?;
        let fetched = self.lock().fetch(len)?;
        let Some(fetched) = fetched else {
            return Ok(None);
        };
        // Reines Umkopieren im Speicher, ausserhalb des Locks.
        bit_buffer::copy_bits(&fetched.bytes[..], u64::from(fetched.first_bit), buf, offset, fetched.bits)?;
        Ok(Some(fetched.bits))
    }

    /// Writes `len` bits from `buf` starting at bit `offset` of `buf`.
    ///
    /// A trailing partial byte stays in the cache until the cursor leaves it.
    pub fn write(&self, buf: &[Word], offset: u64, len: u64) -> Result<()> {
        self.lock().write_words(buf, offset, len)
    }

    /// Reads exactly `len` bits or fails with `PrematureEndOfStream`; on
    /// failure the cursor is past the bits that were read.
    pub fn read_fully(&self, buf: &mut [Word], offset: u64, len: u64) -> Result<()> {
        bit_buffer::ensure_capacity(offset, len, buf.bit_len())?;
        let mut chunks = Vec::new();
        let mut done = 0;
        {
            let mut core = self.lock();
            while done < len {
                match core.fetch(len - done)? {
                    Some(fetched) if fetched.bits > 0 => {
                        done += fetched.bits;
                        chunks.push(fetched);
                    }
                    _ => break,
                }
            }
        }
        let mut at = offset;
        for fetched in &chunks {
            bit_buffer::copy_bits(&fetched.bytes[..], u64::from(fetched.first_bit), buf, at, fetched.bits)?;
            at += fetched.bits;
        }
        if done < len {
            return Err(Error::PrematureEndOfStream);
        }
        Ok(())
    }

    /// Writes exactly `len` bits.
    pub fn write_fully(&self, buf: &[Word], offset: u64, len: u64) -> Result<()> {
        self.write(buf, offset, len)
    }

    // --- Integers ---

    /// Reads an unsigned integer of exactly `count` bits.
    pub fn read_bits(&self, count: u64) -> Result<BigUint> {
        fixed_width::decode(&mut *self.lock(), count)
    }

    /// Writes `value` in exactly `count` bits.
    pub fn write_bits(&self, value: &BigUint, count: u64) -> Result<()> {
        fixed_width::encode(&mut *self.lock(), value, count)
    }

    /// [`Self::read_bits`] for `count <= 64`.
    pub fn read_u64(&self, count: u32) -> Result<u64> {
        fixed_width::decode_u64(&mut *self.lock(), count)
    }

    /// [`Self::write_bits`] for machine-word values.
    pub fn write_u64(&self, value: u64, count: u32) -> Result<()> {
        fixed_width::encode_u64(&mut *self.lock(), value, count)
    }

    /// Reads a tiered variable-length integer.
    pub fn read_varint(&self, params: CodecParams) -> Result<BigUint> {
        varint::decode(&mut *self.lock(), params)
    }

    /// Writes a tiered variable-length integer.
    pub fn write_varint(&self, value: &BigUint, params: CodecParams) -> Result<()> {
        varint::encode(&mut *self.lock(), value, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Memory backing that counts reads and can fail on release.
    #[derive(Clone, Default)]
    struct Probe {
        data: Rc<RefCell<Cursor<Vec<u8>>>>,
        reads: Rc<Cell<usize>>,
        fail_release: bool,
    }

    impl Probe {
        fn contents(&self) -> Vec<u8> {
            self.data.borrow().get_ref().clone()
        }
    }

    impl Read for Probe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.set(self.reads.get() + 1);
            self.data.borrow_mut().read(buf)
        }
    }

    impl Write for Probe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for Probe {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.data.borrow_mut().seek(pos)
        }
    }

    impl Backing for Probe {
        fn byte_len(&mut self) -> io::Result<u64> {
            self.data.borrow_mut().byte_len()
        }
        fn truncate(&mut self, len: u64) -> io::Result<()> {
            self.data.borrow_mut().truncate(len)
        }
        fn release(&mut self) -> io::Result<()> {
            if self.fail_release {
                return Err(io::Error::new(io::ErrorKind::Other, "release refused"));
            }
            Ok(())
        }
    }

    fn bytes_of(stream: BitStream<Cursor<Vec<u8>>>) -> Vec<u8> {
        stream.into_inner().unwrap().into_inner()
    }

    #[test]
    fn stream_is_sync() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<BitStream<Cursor<Vec<u8>>>>();
        assert_sync::<BitStream<File>>();
    }

    #[test]
    fn written_bits_are_read_from_cache() {
        let probe = Probe::default();
        let stream = BitStream::new(probe.clone());
        stream.write_bit(true).unwrap();
        stream.write_bit(false).unwrap();
        stream.seek(0).unwrap();
        assert_eq!(stream.read_bit().unwrap(), Some(true));
        assert_eq!(stream.read_bit().unwrap(), Some(false));
        assert_eq!(probe.reads.get(), 0);
        assert!(probe.contents().is_empty());
    }

    #[test]
    fn leaving_the_byte_flushes() {
        let probe = Probe::default();
        let stream = BitStream::new(probe.clone());
        for _ in 0..3 {
            stream.write_bit(true).unwrap();
        }
        stream.seek(16).unwrap();
        assert_eq!(probe.contents(), vec![0b0000_0111]);
    }

    #[test]
    fn crossing_a_byte_boundary_flushes() {
        let probe = Probe::default();
        let stream = BitStream::new(probe.clone());
        for i in 0..9 {
            stream.write_bit(i % 2 == 0).unwrap();
        }
        assert_eq!(probe.contents(), vec![0b0101_0101]);
        assert_eq!(stream.bit_position().unwrap(), 9);
    }

    #[test]
    fn partial_write_keeps_stored_bits() {
        let stream = BitStream::from_bytes(vec![0xFF, 0xFF]);
        stream.seek(3).unwrap();
        stream.write_bit(false).unwrap();
        stream.seek(12).unwrap();
        stream.write_bit(false).unwrap();
        assert_eq!(bytes_of(stream), vec![0b1111_0111, 0b1110_1111]);
    }

    #[test]
    fn truncate_keeps_partial_byte() {
        let stream = BitStream::in_memory();
        for bit in [true, false, true] {
            stream.write_bit(bit).unwrap();
        }
        stream.truncate_to_size(false).unwrap();
        assert_eq!(stream.byte_len().unwrap(), 1);
        assert_eq!(stream.bit_position().unwrap(), 3);
        assert_eq!(bytes_of(stream), vec![0b0000_0101]);
    }

    #[test]
    fn truncate_fills_with_ones() {
        let stream = BitStream::from_bytes(vec![0; 4]);
        for bit in [true, false, true] {
            stream.write_bit(bit).unwrap();
        }
        stream.truncate_to_size(true).unwrap();
        assert_eq!(bytes_of(stream), vec![0b1111_1101]);
    }

    #[test]
    fn aligned_truncate_drops_cursor_byte() {
        let stream = BitStream::from_bytes(vec![1, 2, 3, 4]);
        stream.seek_byte(2).unwrap();
        stream.write_bit(true).unwrap();
        stream.seek_byte(2).unwrap();
        stream.truncate_to_size(true).unwrap();
        assert_eq!(bytes_of(stream), vec![1, 2]);
    }

    #[test]
    fn end_of_stream_is_not_an_error() {
        let stream = BitStream::in_memory();
        assert_eq!(stream.read_bit().unwrap(), None);
        assert_eq!(stream.bit_position().unwrap(), 0);
        assert_eq!(stream.read_byte().unwrap(), None);
        assert_eq!(stream.read_char().unwrap(), None);

        let stream = BitStream::from_bytes(vec![0xAB]);
        stream.seek(3).unwrap();
        let mut buf = [0 as Word];
        assert_eq!(stream.read(&mut buf, 0, 16).unwrap(), Some(5));
        assert_eq!(buf[0], 0xAB >> 3);
        assert_eq!(stream.bit_position().unwrap(), 8);
        assert_eq!(stream.read(&mut buf, 0, 16).unwrap(), None);
    }

    #[test]
    fn read_fully_reports_premature_end() {
        let stream = BitStream::from_bytes(vec![0xFF]);
        let mut buf = [0 as Word; 2];
        assert_eq!(stream.read_fully(&mut buf, 0, 9).unwrap_err(), Error::PrematureEndOfStream);
        assert_eq!(buf[0], 0xFF);
        assert_eq!(stream.bit_position().unwrap(), 8);
    }

    #[test]
    fn zero_length_read_at_unaligned_cursor() {
        let stream = BitStream::from_bytes(vec![0xFF; 4]);
        let mut buf = [0 as Word];
        stream.seek(3).unwrap();
        assert_eq!(stream.read(&mut buf, 0, 0).unwrap(), Some(0));
        assert_eq!(stream.read_bits(0).unwrap(), BigUint::default());
        stream.read_fully(&mut buf, 0, 0).unwrap();
        assert_eq!(stream.bit_position().unwrap(), 3);
        assert_eq!(buf[0], 0);
    }

    #[test]
    fn pending_byte_past_end_reads_as_zero_filled() {
        let stream = BitStream::in_memory();
        stream.write_bit(true).unwrap();
        stream.seek(0).unwrap();
        let bits: Vec<Option<bool>> = (0..9).map(|_| stream.read_bit().unwrap()).collect();
        let mut expected = vec![Some(true)];
        expected.extend([Some(false); 7]);
        expected.push(None);
        assert_eq!(bits, expected);

        let stream = BitStream::in_memory();
        stream.write_bit(true).unwrap();
        stream.seek(0).unwrap();
        assert_eq!(stream.read_bit().unwrap(), Some(true));
        assert_eq!(stream.read_bit().unwrap(), Some(false));
        stream.seek(0).unwrap();
        assert_eq!(stream.read_byte().unwrap(), Some(1));
        assert_eq!(bytes_of(stream), vec![1]);
    }

    #[test]
    fn read_fully_fills_buffer_in_one_call() {
        let stream = BitStream::from_bytes(vec![0xAB, 0xCD, 0xEF]);
        stream.seek(4).unwrap();
        let mut buf = [0 as Word];
        stream.read_fully(&mut buf, 8, 20).unwrap();
        assert_eq!(buf[0], 0x0E_FCDA << 8);
        assert_eq!(stream.bit_position().unwrap(), 24);
    }

    #[test]
    fn read_masks_bits_outside_range() {
        let stream = BitStream::from_bytes(vec![0xFF; 4]);
        let mut buf = [0 as Word];
        stream.seek(5).unwrap();
        assert_eq!(stream.read(&mut buf, 10, 7).unwrap(), Some(7));
        assert_eq!(buf[0], 0x7F << 10);
    }

    #[test]
    fn undersized_buffer_fails_before_io() {
        let stream = BitStream::from_bytes(vec![0; 16]);
        let mut buf = [0 as Word];
        assert_eq!(
            stream.read(&mut buf, 60, 8).unwrap_err(),
            Error::BufferTooSmall { needed: 68, available: 64 }
        );
        assert_eq!(
            stream.write(&buf, 1, 64).unwrap_err(),
            Error::BufferTooSmall { needed: 65, available: 64 }
        );
        assert_eq!(stream.bit_position().unwrap(), 0);
    }

    #[test]
    fn unaligned_bulk_writes_land_exactly() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let src: Vec<Word> = (0..4).map(|_| rng.gen()).collect();
        for start in [0u64, 3, 7, 8, 13, 64, 65] {
            for len in [1u64, 5, 8, 9, 63, 64, 65, 130] {
                for src_off in [0u64, 7] {
                    let mut expected = vec![0xA5u8; 40];
                    bit_buffer::copy_bits(&src[..], src_off, &mut expected[..], start, len).unwrap();

                    let stream = BitStream::from_bytes(vec![0xA5; 40]);
                    stream.seek(start).unwrap();
                    stream.write_fully(&src, src_off, len).unwrap();
                    assert_eq!(stream.bit_position().unwrap(), start + len);

                    let mut back = [0 as Word; 4];
                    stream.seek(start).unwrap();
                    stream.read_fully(&mut back, src_off, len).unwrap();
                    let mut want = [0 as Word; 4];
                    bit_buffer::copy_bits(&src[..], src_off, &mut want[..], src_off, len).unwrap();
                    assert_eq!(back, want, "start {start} len {len} off {src_off}");

                    assert_eq!(bytes_of(stream), expected, "start {start} len {len} off {src_off}");
                }
            }
        }
    }

    #[test]
    fn write_past_end_zero_fills_gap() {
        let stream = BitStream::in_memory();
        stream.seek(20).unwrap();
        stream.write_u64(0b11, 2).unwrap();
        assert_eq!(bytes_of(stream), vec![0, 0, 0b0011_0000]);
    }

    #[test]
    fn byte_fast_and_slow_paths() {
        let stream = BitStream::from_bytes(vec![0x12, 0x34]);
        assert_eq!(stream.read_byte().unwrap(), Some(0x12));
        stream.seek(4).unwrap();
        assert_eq!(stream.read_byte().unwrap(), Some(0x41));
        assert_eq!(stream.read_byte().unwrap(), None);
        assert_eq!(stream.bit_position().unwrap(), 12);

        let stream = BitStream::in_memory();
        stream.write_bit(true).unwrap();
        stream.write_byte(0xFF).unwrap();
        stream.write_byte(0x00).unwrap();
        assert_eq!(stream.byte_len().unwrap(), 3);
        assert_eq!(bytes_of(stream), vec![0xFF, 0x01, 0x00]);
    }

    #[test]
    fn read_byte_sees_pending_bits() {
        let stream = BitStream::in_memory();
        for _ in 0..3 {
            stream.write_bit(true).unwrap();
        }
        stream.seek(0).unwrap();
        assert_eq!(stream.read_byte().unwrap(), Some(0b0000_0111));
    }

    #[test]
    fn aligned_write_byte_replaces_pending_bits() {
        let stream = BitStream::from_bytes(vec![0x00]);
        stream.write_bit(true).unwrap();
        stream.seek(0).unwrap();
        stream.write_byte(0x80).unwrap();
        assert_eq!(bytes_of(stream), vec![0x80]);
    }

    #[test]
    fn seek_variants() {
        let stream = BitStream::from_bytes(vec![0; 4]);
        stream.seek_byte(2).unwrap();
        assert_eq!(stream.bit_position().unwrap(), 16);
        stream.seek_relative(-3).unwrap();
        assert_eq!(stream.position(), BitPosition::from_bit_index(13));
        assert_eq!(stream.byte_position(), 1);
        assert_eq!(stream.seek_relative(-14).unwrap_err(), Error::NegativePosition(-1));
        assert_eq!(stream.bit_position().unwrap(), 13);
    }

    #[test]
    fn integers_and_chars_through_the_stream() {
        let params = CodecParams::default();
        let values: Vec<BigUint> = [0u64, 7, 8, 263, 264, u64::MAX]
            .iter()
            .map(|&v| BigUint::from(v))
            .chain([BigUint::from(1u8) << 300u32])
            .collect();

        let stream = BitStream::in_memory();
        stream.write_bit(true).unwrap();
        for v in &values {
            stream.write_varint(v, params).unwrap();
        }
        stream.write_char('€').unwrap();
        stream.write_bits(&BigUint::from(0x1234u32), 13).unwrap();
        let end = stream.bit_position().unwrap();
        let expected: u64 = 1 + values.iter().map(|v| varint::encoded_len(v, params).unwrap()).sum::<u64>() + 24 + 13;
        assert_eq!(end, expected);
        stream.truncate_to_size(false).unwrap();

        stream.seek(1).unwrap();
        for v in &values {
            assert_eq!(&stream.read_varint(params).unwrap(), v);
        }
        assert_eq!(stream.read_char().unwrap(), Some('€'));
        assert_eq!(stream.read_bits(13).unwrap(), BigUint::from(0x1234u32));
        let padding = if end % 8 == 0 { None } else { Some(false) };
        assert_eq!(stream.read_bit().unwrap(), padding);
    }

    #[test]
    fn oversized_fixed_width_read_leaves_cursor() {
        let stream = BitStream::from_bytes(vec![0xFF]);
        stream.seek(2).unwrap();
        assert_eq!(stream.read_bits(1 << 40).unwrap_err(), Error::PrematureEndOfStream);
        assert_eq!(stream.bit_position().unwrap(), 2);
    }

    #[test]
    fn close_flushes_and_reports_release_error() {
        let probe = Probe::default();
        let stream = BitStream::new(probe.clone());
        stream.write_u64(0b101, 3).unwrap();
        stream.close().unwrap();
        assert_eq!(probe.contents(), vec![0b101]);

        let probe = Probe { fail_release: true, ..Probe::default() };
        let stream = BitStream::new(probe.clone());
        stream.write_bit(true).unwrap();
        let err = stream.close().unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::Other));
        assert_eq!(probe.contents(), vec![0b1]);
    }
}
