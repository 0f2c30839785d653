//! Single-byte write-back cache for the byte under the cursor.
//!
//! `valid` marks which bits of `byte` are known: either fetched from the
//! backing store or written and not yet flushed. The cache only ever
//! describes the byte at the cursor's current byte offset; the stream
//! flushes and invalidates it before the cursor leaves that byte.

/// Mask with the low `n` bits set (`n <= 8`).
#[inline]
pub(crate) fn low_mask(n: u32) -> u8 {
    if n >= 8 {
        0xFF
    } else {
        ((1u16 << n) - 1) as u8
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ByteCache {
    byte: u8,
    valid: u8,
    dirty: bool,
}

impl ByteCache {
    /// Empty, clean cache.
    pub(crate) const EMPTY: Self = Self { byte: 0, valid: 0, dirty: false };

    /// Clean cache holding a byte fully read from storage.
    pub(crate) fn loaded(byte: u8) -> Self {
        Self { byte, valid: 0xFF, dirty: false }
    }

    /// Dirty cache holding the low `bits` bits of `byte`.
    pub(crate) fn pending(byte: u8, bits: u32) -> Self {
        let valid = low_mask(bits);
        Self { byte: byte & valid, valid, dirty: bits > 0 }
    }

    #[inline]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub(crate) fn is_complete(&self) -> bool {
        self.valid == 0xFF
    }

    #[inline]
    pub(crate) fn byte(&self) -> u8 {
        self.byte
    }

    #[cfg(test)]
    pub(crate) fn valid(&self) -> u8 {
        self.valid
    }

    /// True if every bit in `mask` is known.
    #[inline]
    pub(crate) fn covers(&self, mask: u8) -> bool {
        self.valid & mask == mask
    }

    /// Bit `index`, if known.
    #[inline]
    pub(crate) fn bit(&self, index: u8) -> Option<bool> {
        let mask = 1u8 << index;
        (self.valid & mask != 0).then_some(self.byte & mask != 0)
    }

    /// Records a written bit.
    #[inline]
    pub(crate) fn set_bit(&mut self, index: u8, value: bool) {
        let mask = 1u8 << index;
        if value {
            self.byte |= mask;
        } else {
            self.byte &= !mask;
        }
        self.valid |= mask;
        self.dirty = true;
    }

    /// Records the bits selected by `mask`, taken from `bits`.
    pub(crate) fn set_bits(&mut self, mask: u8, bits: u8) {
        self.byte = (self.byte & !mask) | (bits & mask);
        self.valid |= mask;
        self.dirty = true;
    }

    /// Fills the unknown bits from the stored byte. Known bits win.
    /// Afterwards the cache is complete; the dirty flag is unchanged.
    pub(crate) fn fill_from(&mut self, stored: u8) {
        self.byte = (stored & !self.valid) | (self.byte & self.valid);
        self.valid = 0xFF;
    }

    /// Marks the cached byte as written back.
    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn invalidate(&mut self) {
        *self = Self::EMPTY;
    }
}
