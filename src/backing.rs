//! Byte storage underneath a bit stream.
//!
//! A backing store is a plain random-access byte sequence with a queryable
//! length and a truncate operation. No framing, no magic number: whatever
//! file format is built on top owns that.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};

/// Random-access byte storage for [`crate::BitStream`].
pub trait Backing: Read + Write + Seek {
    /// Current length in bytes.
    fn byte_len(&mut self) -> io::Result<u64>;

    /// Shrinks (or zero-extends) the storage to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Last step of closing a stream. Defaults to [`Write::flush`].
    fn release(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Backing for File {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn release(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

impl Backing for Cursor<Vec<u8>> {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds address space"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

impl<B: Backing + ?Sized> Backing for Box<B> {
    fn byte_len(&mut self) -> io::Result<u64> {
        (**self).byte_len()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        (**self).truncate(len)
    }

    fn release(&mut self) -> io::Result<()> {
        (**self).release()
    }
}
