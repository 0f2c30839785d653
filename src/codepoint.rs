//! UTF-8 codepoints over byte reads and writes.

use crate::{Error, Result};

/// Byte-wise access used by the codepoint layer.
pub(crate) trait ByteIo {
    /// Next byte, `None` at the end.
    fn next_byte(&mut self) -> Result<Option<u8>>;
    fn put_byte(&mut self, byte: u8) -> Result<()>;
}

/// Sequence length announced by a UTF-8 lead byte.
fn sequence_len(lead: u8) -> Result<usize> {
    match lead {
        0x00..=0x7F => Ok(1),
        0xC2..=0xDF => Ok(2),
        0xE0..=0xEF => Ok(3),
        0xF0..=0xF4 => Ok(4),
        0x80..=0xBF => Err(Error::invalid_utf8(format!("unexpected continuation byte {lead:#04x}"))),
        _ => Err(Error::invalid_utf8(format!("invalid lead byte {lead:#04x}"))),
    }
}

/// Reads one scalar value. `None` if the data ends before the lead byte.
pub(crate) fn read_char<R: ByteIo + ?Sized>(io: &mut R) -> Result<Option<char>> {
    let Some(lead) = io.next_byte()? else {
        return Ok(None);
    };
    let len = sequence_len(lead)?;
    let mut buf = [lead, 0, 0, 0];
    for slot in buf.iter_mut().take(len).skip(1) {
        *slot = io.next_byte()?.ok_or(Error::PrematureEndOfStream)?;
    }
    // from_utf8 lehnt Overlong-Formen, Surrogates und > U+10FFFF ab.
    let s = std::str::from_utf8(&buf[..len]).map_err(|e| Error::invalid_utf8(e.to_string()))?;
    Ok(s.chars().next())
}

pub(crate) fn write_char<W: ByteIo + ?Sized>(io: &mut W, c: char) -> Result<()> {
    let mut buf = [0u8; 4];
    for &b in c.encode_utf8(&mut buf).as_bytes() {
        io.put_byte(b)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Bytes(VecDeque<u8>);

    impl ByteIo for Bytes {
        fn next_byte(&mut self) -> Result<Option<u8>> {
            Ok(self.0.pop_front())
        }
        fn put_byte(&mut self, byte: u8) -> Result<()> {
            self.0.push_back(byte);
            Ok(())
        }
    }

    #[test]
    fn round_trip_all_widths() {
        let mut io = Bytes::default();
        for c in ['A', 'ß', '€', '🦀'] {
            write_char(&mut io, c).unwrap();
        }
        assert_eq!(io.0.len(), 1 + 2 + 3 + 4);
        let read: Vec<char> = std::iter::from_fn(|| read_char(&mut io).unwrap()).collect();
        assert_eq!(read, vec!['A', 'ß', '€', '🦀']);
    }

    #[test]
    fn truncated_sequence() {
        let mut io = Bytes(VecDeque::from(vec![0xE2, 0x82]));
        assert_eq!(read_char(&mut io).unwrap_err(), Error::PrematureEndOfStream);
    }

    #[test]
    fn malformed_sequences() {
        for bytes in [vec![0x80], vec![0xC0, 0x80], vec![0xED, 0xA0, 0x80], vec![0xE2, 0x41, 0x41]] {
            let mut io = Bytes(VecDeque::from(bytes.clone()));
            assert!(
                matches!(read_char(&mut io), Err(Error::InvalidUtf8(_))),
                "{bytes:02x?}"
            );
        }
    }

    #[test]
    fn empty_input_is_end() {
        assert_eq!(read_char(&mut Bytes::default()).unwrap(), None);
    }
}
