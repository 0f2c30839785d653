//! Central error types for bit streams and the tiered integer codec.
//!
//! End of data on single bit/byte/char reads is not an error: those calls
//! return `Ok(None)`. Everything in here is a real failure that the caller
//! has to handle.

use core::fmt;
use std::borrow::Cow;
use std::io;

/// All errors produced by this crate.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An exact-length read or write ran out of data.
    PrematureEndOfStream,
    /// Codec parameters violate `header >= 2`, `block >= 2`, `big_block >= block`.
    InvalidCodecParameters {
        header: u32,
        block: u32,
        big_block: u32,
    },
    /// A relative seek would move the cursor before bit 0.
    NegativePosition(i128),
    /// A bit buffer cannot hold `offset + length` bits.
    BufferTooSmall { needed: u64, available: u64 },
    /// A value does not fit into the requested fixed bit width.
    ValueTooWide { bits: u64, width: u64 },
    /// A bit length or block count exceeds the representable range.
    IntegerOverflow,
    /// A codepoint byte sequence is not valid UTF-8.
    InvalidUtf8(Cow<'static, str>),
    /// The backing storage reported an I/O error.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrematureEndOfStream => write!(f, "premature end of bit stream"),
            Self::InvalidCodecParameters { header, block, big_block } => write!(
                f,
                "invalid codec parameters ({header},{block},{big_block}): \
                 need header >= 2, block >= 2, big block >= block"
            ),
            Self::NegativePosition(pos) => write!(f, "seek target {pos} is before the start of the stream"),
            Self::BufferTooSmall { needed, available } => {
                write!(f, "bit buffer too small: need {needed} bits, have {available}")
            }
            Self::ValueTooWide { bits, width } => {
                write!(f, "value needs {bits} bits but the field is {width} bits wide")
            }
            Self::IntegerOverflow => write!(f, "bit length or block count overflow"),
            Self::InvalidUtf8(msg) => {
                if msg.is_empty() {
                    write!(f, "invalid UTF-8 sequence")
                } else {
                    write!(f, "invalid UTF-8 sequence: {msg}")
                }
            }
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// I/O-Fehler werden nur ueber ihren `ErrorKind` verglichen (io::Error hat kein PartialEq).
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::PrematureEndOfStream, Self::PrematureEndOfStream) => true,
            (
                Self::InvalidCodecParameters { header: h1, block: b1, big_block: g1 },
                Self::InvalidCodecParameters { header: h2, block: b2, big_block: g2 },
            ) => h1 == h2 && b1 == b2 && g1 == g2,
            (Self::NegativePosition(a), Self::NegativePosition(b)) => a == b,
            (
                Self::BufferTooSmall { needed: n1, available: a1 },
                Self::BufferTooSmall { needed: n2, available: a2 },
            ) => n1 == n2 && a1 == a2,
            (
                Self::ValueTooWide { bits: b1, width: w1 },
                Self::ValueTooWide { bits: b2, width: w2 },
            ) => b1 == b2 && w1 == w2,
            (Self::IntegerOverflow, Self::IntegerOverflow) => true,
            (Self::InvalidUtf8(a), Self::InvalidUtf8(b)) => a == b,
            (Self::Io(a), Self::Io(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}

impl Error {
    /// Creates an `InvalidUtf8` error with context.
    pub fn invalid_utf8(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidUtf8(msg.into())
    }

    /// True for both flavours of running out of data: the explicit
    /// `PrematureEndOfStream` and an `UnexpectedEof` from the backing store.
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            Self::PrematureEndOfStream => true,
            Self::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
