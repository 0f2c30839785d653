//! bitfile – bit-addressable random-access streams and tiered integer codecs
//!
//! A [`BitStream`] puts a bit cursor over any random-access byte store
//! ([`Backing`]): files, in-memory cursors, or your own type. Bits are
//! numbered least significant first within each byte. On top of it sit
//! fixed-width integers, UTF-8 codepoints, and a dense variable-length
//! integer code with three tiers selected by a parameter triple
//! ([`CodecParams`]).
//!
//! # Beispiel
//!
//! ```
//! use bitfile::{BitStream, CodecParams, MemoryBits};
//! use num_bigint::BigUint;
//!
//! let params = CodecParams::new(2, 4, 8).unwrap();
//! let values: Vec<BigUint> = [0u32, 3, 70_000].into_iter().map(BigUint::from).collect();
//!
//! // Stream über einen Speicherpuffer
//! let stream = BitStream::in_memory();
//! for v in &values {
//!     stream.write_varint(v, params).unwrap();
//! }
//! stream.truncate_to_size(false).unwrap();
//! let bytes = stream.into_inner().unwrap().into_inner();
//!
//! // Dieselben Bytes ohne Stream dekodieren
//! let mut bits = MemoryBits::from_bytes(&bytes);
//! for v in &values {
//!     assert_eq!(&bitfile::varint::decode(&mut bits, params).unwrap(), v);
//! }
//! ```

pub mod backing;
pub mod bit_buffer;
pub(crate) mod cache;
pub(crate) mod codepoint;
pub mod error;
pub mod fixed_width;
pub mod memory;
pub mod params;
pub mod position;
pub mod stream;
pub mod varint;

pub use error::{Error, Result};

// Public API: Streams
pub use backing::Backing;
pub use position::BitPosition;
pub use stream::BitStream;

// Public API: Codecs
pub use bit_buffer::Word;
pub use fixed_width::{BitSink, BitSource};
pub use memory::MemoryBits;
pub use params::CodecParams;
