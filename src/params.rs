//! Codec parameter triple `(header, block, big_block)`.
//!
//! The triple is never stored in the encoded data. Writer and reader must
//! agree on it; a mismatch decodes to a different value without any error.
//!
//! # Beispiel
//!
//! ```
//! use bitfile::CodecParams;
//!
//! let params: CodecParams = "4,8,16".parse().unwrap();
//! assert_eq!(params, CodecParams::default());
//! assert!(CodecParams::new(1, 8, 16).is_err());
//! ```

use core::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::One;

use crate::{Error, Result};

/// Parameters of the tiered integer codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecParams {
    header: u32,
    block: u32,
    big_block: u32,
}

impl Default for CodecParams {
    /// The documented scheme for generic integers: `(4, 8, 16)`.
    fn default() -> Self {
        Self { header: 4, block: 8, big_block: 16 }
    }
}

impl CodecParams {
    /// Validated constructor: `header >= 2`, `block >= 2`, `big_block >= block`.
    pub fn new(header: u32, block: u32, big_block: u32) -> Result<Self> {
        let params = Self { header, block, big_block };
        params.validate()?;
        Ok(params)
    }

    #[cfg(test)]
    pub(crate) fn unchecked(header: u32, block: u32, big_block: u32) -> Self {
        Self { header, block, big_block }
    }

    pub fn validate(&self) -> Result<()> {
        if self.header < 2 || self.block < 2 || self.big_block < self.block {
            return Err(Error::InvalidCodecParameters {
                header: self.header,
                block: self.block,
                big_block: self.big_block,
            });
        }
        Ok(())
    }

    /// Header width `H` in bits.
    #[inline]
    pub fn header(&self) -> u32 {
        self.header
    }

    /// Block width `B` in bits (Large tier granularity).
    #[inline]
    pub fn block(&self) -> u32 {
        self.block
    }

    /// Big block width `G` in bits (VeryLarge tier granularity).
    #[inline]
    pub fn big_block(&self) -> u32 {
        self.big_block
    }

    /// `M = 2^(H-1)`: first value that does not fit the Small tier, and the
    /// header's top bit.
    pub fn small_limit(&self) -> BigUint {
        BigUint::one() << (self.header - 1)
    }
}

impl fmt::Display for CodecParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.header, self.block, self.big_block)
    }
}

/// Parses `"H,B,G"`; whitespace around the numbers is ignored.
impl FromStr for CodecParams {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [h, b, g] = parts.as_slice() else {
            return Err(format!("expected HEADER,BLOCK,BIG_BLOCK, got '{s}'"));
        };
        let parse = |name: &str, v: &str| {
            v.parse::<u32>()
                .map_err(|e| format!("invalid {name} width '{v}': {e}"))
        };
        Self::new(parse("header", *h)?, parse("block", *b)?, parse("big block", *g)?)
            .map_err(|e| e.to_string())
    }
}
