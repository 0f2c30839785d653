//! Tiered variable-length unsigned integers.
//!
//! With `M = 2^(H-1)` every value falls into exactly one tier:
//!
//! - **Small**: `v < M`, stored as-is in the `H`-bit header (top bit 0).
//! - **Large**: header `n | M` with `0 < n < M`, followed by `n * B` bits.
//! - **VeryLarge**: header `M`, followed by the block count encoded with the
//!   same parameters, followed by `(blocks + blocks_offset) * G` bits.
//!
//! Each tier starts counting where the shorter codes stop (the payload holds
//! `v` minus everything representable with fewer bits), so no value has two
//! encodings and no bit pattern is unused.
//!
//! The VeryLarge tier nests: its block count is itself a tiered integer. Both
//! directions unroll that nesting into a loop, so hostile inputs cannot blow
//! the call stack.
//!
//! # Beispiel
//!
//! ```
//! use bitfile::{varint, CodecParams, MemoryBits};
//! use num_bigint::BigUint;
//!
//! let params = CodecParams::default();
//! let mut bits = MemoryBits::new();
//! varint::encode(&mut bits, &BigUint::from(264u32), params).unwrap();
//! assert_eq!(bits.bit_len(), 4 + 16);
//!
//! bits.rewind();
//! assert_eq!(varint::decode(&mut bits, params).unwrap(), BigUint::from(264u32));
//! ```

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::fixed_width::{self, BitSink, BitSource};
use crate::params::CodecParams;
use crate::{Error, Result};

/// One fixed-width field of an encoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    value: BigUint,
    width: u64,
}

/// `S(2^width, n) = 1 + 2^width + ... + 2^(width*(n-1))`, with `S(x, 0) = 0`.
fn geometric_sum(width: u32, n: u64) -> Result<BigUint> {
    if n == 0 {
        return Ok(BigUint::zero());
    }
    let total = u64::from(width).checked_mul(n).ok_or(Error::IntegerOverflow)?;
    let numerator = (BigUint::one() << total) - 1u32;
    let denominator = (BigUint::one() << width) - 1u32;
    Ok(numerator / denominator)
}

/// `floor(((M-1) * B - 1) / G) + 1`: number of big blocks a VeryLarge payload
/// carries even when its block count is 0.
///
/// Equals `ceil((M-1) * B / G)`, the fewest big blocks that hold the widest
/// Large payload.
fn blocks_offset(params: CodecParams) -> Result<u64> {
    let m = params.small_limit();
    let scaled = (m - 1u32) * params.block() - 1u32;
    let offset = scaled / params.big_block() + 1u32;
    offset.to_u64().ok_or(Error::IntegerOverflow)
}

fn checked_width(count: u64, unit: u32) -> Result<u64> {
    count.checked_mul(u64::from(unit)).ok_or(Error::IntegerOverflow)
}

/// Lays out all fields of `value` in write order.
///
/// Everything that can fail (overflowing widths) fails here, before any
/// field is written.
fn layout(value: &BigUint, params: CodecParams) -> Result<Vec<Field>> {
    params.validate()?;
    let header = u64::from(params.header());
    let m = params.small_limit();

    let mut fields = Vec::new();
    // VeryLarge-Payloads kommen nach dem (verschachtelten) Block-Count, also in umgekehrter Reihenfolge.
    let mut payloads = Vec::new();
    let mut v = value.clone();
    loop {
        if v < m {
            fields.push(Field { value: v, width: header });
            break;
        }

        let mut rest = v - &m;
        let mut section = BigUint::one() << params.block();
        let mut n: u64 = 1;
        while BigUint::from(n) < m && rest >= section {
            rest -= &section;
            section <<= params.block();
            n += 1;
        }

        if BigUint::from(n) < m {
            fields.push(Field { value: BigUint::from(n) | &m, width: header });
            fields.push(Field { value: rest, width: checked_width(n, params.block())? });
            break;
        }

        let offset = blocks_offset(params)?;
        let mut section = BigUint::one() << checked_width(offset, params.big_block())?;
        let mut blocks: u64 = 0;
        while rest >= section {
            rest -= &section;
            section <<= params.big_block();
            blocks += 1;
        }
        let count = blocks.checked_add(offset).ok_or(Error::IntegerOverflow)?;
        fields.push(Field { value: m.clone(), width: header });
        payloads.push(Field { value: rest, width: checked_width(count, params.big_block())? });
        v = BigUint::from(blocks);
    }
    fields.extend(payloads.into_iter().rev());
    Ok(fields)
}

/// Writes `value` with the given parameters.
///
/// Parameters are validated and all field widths computed before the first
/// bit is written.
pub fn encode<W: BitSink + ?Sized>(sink: &mut W, value: &BigUint, params: CodecParams) -> Result<()> {
    for field in layout(value, params)? {
        fixed_width::encode(sink, &field.value, field.width)?;
    }
    Ok(())
}

/// Number of bits [`encode`] would write for `value`.
pub fn encoded_len(value: &BigUint, params: CodecParams) -> Result<u64> {
    layout(value, params)?
        .iter()
        .try_fold(0u64, |acc, f| acc.checked_add(f.width).ok_or(Error::IntegerOverflow))
}

/// Reads a value written by [`encode`] with the same parameters.
pub fn decode<R: BitSource + ?Sized>(source: &mut R, params: CodecParams) -> Result<BigUint> {
    params.validate()?;
    let header_width = u64::from(params.header());
    let m = params.small_limit();

    // Anzahl VeryLarge-Ebenen ueber dem innersten Wert.
    let mut depth: u64 = 0;
    let mut value = loop {
        let header = fixed_width::decode(source, header_width)?;
        if header < m {
            break header;
        }
        let len = header - &m;
        if len.is_zero() {
            depth += 1;
            continue;
        }
        let count = len.to_u64().ok_or(Error::IntegerOverflow)?;
        let block = fixed_width::decode(source, checked_width(count, params.block())?)?;
        break block + &m + geometric_sum(params.block(), count)? - 1u32;
    };

    if depth == 0 {
        return Ok(value);
    }

    let offset = blocks_offset(params)?;
    // Erst nach dem ersten gelesenen Payload berechnet: dessen Breite ist mindestens
    // (M-1)*B Bits, die Summen sind damit durch die Eingabegroesse beschraenkt.
    let mut offsets: Option<(BigUint, BigUint)> = None;
    for _ in 0..depth {
        let blocks = value.to_u64().ok_or(Error::IntegerOverflow)?;
        let count = blocks.checked_add(offset).ok_or(Error::IntegerOverflow)?;
        let block = fixed_width::decode(source, checked_width(count, params.big_block())?)?;
        if offsets.is_none() {
            offsets = Some(very_large_offsets(params, &m, offset)?);
        }
        if let Some((base, skipped)) = &offsets {
            value = block + base + geometric_sum(params.big_block(), count)? - skipped;
        }
    }
    Ok(value)
}

/// `(M + S(2^B, M) - 1, S(2^G, blocks_offset))`: values taken by the Small and
/// Large tiers, and the big-block sections a VeryLarge payload never counts.
fn very_large_offsets(params: CodecParams, m: &BigUint, offset: u64) -> Result<(BigUint, BigUint)> {
    let m_count = m.to_u64().ok_or(Error::IntegerOverflow)?;
    let base = m + geometric_sum(params.block(), m_count)? - 1u32;
    let skipped = geometric_sum(params.big_block(), offset)?;
    Ok((base, skipped))
}
