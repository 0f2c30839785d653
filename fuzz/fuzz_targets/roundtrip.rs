#![no_main]
use libfuzzer_sys::fuzz_target;

use bitfile::{varint, CodecParams, MemoryBits};
use num_bigint::BigUint;

fuzz_target!(|data: &[u8]| {
    let [h, b, g, rest @ ..] = data else {
        return;
    };
    let block = 2 + u32::from(*b % 7);
    let Ok(params) = CodecParams::new(2 + u32::from(*h % 7), block, block + u32::from(*g % 9)) else {
        return;
    };
    let value = BigUint::from_bytes_le(rest);

    let mut bits = MemoryBits::new();
    varint::encode(&mut bits, &value, params).unwrap();
    assert_eq!(bits.bit_len(), varint::encoded_len(&value, params).unwrap());
    bits.rewind();
    assert_eq!(varint::decode(&mut bits, params).unwrap(), value);
    assert_eq!(bits.position(), bits.bit_len());
});
