#![no_main]
use libfuzzer_sys::fuzz_target;

use bitfile::{BitStream, CodecParams, MemoryBits};

fuzz_target!(|data: &[u8]| {
    let [h, b, g, rest @ ..] = data else {
        return;
    };
    let block = 2 + u32::from(*b % 7);
    let Ok(params) = CodecParams::new(2 + u32::from(*h % 7), block, block + u32::from(*g % 9)) else {
        return;
    };

    // Speicher und Stream muessen dasselbe Ergebnis liefern.
    let mut bits = MemoryBits::from_bytes(rest);
    let stream = BitStream::from_bytes(rest.to_vec());
    loop {
        let from_memory = bitfile::varint::decode(&mut bits, params);
        let from_stream = stream.read_varint(params);
        assert_eq!(from_memory, from_stream);
        if from_memory.is_err() {
            break;
        }
    }
});
