#![no_main]
use libfuzzer_sys::fuzz_target;

use bitfile::bit_buffer::{bytes_to_words, copy_bits};
use bitfile::BitStream;

fuzz_target!(|data: &[u8]| {
    let [start, src_off, rest @ ..] = data else {
        return;
    };
    let start = u64::from(*start);
    let src_off = u64::from(*src_off % 64);
    let src = bytes_to_words(rest);
    let len = (src.len() as u64 * 64).saturating_sub(src_off);
    if len == 0 {
        return;
    }

    let stream = BitStream::from_bytes(vec![0x5A; 16]);
    stream.seek(start).unwrap();
    stream.write_fully(&src, src_off, len).unwrap();
    stream.seek(start).unwrap();
    let mut back = vec![0u64; src.len()];
    stream.read_fully(&mut back, src_off, len).unwrap();

    let mut want = vec![0u64; src.len()];
    copy_bits(&src[..], src_off, &mut want[..], src_off, len).unwrap();
    assert_eq!(back, want);
});
