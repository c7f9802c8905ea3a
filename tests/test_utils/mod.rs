#![allow(unused)]

use proptest::prelude::*;

pub type Data = easy_hex::Hex<Vec<u8>>;

pub const MAX_DATA_LENGTH: usize = 1000;
pub const MIN_ZSTD_LEVEL: i32 = -3;
pub const MAX_ZSTD_LEVEL: i32 = 15;

pub fn arb_data() -> impl Strategy<Value = Data> {
    prop::collection::vec(any::<u8>(), 0..=MAX_DATA_LENGTH).prop_map(easy_hex::Hex)
}

pub fn arb_data_with_pos() -> impl Strategy<Value = (Data, usize)> {
    arb_data().prop_flat_map(|data| {
        let len = data.len();
        (Just(data), 0..=len)
    })
}

pub fn arb_data_with_positions<const N: usize>() -> impl Strategy<Value = (Data, [usize; N])> {
    arb_data().prop_flat_map(|data| {
        let len = data.len();
        (Just(data), prop::array::uniform(0..=len))
    })
}

pub fn arb_zstd_level() -> impl Strategy<Value = i32> {
    MIN_ZSTD_LEVEL..=MAX_ZSTD_LEVEL
}

/// Levels usable as dictionary cache keys (zstd's standard level range).
pub fn arb_dictionary_level() -> impl Strategy<Value = i32> {
    1..=MAX_ZSTD_LEVEL
}

/// Dictionary sample content with enough repetition to be useful.
pub fn dictionary_content() -> Vec<u8> {
    let mut content = Vec::new();
    for index in 0..64u32 {
        content.extend_from_slice(b"sample phrase number ");
        content.extend_from_slice(index.to_string().as_bytes());
        content.extend_from_slice(b" of the shared dictionary corpus; ");
    }
    content
}

/// Decompress a one-frame-at-a-time decompressor to completion, feeding no
/// further input.
pub fn drain_to_eof(
    decompressor: &mut zstd_incremental::FrameDecompressor<'_>,
    collected: &mut Vec<u8>,
) {
    while !decompressor.eof() {
        let chunk = decompressor.decompress(&[], None).unwrap();
        if chunk.is_empty() && decompressor.needs_input() {
            panic!("decompressor stalled before eof");
        }
        collected.extend_from_slice(&chunk);
    }
}
