use assert_matches::assert_matches;
use easy_hex::Hex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use zstd_incremental::{Error, FrameDecompressor, StreamDecompressor, ZstdDictionary};

mod test_utils;

proptest! {
    #[test]
    fn test_decompress_one_frame(
        data in test_utils::arb_data(),
        level in test_utils::arb_zstd_level(),
    ) {
        let frame = zstd::encode_all(&data[..], level).unwrap();

        let mut decompressor = FrameDecompressor::new().unwrap();
        let decoded = decompressor.decompress(&frame, None).unwrap();

        assert_eq!(Hex(decoded), data);
        assert!(decompressor.eof());
        assert!(!decompressor.needs_input());
        assert_eq!(decompressor.unused_data(), b"");
    }

    #[test]
    fn test_bytes_after_the_frame_become_unused_data(
        data in test_utils::arb_data(),
        trailing in test_utils::arb_data(),
        level in test_utils::arb_zstd_level(),
    ) {
        let mut input = zstd::encode_all(&data[..], level).unwrap();
        input.extend_from_slice(&trailing[..]);

        let mut decompressor = FrameDecompressor::new().unwrap();
        let decoded = decompressor.decompress(&input, None).unwrap();

        assert_eq!(Hex(decoded), data);
        assert!(decompressor.eof());
        assert_eq!(Hex(decompressor.unused_data().to_vec()), trailing);
    }

    #[test]
    fn test_byte_at_a_time_feed(
        data in test_utils::arb_data(),
        level in test_utils::arb_zstd_level(),
    ) {
        let frame = zstd::encode_all(&data[..], level).unwrap();

        let mut decompressor = FrameDecompressor::new().unwrap();
        let mut decoded = vec![];
        for byte in &frame {
            decoded.extend(decompressor.decompress(std::slice::from_ref(byte), None).unwrap());
        }

        assert_eq!(Hex(decoded), data);
        assert!(decompressor.eof());
    }

    #[test]
    fn test_max_length_bounds_every_call(
        data in test_utils::arb_data(),
        level in test_utils::arb_zstd_level(),
        max_length in 0usize..=64,
    ) {
        let frame = zstd::encode_all(&data[..], level).unwrap();

        let mut decompressor = FrameDecompressor::new().unwrap();
        let mut decoded = decompressor.decompress(&frame, Some(max_length)).unwrap();
        assert!(decoded.len() <= max_length);

        if decoded.len() == max_length && !decompressor.eof() {
            // An output capped exactly at the limit means "call again with
            // empty input" before feeding more.
            assert!(!decompressor.needs_input());
        }

        test_utils::drain_to_eof(&mut decompressor, &mut decoded);
        assert_eq!(Hex(decoded), data);
    }

    #[test]
    fn test_endless_decodes_concatenated_frames(
        first in test_utils::arb_data(),
        second in test_utils::arb_data(),
        level in test_utils::arb_zstd_level(),
        split in 0usize..=2 * test_utils::MAX_DATA_LENGTH,
    ) {
        let mut input = zstd::encode_all(&first[..], level).unwrap();
        input.extend(zstd::encode_all(&second[..], level).unwrap());

        let mut expected = first.to_vec();
        expected.extend_from_slice(&second[..]);

        let split = split.min(input.len());
        let mut decompressor = StreamDecompressor::new().unwrap();
        let mut decoded = decompressor.decompress(&input[..split], None).unwrap();
        decoded.extend(decompressor.decompress(&input[split..], None).unwrap());

        assert_eq!(Hex(decoded), Hex(expected));
        assert!(decompressor.at_frame_edge());
        assert!(decompressor.needs_input());
    }

    #[test]
    fn test_one_shot_decompress_rejects_truncation(
        data in test_utils::arb_data(),
        level in test_utils::arb_zstd_level(),
    ) {
        let frame = zstd::encode_all(&data[..], level).unwrap();

        let truncated = &frame[..frame.len() - 1];
        assert_matches!(
            zstd_incremental::decompress(truncated),
            Err(Error::IncompleteFrame | Error::Codec(_))
        );
    }

    #[test]
    fn test_dictionary_stream_round_trip(
        data in test_utils::arb_data(),
        level in test_utils::arb_dictionary_level(),
    ) {
        let dictionary = ZstdDictionary::new(test_utils::dictionary_content()).unwrap();

        let mut compressor = zstd_incremental::Compressor::builder()
            .with_compression_level(level)
            .with_dictionary(&dictionary)
            .build()
            .unwrap();
        let frame = compressor
            .compress(&data[..], zstd_incremental::CompressMode::FlushFrame)
            .unwrap();

        let mut decompressor = StreamDecompressor::builder()
            .with_dictionary(&dictionary)
            .build()
            .unwrap();
        let decoded = decompressor.decompress(&frame, None).unwrap();
        assert_eq!(Hex(decoded), data);
        assert!(decompressor.at_frame_edge());
    }
}

#[test]
fn test_abcdef_example() {
    let frame = zstd_incremental::compress(b"abcdef", 0).unwrap();

    let info = zstd_incremental::frame_info(&frame).unwrap();
    assert_eq!(info.content_size, Some(6));

    assert_eq!(zstd_incremental::decompress(&frame).unwrap(), b"abcdef");
    assert_eq!(
        zstd_incremental::frame_compressed_size(&frame).unwrap(),
        u64::try_from(frame.len()).unwrap()
    );

    let mut decompressor = FrameDecompressor::new().unwrap();
    let mut decoded = decompressor.decompress(&frame, Some(3)).unwrap();
    assert_eq!(decoded, b"abc");
    assert!(!decompressor.eof());
    assert!(!decompressor.needs_input());

    test_utils::drain_to_eof(&mut decompressor, &mut decoded);
    assert_eq!(decoded, b"abcdef");
    assert!(decompressor.eof());
}

#[test]
fn test_decompressing_zero_bytes_preserves_frame_edge_state() {
    let frame = zstd_incremental::compress(b"hello world", 3).unwrap();

    let mut decompressor = StreamDecompressor::new().unwrap();

    // Fresh decompressor: at the edge, and empty input keeps it there.
    assert!(decompressor.at_frame_edge());
    for _ in 0..3 {
        assert_eq!(decompressor.decompress(&[], None).unwrap(), b"");
        assert!(decompressor.at_frame_edge());
    }

    // Partway into a frame: off the edge, and empty input keeps it there.
    decompressor.decompress(&frame[..5], None).unwrap();
    assert!(!decompressor.at_frame_edge());
    assert_eq!(decompressor.decompress(&[], None).unwrap(), b"");
    assert!(!decompressor.at_frame_edge());

    // After the frame completes: back at the edge, empty input keeps it.
    let decoded = decompressor.decompress(&frame[5..], None).unwrap();
    assert_eq!(decoded, b"hello world");
    assert!(decompressor.at_frame_edge());
    assert_eq!(decompressor.decompress(&[], None).unwrap(), b"");
    assert!(decompressor.at_frame_edge());
}

#[test]
fn test_bounded_decompressor_terminal_state() {
    let frame = zstd_incremental::compress(b"terminal", 3).unwrap();
    let mut input = frame.clone();
    input.extend_from_slice(b"next frame would go here");

    let mut decompressor = FrameDecompressor::new().unwrap();
    let decoded = decompressor.decompress(&input, None).unwrap();
    assert_eq!(decoded, b"terminal");
    assert!(decompressor.eof());
    assert_eq!(decompressor.unused_data(), b"next frame would go here");

    // Any further call fails without touching the terminal state.
    assert_matches!(decompressor.decompress(b"x", None), Err(Error::AlreadyAtEnd));
    assert!(decompressor.eof());
    assert_eq!(decompressor.unused_data(), b"next frame would go here");
}

#[test]
fn test_unused_data_holds_a_decodable_second_frame() {
    let first = zstd_incremental::compress(b"first", 3).unwrap();
    let second = zstd_incremental::compress(b"second", 3).unwrap();
    let mut input = first.clone();
    input.extend_from_slice(&second);

    let mut decompressor = FrameDecompressor::new().unwrap();
    let decoded = decompressor.decompress(&input, None).unwrap();
    assert_eq!(decoded, b"first");
    assert_eq!(decompressor.unused_data(), &second[..]);

    let mut next = FrameDecompressor::new().unwrap();
    let decoded = next.decompress(decompressor.unused_data(), None).unwrap();
    assert_eq!(decoded, b"second");
}

#[test]
fn test_needs_input_false_while_backlog_remains() {
    let data = vec![7u8; 4096];
    let frame = zstd_incremental::compress(&data, 3).unwrap();

    let mut decompressor = FrameDecompressor::new().unwrap();
    let decoded = decompressor.decompress(&frame, Some(0)).unwrap();
    assert_eq!(decoded, b"");
    assert!(!decompressor.needs_input());

    let rest = decompressor.decompress(&[], None).unwrap();
    assert_eq!(rest, data);
    assert!(decompressor.eof());
}

#[test]
fn test_endless_at_edge_with_exact_cap_still_needs_input() {
    let frame = zstd_incremental::compress(b"exactly", 3).unwrap();

    let mut decompressor = StreamDecompressor::new().unwrap();
    let decoded = decompressor.decompress(&frame, Some(7)).unwrap();
    assert_eq!(decoded, b"exactly");

    // The output hit the cap, but the frame also ended: nothing more can
    // come out without new input.
    assert!(decompressor.at_frame_edge());
    assert!(decompressor.needs_input());
}

#[test]
fn test_codec_error_resets_the_instance() {
    let mut decompressor = StreamDecompressor::new().unwrap();
    assert_matches!(
        decompressor.decompress(b"this is not a zstd stream", None),
        Err(Error::Codec(_))
    );

    // The failed stream is abandoned and a fresh one decodes fine.
    assert!(decompressor.at_frame_edge());
    assert!(decompressor.needs_input());

    let frame = zstd_incremental::compress(b"recovered", 3).unwrap();
    let decoded = decompressor.decompress(&frame, None).unwrap();
    assert_eq!(decoded, b"recovered");
    assert!(decompressor.at_frame_edge());
}

#[test]
fn test_bounded_codec_error_resets_the_instance() {
    let mut decompressor = FrameDecompressor::new().unwrap();
    assert_matches!(
        decompressor.decompress(b"garbage input", None),
        Err(Error::Codec(_))
    );
    assert!(!decompressor.eof());

    let frame = zstd_incremental::compress(b"recovered", 3).unwrap();
    let decoded = decompressor.decompress(&frame, None).unwrap();
    assert_eq!(decoded, b"recovered");
    assert!(decompressor.eof());
}

#[test]
fn test_one_shot_decompress_handles_concatenated_frames() {
    let mut input = zstd_incremental::compress(b"one, ", 3).unwrap();
    input.extend(zstd_incremental::compress(b"two", 3).unwrap());

    assert_eq!(zstd_incremental::decompress(&input).unwrap(), b"one, two");
}

#[test]
fn test_one_shot_decompress_empty_input() {
    assert_eq!(zstd_incremental::decompress(b"").unwrap(), b"");
}

#[test]
fn test_empty_frame_reaches_eof() {
    let frame = zstd_incremental::compress(b"", 3).unwrap();

    let mut decompressor = FrameDecompressor::new().unwrap();
    let decoded = decompressor.decompress(&frame, None).unwrap();
    assert_eq!(decoded, b"");
    assert!(decompressor.eof());
    assert_eq!(decompressor.unused_data(), b"");
}
