use crate::error::{Error, Result};

/// Header fields of a zstd frame, read without decompressing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// The decompressed size recorded in the frame header, when the
    /// compressor knew it.
    pub content_size: Option<u64>,
    /// The id of the dictionary needed to decompress the frame, or 0 when
    /// no dictionary (or a raw content dictionary) was used.
    pub dictionary_id: u32,
}

/// Read the [`FrameInfo`] of the frame starting at the beginning of
/// `data`. `data` only needs to contain the frame header, not the whole
/// frame.
pub fn frame_info(data: &[u8]) -> Result<FrameInfo> {
    let content_size = zstd::zstd_safe::get_frame_content_size(data)
        .map_err(|_| Error::Codec(std::io::Error::other("failed to parse zstd frame header")))?;
    let dictionary_id = zstd::zstd_safe::get_dict_id_from_frame(data).map_or(0, |id| id.get());

    Ok(FrameInfo {
        content_size,
        dictionary_id,
    })
}

/// The compressed size of the frame starting at the beginning of `data`,
/// header and checksum included. `data` must contain at least the whole
/// frame.
pub fn frame_compressed_size(data: &[u8]) -> Result<u64> {
    let size = zstd::zstd_safe::find_frame_compressed_size(data)
        .map_err(|_| Error::Codec(std::io::Error::other("failed to parse zstd frame")))?;
    let size: u64 = size
        .try_into()
        .expect("failed to convert frame size to u64");
    Ok(size)
}
