//! Incremental and one-shot zstd compression and decompression.
//!
//! This crate sits between the raw zstd streaming interface and callers
//! that want plain `&[u8] -> Vec<u8>` operations: compressed or
//! decompressed output is accumulated in a growable chunked buffer, so no
//! output size needs to be known up front, and decompression tracks frame
//! boundaries across calls while buffering any input the codec has not
//! consumed yet.
//!
//! - [`Compressor`]: streaming compression with [`CompressMode`]
//!   directives, optional multi-threaded workers, and a single-shot path
//!   pre-sized to the codec's worst-case bound.
//! - [`FrameDecompressor`]: decompresses exactly one frame, then stops
//!   and exposes trailing bytes as unused data.
//! - [`StreamDecompressor`]: decompresses any number of concatenated
//!   frames.
//! - [`ZstdDictionary`]: shared dictionary with lazily compiled,
//!   per-level digested forms.
//! - [`compress`] / [`decompress`]: one-shot conveniences.
//!
//! ```
//! # fn main() -> Result<(), zstd_incremental::Error> {
//! let frame = zstd_incremental::compress(b"abcdef", 3)?;
//! assert_eq!(zstd_incremental::decompress(&frame)?, b"abcdef");
//! # Ok(())
//! # }
//! ```

mod compressor;
mod decompressor;
mod dict;
mod error;
mod frame;
mod output;
mod unconsumed;

pub use compressor::{compress, CompressMode, Compressor, CompressorBuilder, FlushMode};
pub use decompressor::{
    decompress, FrameDecompressor, FrameDecompressorBuilder, StreamDecompressor,
    StreamDecompressorBuilder,
};
pub use dict::ZstdDictionary;
pub use error::{Error, Result};
pub use frame::{frame_compressed_size, frame_info, FrameInfo};
