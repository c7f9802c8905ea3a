/// An error from a compression or decompression operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The allocator could not provide `size` bytes for an output chunk or
    /// for the decompressor's input backlog. The operation's buffered
    /// output is discarded.
    #[error("failed to allocate {size} bytes")]
    Allocation { size: usize },

    /// The zstd codec reported a failure mid-step. The codec session has
    /// been reset, so the compressor or decompressor instance remains
    /// usable for a fresh frame; the in-flight frame is lost.
    #[error("zstd codec error: {0}")]
    Codec(#[from] std::io::Error),

    /// A parameter was rejected before any codec interaction.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A [`FrameDecompressor`](crate::FrameDecompressor) was called again
    /// after its frame completed. The instance is unaffected and remains
    /// queryable.
    #[error("already at the end of a zstd frame")]
    AlreadyAtEnd,

    /// The compressed input ended in the middle of a frame.
    #[error("compressed input ended inside a zstd frame")]
    IncompleteFrame,
}

pub type Result<T> = std::result::Result<T, Error>;
