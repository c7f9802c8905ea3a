use zstd::stream::raw::Operation as _;

use crate::{
    dict::ZstdDictionary,
    error::{Error, Result},
    output::{self, OutputBuffer},
};

/// Directive passed to the codec along with each
/// [`compress`](Compressor::compress) call.
///
/// Modes are ordered by how much buffered state they leave in the codec:
/// `Continue` keeps everything buffered, `FlushBlock` completes the
/// pending block, `FlushFrame` completes the whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompressMode {
    /// Collect more data; the codec decides when to emit output.
    Continue,
    /// Complete the pending block so all input so far is decodable, but
    /// keep the frame open.
    FlushBlock,
    /// Complete and end the current frame. The next call starts a fresh
    /// frame.
    FlushFrame,
}

/// How much to flush with a [`flush`](Compressor::flush) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlushMode {
    /// Complete the pending block, keeping the frame open.
    Block,
    /// Complete and end the current frame.
    Frame,
}

/// A streaming zstd compressor.
///
/// Input is fed incrementally with [`compress`](Compressor::compress); each
/// call returns whatever compressed bytes the codec produced for it, which
/// may be empty while the codec buffers. Concatenating every returned
/// buffer yields the compressed stream.
///
/// ## Construction
///
/// Use [`Compressor::new`] for a plain compressor at a given level, or
/// [`Compressor::builder`] to also configure multi-threaded workers or a
/// shared [`ZstdDictionary`].
///
/// ```
/// # fn main() -> Result<(), zstd_incremental::Error> {
/// use zstd_incremental::{CompressMode, Compressor, FlushMode};
///
/// let mut compressor = Compressor::new(3)?;
/// let mut frame = compressor.compress(b"hello world", CompressMode::Continue)?;
/// frame.extend(compressor.flush(FlushMode::Frame)?);
///
/// assert_eq!(zstd_incremental::decompress(&frame)?, b"hello world");
/// # Ok(())
/// # }
/// ```
///
/// ## Failure behavior
///
/// A codec error resets the underlying session and forces the mode state
/// back to [`CompressMode::FlushFrame`], so a failed compressor starts a
/// fresh frame on its next use instead of continuing a corrupt one.
pub struct Compressor<'dict> {
    encoder: zstd::stream::raw::Encoder<'dict>,
    last_mode: CompressMode,
    multi_threaded: bool,
}

impl Compressor<'static> {
    /// Create a compressor at the given compression level. Level 0 selects
    /// zstd's default level.
    pub fn new(level: i32) -> Result<Self> {
        Self::builder().with_compression_level(level).build()
    }
}

impl<'dict> Compressor<'dict> {
    pub fn builder() -> CompressorBuilder<'dict> {
        CompressorBuilder::new()
    }

    /// Compress `data`, applying `mode` once all of it has been fed.
    pub fn compress(&mut self, data: &[u8], mode: CompressMode) -> Result<Vec<u8>> {
        match self.compress_inner(data, mode) {
            Ok(compressed) => {
                self.last_mode = mode;
                Ok(compressed)
            }
            Err(error) => {
                self.reset_session();
                Err(error)
            }
        }
    }

    /// Flush buffered data without feeding new input.
    pub fn flush(&mut self, mode: FlushMode) -> Result<Vec<u8>> {
        let (drain, recorded_mode) = match mode {
            FlushMode::Block => (Drain::Block, CompressMode::FlushBlock),
            FlushMode::Frame => (Drain::Frame, CompressMode::FlushFrame),
        };

        match self.flush_inner(drain) {
            Ok(compressed) => {
                self.last_mode = recorded_mode;
                Ok(compressed)
            }
            Err(error) => {
                self.reset_session();
                Err(error)
            }
        }
    }

    /// Compress `data` as one complete frame in a single call.
    ///
    /// The output buffer is pre-sized to the codec's worst-case bound for
    /// `data.len()`, so the output never needs to grow, and the input
    /// length is pledged up front so the frame header records its content
    /// size. Only valid while no frame is open; interleaving with
    /// unfinished [`compress`](Compressor::compress) calls is rejected.
    pub fn compress_single_frame(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if self.last_mode != CompressMode::FlushFrame {
            return Err(Error::InvalidArgument(
                "single-frame compression requires the previous frame to be finished",
            ));
        }
        if self.multi_threaded {
            log::warn!(
                "single-frame compression with multi-threaded workers: \
                 the preallocated output bound assumes single-threaded framing"
            );
        }

        match self.compress_single_frame_inner(data) {
            Ok(compressed) => {
                self.last_mode = CompressMode::FlushFrame;
                Ok(compressed)
            }
            Err(error) => {
                self.reset_session();
                Err(error)
            }
        }
    }

    /// The mode most recently applied by a successful
    /// [`compress`](Compressor::compress) or [`flush`](Compressor::flush)
    /// call. Starts as [`CompressMode::FlushFrame`], meaning no frame is
    /// open yet.
    pub fn last_mode(&self) -> CompressMode {
        self.last_mode
    }

    fn compress_inner(&mut self, data: &[u8], mode: CompressMode) -> Result<Vec<u8>> {
        let mut output = OutputBuffer::new(None)?;

        self.feed(data, &mut output)?;
        match mode {
            CompressMode::Continue => {}
            CompressMode::FlushBlock => self.drain(Drain::Block, &mut output)?,
            CompressMode::FlushFrame => self.drain(Drain::Frame, &mut output)?,
        }

        output.finish()
    }

    fn flush_inner(&mut self, drain: Drain) -> Result<Vec<u8>> {
        let mut output = OutputBuffer::new(None)?;
        self.drain(drain, &mut output)?;
        output.finish()
    }

    fn compress_single_frame_inner(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let bound = zstd::zstd_safe::compress_bound(data.len());
        let mut output = OutputBuffer::with_exact(bound)?;

        let pledged: u64 = data
            .len()
            .try_into()
            .expect("failed to convert input length to u64");
        self.encoder.set_pledged_src_size(Some(pledged))?;

        self.feed(data, &mut output)?;
        self.drain(Drain::Frame, &mut output)?;
        output.finish()
    }

    /// Feed all of `data` to the codec, growing the output buffer whenever
    /// the codec fills the current chunk.
    fn feed(&mut self, data: &[u8], output: &mut OutputBuffer) -> Result<()> {
        let mut in_buffer = zstd::stream::raw::InBuffer::around(data);

        while in_buffer.pos() < data.len() {
            if output.spare_is_empty() {
                output.grow()?;
            }

            if self.multi_threaded {
                // A worker pool may consume only a sliver of input per
                // step; keep stepping until the chunk fills or the input
                // is gone.
                loop {
                    let (result, _) = output::with_raw_out_buffer(output, |out_buffer| {
                        self.encoder.run(&mut in_buffer, out_buffer)
                    });
                    result?;

                    if in_buffer.pos() == data.len() || output.spare_is_empty() {
                        break;
                    }
                }
            } else {
                let (result, _) = output::with_raw_out_buffer(output, |out_buffer| {
                    self.encoder.run(&mut in_buffer, out_buffer)
                });
                result?;
            }
        }

        Ok(())
    }

    /// Drive the codec's flush or frame-end step until it reports no
    /// remaining work.
    fn drain(&mut self, drain: Drain, output: &mut OutputBuffer) -> Result<()> {
        loop {
            if output.spare_is_empty() {
                output.grow()?;
            }

            let (result, _) = output::with_raw_out_buffer(output, |out_buffer| match drain {
                Drain::Block => self.encoder.flush(out_buffer),
                Drain::Frame => self.encoder.finish(out_buffer, false),
            });

            let remaining = result?;
            if remaining == 0 {
                return Ok(());
            }
        }
    }

    fn reset_session(&mut self) {
        if let Err(error) = self.encoder.reinit() {
            log::debug!("failed to reset compressor session: {error}");
        }
        self.last_mode = CompressMode::FlushFrame;
    }
}

#[derive(Clone, Copy)]
enum Drain {
    Block,
    Frame,
}

/// A builder that configures and builds a [`Compressor`].
pub struct CompressorBuilder<'dict> {
    compression_level: i32,
    workers: u32,
    dictionary: Option<&'dict ZstdDictionary>,
}

impl<'dict> CompressorBuilder<'dict> {
    fn new() -> Self {
        Self {
            compression_level: 0,
            workers: 0,
            dictionary: None,
        }
    }

    /// Use the given compression level. 0 selects zstd's default level;
    /// negative levels trade ratio for speed.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Spread compression across `workers` internal codec threads. 0 (the
    /// default) compresses on the calling thread.
    pub fn with_workers(mut self, workers: u32) -> Self {
        self.workers = workers;
        self
    }

    /// Compress with the given dictionary. The compressor borrows the
    /// dictionary's digested form for its own lifetime.
    pub fn with_dictionary(mut self, dictionary: &'dict ZstdDictionary) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// Build the compressor.
    pub fn build(self) -> Result<Compressor<'dict>> {
        let level = if self.compression_level == 0 {
            zstd::DEFAULT_COMPRESSION_LEVEL
        } else {
            self.compression_level
        };
        let valid_levels = zstd::zstd_safe::min_c_level()..=zstd::zstd_safe::max_c_level();
        if !valid_levels.contains(&level) {
            return Err(Error::InvalidArgument("compression level out of range"));
        }

        let mut encoder = match self.dictionary {
            Some(dictionary) => zstd::stream::raw::Encoder::with_prepared_dictionary(
                dictionary.compiled_for_level(level)?,
            )?,
            None => zstd::stream::raw::Encoder::new(level)?,
        };

        if self.workers > 0 {
            encoder.set_parameter(zstd::stream::raw::CParameter::NbWorkers(self.workers))?;
        }

        Ok(Compressor {
            encoder,
            last_mode: CompressMode::FlushFrame,
            multi_threaded: self.workers > 0,
        })
    }
}

/// Compress `data` into a single zstd frame at the given compression
/// level. Level 0 selects zstd's default level.
///
/// Equivalent to [`Compressor::compress_single_frame`] on a fresh
/// compressor: the output is pre-sized to the codec's worst-case bound and
/// the frame header records the content size.
pub fn compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut compressor = Compressor::new(level)?;
    compressor.compress_single_frame(data)
}
