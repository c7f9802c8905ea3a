use zstd::stream::raw::Operation as _;

use crate::{
    dict::ZstdDictionary,
    error::{Error, Result},
    output::{self, OutputBuffer},
    unconsumed::UnconsumedInput,
};

/// Where a decompressor stands relative to frame boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    /// The previous frame (if any) fully ended and no partial next frame
    /// has begun. The initial state.
    AtEdge,
    /// Partway through a frame: header bytes were consumed or output is
    /// still owed.
    MidFrame,
    /// A frame completed and this decompressor stops there. Only reached
    /// when decoding a single frame.
    Done,
}

/// Whether decompression stops after the first frame or runs on through
/// any number of concatenated frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameMode {
    Single,
    Multi,
}

/// The shared per-call loop behind [`FrameDecompressor`] and
/// [`StreamDecompressor`].
struct DecompressEngine<'dict> {
    decoder: zstd::stream::raw::Decoder<'dict>,
    pending: UnconsumedInput,
    state: FrameState,
    needs_input: bool,
    mode: FrameMode,
}

impl<'dict> DecompressEngine<'dict> {
    fn new(decoder: zstd::stream::raw::Decoder<'dict>, mode: FrameMode) -> Self {
        Self {
            decoder,
            pending: UnconsumedInput::new(),
            state: FrameState::AtEdge,
            needs_input: true,
            mode,
        }
    }

    fn decompress(
        &mut self,
        data: &[u8],
        max_length: Option<usize>,
        size_hint: Option<usize>,
    ) -> Result<Vec<u8>> {
        if self.state == FrameState::Done {
            return Err(Error::AlreadyAtEnd);
        }

        match self.decompress_inner(data, max_length, size_hint) {
            Ok(decompressed) => Ok(decompressed),
            Err(error) => {
                self.reset_session();
                Err(error)
            }
        }
    }

    fn decompress_inner(
        &mut self,
        data: &[u8],
        max_length: Option<usize>,
        size_hint: Option<usize>,
    ) -> Result<Vec<u8>> {
        // When bytes are already pending, new input joins the backlog and
        // the codec reads from there; otherwise it reads the caller's
        // slice directly.
        let from_pending = !self.pending.is_empty();
        if from_pending && !data.is_empty() {
            self.pending.absorb(data)?;
        }

        let mut output = match size_hint {
            Some(size) => OutputBuffer::with_exact(size)?,
            None => OutputBuffer::new(max_length)?,
        };

        let (consumed, drained_input, hit_max_length) = {
            let input = if from_pending {
                self.pending.pending()
            } else {
                data
            };
            run_decode_loop(
                &mut self.decoder,
                input,
                &mut output,
                self.mode,
                &mut self.state,
            )?
        };

        if from_pending {
            self.pending.advance(consumed);
        } else if !drained_input {
            self.pending.replace(&data[consumed..])?;
        }

        self.needs_input = if self.state == FrameState::Done || !drained_input {
            // Finished the frame, or the backlog still holds input.
            false
        } else {
            let output_may_remain = match self.mode {
                FrameMode::Single => true,
                FrameMode::Multi => self.state == FrameState::MidFrame,
            };
            // An output capped exactly at max_length is ambiguous: the
            // codec may still hold decoded bytes, so the caller should
            // call again with empty input before feeding more.
            !(hit_max_length && output_may_remain)
        };

        output.finish()
    }

    /// Make the instance reusable after a failed call: the in-flight frame
    /// and any buffered input are abandoned and all state returns to its
    /// initial value.
    fn reset_session(&mut self) {
        self.pending.clear();
        self.state = FrameState::AtEdge;
        self.needs_input = true;
        if let Err(error) = self.decoder.reinit() {
            log::debug!("failed to reset decompressor session: {error}");
        }
    }
}

/// Drive the codec over `input` until the output cap is reached, the input
/// is exhausted, or (in single-frame mode) the frame ends. Returns the
/// consumed byte count, whether all input was consumed, and whether the
/// output stopped exactly at its cap.
fn run_decode_loop(
    decoder: &mut zstd::stream::raw::Decoder<'_>,
    input: &[u8],
    output: &mut OutputBuffer,
    mode: FrameMode,
    state: &mut FrameState,
) -> Result<(usize, bool, bool)> {
    let mut in_buffer = zstd::stream::raw::InBuffer::around(input);
    let mut hit_max_length = false;

    loop {
        let pos_before = in_buffer.pos();
        let (result, written) = output::with_raw_out_buffer(output, |out_buffer| {
            decoder.run(&mut in_buffer, out_buffer)
        });

        let remaining = result?;
        if remaining == 0 {
            // The frame fully ended and flushed.
            match mode {
                FrameMode::Single => {
                    *state = FrameState::Done;
                    break;
                }
                FrameMode::Multi => *state = FrameState::AtEdge,
            }
        } else if in_buffer.pos() > pos_before || written > 0 {
            // Only forward progress moves off the edge: a step that
            // consumed nothing and produced nothing must leave the frame
            // state untouched.
            *state = FrameState::MidFrame;
        }

        if output.spare_is_empty() {
            if output.reached_max_length() {
                hit_max_length = true;
                break;
            }
            output.grow()?;
            continue;
        }

        if in_buffer.pos() == input.len() {
            break;
        }
    }

    let consumed = in_buffer.pos();
    Ok((consumed, consumed == input.len(), hit_max_length))
}

/// A decompressor for exactly one zstd frame.
///
/// Input is fed incrementally with
/// [`decompress`](FrameDecompressor::decompress); the moment the frame
/// ends, [`eof`](FrameDecompressor::eof) turns true, any bytes beyond the
/// frame end are exposed via [`unused_data`](FrameDecompressor::unused_data),
/// and further calls fail with [`Error::AlreadyAtEnd`].
///
/// ```
/// # fn main() -> Result<(), zstd_incremental::Error> {
/// let frame = zstd_incremental::compress(b"abcdef", 3)?;
///
/// let mut decompressor = zstd_incremental::FrameDecompressor::new()?;
/// let decompressed = decompressor.decompress(&frame, None)?;
/// assert_eq!(decompressed, b"abcdef");
/// assert!(decompressor.eof());
/// # Ok(())
/// # }
/// ```
pub struct FrameDecompressor<'dict> {
    engine: DecompressEngine<'dict>,
}

impl FrameDecompressor<'static> {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }
}

impl<'dict> FrameDecompressor<'dict> {
    pub fn builder() -> FrameDecompressorBuilder<'dict> {
        FrameDecompressorBuilder::new()
    }

    /// Decompress from `data`, returning at most `max_length` bytes
    /// (`None` = unbounded).
    ///
    /// Bytes that could not be consumed yet are carried over to the next
    /// call, so `data` can be sliced arbitrarily finely. When output stops
    /// exactly at `max_length`, call again with empty `data` to drain more
    /// before feeding new input.
    pub fn decompress(&mut self, data: &[u8], max_length: Option<usize>) -> Result<Vec<u8>> {
        self.engine.decompress(data, max_length, None)
    }

    /// True once the frame has fully ended.
    pub fn eof(&self) -> bool {
        self.engine.state == FrameState::Done
    }

    /// False when the decompressor can produce more output without new
    /// input: either buffered input remains, or the last call stopped
    /// exactly at `max_length`, or the frame already ended.
    pub fn needs_input(&self) -> bool {
        self.engine.needs_input
    }

    /// The bytes that followed the end of the frame. Empty until
    /// [`eof`](FrameDecompressor::eof) is true.
    pub fn unused_data(&self) -> &[u8] {
        match self.engine.state {
            FrameState::Done => self.engine.pending.pending(),
            _ => &[],
        }
    }
}

/// A builder that builds a [`FrameDecompressor`].
pub struct FrameDecompressorBuilder<'dict> {
    dictionary: Option<&'dict ZstdDictionary>,
}

impl<'dict> FrameDecompressorBuilder<'dict> {
    fn new() -> Self {
        Self { dictionary: None }
    }

    /// Decompress with the given dictionary. The decompressor borrows the
    /// dictionary's digested form for its own lifetime.
    pub fn with_dictionary(mut self, dictionary: &'dict ZstdDictionary) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// Build the decompressor.
    pub fn build(self) -> Result<FrameDecompressor<'dict>> {
        let decoder = build_decoder(self.dictionary)?;
        Ok(FrameDecompressor {
            engine: DecompressEngine::new(decoder, FrameMode::Single),
        })
    }
}

/// A decompressor for an endless stream of concatenated zstd frames.
///
/// There is no terminal state: whenever one frame ends,
/// [`at_frame_edge`](StreamDecompressor::at_frame_edge) turns true and
/// decompression resumes transparently into the next frame on further
/// input. A stream that ends anywhere other than a frame edge was
/// truncated.
pub struct StreamDecompressor<'dict> {
    engine: DecompressEngine<'dict>,
}

impl StreamDecompressor<'static> {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }
}

impl<'dict> StreamDecompressor<'dict> {
    pub fn builder() -> StreamDecompressorBuilder<'dict> {
        StreamDecompressorBuilder::new()
    }

    /// Decompress from `data`, returning at most `max_length` bytes
    /// (`None` = unbounded).
    ///
    /// Bytes that could not be consumed yet are carried over to the next
    /// call, so `data` can be sliced arbitrarily finely. When output stops
    /// exactly at `max_length`, call again with empty `data` to drain more
    /// before feeding new input.
    pub fn decompress(&mut self, data: &[u8], max_length: Option<usize>) -> Result<Vec<u8>> {
        self.engine.decompress(data, max_length, None)
    }

    /// True between frames: every frame so far fully ended and no partial
    /// next frame has begun. Also true on a fresh decompressor.
    /// Decompressing zero bytes never changes this.
    pub fn at_frame_edge(&self) -> bool {
        self.engine.state == FrameState::AtEdge
    }

    /// False when the decompressor can produce more output without new
    /// input: either buffered input remains, or the last call stopped
    /// exactly at `max_length` mid-frame.
    pub fn needs_input(&self) -> bool {
        self.engine.needs_input
    }
}

/// A builder that builds a [`StreamDecompressor`].
pub struct StreamDecompressorBuilder<'dict> {
    dictionary: Option<&'dict ZstdDictionary>,
}

impl<'dict> StreamDecompressorBuilder<'dict> {
    fn new() -> Self {
        Self { dictionary: None }
    }

    /// Decompress with the given dictionary. The decompressor borrows the
    /// dictionary's digested form for its own lifetime.
    pub fn with_dictionary(mut self, dictionary: &'dict ZstdDictionary) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// Build the decompressor.
    pub fn build(self) -> Result<StreamDecompressor<'dict>> {
        let decoder = build_decoder(self.dictionary)?;
        Ok(StreamDecompressor {
            engine: DecompressEngine::new(decoder, FrameMode::Multi),
        })
    }
}

fn build_decoder(
    dictionary: Option<&ZstdDictionary>,
) -> Result<zstd::stream::raw::Decoder<'_>> {
    let decoder = match dictionary {
        Some(dictionary) => zstd::stream::raw::Decoder::with_prepared_dictionary(
            dictionary.compiled_for_decompression(),
        )?,
        None => zstd::stream::raw::Decoder::new()?,
    };
    Ok(decoder)
}

/// Decompress every frame in `data` and return the concatenated result.
///
/// Fails with [`Error::IncompleteFrame`] if `data` ends in the middle of a
/// frame instead of silently returning a truncated result.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decompressor = StreamDecompressor::new()?;

    // A frame header that records its content size lets the output skip
    // geometric growth for the common single-frame case.
    let size_hint = match zstd::zstd_safe::get_frame_content_size(data) {
        Ok(Some(content_size)) => content_size.try_into().ok(),
        _ => None,
    };

    let decompressed = decompressor.engine.decompress(data, None, size_hint)?;
    if !decompressor.at_frame_edge() {
        return Err(Error::IncompleteFrame);
    }
    Ok(decompressed)
}
