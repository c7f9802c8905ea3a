use crate::error::{Error, Result};

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;

/// Chunk sizes used as output grows, indexed by the number of chunks
/// already allocated. Growth levels off at 256 MiB.
const CHUNK_SCHEDULE: [usize; 17] = [
    32 * KIB,
    64 * KIB,
    256 * KIB,
    MIB,
    4 * MIB,
    8 * MIB,
    16 * MIB,
    16 * MIB,
    32 * MIB,
    32 * MIB,
    32 * MIB,
    32 * MIB,
    64 * MIB,
    64 * MIB,
    128 * MIB,
    128 * MIB,
    256 * MIB,
];

struct Chunk {
    data: Box<[u8]>,
    filled: usize,
}

impl Chunk {
    fn is_full(&self) -> bool {
        self.filled == self.data.len()
    }
}

/// A growable byte sink that accumulates codec output across repeated
/// steps, then materializes it into one contiguous `Vec<u8>` with
/// [`OutputBuffer::finish`].
///
/// Output lands in a sequence of chunks sized by [`CHUNK_SCHEDULE`], so
/// neither many small reallocations nor one pessimistic huge allocation is
/// needed when the output size is unknown. When the size *is* known,
/// [`OutputBuffer::with_exact`] sidesteps growth entirely.
///
/// Every chunk except the last is fully written. Dropping the buffer
/// without finishing releases all chunks; error paths rely on this.
pub(crate) struct OutputBuffer {
    chunks: Vec<Chunk>,
    allocated: usize,
    max_length: Option<usize>,
}

impl OutputBuffer {
    /// Create a buffer that grows on demand, up to `max_length` bytes if
    /// given.
    pub(crate) fn new(max_length: Option<usize>) -> Result<Self> {
        let first_chunk_size = match max_length {
            Some(max) => max.min(CHUNK_SCHEDULE[0]),
            None => CHUNK_SCHEDULE[0],
        };
        Self::with_first_chunk(first_chunk_size, max_length)
    }

    /// Create a buffer with a single chunk of exactly `size` bytes, for
    /// when the expected output size is known up front. The buffer can
    /// still grow past `size` if the expectation turns out wrong.
    pub(crate) fn with_exact(size: usize) -> Result<Self> {
        Self::with_first_chunk(size, None)
    }

    fn with_first_chunk(size: usize, max_length: Option<usize>) -> Result<Self> {
        let chunk = alloc_chunk(size)?;
        Ok(Self {
            chunks: vec![chunk],
            allocated: size,
            max_length,
        })
    }

    /// Append the next chunk from the schedule, clamped so the total
    /// allocation never exceeds `max_length`. No-op when a finite
    /// `max_length` is already fully allocated, so repeated calls at the
    /// cap can't append empty trailing chunks.
    ///
    /// Must only be called once the current chunk is fully written.
    pub(crate) fn grow(&mut self) -> Result<()> {
        debug_assert!(self.chunks.last().is_some_and(Chunk::is_full));

        let schedule_index = self.chunks.len().min(CHUNK_SCHEDULE.len() - 1);
        let mut size = CHUNK_SCHEDULE[schedule_index];

        if let Some(max) = self.max_length {
            let room = max - self.allocated;
            if room == 0 {
                return Ok(());
            }
            size = size.min(room);
        }

        let chunk = alloc_chunk(size)?;
        self.chunks.push(chunk);
        self.allocated += size;
        Ok(())
    }

    /// True once a finite `max_length` is fully allocated and written.
    pub(crate) fn reached_max_length(&self) -> bool {
        match self.max_length {
            Some(max) => {
                self.allocated == max && self.chunks.last().is_some_and(Chunk::is_full)
            }
            None => false,
        }
    }

    pub(crate) fn spare_is_empty(&self) -> bool {
        self.chunks.last().is_some_and(Chunk::is_full)
    }

    /// The writable tail of the current chunk.
    fn spare(&mut self) -> &mut [u8] {
        let chunk = self
            .chunks
            .last_mut()
            .expect("output buffer has no chunks");
        &mut chunk.data[chunk.filled..]
    }

    /// Mark the first `len` bytes of the spare region as written.
    fn advance(&mut self, len: usize) {
        let chunk = self
            .chunks
            .last_mut()
            .expect("output buffer has no chunks");
        chunk.filled += len;
        assert!(chunk.filled <= chunk.data.len());
    }

    /// Bytes written so far.
    pub(crate) fn len(&self) -> usize {
        let chunk = self.chunks.last().expect("output buffer has no chunks");
        self.allocated - (chunk.data.len() - chunk.filled)
    }

    /// Concatenate all written bytes into one `Vec<u8>`, consuming the
    /// buffer. The single-chunk case hands over the chunk's allocation
    /// without copying.
    pub(crate) fn finish(mut self) -> Result<Vec<u8>> {
        if self.chunks.len() == 1 {
            let chunk = self.chunks.pop().expect("output buffer has no chunks");
            let mut result = chunk.data.into_vec();
            result.truncate(chunk.filled);
            return Ok(result);
        }

        let total = self.len();
        let mut result = Vec::new();
        result
            .try_reserve_exact(total)
            .map_err(|_| Error::Allocation { size: total })?;
        for chunk in &self.chunks {
            result.extend_from_slice(&chunk.data[..chunk.filled]);
        }
        Ok(result)
    }
}

fn alloc_chunk(size: usize) -> Result<Chunk> {
    let mut data = Vec::new();
    data.try_reserve_exact(size)
        .map_err(|_| Error::Allocation { size })?;
    data.resize(size, 0);
    Ok(Chunk {
        data: data.into_boxed_slice(),
        filled: 0,
    })
}

/// Call a function that uses a [`zstd::stream::raw::OutBuffer`] wrapped
/// around the buffer's spare region. Returns a tuple containing the
/// function's output and the number of bytes written during the call.
pub(crate) fn with_raw_out_buffer<R>(
    buffer: &mut OutputBuffer,
    f: impl FnOnce(&mut zstd::stream::raw::OutBuffer<'_, [u8]>) -> R,
) -> (R, usize) {
    let mut out_buffer = zstd::stream::raw::OutBuffer::around(buffer.spare());
    let result = f(&mut out_buffer);
    let written = out_buffer.pos();
    buffer.advance(written);
    (result, written)
}
