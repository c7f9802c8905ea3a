use crate::error::{Error, Result};

/// Scratch buffer for bytes the caller supplied but the codec has not yet
/// consumed. The pending range is `data[begin..]`; consumed bytes are
/// dropped by advancing `begin`, and the backing allocation is reused or
/// compacted as new input arrives.
pub(crate) struct UnconsumedInput {
    data: Vec<u8>,
    begin: usize,
}

impl UnconsumedInput {
    pub(crate) fn new() -> Self {
        Self {
            data: Vec::new(),
            begin: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.begin == self.data.len()
    }

    /// The bytes waiting to be fed to the codec.
    pub(crate) fn pending(&self) -> &[u8] {
        &self.data[self.begin..]
    }

    /// Append `new_bytes` after the pending range.
    ///
    /// When the allocation has no room at all for `new_bytes`, it is
    /// replaced with one sized to exactly the combined backlog. When only
    /// the tail is short, the pending range is shifted to the front in
    /// place instead. This keeps the allocation bounded by the largest
    /// backlog actually needed, without reallocating on every call.
    pub(crate) fn absorb(&mut self, new_bytes: &[u8]) -> Result<()> {
        let used = self.data.len() - self.begin;
        let available_total = self.data.capacity() - used;
        let available_after_end = self.data.capacity() - self.data.len();

        if available_total < new_bytes.len() {
            let needed = used + new_bytes.len();
            let mut grown = Vec::new();
            grown
                .try_reserve_exact(needed)
                .map_err(|_| Error::Allocation { size: needed })?;
            grown.extend_from_slice(&self.data[self.begin..]);
            self.data = grown;
            self.begin = 0;
        } else if available_after_end < new_bytes.len() {
            self.data.copy_within(self.begin.., 0);
            self.data.truncate(used);
            self.begin = 0;
        }

        self.data.extend_from_slice(new_bytes);
        Ok(())
    }

    /// Replace the pending range with `remainder`, reusing the allocation
    /// when it is large enough.
    pub(crate) fn replace(&mut self, remainder: &[u8]) -> Result<()> {
        self.data.clear();
        self.begin = 0;
        self.absorb(remainder)
    }

    /// Drop `consumed` bytes from the front of the pending range.
    pub(crate) fn advance(&mut self, consumed: usize) {
        self.begin += consumed;
        assert!(self.begin <= self.data.len());
        if self.is_empty() {
            self.clear();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.begin = 0;
    }
}
