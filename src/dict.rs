use std::collections::HashMap;
use std::sync::OnceLock;

use zstd::dict::{DecoderDictionary, EncoderDictionary};

use crate::error::{Error, Result};

/// A zstd dictionary: raw content plus lazily compiled, digested forms.
///
/// Digesting a dictionary into the codec's internal form is expensive and
/// depends on the compression level, so each level's digested dictionary is
/// compiled at most once and then shared read-only by every compressor
/// built from this dictionary. Decompression needs a single
/// level-independent digested form, cached the same way.
///
/// Compressors and decompressors borrow the dictionary for their lifetime,
/// so the digested handles always outlive the sessions referencing them.
pub struct ZstdDictionary {
    content: Vec<u8>,
    by_level: HashMap<i32, OnceLock<EncoderDictionary<'static>>>,
    for_decompression: OnceLock<DecoderDictionary<'static>>,
}

impl ZstdDictionary {
    /// Create a dictionary from raw content, either trained dictionary
    /// bytes (with the dictionary magic and an id) or arbitrary "raw
    /// content" sample bytes.
    pub fn new(content: Vec<u8>) -> Result<Self> {
        if content.is_empty() {
            return Err(Error::InvalidArgument("dictionary content is empty"));
        }

        let by_level = (1..=zstd::zstd_safe::max_c_level())
            .map(|level| (level, OnceLock::new()))
            .collect();

        Ok(Self {
            content,
            by_level,
            for_decompression: OnceLock::new(),
        })
    }

    /// The raw dictionary content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    /// The dictionary id recorded in the content, or 0 for a raw content
    /// dictionary.
    pub fn id(&self) -> u32 {
        zstd::zstd_safe::get_dict_id_from_dict(&self.content).map_or(0, |id| id.get())
    }

    /// The digested compression dictionary for `level`, compiling it on
    /// first use. Concurrent requests for the same level fold into a
    /// single compilation; requests for other levels proceed
    /// independently.
    pub(crate) fn compiled_for_level(&self, level: i32) -> Result<&EncoderDictionary<'static>> {
        let cell = self.by_level.get(&level).ok_or(Error::InvalidArgument(
            "compression level out of range for dictionary compression",
        ))?;
        Ok(cell.get_or_init(|| EncoderDictionary::copy(&self.content, level)))
    }

    /// The digested decompression dictionary, compiling it on first use.
    pub(crate) fn compiled_for_decompression(&self) -> &DecoderDictionary<'static> {
        self.for_decompression
            .get_or_init(|| DecoderDictionary::copy(&self.content))
    }
}

impl std::fmt::Debug for ZstdDictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZstdDictionary")
            .field("len", &self.content.len())
            .field("id", &self.id())
            .finish()
    }
}
