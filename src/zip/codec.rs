use std::io::Write;
use std::mem;

use flate2::Compression;
use flate2::write::GzEncoder;

use crate::error::{Error, Result};

/// Incremental gzip encoder.
///
/// Output is drained after every input chunk, so the caller sees the wrapped
/// stream as a sequence of chunks whose boundaries follow the deflate
/// encoder's internal flushing, not the input's.
pub struct GzipCodec {
    encoder: GzEncoder<Vec<u8>>,
}

impl GzipCodec {
    pub fn new(level: Compression) -> Self {
        Self {
            encoder: GzEncoder::new(Vec::new(), level),
        }
    }

    /// Compress one input chunk, returning whatever wrapped bytes are ready.
    ///
    /// The result is often empty while the encoder accumulates a block.
    pub fn update(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.encoder.write_all(input).map_err(Error::Codec)?;
        Ok(mem::take(self.encoder.get_mut()))
    }

    /// Flush the final deflate block and the 8-byte gzip trailer.
    pub fn finish(self) -> Result<Vec<u8>> {
        self.encoder.finish().map_err(Error::Codec)
    }
}
