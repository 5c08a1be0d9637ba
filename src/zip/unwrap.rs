//! Strip the gzip envelope from a chunked stream.
//!
//! A gzip stream is a 10-byte header, a raw deflate body and an 8-byte
//! trailer (CRC-32, then input size modulo 2^32, both little-endian). The
//! deflate body is exactly what a ZIP entry with method 8 stores, and the
//! trailer carries the checksum the ZIP headers need.
//!
//! Chunk boundaries are arbitrary: the header may arrive in several pieces
//! and the trailer may straddle the last two chunks. [`GzipUnwrapper`]
//! strips the header once and always holds back the most recent chunk, so
//! whatever arrives last still contains the trailer when the stream ends.

use std::mem;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Length of a gzip header without optional fields
pub const GZIP_HEADER_LEN: usize = 10;

/// Length of the gzip trailer: CRC-32 and ISIZE
pub const GZIP_TRAILER_LEN: usize = 8;

/// Checksum and size carried by the gzip trailer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    pub crc32: u32,
    /// Uncompressed size modulo 2^32
    pub reported_size: u32,
}

impl GzipTrailer {
    fn from_bytes(data: &[u8]) -> Self {
        Self {
            crc32: LittleEndian::read_u32(&data[0..4]),
            reported_size: LittleEndian::read_u32(&data[4..8]),
        }
    }
}

#[derive(Debug)]
enum State {
    /// Fewer than 10 bytes seen so far
    AwaitingHeader { seen: Vec<u8> },
    /// Header dropped; `pending` is held back until more input arrives
    Streaming { pending: Vec<u8> },
    Done,
}

/// Push-driven state machine turning gzip chunks into deflate body chunks.
///
/// ```
/// use flate2::{Compression, write::GzEncoder};
/// use std::io::Write;
/// use streamzip::zip::GzipUnwrapper;
///
/// let mut enc = GzEncoder::new(Vec::new(), Compression::default());
/// enc.write_all(b"hello world").unwrap();
/// let wrapped = enc.finish().unwrap();
///
/// let mut unwrapper = GzipUnwrapper::new();
/// let mut body = Vec::new();
/// for chunk in wrapped.chunks(3) {
///     body.extend(unwrapper.push(chunk).unwrap().unwrap_or_default());
/// }
/// let (tail, trailer) = unwrapper.finish().unwrap();
/// body.extend(tail);
///
/// assert_eq!(trailer.reported_size, 11);
/// assert_eq!(body, &wrapped[10..wrapped.len() - 8]);
/// ```
#[derive(Debug)]
pub struct GzipUnwrapper {
    state: State,
}

impl Default for GzipUnwrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipUnwrapper {
    pub fn new() -> Self {
        Self {
            state: State::AwaitingHeader { seen: Vec::new() },
        }
    }

    /// Feed the next wrapped chunk.
    ///
    /// Returns body bytes that are now known not to belong to the trailer,
    /// or `None` when everything received so far must still be held.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<Vec<u8>>> {
        match &mut self.state {
            State::AwaitingHeader { seen } => {
                seen.extend_from_slice(chunk);
                if seen.len() < GZIP_HEADER_LEN {
                    return Ok(None);
                }
                let body = seen.split_off(GZIP_HEADER_LEN);
                self.state = State::Streaming {
                    pending: Vec::new(),
                };
                Ok(self.hold(body))
            }
            State::Streaming { .. } => Ok(self.hold(chunk.to_vec())),
            State::Done => Err(Error::Sequencing("gzip stream already finished")),
        }
    }

    fn hold(&mut self, chunk: Vec<u8>) -> Option<Vec<u8>> {
        let State::Streaming { pending } = &mut self.state else {
            return None;
        };

        if chunk.is_empty() {
            return None;
        }
        if pending.is_empty() {
            *pending = chunk;
            return None;
        }
        if chunk.len() >= GZIP_TRAILER_LEN {
            return Some(mem::replace(pending, chunk));
        }

        // The new chunk is too short to hold the whole trailer on its own
        pending.extend_from_slice(&chunk);
        if pending.len() <= GZIP_TRAILER_LEN {
            return None;
        }
        let keep = pending.split_off(pending.len() - GZIP_TRAILER_LEN);
        Some(mem::replace(pending, keep))
    }

    /// Signal the end of input.
    ///
    /// Returns the last body bytes (possibly empty) and the parsed trailer.
    /// Fails with [`Error::Framing`] if fewer than 18 bytes were pushed.
    pub fn finish(&mut self) -> Result<(Vec<u8>, GzipTrailer)> {
        match mem::replace(&mut self.state, State::Done) {
            State::AwaitingHeader { seen } => Err(Error::Framing(format!(
                "gzip stream ended after {} header bytes",
                seen.len()
            ))),
            State::Streaming { mut pending } => {
                if pending.len() < GZIP_TRAILER_LEN {
                    return Err(Error::Framing(format!(
                        "gzip stream ended with {} of {} trailer bytes",
                        pending.len(),
                        GZIP_TRAILER_LEN
                    )));
                }
                let trailer = pending.split_off(pending.len() - GZIP_TRAILER_LEN);
                Ok((pending, GzipTrailer::from_bytes(&trailer)))
            }
            State::Done => Err(Error::Sequencing("gzip stream already finished")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::read::DeflateDecoder;
    use flate2::write::GzEncoder;
    use std::io::{Read, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn unwrap_chunks(chunks: &[&[u8]]) -> Result<(Vec<u8>, GzipTrailer)> {
        let mut unwrapper = GzipUnwrapper::new();
        let mut body = Vec::new();
        for chunk in chunks {
            if let Some(out) = unwrapper.push(chunk)? {
                body.extend(out);
            }
        }
        let (tail, trailer) = unwrapper.finish()?;
        body.extend(tail);
        Ok((body, trailer))
    }

    fn split_at_all<'a>(data: &'a [u8], cuts: &[usize]) -> Vec<&'a [u8]> {
        let mut parts = Vec::new();
        let mut start = 0;
        for &cut in cuts {
            parts.push(&data[start..cut]);
            start = cut;
        }
        parts.push(&data[start..]);
        parts
    }

    fn inflate(body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        DeflateDecoder::new(body).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn header_and_trailer_split_across_chunks() {
        let wrapped = gzip(b"hello world");
        let n = wrapped.len();
        // header arrives as 4 + 6 bytes, trailer straddles the last two chunks
        let chunks = split_at_all(&wrapped, &[4, 10, n - 5]);

        let (body, trailer) = unwrap_chunks(&chunks).unwrap();

        assert_eq!(body, &wrapped[10..n - 8]);
        assert_eq!(inflate(&body), b"hello world");
        assert_eq!(trailer.reported_size, 11);

        let mut crc = flate2::Crc::new();
        crc.update(b"hello world");
        assert_eq!(trailer.crc32, crc.sum());
    }

    #[test]
    fn every_single_byte_chunking() {
        let data = b"The quick brown fox jumps over the lazy dog".repeat(20);
        let wrapped = gzip(&data);
        let chunks: Vec<&[u8]> = wrapped.chunks(1).collect();

        let (body, trailer) = unwrap_chunks(&chunks).unwrap();

        assert_eq!(body, &wrapped[10..wrapped.len() - 8]);
        assert_eq!(inflate(&body), data);
        assert_eq!(trailer.reported_size as usize, data.len());
    }

    #[test]
    fn whole_stream_in_one_chunk() {
        let wrapped = gzip(b"zipped");
        let (body, trailer) = unwrap_chunks(&[&wrapped[..]]).unwrap();
        assert_eq!(inflate(&body), b"zipped");
        assert_eq!(trailer.reported_size, 6);
    }

    #[test]
    fn empty_chunks_are_ignored() {
        let wrapped = gzip(b"abc");
        let n = wrapped.len();
        let empty: &[u8] = &[];
        let chunks = [
            empty,
            &wrapped[..12],
            empty,
            &wrapped[12..n - 2],
            empty,
            &wrapped[n - 2..],
            empty,
        ];
        let (body, trailer) = unwrap_chunks(&chunks).unwrap();
        assert_eq!(inflate(&body), b"abc");
        assert_eq!(trailer.reported_size, 3);
    }

    #[test]
    fn holds_back_until_trailer_is_covered() {
        let mut unwrapper = GzipUnwrapper::new();
        assert_eq!(unwrapper.push(&[0u8; 10]).unwrap(), None);
        assert_eq!(unwrapper.push(&[1u8; 12]).unwrap(), None);
        // 12 held + 3 new: only the last 8 may be trailer
        assert_eq!(unwrapper.push(&[2u8; 3]).unwrap(), Some(vec![1u8; 7]));
        let (tail, trailer) = unwrapper.finish().unwrap();
        assert!(tail.is_empty());
        assert_eq!(trailer.crc32, 0x01010101);
        assert_eq!(trailer.reported_size, 0x02020201);
    }

    #[test]
    fn minimal_envelope_has_empty_body() {
        let mut envelope = vec![0u8; 10];
        envelope.extend([0x78, 0x56, 0x34, 0x12, 0, 0, 0, 0]);
        let (body, trailer) = unwrap_chunks(&[&envelope[..]]).unwrap();
        assert!(body.is_empty());
        assert_eq!(trailer.crc32, 0x12345678);
        assert_eq!(trailer.reported_size, 0);
    }

    #[test]
    fn short_input_is_a_framing_error() {
        assert!(matches!(unwrap_chunks(&[&[0u8; 9][..]]), Err(Error::Framing(_))));
        assert!(matches!(unwrap_chunks(&[&[0u8; 17][..]]), Err(Error::Framing(_))));
        assert!(matches!(unwrap_chunks(&[]), Err(Error::Framing(_))));
    }

    #[test]
    fn use_after_finish_is_rejected() {
        let wrapped = gzip(b"x");
        let mut unwrapper = GzipUnwrapper::new();
        unwrapper.push(&wrapped).unwrap();
        unwrapper.finish().unwrap();
        assert!(matches!(unwrapper.push(b"more"), Err(Error::Sequencing(_))));
        assert!(matches!(unwrapper.finish(), Err(Error::Sequencing(_))));
    }
}
