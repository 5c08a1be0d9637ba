use chrono::NaiveDateTime;
use flate2::Compression;

use crate::error::{Error, Result};

use super::codec::GzipCodec;
use super::structures::{
    CentralDirectoryHeader, CompressionMethod, DataDescriptor, DosDateTime, FLAG_DATA_DESCRIPTOR,
    FLAG_UTF8, FileHeader, LocalFileHeader, VERSION_MADE_BY, VERSION_NEEDED,
};
use super::unwrap::GzipUnwrapper;

/// Unix `drwxr-xr-x` in the high 16 bits
pub const FOLDER_ATTRIBUTES: u32 = 0o040755 << 16;

/// Unix `-rw-r--r--` in the high 16 bits
pub const FILE_ATTRIBUTES: u32 = 0o100644 << 16;

/// Size of the slices fed to the codec when compressing in-memory content
const COMPRESS_CHUNK_SIZE: usize = 64 * 1024;

/// One archive member.
///
/// Sizes and `crc32` are only authoritative once the body has been fully
/// compressed. Entries created by [`Entry::streaming_file`] carry zeros until
/// [`Entry::complete`] is called.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub modified: NaiveDateTime,
    pub compression_method: CompressionMethod,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub external_attributes: u32,
    pub local_header_offset: u32,
    /// Raw deflate body, only kept for buffered entries until finalize
    pub(crate) data: Vec<u8>,
}

fn check_name(name: &str) -> Result<()> {
    if name.len() > u16::MAX as usize {
        return Err(Error::Capacity(format!(
            "entry name is {} bytes, at most {} fit",
            name.len(),
            u16::MAX
        )));
    }
    Ok(())
}

/// Narrow a size or offset to its 32-bit header field
pub(crate) fn fits_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::Capacity(format!("{what} {value} does not fit in 32 bits")))
}

impl Entry {
    /// Folder entry: stored, empty, name ending in `/`
    pub fn folder(name: &str, modified: NaiveDateTime) -> Result<Self> {
        let name = if name.ends_with('/') {
            name.to_string()
        } else {
            format!("{name}/")
        };
        check_name(&name)?;

        Ok(Self {
            name,
            modified,
            compression_method: CompressionMethod::Stored,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            external_attributes: FOLDER_ATTRIBUTES,
            local_header_offset: 0,
            data: Vec::new(),
        })
    }

    /// File entry whose content is compressed up front.
    ///
    /// The content goes through the gzip codec and the gzip envelope is
    /// stripped again, leaving the deflate body plus the checksum from the
    /// trailer.
    pub fn file_from_bytes(
        name: &str,
        modified: NaiveDateTime,
        content: &[u8],
        level: Compression,
    ) -> Result<Self> {
        if content.len() > u32::MAX as usize {
            return Err(Error::Capacity(format!(
                "{name} is {} bytes, larger than 4 GiB",
                content.len()
            )));
        }

        let mut entry = Self::streaming_file(name, modified)?;
        let mut codec = GzipCodec::new(level);
        let mut unwrapper = GzipUnwrapper::new();
        let mut body = Vec::new();

        for chunk in content.chunks(COMPRESS_CHUNK_SIZE) {
            if let Some(out) = unwrapper.push(&codec.update(chunk)?)? {
                body.extend_from_slice(&out);
            }
        }
        if let Some(out) = unwrapper.push(&codec.finish()?)? {
            body.extend_from_slice(&out);
        }
        let (tail, trailer) = unwrapper.finish()?;
        body.extend_from_slice(&tail);

        let compressed = fits_u32(body.len() as u64, "compressed size")?;
        entry.complete(trailer.crc32, compressed, trailer.reported_size);
        entry.data = body;
        Ok(entry)
    }

    /// Deflate file entry whose sizes and checksum are not known yet
    pub fn streaming_file(name: &str, modified: NaiveDateTime) -> Result<Self> {
        check_name(name)?;

        Ok(Self {
            name: name.to_string(),
            modified,
            compression_method: CompressionMethod::Deflate,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            external_attributes: FILE_ATTRIBUTES,
            local_header_offset: 0,
            data: Vec::new(),
        })
    }

    /// Record the final checksum and sizes once the body has been produced
    pub fn complete(&mut self, crc32: u32, compressed_size: u32, uncompressed_size: u32) {
        self.crc32 = crc32;
        self.compressed_size = compressed_size;
        self.uncompressed_size = uncompressed_size;
    }

    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Compressed body held for a buffered entry
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn file_header(&self, flags: u16, deferred: bool) -> FileHeader {
        let (crc32, compressed_size, uncompressed_size) = if deferred {
            (0, 0, 0)
        } else {
            (self.crc32, self.compressed_size, self.uncompressed_size)
        };

        FileHeader {
            version_needed: VERSION_NEEDED,
            flags,
            compression_method: self.compression_method,
            modified: DosDateTime::from_datetime(&self.modified),
            crc32,
            compressed_size,
            uncompressed_size,
        }
    }

    /// Encode the local file header.
    ///
    /// With `streaming` set, crc32 and sizes are zero and flag bit 3 tells
    /// readers to take them from the data descriptor after the body.
    pub fn local_file_header(&self, streaming: bool) -> Vec<u8> {
        let flags = if streaming {
            FLAG_UTF8 | FLAG_DATA_DESCRIPTOR
        } else {
            FLAG_UTF8
        };

        LocalFileHeader {
            header: self.file_header(flags, streaming),
            file_name: self.name.as_bytes().to_vec(),
        }
        .to_bytes()
    }

    pub fn central_directory_header(&self) -> Vec<u8> {
        CentralDirectoryHeader {
            version_made_by: VERSION_MADE_BY,
            header: self.file_header(FLAG_UTF8, false),
            external_attributes: self.external_attributes,
            lfh_offset: self.local_header_offset,
            file_name: self.name.as_bytes().to_vec(),
        }
        .to_bytes()
    }

    pub fn data_descriptor(&self) -> [u8; DataDescriptor::SIZE] {
        DataDescriptor {
            crc32: self.crc32,
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
        }
        .to_bytes()
    }
}
