use std::mem;

use chrono::{Local, NaiveDateTime};
use flate2::Compression;
use log::debug;

use crate::error::{Error, Result};
use crate::io::ByteSink;

use super::entry::{Entry, fits_u32};
use super::structures::{CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader};

/// Archive assembled entirely in memory.
///
/// Every file is compressed as soon as it is added; nothing is laid out
/// until [`finalize`](ZipBuilder::finalize), which computes all offsets in
/// one pass.
///
/// ```
/// use streamzip::ZipBuilder;
///
/// let mut zip = ZipBuilder::new();
/// zip.add_file("one.txt", b"hello world")?;
/// let mut docs = zip.add_folder("docs")?;
/// docs.add_file("readme.md", b"# docs")?;
///
/// let bytes = zip.finalize()?;
/// assert_eq!(&bytes[0..4], b"PK\x03\x04");
/// # Ok::<(), streamzip::Error>(())
/// ```
pub struct ZipBuilder {
    entries: Vec<Entry>,
    level: Compression,
    timestamp: Option<NaiveDateTime>,
    finalized: bool,
}

impl Default for ZipBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            level: Compression::default(),
            timestamp: None,
            finalized: false,
        }
    }

    pub fn with_compression(mut self, level: Compression) -> Self {
        self.level = level;
        self
    }

    /// Stamp every entry with `timestamp` instead of the current local time
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    fn modified(&self) -> NaiveDateTime {
        self.timestamp
            .unwrap_or_else(|| Local::now().naive_local())
    }

    fn check_open(&self) -> Result<()> {
        if self.finalized {
            return Err(Error::Sequencing("entry added after finalize"));
        }
        Ok(())
    }

    /// Compress `content` and append it as `name`
    pub fn add_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        self.check_open()?;
        let entry = Entry::file_from_bytes(name, self.modified(), content, self.level)?;
        debug!(
            "compressed {} ({} -> {} bytes)",
            entry.name, entry.uncompressed_size, entry.compressed_size
        );
        self.entries.push(entry);
        Ok(())
    }

    /// Append a folder entry and return a scope for adding its children
    pub fn add_folder(&mut self, name: &str) -> Result<Folder<'_>> {
        self.check_open()?;
        let entry = Entry::folder(name, self.modified())?;
        let prefix = entry.name.clone();
        self.entries.push(entry);
        Ok(Folder {
            builder: self,
            prefix,
        })
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Lay out the archive and return its bytes.
    ///
    /// Compressed bodies are released as they are copied out. May only be
    /// called once; later calls and later adds fail with
    /// [`Error::Sequencing`].
    pub fn finalize(&mut self) -> Result<Vec<u8>> {
        if self.finalized {
            return Err(Error::Sequencing("finalize called twice"));
        }
        self.finalized = true;

        let count = u16::try_from(self.entries.len()).map_err(|_| {
            Error::Capacity(format!("{} entries, at most {}", self.entries.len(), u16::MAX))
        })?;

        let mut general_capacity = 0;
        let mut central_directory_capacity = 0;
        for entry in &self.entries {
            general_capacity += LocalFileHeader::SIZE + entry.name.len() + entry.data.len();
            central_directory_capacity += CentralDirectoryHeader::MIN_SIZE + entry.name.len();
        }

        let mut general_segment = Vec::with_capacity(general_capacity);
        let mut central_directory_segment =
            Vec::with_capacity(central_directory_capacity + EndOfCentralDirectory::SIZE);

        for entry in &mut self.entries {
            entry.local_header_offset = fits_u32(general_segment.len() as u64, "local header offset")?;
            general_segment.extend_from_slice(&entry.local_file_header(false));
            general_segment.extend_from_slice(&mem::take(&mut entry.data));

            central_directory_segment.extend_from_slice(&entry.central_directory_header());
        }

        let cd_offset = fits_u32(general_segment.len() as u64, "central directory offset")?;
        let cd_size = fits_u32(central_directory_segment.len() as u64, "central directory size")?;
        central_directory_segment
            .extend_from_slice(&EndOfCentralDirectory::new(count, cd_size, cd_offset).to_bytes());

        debug!(
            "finalized {} entries, central directory at {} ({} bytes)",
            count, cd_offset, cd_size
        );

        Ok([general_segment, central_directory_segment].concat())
    }

    /// Finalize and write the archive to `sink`, then close it
    pub async fn finalize_into<S: ByteSink>(&mut self, sink: &mut S) -> Result<()> {
        let bytes = self.finalize()?;
        sink.write(&bytes).await.map_err(Error::Sink)?;
        sink.close().await.map_err(Error::Sink)
    }
}

/// Scope that adds children under a folder of a [`ZipBuilder`]
pub struct Folder<'a> {
    builder: &'a mut ZipBuilder,
    prefix: String,
}

impl Folder<'_> {
    /// Archive path of this folder, with trailing `/`
    pub fn path(&self) -> &str {
        &self.prefix
    }

    pub fn add_file(&mut self, name: &str, content: &[u8]) -> Result<()> {
        let name = format!("{}{name}", self.prefix);
        self.builder.add_file(&name, content)
    }

    pub fn add_folder(&mut self, name: &str) -> Result<Folder<'_>> {
        let name = format!("{}{name}", self.prefix);
        self.builder.add_folder(&name)
    }
}
