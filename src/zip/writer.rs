use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use flate2::Compression;
use log::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::io::{ByteSink, ByteSource, FileSystem, LocalFs};

use super::codec::GzipCodec;
use super::entry::{Entry, fits_u32};
use super::structures::EndOfCentralDirectory;
use super::unwrap::GzipUnwrapper;

/// Archive member name for a filesystem path: normal components joined by
/// `/`. Roots, prefixes, `.` and `..` are dropped.
pub fn archive_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn local_time(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

/// Archive writer that streams every entry straight into a [`ByteSink`].
///
/// Files are compressed chunk by chunk while they are read, so a file's
/// local header is written before its size and checksum are known. Those
/// follow the body in a data descriptor. The central directory is written
/// by [`close`](ZipStreamWriter::close).
///
/// Writes are strictly sequential: each one completes before the next
/// starts, and the running total of completed writes is the source of every
/// offset recorded in the archive.
///
/// ```no_run
/// use std::path::Path;
/// use streamzip::{FileSink, LocalFs, ZipStreamWriter};
///
/// #[tokio::main]
/// async fn main() -> streamzip::Result<()> {
///     let sink = FileSink::create(Path::new("out.zip")).await.map_err(streamzip::Error::Sink)?;
///     let mut zip = ZipStreamWriter::new(sink, LocalFs::new());
///
///     zip.add_folder(Path::new("docs")).await?;
///     zip.add_file(Path::new("README.md")).await?;
///     zip.close().await?;
///     Ok(())
/// }
/// ```
pub struct ZipStreamWriter<S: ByteSink, F: FileSystem = LocalFs> {
    sink: S,
    fs: F,
    entries: Vec<Entry>,
    /// Bytes acknowledged by the sink so far
    offset: u64,
    level: Compression,
    /// Base folder that added paths are resolved against and named from
    root: Option<PathBuf>,
    /// Canonical paths never read, such as the archive being written
    excluded: Vec<PathBuf>,
    closed: bool,
    /// Set once an add fails after writing part of an entry; the archive
    /// can only be discarded
    failed: bool,
}

impl<S: ByteSink, F: FileSystem> ZipStreamWriter<S, F> {
    pub fn new(sink: S, fs: F) -> Self {
        Self {
            sink,
            fs,
            entries: Vec::new(),
            offset: 0,
            level: Compression::default(),
            root: None,
            excluded: Vec::new(),
            closed: false,
            failed: false,
        }
    }

    pub fn with_compression(mut self, level: Compression) -> Self {
        self.level = level;
        self
    }

    /// Resolve added paths under `root` and name entries relative to it
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Never archive `path`, compared against the canonical form of every
    /// path visited. Pass it canonicalized, e.g. the output archive when it
    /// sits inside a folder being added.
    pub fn with_exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    async fn is_excluded(&self, path: &Path) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        match self.fs.canonicalize(path).await {
            Ok(canonical) => self.excluded.contains(&canonical),
            Err(_) => false,
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path),
            None => path.to_path_buf(),
        }
    }

    fn name_for(&self, resolved: &Path) -> String {
        let relative = match &self.root {
            Some(root) => resolved.strip_prefix(root).unwrap_or(resolved),
            None => resolved,
        };
        archive_name(relative)
    }

    /// Entries written so far, in archive order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Running total of bytes written to the sink
    pub fn bytes_written(&self) -> u64 {
        self.offset
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Give back the sink, e.g. to read a [`MemorySink`](crate::io::MemorySink)
    pub fn into_inner(self) -> S {
        self.sink
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Sequencing("entry added after close"));
        }
        if self.failed {
            return Err(Error::Sequencing("archive abandoned after a failed add"));
        }
        Ok(())
    }

    /// Abandon the archive if a failed add left bytes in the sink.
    /// A failed sink write may have accepted part of its buffer.
    fn track(&mut self, start: u64, result: Result<()>) -> Result<()> {
        if let Err(err) = &result {
            if self.offset != start || matches!(err, Error::Sink(_)) {
                self.failed = true;
            }
        }
        result
    }

    async fn emit(&mut self, buf: &[u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        self.sink.write(buf).await.map_err(Error::Sink)?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    /// Add a file or a folder, depending on what `path` is
    pub async fn add_path(&mut self, path: &Path) -> Result<()> {
        self.check_open()?;
        let resolved = self.resolve(path);
        let start = self.offset;
        let result = match self.fs.metadata(&resolved).await {
            Ok(meta) if meta.is_dir => self.write_folder(&resolved).await,
            Ok(_) => self.write_file(&resolved).await,
            Err(err) => Err(Error::Source(err)),
        };
        self.track(start, result)
    }

    /// Write a folder entry, then everything below it.
    ///
    /// Children are added in path order. A path with no normal components
    /// (such as `.`) gets no entry of its own, only its children.
    pub async fn add_folder(&mut self, path: &Path) -> Result<()> {
        self.check_open()?;
        let resolved = self.resolve(path);
        let start = self.offset;
        let result = self.write_folder(&resolved).await;
        self.track(start, result)
    }

    async fn write_folder(&mut self, path: &Path) -> Result<()> {
        if self.is_excluded(path).await {
            debug!("skipping excluded {}", path.display());
            return Ok(());
        }
        let meta = self.fs.metadata(path).await.map_err(Error::Source)?;
        if !meta.is_dir {
            return Err(Error::Source(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a folder", path.display()),
            )));
        }

        let name = self.name_for(path);
        if !name.is_empty() {
            let mut folder = Entry::folder(&name, local_time(meta.modified))?;
            folder.local_header_offset = fits_u32(self.offset, "local header offset")?;
            self.emit(&folder.local_file_header(false)).await?;
            info!("  adding: {}", folder.name);
            self.entries.push(folder);
        }

        let mut children = self.fs.read_dir(path).await.map_err(Error::Source)?;
        children.sort_by(|a, b| a.path.cmp(&b.path));

        for child in children {
            if child.is_dir {
                Box::pin(self.write_folder(&child.path)).await?;
            } else {
                self.write_file(&child.path).await?;
            }
        }

        Ok(())
    }

    /// Stream one file into the archive.
    ///
    /// The local header goes out first with sizes deferred, then each
    /// compressed chunk as soon as the codec produces it, then the data
    /// descriptor.
    pub async fn add_file(&mut self, path: &Path) -> Result<()> {
        self.check_open()?;
        let resolved = self.resolve(path);
        let start = self.offset;
        let result = self.write_file(&resolved).await;
        self.track(start, result)
    }

    async fn write_file(&mut self, path: &Path) -> Result<()> {
        if self.is_excluded(path).await {
            debug!("skipping excluded {}", path.display());
            return Ok(());
        }
        let meta = self.fs.metadata(path).await.map_err(Error::Source)?;
        let mut entry = Entry::streaming_file(&self.name_for(path), local_time(meta.modified))?;
        entry.local_header_offset = fits_u32(self.offset, "local header offset")?;
        self.emit(&entry.local_file_header(true)).await?;

        let mut source = self.fs.open(path).await.map_err(Error::Source)?;
        let mut codec = GzipCodec::new(self.level);
        let mut unwrapper = GzipUnwrapper::new();
        let mut read = 0u64;
        let mut compressed = 0u64;

        while let Some(chunk) = source.next_chunk().await.map_err(Error::Source)? {
            read += chunk.len() as u64;
            if let Some(body) = unwrapper.push(&codec.update(&chunk)?)? {
                trace!("{}: {} compressed bytes", entry.name, body.len());
                compressed += body.len() as u64;
                self.emit(&body).await?;
            }
        }
        if let Some(body) = unwrapper.push(&codec.finish()?)? {
            compressed += body.len() as u64;
            self.emit(&body).await?;
        }
        let (tail, trailer) = unwrapper.finish()?;
        compressed += tail.len() as u64;
        self.emit(&tail).await?;

        if read != meta.len {
            warn!(
                "{} changed while archiving: expected {} bytes, read {}",
                path.display(),
                meta.len,
                read
            );
        }
        fits_u32(read, "file size")?;
        let compressed = fits_u32(compressed, "compressed size")?;

        entry.complete(trailer.crc32, compressed, trailer.reported_size);
        self.emit(&entry.data_descriptor()).await?;

        debug!(
            "wrote {} at {} ({} -> {} bytes, crc32 {:08x})",
            entry.name,
            entry.local_header_offset,
            entry.uncompressed_size,
            entry.compressed_size,
            entry.crc32
        );
        info!("  adding: {}", entry.name);
        self.entries.push(entry);
        Ok(())
    }

    /// Write the central directory and the end record, then close the sink.
    ///
    /// Must be called exactly once, after the last add has completed.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Sequencing("close called twice"));
        }
        if self.failed {
            return Err(Error::Sequencing("archive abandoned after a failed add"));
        }
        self.closed = true;

        let count = u16::try_from(self.entries.len()).map_err(|_| {
            Error::Capacity(format!("{} entries, at most {}", self.entries.len(), u16::MAX))
        })?;
        let cd_start = self.offset;
        let cd_offset = fits_u32(cd_start, "central directory offset")?;

        for i in 0..self.entries.len() {
            let header = self.entries[i].central_directory_header();
            self.emit(&header).await?;
        }

        let cd_size = fits_u32(self.offset - cd_start, "central directory size")?;
        let eocd = EndOfCentralDirectory::new(count, cd_size, cd_offset);
        self.emit(&eocd.to_bytes()).await?;

        self.sink.close().await.map_err(Error::Sink)?;
        debug!(
            "closed archive: {} entries, central directory at {} ({} bytes), {} bytes total",
            count, cd_offset, cd_size, self.offset
        );
        Ok(())
    }
}
