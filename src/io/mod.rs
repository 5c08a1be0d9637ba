mod local;
mod sink;

pub use local::{LocalFileSource, LocalFs};
pub use sink::{FileSink, MemorySink, WriteSink};

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Append-only destination for archive bytes
#[async_trait]
pub trait ByteSink: Send {
    /// Append `buf`, resolving once the sink has accepted all of it
    async fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Total bytes accepted so far
    fn bytes_written(&self) -> u64;

    /// Flush and release the destination
    async fn close(&mut self) -> io::Result<()>;
}

/// Producer of one file's raw content
#[async_trait]
pub trait ByteSource: Send {
    /// Next chunk of content, or `None` at end of file
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Metadata queried once before a file or folder is added
#[derive(Debug, Clone)]
pub struct SourceMetadata {
    pub modified: SystemTime,
    pub len: u64,
    pub is_dir: bool,
}

/// Child of a listed folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Trait for the filesystem the streaming writer reads from
#[async_trait]
pub trait FileSystem: Send + Sync {
    type Source: ByteSource;

    async fn metadata(&self, path: &Path) -> io::Result<SourceMetadata>;

    async fn open(&self, path: &Path) -> io::Result<Self::Source>;

    /// Children of `path`, in no particular order
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Absolute form of `path` with links resolved, used to recognise
    /// excluded paths however they were spelled
    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}
