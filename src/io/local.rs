use super::{ByteSource, DirEntry, FileSystem, SourceMetadata};
use async_trait::async_trait;
use std::io;
use log::warn;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncReadExt;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem access through tokio
#[derive(Debug, Clone)]
pub struct LocalFs {
    chunk_size: usize,
}

impl Default for LocalFs {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalFs {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Read files in chunks of at most `chunk_size` bytes
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

/// Sequential reader over one local file
pub struct LocalFileSource {
    file: fs::File,
    buf: Vec<u8>,
}

#[async_trait]
impl ByteSource for LocalFileSource {
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        let n = self.file.read(&mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf[..n].to_vec()))
    }
}

#[async_trait]
impl FileSystem for LocalFs {
    type Source = LocalFileSource;

    async fn metadata(&self, path: &Path) -> io::Result<SourceMetadata> {
        let meta = fs::metadata(path).await?;
        Ok(SourceMetadata {
            // Some platforms can't report mtime
            modified: meta.modified().unwrap_or_else(|_| SystemTime::now()),
            len: meta.len(),
            is_dir: meta.is_dir(),
        })
    }

    async fn open(&self, path: &Path) -> io::Result<LocalFileSource> {
        let file = fs::File::open(path).await?;
        Ok(LocalFileSource {
            file,
            buf: vec![0u8; self.chunk_size],
        })
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut children = Vec::new();
        let mut dir = fs::read_dir(path).await?;
        while let Some(child) = dir.next_entry().await? {
            let path = child.path();
            let file_type = child.file_type().await?;
            if !file_type.is_symlink() {
                children.push(DirEntry {
                    path,
                    is_dir: file_type.is_dir(),
                });
                continue;
            }

            // Links to files are archived as the file; links to folders
            // could loop back on an ancestor
            match fs::metadata(&path).await {
                Ok(target) if target.is_dir() => {
                    warn!("skipping {}: link to a folder", path.display());
                }
                Ok(_) => children.push(DirEntry {
                    path,
                    is_dir: false,
                }),
                Err(err) => warn!("skipping {}: {}", path.display(), err),
            }
        }
        Ok(children)
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path).await
    }
}
