use super::ByteSink;
use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// In-memory accumulator
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[async_trait]
impl ByteSink for MemorySink {
    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.buf.len() as u64
    }

    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink over any tokio writer, counting the bytes it accepts
pub struct WriteSink<W> {
    inner: W,
    written: u64,
}

/// Buffered sink over a local file
pub type FileSink = WriteSink<BufWriter<File>>;

impl<W: AsyncWrite + Unpin + Send> WriteSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl FileSink {
    /// Create (or truncate) the file at `path`
    pub async fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path).await?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ByteSink for WriteSink<W> {
    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf).await?;
        self.written += buf.len() as u64;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.written
    }

    async fn close(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}
