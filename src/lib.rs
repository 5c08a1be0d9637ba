//! # streamzip
//!
//! Incremental ZIP archive writer.
//!
//! Entries are appended one at a time and the archive is finalized either
//! into a single in-memory buffer ([`ZipBuilder`]) or streamed to a sink as
//! the files are read ([`ZipStreamWriter`]). Compression is deflate, produced
//! by a gzip encoder whose envelope is stripped on the fly.
//!
//! ## Features
//!
//! - Buffered archives with nested folder scopes
//! - Streaming archives with data descriptors, constant memory per file
//! - Output to memory or to any tokio `AsyncWrite`, such as a file
//! - UTF-8 entry names, Unix permissions, DOS timestamps
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use streamzip::{LocalFs, MemorySink, ZipStreamWriter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut zip = ZipStreamWriter::new(MemorySink::new(), LocalFs::new());
//!
//!     zip.add_folder(Path::new("assets")).await?;
//!     zip.close().await?;
//!
//!     let bytes = zip.into_inner().into_inner();
//!     println!("{} bytes", bytes.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{ByteSink, ByteSource, FileSink, FileSystem, LocalFs, MemorySink, WriteSink};
pub use zip::{Entry, ZipBuilder, ZipStreamWriter};
