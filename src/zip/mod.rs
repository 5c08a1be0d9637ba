//! ZIP archive construction.
//!
//! This module writes ZIP archives incrementally, either fully in memory or
//! streamed to a sink as entries are added.
//!
//! ## Architecture
//!
//! - [`structures`]: Binary layouts of the ZIP records (local file header,
//!   central directory header, data descriptor, EOCD) and DOS timestamps
//! - [`codec`]: Incremental gzip compression via `flate2`
//! - [`unwrap`]: Strips the gzip envelope, leaving the raw deflate body and
//!   the CRC-32 from its trailer
//! - [`entry`]: One archive member and its header encodings
//! - [`builder`]: In-memory archive with nested folder scopes
//! - [`writer`]: Streaming archive over a [`ByteSink`](crate::io::ByteSink)
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! When a file is streamed its local header is written before the size and
//! checksum are known. Flag bit 3 is set, the fields are zero, and a data
//! descriptor after the body carries the real values. The central directory
//! always carries the final values.
//!
//! ## Limitations
//!
//! - No ZIP64: at most 65535 entries, sizes and offsets below 4 GiB
//! - No encryption, comments or extra fields
//! - Files are always deflated; folders are stored

pub mod builder;
pub mod codec;
pub mod entry;
pub mod structures;
pub mod unwrap;
pub mod writer;

pub use builder::{Folder, ZipBuilder};
pub use codec::GzipCodec;
pub use entry::{Entry, FILE_ATTRIBUTES, FOLDER_ATTRIBUTES};
pub use structures::*;
pub use unwrap::{GzipTrailer, GzipUnwrapper};
pub use writer::{ZipStreamWriter, archive_name};
