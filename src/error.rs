use std::io;

/// Errors produced while building or streaming an archive.
///
/// None of these are retried internally. Once an add or finalize fails the
/// archive is left with offsets that cannot be revised and must be discarded.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid framing: {0}")]
    Framing(String),

    #[error("Sink write failed: {0}")]
    Sink(#[source] io::Error),

    #[error("Source read failed: {0}")]
    Source(#[source] io::Error),

    #[error("Compression failed: {0}")]
    Codec(#[source] io::Error),

    #[error("Out of sequence: {0}")]
    Sequencing(&'static str),

    #[error("Archive limit exceeded: {0}")]
    Capacity(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
