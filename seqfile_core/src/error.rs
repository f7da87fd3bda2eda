//! Error types for SequenceFile decoding.
//!
//! Two families are kept apart so callers can tell a flaky source from a
//! corrupt file:
//!
//! - [`Error::Io`]: the underlying source failed or ended mid-read (short read
//!   on a length prefix, chunk body, header, or record).
//! - [`Error::Format`]: the bytes were read fine but do not describe a valid
//!   stream. Always fatal to the current group/record; the caller should treat
//!   that region of the file as corrupt.
//!
//! A clean end of stream is never an error: `read` returns `Ok(0)` and
//! `Reader::scan` returns `Ok(false)`.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Debug, Error)]
pub enum FormatError {
    /// Chunks decoded to a different total than the group header declared.
    #[error("partial block")]
    PartialBlock,

    #[error("{codec}: corrupt chunk: {message}")]
    Codec { codec: &'static str, message: String },

    /// Group header does not fit in a signed 32-bit size.
    #[error("group size {0} overflows int32")]
    SizeOverflow(u32),

    #[error("invalid magic bytes, not a SequenceFile")]
    BadMagic,

    #[error("unsupported SequenceFile version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown compression codec: {0}")]
    UnknownCodec(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("sync marker mismatch")]
    SyncMismatch,

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl Error {
    /// `true` when the stream content is bad, as opposed to the source failing.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Format(_))
    }

    pub(crate) fn codec(codec: &'static str, message: impl Into<String>) -> Self {
        Error::Format(FormatError::Codec {
            codec,
            message: message.into(),
        })
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Io(e) => e,
            Error::Format(f) => io::Error::new(io::ErrorKind::InvalidData, f),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
