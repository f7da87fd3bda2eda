use crate::error::{Error, FormatError, Result};

/// Magic bytes every SequenceFile starts with, followed by one version byte.
pub const MAGIC: &[u8; 3] = b"SEQ";

/// Oldest version with block compression.
pub const MIN_VERSION: u8 = 4;

/// Version with the metadata section (the one current Hadoop writes).
pub const VERSION_WITH_METADATA: u8 = 6;

/// First version that names its codec class in the header.
pub const VERSION_WITH_CODEC: u8 = 5;

/// Size of the sync marker in bytes.
pub const SYNC_SIZE: usize = 16;

/// Record length value announcing a sync marker instead of a record.
pub const SYNC_ESCAPE: i32 = -1;

/// Default ceiling the block framer pre-grows its buffers to: 1 MiB.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024;

// ── Codec class names ──────────────────────────────────────────────────────

pub const GZIP_CLASS_NAME: &str = "org.apache.hadoop.io.compress.GzipCodec";
pub const ZLIB_CLASS_NAME: &str = "org.apache.hadoop.io.compress.DefaultCodec";
pub const SNAPPY_CLASS_NAME: &str = "org.apache.hadoop.io.compress.SnappyCodec";
pub const LZ4_CLASS_NAME: &str = "org.apache.hadoop.io.compress.Lz4Codec";
pub const ZSTD_CLASS_NAME: &str = "org.apache.hadoop.io.compress.ZStandardCodec";

/// How record payloads are compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    /// Each value is compressed on its own; keys are stored raw.
    Record,
    /// Keys and values of many records are compressed together.
    Block,
}

/// Compression algorithm named by the header's codec class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Gzip,
    Zlib,
    Snappy,
    Lz4,
    Zstd,
}

impl CodecKind {
    pub const ALL: [CodecKind; 5] = [
        CodecKind::Gzip,
        CodecKind::Zlib,
        CodecKind::Snappy,
        CodecKind::Lz4,
        CodecKind::Zstd,
    ];

    pub fn class_name(self) -> &'static str {
        match self {
            CodecKind::Gzip => GZIP_CLASS_NAME,
            CodecKind::Zlib => ZLIB_CLASS_NAME,
            CodecKind::Snappy => SNAPPY_CLASS_NAME,
            CodecKind::Lz4 => LZ4_CLASS_NAME,
            CodecKind::Zstd => ZSTD_CLASS_NAME,
        }
    }

    pub fn from_class_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.class_name() == name)
            .ok_or_else(|| Error::from(FormatError::UnknownCodec(name.to_string())))
    }

    /// Short name for CLI display and error messages.
    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Gzip => "gzip",
            CodecKind::Zlib => "zlib",
            CodecKind::Snappy => "snappy",
            CodecKind::Lz4 => "lz4",
            CodecKind::Zstd => "zstd",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gzip" | "gz" => Some(CodecKind::Gzip),
            "zlib" | "deflate" | "default" => Some(CodecKind::Zlib),
            "snappy" => Some(CodecKind::Snappy),
            "lz4" => Some(CodecKind::Lz4),
            "zstd" => Some(CodecKind::Zstd),
            _ => None,
        }
    }

    /// Whether Hadoop writes this codec's streams with length-prefixed group
    /// framing. The rest are plain codec streams.
    pub fn is_block_framed(self) -> bool {
        matches!(self, CodecKind::Snappy | CodecKind::Lz4)
    }
}
