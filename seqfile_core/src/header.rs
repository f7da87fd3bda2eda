use std::io::Read;

use tracing::debug;

use crate::error::{FormatError, Result};
use crate::format::{
    CodecKind, CompressionType, MAGIC, MIN_VERSION, SYNC_SIZE, VERSION_WITH_CODEC,
    VERSION_WITH_METADATA,
};
use crate::writable::read_string;

/// Decoded SequenceFile header.
///
/// # Layout
/// ```text
/// "SEQ" version:u8
/// key_class:Text value_class:Text
/// compressed:bool block_compressed:bool
/// [codec_class:Text]                        if compressed, version >= 5
/// [count:i32 (name:Text value:Text)*]       version >= 6
/// sync:[u8; 16]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub key_class_name: String,
    pub value_class_name: String,
    pub compression: CompressionType,
    /// `None` for uncompressed files.
    pub codec: Option<CodecKind>,
    /// Metadata entries in file order.
    pub metadata: Vec<(String, String)>,
    pub sync: [u8; SYNC_SIZE],
}

fn read_bool<R: Read>(source: &mut R) -> Result<bool> {
    let mut b = [0u8; 1];
    source.read_exact(&mut b)?;
    match b[0] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(FormatError::InvalidHeader(format!("bad boolean byte {}", other)).into()),
    }
}

impl Header {
    /// Read a header from the start of `source`, leaving it positioned at the
    /// first record (or block).
    pub fn read_from<R: Read>(source: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        source.read_exact(&mut magic)?;
        if &magic[..3] != MAGIC {
            return Err(FormatError::BadMagic.into());
        }
        let version = magic[3];
        if !(MIN_VERSION..=VERSION_WITH_METADATA).contains(&version) {
            return Err(FormatError::UnsupportedVersion(version).into());
        }

        let key_class_name = read_string(source)?;
        let value_class_name = read_string(source)?;

        let compressed = read_bool(source)?;
        let block_compressed = read_bool(source)?;
        let compression = match (compressed, block_compressed) {
            (false, _) => CompressionType::None,
            (true, false) => CompressionType::Record,
            (true, true) => CompressionType::Block,
        };

        let codec = if !compressed {
            None
        } else if version >= VERSION_WITH_CODEC {
            Some(CodecKind::from_class_name(&read_string(source)?)?)
        } else {
            Some(CodecKind::Zlib)
        };

        let mut metadata = Vec::new();
        if version >= VERSION_WITH_METADATA {
            let mut count = [0u8; 4];
            source.read_exact(&mut count)?;
            let count = i32::from_be_bytes(count);
            if count < 0 {
                return Err(FormatError::InvalidHeader(format!("metadata count {}", count)).into());
            }
            for _ in 0..count {
                let name = read_string(source)?;
                let value = read_string(source)?;
                metadata.push((name, value));
            }
        }

        let mut sync = [0u8; SYNC_SIZE];
        source.read_exact(&mut sync)?;

        debug!(
            version,
            key_class = %key_class_name,
            value_class = %value_class_name,
            compression = ?compression,
            codec = codec.map(CodecKind::name),
            "read header"
        );

        Ok(Self {
            version,
            key_class_name,
            value_class_name,
            compression,
            codec,
            metadata,
            sync,
        })
    }

    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
