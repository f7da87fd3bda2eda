use seqfile_core::{ChunkCodec, ChunkError, CodecKind};

use crate::read_bounded;

/// Zstandard chunks: one or more zstd frames.
pub struct ZstdCodec;

impl ChunkCodec for ZstdCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Zstd
    }

    fn decode_chunk(
        &self,
        compressed: &[u8],
        out: &mut Vec<u8>,
        limit: usize,
    ) -> Result<usize, ChunkError> {
        let decoder = zstd::stream::read::Decoder::with_buffer(compressed)
            .map_err(|e| ChunkError::Malformed(e.to_string()))?;
        read_bounded(decoder, out, limit)
    }
}
