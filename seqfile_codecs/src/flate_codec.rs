use flate2::read::{MultiGzDecoder, ZlibDecoder};
use seqfile_core::{ChunkCodec, ChunkError, CodecKind};

use crate::read_bounded;

/// Gzip chunks: one or more gzip members.
pub struct GzipCodec;

impl ChunkCodec for GzipCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Gzip
    }

    fn decode_chunk(
        &self,
        compressed: &[u8],
        out: &mut Vec<u8>,
        limit: usize,
    ) -> Result<usize, ChunkError> {
        read_bounded(MultiGzDecoder::new(compressed), out, limit)
    }
}

/// Zlib chunks, the format of Hadoop's `DefaultCodec`.
pub struct ZlibCodec;

impl ChunkCodec for ZlibCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Zlib
    }

    fn decode_chunk(
        &self,
        compressed: &[u8],
        out: &mut Vec<u8>,
        limit: usize,
    ) -> Result<usize, ChunkError> {
        read_bounded(ZlibDecoder::new(compressed), out, limit)
    }
}
