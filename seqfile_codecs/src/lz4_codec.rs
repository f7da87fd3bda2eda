use lz4_flex::block::{decompress_into, DecompressError};
use seqfile_core::{ChunkCodec, ChunkError, CodecKind};

/// LZ4 chunks as written by Hadoop's `Lz4Codec`: raw LZ4 blocks with no size
/// prefix of their own.
pub struct Lz4Codec;

/// Largest expansion an LZ4 block can encode per input byte.
const MAX_EXPANSION: usize = 255;

/// Output window tried first, as a multiple of the compressed length.
const INITIAL_EXPANSION: usize = 4;

impl ChunkCodec for Lz4Codec {
    fn kind(&self) -> CodecKind {
        CodecKind::Lz4
    }

    fn decode_chunk(
        &self,
        compressed: &[u8],
        out: &mut Vec<u8>,
        limit: usize,
    ) -> Result<usize, ChunkError> {
        // The block does not record its decoded size. The hard ceiling is the
        // group's remaining bytes, capped by what the input could ever expand
        // to; start well below it and double on `OutputTooSmall`.
        let bound = limit.min(compressed.len().saturating_mul(MAX_EXPANSION).saturating_add(16));
        let mut window = bound.min(compressed.len().saturating_mul(INITIAL_EXPANSION).max(64));
        loop {
            out.resize(window, 0);
            match decompress_into(compressed, out) {
                Ok(n) => {
                    out.truncate(n);
                    return Ok(n);
                }
                Err(DecompressError::OutputTooSmall { .. }) if window < bound => {
                    window = bound.min(window.saturating_mul(2));
                }
                Err(DecompressError::OutputTooSmall { .. }) if bound == limit => {
                    out.clear();
                    return Err(ChunkError::Overrun);
                }
                Err(e) => {
                    out.clear();
                    return Err(ChunkError::Malformed(e.to_string()));
                }
            }
        }
    }
}
