use seqfile_core::{ChunkCodec, ChunkError, CodecKind};

/// Snappy chunks as written by Hadoop's `SnappyCodec`: raw (unframed) Snappy.
pub struct SnappyCodec;

/// Upper bound on decoded bytes per compressed byte. A 3-byte copy element
/// expands to at most 64 bytes.
const MAX_EXPANSION: usize = 32;

impl ChunkCodec for SnappyCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Snappy
    }

    fn decode_chunk(
        &self,
        compressed: &[u8],
        out: &mut Vec<u8>,
        limit: usize,
    ) -> Result<usize, ChunkError> {
        // Raw Snappy leads with its decoded length, so overruns are caught
        // before anything is written.
        let len = snap::raw::decompress_len(compressed)
            .map_err(|e| ChunkError::Malformed(e.to_string()))?;
        if len > compressed.len().saturating_mul(MAX_EXPANSION) {
            return Err(ChunkError::Malformed(format!(
                "preamble claims {} bytes from a {}-byte chunk",
                len,
                compressed.len()
            )));
        }
        if len > limit {
            return Err(ChunkError::Overrun);
        }
        out.resize(len, 0);
        match snap::raw::Decoder::new().decompress(compressed, out) {
            Ok(n) => {
                out.truncate(n);
                Ok(n)
            }
            Err(e) => {
                out.clear();
                Err(ChunkError::Malformed(e.to_string()))
            }
        }
    }
}
