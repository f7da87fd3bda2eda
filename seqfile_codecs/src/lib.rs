mod flate_codec;
mod lz4_codec;
mod snappy_codec;
mod stream;
mod zstd_codec;

pub use flate_codec::{GzipCodec, ZlibCodec};
pub use lz4_codec::Lz4Codec;
pub use snappy_codec::SnappyCodec;
pub use stream::StreamDecompressor;
pub use zstd_codec::ZstdCodec;

use std::io::Read;

use seqfile_core::{
    BlockDecompressor, BufferSource, ChunkCodec, ChunkError, CodecKind, CodecProvider,
    Decompressor, Result, MAX_BUFFER_SIZE,
};
use tracing::debug;

/// Resolve the chunk codec for `kind`.
pub fn codec_by_kind(kind: CodecKind) -> Box<dyn ChunkCodec> {
    match kind {
        CodecKind::Gzip => Box::new(GzipCodec),
        CodecKind::Zlib => Box::new(ZlibCodec),
        CodecKind::Snappy => Box::new(SnappyCodec),
        CodecKind::Lz4 => Box::new(Lz4Codec),
        CodecKind::Zstd => Box::new(ZstdCodec),
    }
}

/// Bind a group-framed decompressor for `kind` to `source` and read its
/// group header.
pub fn block_decompressor<'a, R: Read + 'a>(
    kind: CodecKind,
    source: R,
) -> Result<Box<dyn Decompressor<R> + 'a>> {
    HadoopCodecs::default().block_decompressor(kind, source)
}

/// Drain a streaming decoder into `out`, stopping one byte past `limit` so an
/// overrun is detected without decoding the whole chunk.
pub(crate) fn read_bounded<D: Read>(
    decoder: D,
    out: &mut Vec<u8>,
    limit: usize,
) -> std::result::Result<usize, ChunkError> {
    let n = match decoder.take(limit as u64 + 1).read_to_end(out) {
        Ok(n) => n,
        Err(e) => {
            out.clear();
            return Err(ChunkError::Malformed(e.to_string()));
        }
    };
    if n > limit {
        out.clear();
        return Err(ChunkError::Overrun);
    }
    Ok(n)
}

/// Decompressors laid out the way Hadoop writes each codec: Snappy and LZ4
/// streams use group framing, gzip, zlib and zstd are plain codec streams.
#[derive(Debug, Clone, Copy)]
pub struct HadoopCodecs {
    /// Capacity the framer pre-grows its buffers to.
    pub buffer_size: usize,
}

impl Default for HadoopCodecs {
    fn default() -> Self {
        Self {
            buffer_size: MAX_BUFFER_SIZE,
        }
    }
}

impl HadoopCodecs {
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }

    /// Group-framed decompressor for any codec, bound to `source`.
    pub fn block_decompressor<'a, R: Read + 'a>(
        &self,
        kind: CodecKind,
        source: R,
    ) -> Result<Box<dyn Decompressor<R> + 'a>> {
        let decompressor =
            BlockDecompressor::with_buffer_size(codec_by_kind(kind), source, self.buffer_size)?;
        Ok(Box::new(decompressor))
    }
}

impl CodecProvider for HadoopCodecs {
    fn decompressor(&self, kind: CodecKind) -> Result<Box<dyn Decompressor<BufferSource>>> {
        debug!(
            codec = kind.name(),
            framed = kind.is_block_framed(),
            "creating decompressor"
        );
        if kind.is_block_framed() {
            Ok(Box::new(BlockDecompressor::<BufferSource, _>::unbound(
                codec_by_kind(kind),
                self.buffer_size,
            )))
        } else {
            Ok(Box::new(StreamDecompressor::<BufferSource>::new(kind)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::read::MultiGzDecoder;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    #[test]
    fn failed_stream_leaves_no_output() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(&vec![7u8; 50_000]).unwrap();
        let mut gz = enc.finish().unwrap();
        gz.truncate(gz.len() - 10);

        let mut out = Vec::new();
        let err = read_bounded(MultiGzDecoder::new(&gz[..]), &mut out, 1 << 20).unwrap_err();
        assert!(matches!(err, ChunkError::Malformed(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn overrun_leaves_no_output() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"AlicePractice").unwrap();
        let gz = enc.finish().unwrap();

        let mut out = Vec::new();
        let err = read_bounded(MultiGzDecoder::new(&gz[..]), &mut out, 5).unwrap_err();
        assert!(matches!(err, ChunkError::Overrun));
        assert!(out.is_empty());
    }
}
