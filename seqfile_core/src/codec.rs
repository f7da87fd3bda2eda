use std::io::{Cursor, Read};

use crate::error::Result;
use crate::format::CodecKind;

/// Why a single chunk could not be decoded.
#[derive(Debug)]
pub enum ChunkError {
    /// The chunk decodes to more than the caller allowed.
    Overrun,
    /// The compressed bytes are malformed.
    Malformed(String),
}

/// Per-codec primitive that decodes one contiguous compressed chunk.
///
/// Implementations are stateless; every chunk is self-contained.
pub trait ChunkCodec: Send + Sync {
    fn kind(&self) -> CodecKind;

    /// Human-readable codec name for logs and error messages.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Decode `compressed` into `out`, which the caller has already cleared.
    ///
    /// At most `limit` bytes may be produced. A chunk that would produce more
    /// must return [`ChunkError::Overrun`] rather than truncate. Returns the
    /// number of decoded bytes, which equals `out.len()` on success.
    fn decode_chunk(
        &self,
        compressed: &[u8],
        out: &mut Vec<u8>,
        limit: usize,
    ) -> std::result::Result<usize, ChunkError>;
}

impl<C: ChunkCodec + ?Sized> ChunkCodec for Box<C> {
    fn kind(&self) -> CodecKind {
        (**self).kind()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode_chunk(
        &self,
        compressed: &[u8],
        out: &mut Vec<u8>,
        limit: usize,
    ) -> std::result::Result<usize, ChunkError> {
        (**self).decode_chunk(compressed, out, limit)
    }
}

/// Uniform streaming view over a codec-specific decoder.
///
/// Usage is strictly sequential: [`reset`](Self::reset) onto a source, then
/// [`read`](Self::read) until it returns `Ok(0)`. The source is handed in by
/// value; pass `&mut T` to keep ownership on the caller side. It is never
/// closed by the decompressor.
pub trait Decompressor<R: Read> {
    /// Fill as much of `dest` as decoded bytes allow.
    ///
    /// Returns `Ok(0)` once the current stream is exhausted (or `dest` is
    /// empty). Otherwise `0 < n <= dest.len()`.
    fn read(&mut self, dest: &mut [u8]) -> Result<usize>;

    /// Rebind onto `source`, discarding all state from the previous stream.
    fn reset(&mut self, source: R) -> Result<()>;

    /// Release per-stream state. The source stays bound and is not closed.
    fn close(&mut self) -> Result<()>;

    /// Unbind and return the current source, if any.
    fn take_source(&mut self) -> Option<R>;

    /// Append everything left in the current stream to `out`.
    fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        let mut buf = [0u8; 8 * 1024];
        let mut total = 0;
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                return Ok(total);
            }
            out.extend_from_slice(&buf[..n]);
            total += n;
        }
    }
}

/// In-memory source a [`crate::Reader`] feeds its decompressor with.
pub type BufferSource = Cursor<Vec<u8>>;

/// Builds decompressors for the codecs a SequenceFile header may name.
pub trait CodecProvider {
    fn decompressor(&self, kind: CodecKind) -> Result<Box<dyn Decompressor<BufferSource>>>;
}
