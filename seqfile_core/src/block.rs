//! Length-prefixed group framing used by block-framed codecs.
//!
//! # Wire format (big-endian)
//! ```text
//! Group         := GroupHeader Chunk* TerminalChunk
//! GroupHeader   := u32                      total uncompressed bytes
//! Chunk         := u32 chunk_length, [u8; chunk_length]   chunk_length > 0
//! TerminalChunk := u32 0
//! ```
//!
//! [`BlockDecompressor`] turns one group into a flat stream of decoded bytes.
//! The framing is identical for every codec; only the [`ChunkCodec`] differs.
//!
//! The `remaining` counter is the only integrity check: a group whose chunks
//! decode to fewer bytes than declared (terminal chunk seen too early) or more
//! bytes than declared fails with [`FormatError::PartialBlock`]. Once
//! `remaining` reaches zero the group is exhausted and no further prefix is
//! read, so a trailing terminal chunk is left in the source.
//!
//! Any error while decoding a chunk fails the whole group: later reads return
//! [`FormatError::PartialBlock`] until the decompressor is reset.

use std::io::{self, Read};

use tracing::{debug, trace, warn};

use crate::codec::{ChunkCodec, ChunkError, Decompressor};
use crate::error::{Error, FormatError, Result};
use crate::format::MAX_BUFFER_SIZE;

/// Compressed input and decoded output for the chunk being served.
///
/// Both vectors are pre-grown once and only ever cleared afterwards, so chunks
/// up to the configured size never allocate. Larger chunks grow them in place.
struct DecodeBuffers {
    compressed: Vec<u8>,
    uncompressed: Vec<u8>,
    /// First byte of `uncompressed` not yet handed to the caller.
    cursor: usize,
}

impl DecodeBuffers {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            compressed: Vec::with_capacity(capacity),
            uncompressed: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    fn reset(&mut self) {
        self.compressed.clear();
        self.uncompressed.clear();
        self.cursor = 0;
    }

    fn pending(&self) -> &[u8] {
        &self.uncompressed[self.cursor..]
    }

    /// Copy as many undelivered bytes as fit into `dest`.
    fn drain_into(&mut self, dest: &mut [u8]) -> usize {
        let pending = self.pending();
        let n = pending.len().min(dest.len());
        dest[..n].copy_from_slice(&pending[..n]);
        self.cursor += n;
        n
    }

    /// Read exactly `len` chunk bytes into `compressed`.
    fn fill_compressed<R: Read>(&mut self, source: &mut R, len: usize) -> io::Result<()> {
        self.compressed.clear();
        // Grows with the bytes that actually arrive, so a bogus length on a
        // short stream cannot force a huge allocation up front.
        let got = source.by_ref().take(len as u64).read_to_end(&mut self.compressed)?;
        if got != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("chunk truncated: expected {} bytes, got {}", len, got),
            ));
        }
        Ok(())
    }
}

fn read_length<R: Read>(source: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Decoder for one length-prefixed group, generic over the chunk codec.
///
/// Construct with [`new`](Self::new) (binds a source and reads its group
/// header) or [`unbound`](Self::unbound) (reports end of stream until
/// [`reset`](Decompressor::reset) binds one).
pub struct BlockDecompressor<R, C> {
    codec: C,
    source: Option<R>,
    /// Decoded bytes the group still owes.
    remaining: usize,
    buffers: DecodeBuffers,
    /// Set once a chunk fails; the group yields nothing more until `reset`.
    failed: bool,
}

impl<R: Read, C: ChunkCodec> BlockDecompressor<R, C> {
    pub fn new(codec: C, source: R) -> Result<Self> {
        Self::with_buffer_size(codec, source, MAX_BUFFER_SIZE)
    }

    pub fn with_buffer_size(codec: C, source: R, buffer_size: usize) -> Result<Self> {
        let mut decompressor = Self::unbound(codec, buffer_size);
        decompressor.reset(source)?;
        Ok(decompressor)
    }

    pub fn unbound(codec: C, buffer_size: usize) -> Self {
        Self {
            codec,
            source: None,
            remaining: 0,
            buffers: DecodeBuffers::with_capacity(buffer_size),
            failed: false,
        }
    }

    /// Decoded bytes the current group has yet to produce from the source.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn get_ref(&self) -> Option<&R> {
        self.source.as_ref()
    }

    /// Pull and decode the next chunk. `Ok(false)` means the terminal chunk
    /// closed a fully satisfied group.
    fn decode_next_chunk(&mut self) -> Result<bool> {
        let source = self.source.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "decompressor has no source")
        })?;

        let chunk_len = read_length(source)? as usize;
        if chunk_len == 0 {
            if self.remaining != 0 {
                warn!(
                    codec = self.codec.name(),
                    remaining = self.remaining,
                    "terminal chunk before group was satisfied"
                );
                return Err(FormatError::PartialBlock.into());
            }
            return Ok(false);
        }

        self.buffers.fill_compressed(source, chunk_len)?;
        self.buffers.uncompressed.clear();
        self.buffers.cursor = 0;

        let produced = match self.codec.decode_chunk(
            &self.buffers.compressed,
            &mut self.buffers.uncompressed,
            self.remaining,
        ) {
            Ok(n) => n,
            Err(ChunkError::Overrun) => {
                warn!(
                    codec = self.codec.name(),
                    remaining = self.remaining,
                    "chunk decodes past the group size"
                );
                return Err(FormatError::PartialBlock.into());
            }
            Err(ChunkError::Malformed(message)) => {
                return Err(Error::codec(self.codec.name(), message));
            }
        };

        if produced > self.remaining {
            warn!(
                codec = self.codec.name(),
                produced,
                remaining = self.remaining,
                "chunk decodes past the group size"
            );
            return Err(FormatError::PartialBlock.into());
        }
        self.remaining -= produced;
        self.buffers.uncompressed.truncate(produced);

        trace!(
            codec = self.codec.name(),
            compressed = chunk_len,
            produced,
            remaining = self.remaining,
            "decoded chunk"
        );
        Ok(true)
    }
}

impl<R: Read, C: ChunkCodec> Decompressor<R> for BlockDecompressor<R, C> {
    fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        if self.failed {
            return Err(FormatError::PartialBlock.into());
        }
        if dest.is_empty() {
            return Ok(0);
        }
        loop {
            if !self.buffers.pending().is_empty() {
                return Ok(self.buffers.drain_into(dest));
            }
            if self.remaining == 0 {
                return Ok(0);
            }
            match self.decode_next_chunk() {
                Ok(true) => {}
                Ok(false) => return Ok(0),
                Err(e) => {
                    // Nothing decoded from the failed chunk may be served.
                    self.buffers.reset();
                    self.failed = true;
                    return Err(e);
                }
            }
        }
    }

    fn reset(&mut self, mut source: R) -> Result<()> {
        self.buffers.reset();
        self.remaining = 0;
        self.failed = false;

        let declared = read_length(&mut source);
        self.source = Some(source);
        let declared = declared.map_err(|e| {
            io::Error::new(e.kind(), format!("failed to read uncompressed length: {}", e))
        })?;

        if declared > i32::MAX as u32 {
            warn!(codec = self.codec.name(), declared, "group size overflows int32");
            return Err(FormatError::SizeOverflow(declared).into());
        }
        self.remaining = declared as usize;
        debug!(codec = self.codec.name(), size = declared, "group header");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.buffers.reset();
        self.remaining = 0;
        self.failed = false;
        Ok(())
    }

    fn take_source(&mut self) -> Option<R> {
        self.buffers.reset();
        self.remaining = 0;
        self.failed = false;
        self.source.take()
    }
}
