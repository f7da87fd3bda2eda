use std::io::{self, BufReader, Read};

use flate2::read::{MultiGzDecoder, ZlibDecoder};
use seqfile_core::{CodecKind, Decompressor, Error, FormatError, Result};

enum State<R: Read> {
    Unbound,
    /// Bound to a source with no stream in progress.
    Idle(R),
    Gzip(MultiGzDecoder<R>),
    Zlib(ZlibDecoder<R>),
    Zstd(zstd::stream::read::Decoder<'static, BufReader<R>>),
}

/// Decompressor over a plain codec stream, for codecs Hadoop writes without
/// group framing (gzip, zlib, zstd).
///
/// The stream ends where the codec says it ends; there is no declared size to
/// check against, so integrity rests on the codec's own trailer checks.
pub struct StreamDecompressor<R: Read> {
    kind: CodecKind,
    state: State<R>,
}

impl<R: Read> StreamDecompressor<R> {
    pub fn new(kind: CodecKind) -> Result<Self> {
        if kind.is_block_framed() {
            return Err(FormatError::UnknownCodec(format!(
                "{} has no plain stream decoder",
                kind.name()
            ))
            .into());
        }
        Ok(Self {
            kind,
            state: State::Unbound,
        })
    }

    fn unbind(&mut self) -> Option<R> {
        match std::mem::replace(&mut self.state, State::Unbound) {
            State::Unbound => None,
            State::Idle(source) => Some(source),
            State::Gzip(d) => Some(d.into_inner()),
            State::Zlib(d) => Some(d.into_inner()),
            State::Zstd(d) => Some(d.finish().into_inner()),
        }
    }

    fn map_err(&self, e: io::Error) -> Error {
        // zstd reports bad frames as `Other`.
        let corrupt = match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => true,
            io::ErrorKind::Other => self.kind == CodecKind::Zstd,
            _ => false,
        };
        if corrupt {
            Error::Format(FormatError::Codec {
                codec: self.kind.name(),
                message: e.to_string(),
            })
        } else {
            Error::Io(e)
        }
    }
}

impl<R: Read> Decompressor<R> for StreamDecompressor<R> {
    fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        let result = match &mut self.state {
            State::Unbound | State::Idle(_) => return Ok(0),
            State::Gzip(d) => d.read(dest),
            State::Zlib(d) => d.read(dest),
            State::Zstd(d) => d.read(dest),
        };
        result.map_err(|e| self.map_err(e))
    }

    fn reset(&mut self, source: R) -> Result<()> {
        self.unbind();
        self.state = match self.kind {
            CodecKind::Gzip => State::Gzip(MultiGzDecoder::new(source)),
            CodecKind::Zlib => State::Zlib(ZlibDecoder::new(source)),
            CodecKind::Zstd => State::Zstd(zstd::stream::read::Decoder::new(source)?),
            CodecKind::Snappy | CodecKind::Lz4 => State::Idle(source),
        };
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(source) = self.unbind() {
            self.state = State::Idle(source);
        }
        Ok(())
    }

    fn take_source(&mut self) -> Option<R> {
        self.unbind()
    }
}
