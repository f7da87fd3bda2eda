pub mod block;
pub mod codec;
pub mod error;
pub mod format;
pub mod header;
pub mod reader;
pub mod writable;

pub use block::BlockDecompressor;
pub use codec::{BufferSource, ChunkCodec, ChunkError, CodecProvider, Decompressor};
pub use error::{Error, FormatError, Result};
pub use format::{CodecKind, CompressionType, MAX_BUFFER_SIZE};
pub use header::Header;
pub use reader::Reader;
