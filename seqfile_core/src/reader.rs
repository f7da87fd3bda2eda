use std::io::{self, Cursor, Read};

use tracing::{debug, warn};

use crate::codec::{BufferSource, CodecProvider, Decompressor};
use crate::error::{Error, FormatError, Result};
use crate::format::{CompressionType, SYNC_ESCAPE, SYNC_SIZE};
use crate::header::Header;
use crate::writable::{decode_vlong, read_vlen};

/// Sequential record reader for SequenceFiles.
///
/// # Record layouts
/// Uncompressed and record-compressed files store one record at a time:
/// ```text
/// record_len:i32 key_len:i32 key:[u8; key_len] value:[u8; record_len - key_len]
/// ```
/// A `record_len` of `-1` announces a sync marker instead. In record-compressed
/// files the value bytes are a codec stream.
///
/// Block-compressed files store batches:
/// ```text
/// -1:i32 sync:[u8; 16] count:vint
/// (len:vint compressed:[u8; len]) x 4      key lengths, keys, value lengths, values
/// ```
/// Each of the four buffers decodes to one or more concatenated codec streams.
///
/// # Usage
/// Call [`scan`](Self::scan) until it returns `Ok(false)`; after each `true`
/// the current record is available through [`key`](Self::key) and
/// [`value`](Self::value). Keys and values are the raw serialized `Writable`s;
/// see [`crate::writable`] to unwrap them.
pub struct Reader<R> {
    source: R,
    header: Header,
    decompressor: Option<Box<dyn Decompressor<BufferSource>>>,
    block: Block,
    key: Vec<u8>,
    value: Vec<u8>,
    /// Compressed bytes of the buffer being decoded; recycled between buffers.
    scratch: Vec<u8>,
}

/// Decoded contents of the current block plus read positions into them.
#[derive(Default)]
struct Block {
    records: usize,
    key_lengths: Vec<u8>,
    keys: Vec<u8>,
    value_lengths: Vec<u8>,
    values: Vec<u8>,
    key_lengths_pos: usize,
    keys_pos: usize,
    value_lengths_pos: usize,
    values_pos: usize,
}

impl Block {
    fn rewind(&mut self, records: usize) {
        self.records = records;
        self.key_lengths_pos = 0;
        self.keys_pos = 0;
        self.value_lengths_pos = 0;
        self.values_pos = 0;
    }

    fn next_record(&mut self, key: &mut Vec<u8>, value: &mut Vec<u8>) -> Result<()> {
        let key_len = next_len(&self.key_lengths, &mut self.key_lengths_pos, "key length")?;
        let key_bytes = next_slice(&self.keys, &mut self.keys_pos, key_len, "key")?;
        key.clear();
        key.extend_from_slice(key_bytes);

        let value_len = next_len(&self.value_lengths, &mut self.value_lengths_pos, "value length")?;
        let value_bytes = next_slice(&self.values, &mut self.values_pos, value_len, "value")?;
        value.clear();
        value.extend_from_slice(value_bytes);

        self.records -= 1;
        Ok(())
    }
}

fn next_len(buf: &[u8], pos: &mut usize, what: &str) -> Result<usize> {
    let (value, used) = decode_vlong(&buf[*pos..])
        .ok_or_else(|| FormatError::InvalidRecord(format!("{} truncated", what)))?;
    if !(0..=i32::MAX as i64).contains(&value) {
        return Err(FormatError::InvalidRecord(format!("{} {} out of range", what, value)).into());
    }
    *pos += used;
    Ok(value as usize)
}

fn next_slice<'a>(buf: &'a [u8], pos: &mut usize, len: usize, what: &str) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| FormatError::InvalidRecord(format!("{} runs past its block", what)))?;
    let slice = &buf[*pos..end];
    *pos = end;
    Ok(slice)
}

fn missing_codec() -> Error {
    FormatError::InvalidHeader("compressed file without a codec".to_string()).into()
}

/// Read a big-endian i32, or `None` on a clean end of stream.
fn read_i32_or_eof<R: Read>(source: &mut R) -> Result<Option<i32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(i32::from_be_bytes(buf)))
}

fn read_i32<R: Read>(source: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    source.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

/// Replace `buf` with exactly `len` bytes from `source`.
fn read_exactly<R: Read>(source: &mut R, buf: &mut Vec<u8>, len: usize) -> Result<()> {
    buf.clear();
    let got = source.by_ref().take(len as u64).read_to_end(buf)?;
    if got != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len, got),
        )
        .into());
    }
    Ok(())
}

/// Decode the codec streams in `compressed` into `out`.
///
/// A buffer may carry several streams back to back, so the decompressor is
/// reset onto whatever is left until every byte is consumed.
fn inflate(
    decompressor: &mut dyn Decompressor<BufferSource>,
    compressed: &mut Vec<u8>,
    out: &mut Vec<u8>,
) -> Result<()> {
    out.clear();
    let len = compressed.len() as u64;
    if len == 0 {
        return Ok(());
    }

    let mut source = Cursor::new(std::mem::take(compressed));
    loop {
        let start = source.position();
        decompressor.reset(source)?;
        decompressor.read_to_end(out)?;
        source = decompressor.take_source().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "decompressor dropped its source")
        })?;
        if source.position() >= len {
            break;
        }
        if source.position() == start {
            return Err(FormatError::InvalidRecord("codec stream made no progress".to_string()).into());
        }
    }
    *compressed = source.into_inner();
    Ok(())
}

impl<R: Read> Reader<R> {
    /// Read the header from `source` and prepare to scan records.
    ///
    /// `codecs` supplies the decompressor when the header names a codec.
    pub fn new(mut source: R, codecs: &dyn CodecProvider) -> Result<Self> {
        let header = Header::read_from(&mut source)?;
        let decompressor = match header.codec {
            Some(kind) if header.compression != CompressionType::None => {
                Some(codecs.decompressor(kind)?)
            }
            _ => None,
        };
        Ok(Self {
            source,
            header,
            decompressor,
            block: Block::default(),
            key: Vec::new(),
            value: Vec::new(),
            scratch: Vec::new(),
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Serialized key of the current record.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Serialized (decompressed) value of the current record.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Mutable access to the source, e.g. to seek it before [`reset`](Self::reset).
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Drop buffered block state and the current record.
    ///
    /// Call after repositioning the source at a record or block boundary
    /// (for example the offset right after the header); the next
    /// [`scan`](Self::scan) starts reading from there.
    pub fn reset(&mut self) {
        self.block.rewind(0);
        self.key.clear();
        self.value.clear();
    }

    /// Advance to the next record. `Ok(false)` means a clean end of file.
    pub fn scan(&mut self) -> Result<bool> {
        match self.header.compression {
            CompressionType::Block => self.scan_block(),
            CompressionType::None | CompressionType::Record => self.scan_record(),
        }
    }

    fn check_sync(&mut self) -> Result<()> {
        let mut sync = [0u8; SYNC_SIZE];
        self.source.read_exact(&mut sync)?;
        if sync != self.header.sync {
            warn!("sync marker mismatch");
            return Err(FormatError::SyncMismatch.into());
        }
        Ok(())
    }

    fn scan_record(&mut self) -> Result<bool> {
        let record_len = loop {
            match read_i32_or_eof(&mut self.source)? {
                None => return Ok(false),
                Some(SYNC_ESCAPE) => self.check_sync()?,
                Some(len) => break len,
            }
        };
        let key_len = read_i32(&mut self.source)?;
        if record_len < 0 || key_len < 0 || key_len > record_len {
            return Err(FormatError::InvalidRecord(format!(
                "record length {} with key length {}",
                record_len, key_len
            ))
            .into());
        }
        let value_len = (record_len - key_len) as usize;

        read_exactly(&mut self.source, &mut self.key, key_len as usize)?;
        if self.header.compression == CompressionType::Record {
            read_exactly(&mut self.source, &mut self.scratch, value_len)?;
            let decompressor = self.decompressor.as_deref_mut().ok_or_else(missing_codec)?;
            inflate(decompressor, &mut self.scratch, &mut self.value)?;
        } else {
            read_exactly(&mut self.source, &mut self.value, value_len)?;
        }
        Ok(true)
    }

    fn scan_block(&mut self) -> Result<bool> {
        while self.block.records == 0 {
            if !self.load_block()? {
                return Ok(false);
            }
        }
        self.block.next_record(&mut self.key, &mut self.value)?;
        Ok(true)
    }

    /// Read and decode the next block. `Ok(false)` at a clean end of file.
    fn load_block(&mut self) -> Result<bool> {
        let escape = match read_i32_or_eof(&mut self.source)? {
            Some(v) => v,
            None => return Ok(false),
        };
        if escape != SYNC_ESCAPE {
            return Err(FormatError::InvalidRecord(format!(
                "expected sync escape before block, found {}",
                escape
            ))
            .into());
        }
        self.check_sync()?;
        let records = read_vlen(&mut self.source, "block record count")?;

        let decompressor = self.decompressor.as_deref_mut().ok_or_else(missing_codec)?;
        let block = &mut self.block;
        for part in [
            &mut block.key_lengths,
            &mut block.keys,
            &mut block.value_lengths,
            &mut block.values,
        ] {
            let len = read_vlen(&mut self.source, "compressed buffer length")?;
            read_exactly(&mut self.source, &mut self.scratch, len)?;
            inflate(&mut *decompressor, &mut self.scratch, part)?;
        }
        block.rewind(records);

        debug!(
            records,
            keys = block.keys.len(),
            values = block.values.len(),
            "loaded block"
        );
        Ok(true)
    }
}
