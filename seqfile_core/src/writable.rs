//! Hadoop `Writable` encodings that appear inside SequenceFiles.

use std::io::{self, Read};

use crate::error::{FormatError, Result};

/// Number of bytes (including the first) of a vint starting with `first`.
fn vint_size(first: i8) -> usize {
    if first >= -112 {
        1
    } else if first < -120 {
        (-119 - first as i32) as usize
    } else {
        (-111 - first as i32) as usize
    }
}

fn vint_is_negative(first: i8) -> bool {
    first < -120 || (-112..0).contains(&first)
}

fn finish_vint(first: i8, rest: &[u8]) -> i64 {
    let mut value: i64 = 0;
    for &b in rest {
        value = (value << 8) | b as i64;
    }
    if vint_is_negative(first) {
        value ^ -1
    } else {
        value
    }
}

/// Read a zero-compressed variable-length integer (`WritableUtils.readVLong`).
pub fn read_vlong<R: Read>(source: &mut R) -> io::Result<i64> {
    let mut first = [0u8; 1];
    source.read_exact(&mut first)?;
    let first = first[0] as i8;
    let size = vint_size(first);
    if size == 1 {
        return Ok(first as i64);
    }
    let mut rest = [0u8; 8];
    source.read_exact(&mut rest[..size - 1])?;
    Ok(finish_vint(first, &rest[..size - 1]))
}

/// Like [`read_vlong`], rejecting values outside `0..=i32::MAX`.
pub fn read_vlen<R: Read>(source: &mut R, what: &str) -> Result<usize> {
    let value = read_vlong(source)?;
    if !(0..=i32::MAX as i64).contains(&value) {
        return Err(FormatError::InvalidRecord(format!("{} {} out of range", what, value)).into());
    }
    Ok(value as usize)
}

/// Decode a vint from the front of `buf`, returning it and the bytes used.
pub fn decode_vlong(buf: &[u8]) -> Option<(i64, usize)> {
    let first = *buf.first()? as i8;
    let size = vint_size(first);
    if size == 1 {
        return Some((first as i64, 1));
    }
    let rest = buf.get(1..size)?;
    Some((finish_vint(first, rest), size))
}

/// Read a vint-prefixed UTF-8 string (`Text.readString`).
pub fn read_string<R: Read>(source: &mut R) -> Result<String> {
    let len = read_vlen(source, "string length")?;
    let mut buf = Vec::new();
    let got = source.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if got != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    String::from_utf8(buf)
        .map_err(|e| FormatError::InvalidHeader(format!("string is not UTF-8: {}", e)).into())
}

/// Payload of a serialized `BytesWritable`: 4-byte big-endian length + bytes.
pub fn bytes_writable(raw: &[u8]) -> Option<&[u8]> {
    let len = u32::from_be_bytes(raw.get(..4)?.try_into().ok()?) as usize;
    raw.get(4..4 + len)
}

/// Payload of a serialized `Text`: vint length + UTF-8 bytes.
pub fn text(raw: &[u8]) -> Option<&str> {
    let (len, used) = decode_vlong(raw)?;
    let len = usize::try_from(len).ok()?;
    std::str::from_utf8(raw.get(used..used.checked_add(len)?)?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `WritableUtils.writeVLong`, for building inputs.
    fn encode_vlong(mut value: i64) -> Vec<u8> {
        if (-112..=127).contains(&value) {
            return vec![value as u8];
        }
        let mut len: i64 = -112;
        if value < 0 {
            value ^= -1;
            len = -120;
        }
        let mut tmp = value;
        while tmp != 0 {
            tmp >>= 8;
            len -= 1;
        }
        let mut out = vec![len as u8];
        let len = if len < -120 { -(len + 120) } else { -(len + 112) };
        for idx in (0..len).rev() {
            out.push((value >> (idx * 8)) as u8);
        }
        out
    }

    #[test]
    fn vlong_decodes_hadoop_layout() {
        for value in [0, 1, -1, 127, -112, 128, -113, 255, 256, 65_535, -65_536, i32::MAX as i64, i64::MIN, i64::MAX] {
            let bytes = encode_vlong(value);
            assert_eq!(read_vlong(&mut bytes.as_slice()).unwrap(), value, "{value}");
            assert_eq!(decode_vlong(&bytes), Some((value, bytes.len())), "{value}");
        }
    }

    #[test]
    fn known_encodings() {
        assert_eq!(decode_vlong(&[0x05]), Some((5, 1)));
        assert_eq!(decode_vlong(&[0x8e, 0x01, 0x00]), Some((256, 3)));
        assert_eq!(decode_vlong(&[0x87, 0x70]), Some((-113, 2)));
    }

    #[test]
    fn truncated_vlong() {
        assert_eq!(decode_vlong(&[0x8e, 0x01]), None);
        assert_eq!(decode_vlong(&[]), None);
        let err = read_vlong(&mut [0x8eu8].as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn negative_length_is_rejected() {
        let bytes = encode_vlong(-5);
        let err = read_vlen(&mut bytes.as_slice(), "key length").unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn strings_and_writables() {
        let mut raw = vec![5u8];
        raw.extend_from_slice(b"Alice");
        assert_eq!(read_string(&mut raw.as_slice()).unwrap(), "Alice");
        assert_eq!(text(&raw), Some("Alice"));

        let mut bw = 8u32.to_be_bytes().to_vec();
        bw.extend_from_slice(b"Practice");
        assert_eq!(bytes_writable(&bw), Some(&b"Practice"[..]));
        assert_eq!(bytes_writable(&bw[..6]), None);
    }
}
