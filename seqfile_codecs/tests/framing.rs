/// Integration tests: every bundled codec driven through the shared group
/// framer, using chunks produced by the real encoders.
use std::io::{Cursor, Write};

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use seqfile_codecs::{block_decompressor, HadoopCodecs};
use seqfile_core::{CodecKind, CodecProvider, Decompressor, Error, FormatError, MAX_BUFFER_SIZE};

fn compress(kind: CodecKind, data: &[u8]) -> Vec<u8> {
    match kind {
        CodecKind::Lz4 => lz4_flex::block::compress(data),
        CodecKind::Snappy => snap::raw::Encoder::new().compress_vec(data).unwrap(),
        CodecKind::Gzip => {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(data).unwrap();
            enc.finish().unwrap()
        }
        CodecKind::Zlib => {
            let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
            enc.write_all(data).unwrap();
            enc.finish().unwrap()
        }
        CodecKind::Zstd => zstd::encode_all(data, 3).unwrap(),
    }
}

/// Frame `chunks` as one group: header, compressed chunks, terminal chunk.
fn group(kind: CodecKind, declared: u32, chunks: &[&[u8]]) -> Vec<u8> {
    let mut out = declared.to_be_bytes().to_vec();
    for chunk in chunks {
        let compressed = compress(kind, chunk);
        out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
        out.extend_from_slice(&compressed);
    }
    out.extend_from_slice(&0u32.to_be_bytes());
    out
}

fn exact_group(kind: CodecKind, chunks: &[&[u8]]) -> Vec<u8> {
    let total: usize = chunks.iter().map(|c| c.len()).sum();
    group(kind, total as u32, chunks)
}

fn read_with_step<R: std::io::Read>(d: &mut dyn Decompressor<R>, step: usize) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; step];
    loop {
        let n = d.read(&mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}

/// Generate `len` compressible bytes (repeating text).
fn compressible_bytes(len: usize, seed: u8) -> Vec<u8> {
    let pattern = b"the quick brown fox jumps over the lazy dog. ";
    (0..len)
        .map(|i| pattern[i % pattern.len()].wrapping_add(seed))
        .collect()
}

// ── tests ──────────────────────────────────────────────────────────────────

#[test]
fn alice_practice_through_every_codec() {
    for kind in CodecKind::ALL {
        let data = exact_group(kind, &[b"Alice", b"Practice"]);
        let mut d = block_decompressor(kind, Cursor::new(data)).unwrap();

        let mut buf = [0u8; 64];
        let mut got = Vec::new();
        loop {
            let n = d.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(got, b"AlicePractice", "{}", kind.name());
        assert_eq!(d.read(&mut buf).unwrap(), 0, "{}", kind.name());
    }
}

#[test]
fn any_read_size_yields_the_chunks_in_order() {
    let chunks = [
        compressible_bytes(10_000, 0),
        compressible_bytes(7_777, 1),
        compressible_bytes(1, 2),
        compressible_bytes(12_345, 3),
    ];
    let refs: Vec<&[u8]> = chunks.iter().map(|c| c.as_slice()).collect();
    let expected = chunks.concat();

    for kind in CodecKind::ALL {
        for step in [1, 3, 9_999, 10_000, expected.len() + 1] {
            let data = exact_group(kind, &refs);
            let mut d = block_decompressor(kind, Cursor::new(data)).unwrap();
            let got = read_with_step(d.as_mut(), step).unwrap();
            assert!(got == expected, "{} with step {}", kind.name(), step);
        }
    }
}

#[test]
fn short_group_fails_as_partial_block() {
    for kind in CodecKind::ALL {
        let data = group(kind, 20, &[b"Alice", b"Practice"]);
        let mut d = block_decompressor(kind, Cursor::new(data)).unwrap();
        let err = read_with_step(d.as_mut(), 64).unwrap_err();
        assert!(
            matches!(err, Error::Format(FormatError::PartialBlock)),
            "{}: {err:?}",
            kind.name()
        );
    }
}

#[test]
fn overproducing_chunk_fails_as_partial_block() {
    for kind in CodecKind::ALL {
        let data = group(kind, 10, &[b"Alice", b"Practice"]);
        let mut d = block_decompressor(kind, Cursor::new(data)).unwrap();

        let mut buf = [0u8; 64];
        assert_eq!(d.read(&mut buf).unwrap(), 5, "{}", kind.name());
        let err = d.read(&mut buf).unwrap_err();
        assert!(
            matches!(err, Error::Format(FormatError::PartialBlock)),
            "{}: {err:?}",
            kind.name()
        );
    }
}

#[test]
fn malformed_chunk_reports_the_codec() {
    let garbage = [0xffu8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff];
    for kind in [CodecKind::Snappy, CodecKind::Gzip, CodecKind::Zlib] {
        let mut data = 100u32.to_be_bytes().to_vec();
        data.extend_from_slice(&(garbage.len() as u32).to_be_bytes());
        data.extend_from_slice(&garbage);
        let mut d = block_decompressor(kind, Cursor::new(data)).unwrap();

        match d.read(&mut [0u8; 16]).unwrap_err() {
            Error::Format(FormatError::Codec { codec, .. }) => assert_eq!(codec, kind.name()),
            other => panic!("{}: unexpected error {other:?}", kind.name()),
        }
    }
}

#[test]
fn truncated_chunk_fails_the_whole_group() {
    let data = compressible_bytes(200_000, 5);
    let mut chunk = compress(CodecKind::Gzip, &data);
    chunk.truncate(chunk.len() - 20);
    let mut framed = (data.len() as u32).to_be_bytes().to_vec();
    framed.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
    framed.extend_from_slice(&chunk);
    framed.extend_from_slice(&0u32.to_be_bytes());

    let mut d = block_decompressor(CodecKind::Gzip, Cursor::new(framed)).unwrap();
    let mut buf = vec![0u8; 1 << 20];
    let err = d.read(&mut buf).unwrap_err();
    assert!(err.is_corruption(), "{err:?}");
    for _ in 0..2 {
        let again = d.read(&mut buf);
        assert!(again.is_err(), "read after failure gave {:?}", again.ok());
    }
}

#[test]
fn reset_replays_like_a_fresh_decoder() {
    for kind in CodecKind::ALL {
        let a = exact_group(kind, &[b"Alice", b"Practice"]);
        let b = exact_group(kind, &[b"Bob", b"Hope"]);

        let mut d = block_decompressor(kind, Cursor::new(a)).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(d.read(&mut buf).unwrap(), 2);
        d.reset(Cursor::new(b.clone())).unwrap();
        let replayed = read_with_step(d.as_mut(), 3).unwrap();

        let mut fresh = block_decompressor(kind, Cursor::new(b)).unwrap();
        assert_eq!(replayed, read_with_step(fresh.as_mut(), 3).unwrap());
        assert_eq!(replayed, b"BobHope", "{}", kind.name());
    }
}

#[test]
fn chunk_larger_than_buffer_ceiling() {
    let big = compressible_bytes(MAX_BUFFER_SIZE * 2 + 17, 0);
    for kind in [CodecKind::Lz4, CodecKind::Snappy] {
        let data = exact_group(kind, &[big.as_slice()]);
        let mut d = block_decompressor(kind, Cursor::new(data)).unwrap();
        let got = read_with_step(d.as_mut(), 64 * 1024).unwrap();
        assert!(got == big, "{}", kind.name());
    }
}

#[test]
fn negative_group_size_is_an_error_not_a_crash() {
    let data = 0xffff_fff0u32.to_be_bytes().to_vec();
    let err = block_decompressor(CodecKind::Lz4, Cursor::new(data)).err().unwrap();
    assert!(matches!(err, Error::Format(FormatError::SizeOverflow(0xffff_fff0))));
}

#[test]
fn borrowed_source_is_left_usable() {
    let mut data = exact_group(CodecKind::Snappy, &[b"Alice"]);
    data.extend(exact_group(CodecKind::Snappy, &[b"Bob"]));
    let mut source = Cursor::new(data);

    let mut d = block_decompressor(CodecKind::Snappy, &mut source).unwrap();
    assert_eq!(read_with_step(d.as_mut(), 16).unwrap(), b"Alice");
    d.close().unwrap();
    drop(d);

    // Skip the first group's terminal chunk and decode the second group.
    source.set_position(source.position() + 4);
    let mut d = block_decompressor(CodecKind::Snappy, &mut source).unwrap();
    assert_eq!(read_with_step(d.as_mut(), 16).unwrap(), b"Bob");
}

#[test]
fn provider_matches_hadoop_layout() {
    let codecs = HadoopCodecs::default();

    let mut framed = codecs.decompressor(CodecKind::Lz4).unwrap();
    framed
        .reset(Cursor::new(exact_group(CodecKind::Lz4, &[b"Alice", b"Practice"])))
        .unwrap();
    let mut out = Vec::new();
    framed.read_to_end(&mut out).unwrap();
    assert_eq!(out, b"AlicePractice");

    let mut plain = codecs.decompressor(CodecKind::Gzip).unwrap();
    plain
        .reset(Cursor::new(compress(CodecKind::Gzip, b"AlicePractice")))
        .unwrap();
    let mut out = Vec::new();
    plain.read_to_end(&mut out).unwrap();
    assert_eq!(out, b"AlicePractice");
}
