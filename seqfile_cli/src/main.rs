use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use seqfile_codecs::HadoopCodecs;
use seqfile_core::writable::{bytes_writable, text};
use seqfile_core::{CodecKind, Reader, MAX_BUFFER_SIZE};

const TEXT_CLASS: &str = "org.apache.hadoop.io.Text";
const BYTES_WRITABLE_CLASS: &str = "org.apache.hadoop.io.BytesWritable";

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "seqfile",
    about = "Inspect and dump Hadoop SequenceFiles",
    version
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Capacity the group framer pre-grows its buffers to
    #[arg(long, global = true, default_value_t = MAX_BUFFER_SIZE)]
    buffer_size: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header: versions, classes, compression, metadata
    Inspect {
        /// SequenceFile to inspect
        file: PathBuf,
    },
    /// Print records as tab-separated key/value lines
    Cat {
        /// SequenceFile to read
        file: PathBuf,
        /// Stop after this many records
        #[arg(short = 'n', long)]
        limit: Option<u64>,
        /// How to render keys and values
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Count records
    Count {
        /// SequenceFile to read
        file: PathBuf,
    },
    /// Decode one raw length-prefixed group to stdout
    DecodeGroup {
        /// File holding the group bytes
        file: PathBuf,
        /// Codec the chunks were compressed with: gzip | zlib | snappy | lz4 | zstd
        #[arg(short, long)]
        codec: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// UTF-8, with invalid sequences replaced
    Text,
    /// Lowercase hex
    Hex,
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn open_reader(path: &Path, codecs: &HadoopCodecs) -> anyhow::Result<Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    debug!(path = ?path, buffer_size = codecs.buffer_size, "opening sequence file");
    Reader::new(BufReader::new(file), codecs)
        .with_context(|| format!("reading header of {:?}", path))
}

fn codec_from_name(name: &str) -> anyhow::Result<CodecKind> {
    CodecKind::from_name(name).with_context(|| {
        let valid: Vec<&str> = CodecKind::ALL.iter().map(|k| k.name()).collect();
        format!("unknown codec '{}'. Valid options: {}", name, valid.join(", "))
    })
}

/// Strip the `Writable` framing for the classes we know; other classes are
/// shown as their raw serialized bytes.
fn payload<'a>(class: &str, raw: &'a [u8]) -> &'a [u8] {
    let unwrapped = match class {
        TEXT_CLASS => text(raw).map(str::as_bytes),
        BYTES_WRITABLE_CLASS => bytes_writable(raw),
        _ => None,
    };
    unwrapped.unwrap_or(raw)
}

fn render(out: &mut impl Write, bytes: &[u8], format: Format) -> io::Result<()> {
    match format {
        Format::Text => out.write_all(String::from_utf8_lossy(bytes).as_bytes()),
        Format::Hex => bytes.iter().try_for_each(|b| write!(out, "{:02x}", b)),
    }
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_inspect(file: PathBuf, codecs: &HadoopCodecs) -> anyhow::Result<()> {
    let reader = open_reader(&file, codecs)?;
    let header = reader.header();
    let file_size = std::fs::metadata(&file)?.len();

    println!("=== SequenceFile: {:?} ===", file);
    println!();
    println!("  version        : {}", header.version);
    println!("  key class      : {}", header.key_class_name);
    println!("  value class    : {}", header.value_class_name);
    println!("  compression    : {:?}", header.compression);
    match header.codec {
        Some(kind) => println!("  codec          : {} ({})", kind.name(), kind.class_name()),
        None => println!("  codec          : none"),
    }
    println!("  file on disk   : {}", human_bytes(file_size));
    print!("  sync           : ");
    for b in header.sync {
        print!("{:02x}", b);
    }
    println!();

    if !header.metadata.is_empty() {
        println!();
        println!("  metadata:");
        for (name, value) in &header.metadata {
            println!("    {} = {}", name, value);
        }
    }
    Ok(())
}

fn run_cat(
    file: PathBuf,
    limit: Option<u64>,
    format: Format,
    codecs: &HadoopCodecs,
) -> anyhow::Result<()> {
    let mut reader = open_reader(&file, codecs)?;
    let key_class = reader.header().key_class_name.clone();
    let value_class = reader.header().value_class_name.clone();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut printed = 0u64;
    while limit.map_or(true, |n| printed < n) {
        let more = reader
            .scan()
            .with_context(|| format!("failed to read record {} of {:?}", printed, file))?;
        if !more {
            break;
        }
        render(&mut out, payload(&key_class, reader.key()), format)?;
        out.write_all(b"\t")?;
        render(&mut out, payload(&value_class, reader.value()), format)?;
        out.write_all(b"\n")?;
        printed += 1;
    }
    out.flush()?;
    Ok(())
}

fn run_count(file: PathBuf, codecs: &HadoopCodecs) -> anyhow::Result<()> {
    let mut reader = open_reader(&file, codecs)?;

    let t0 = Instant::now();
    let mut records = 0u64;
    let mut raw = 0u64;
    while reader
        .scan()
        .with_context(|| format!("failed to read record {} of {:?}", records, file))?
    {
        records += 1;
        raw += (reader.key().len() + reader.value().len()) as u64;
    }
    let elapsed = t0.elapsed();

    println!("{}", records);
    eprintln!("  raw size    : {}", human_bytes(raw));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_decode_group(file: PathBuf, codec: &str, codecs: &HadoopCodecs) -> anyhow::Result<()> {
    let kind = codec_from_name(codec)?;
    let source = BufReader::new(File::open(&file).with_context(|| format!("opening {:?}", file))?);
    let mut decompressor = codecs
        .block_decompressor(kind, source)
        .with_context(|| format!("reading group header of {:?}", file))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = decompressor
            .read(&mut buf)
            .with_context(|| format!("decoding {} group after {} bytes", kind.name(), total))?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        total += n as u64;
    }
    out.flush()?;
    decompressor.close()?;

    eprintln!("  decoded {} with {}", human_bytes(total), kind.name());
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let codecs = HadoopCodecs::new(cli.buffer_size);

    match cli.command {
        Commands::Inspect { file } => run_inspect(file, &codecs),
        Commands::Cat {
            file,
            limit,
            format,
        } => run_cat(file, limit, format, &codecs),
        Commands::Count { file } => run_count(file, &codecs),
        Commands::DecodeGroup { file, codec } => run_decode_group(file, &codec, &codecs),
    }
}
