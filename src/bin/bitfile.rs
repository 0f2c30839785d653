//! bitfile CLI: tiered integers in bit files.
//!
//! `encode` writes the number of values followed by the values, each as a
//! tiered varint; `decode` reads that layout back. `dump` shows the stored
//! bits, least significant bit of each byte first.

use std::io::{self, BufWriter, IsTerminal, Read, Write};
use std::path::Path;
use std::process;

use bitfile::{BitStream, CodecParams};
use clap::{Args, Parser, Subcommand};
use num_bigint::BigUint;

#[derive(Parser)]
#[command(name = "bitfile", about = "Tiered variable-length integers in bit-addressed files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode decimal integers into a bit file
    Encode(EncodeArgs),
    /// Decode integers from a bit file (one per line)
    Decode(DecodeArgs),
    /// Print the bits of a file, LSB first per byte
    Dump(DumpArgs),
}

#[derive(Args)]
struct CodecArgs {
    /// Codec parameters HEADER,BLOCK,BIG_BLOCK
    #[arg(short, long, default_value_t = CodecParams::default())]
    params: CodecParams,

    /// Bit offset of the first value in the file
    #[arg(long, default_value_t = 0)]
    offset: u64,
}

#[derive(Args)]
struct EncodeArgs {
    #[command(flatten)]
    codec: CodecArgs,

    /// Output file
    #[arg(short, long)]
    output: String,

    /// Fill the unused bits of the last byte with ones
    #[arg(long)]
    pad_ones: bool,

    /// Values (decimal); read whitespace-separated from stdin if omitted
    values: Vec<String>,
}

#[derive(Args)]
struct DecodeArgs {
    #[command(flatten)]
    codec: CodecArgs,

    /// Input file
    #[arg(short, long)]
    input: String,
}

#[derive(Args)]
struct DumpArgs {
    /// Input file
    #[arg(short, long)]
    input: String,

    /// Bytes per output line
    #[arg(long, default_value_t = 8)]
    width: usize,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Encode(args) => run_encode(args),
        Command::Decode(args) => run_decode(args),
        Command::Dump(args) => run_dump(args),
    }
}

fn parse_values(raw: &[String]) -> Result<Vec<BigUint>, String> {
    raw.iter()
        .map(|s| {
            s.parse::<BigUint>()
                .map_err(|e| format!("ungueltiger Wert '{s}': {e}"))
        })
        .collect()
}

fn read_stdin_values() -> Result<Vec<String>, String> {
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        eprintln!("Lese Werte von stdin (Ctrl+D zum Beenden)...");
    }
    let mut text = String::new();
    stdin
        .read_to_string(&mut text)
        .map_err(|e| format!("stdin: {e}"))?;
    Ok(text.split_whitespace().map(str::to_string).collect())
}

fn run_encode(args: EncodeArgs) -> Result<(), String> {
    let raw = if args.values.is_empty() {
        read_stdin_values()?
    } else {
        args.values
    };
    let values = parse_values(&raw)?;
    let params = args.codec.params;

    // Erst in eine .tmp-Datei schreiben, bei Erfolg umbenennen.
    let tmp_path = format!("{}.tmp", args.output);
    let result = write_values(Path::new(&tmp_path), &values, params, args.codec.offset, args.pad_ones);
    match result {
        Ok(()) => std::fs::rename(&tmp_path, &args.output)
            .map_err(|e| format!("Rename-Fehler: {e}")),
        Err(e) => {
            let _ = std::fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

fn write_values(
    path: &Path,
    values: &[BigUint],
    params: CodecParams,
    offset: u64,
    pad_ones: bool,
) -> Result<(), String> {
    let stream = BitStream::create(path).map_err(|e| format!("{}: {e}", path.display()))?;
    stream.seek(offset).map_err(|e| e.to_string())?;
    stream
        .write_varint(&BigUint::from(values.len()), params)
        .map_err(|e| e.to_string())?;
    for v in values {
        stream.write_varint(v, params).map_err(|e| e.to_string())?;
    }
    stream.truncate_to_size(pad_ones).map_err(|e| e.to_string())?;
    stream.close().map_err(|e| e.to_string())
}

fn run_decode(args: DecodeArgs) -> Result<(), String> {
    let params = args.codec.params;
    let stream = BitStream::open_read_only(&args.input).map_err(|e| format!("{}: {e}", args.input))?;
    stream.seek(args.codec.offset).map_err(|e| e.to_string())?;

    let count = stream.read_varint(params).map_err(|e| format!("Anzahl: {e}"))?;
    let mut out = BufWriter::new(io::stdout().lock());
    let mut index = BigUint::default();
    while index < count {
        let value = stream
            .read_varint(params)
            .map_err(|e| format!("Wert {index}: {e}"))?;
        writeln!(out, "{value}").map_err(|e| e.to_string())?;
        index += 1u32;
    }
    out.flush().map_err(|e| e.to_string())
}

/// Bits eines Bytes, Bit 0 zuerst.
fn bits_lsb_first(byte: u8) -> String {
    (0..8).map(|i| if byte >> i & 1 == 1 { '1' } else { '0' }).collect()
}

fn run_dump(args: DumpArgs) -> Result<(), String> {
    if args.width == 0 {
        return Err("--width muss > 0 sein".into());
    }
    let stream = BitStream::open_read_only(&args.input).map_err(|e| format!("{}: {e}", args.input))?;
    let mut out = BufWriter::new(io::stdout().lock());
    let mut line = Vec::with_capacity(args.width);
    let mut offset = 0u64;
    loop {
        let byte = stream.read_byte().map_err(|e| e.to_string())?;
        if let Some(b) = byte {
            line.push(bits_lsb_first(b));
        }
        if line.len() == args.width || (byte.is_none() && !line.is_empty()) {
            writeln!(out, "{offset:08x}: {}", line.join(" ")).map_err(|e| e.to_string())?;
            offset += line.len() as u64;
            line.clear();
        }
        if byte.is_none() {
            break;
        }
    }
    out.flush().map_err(|e| e.to_string())
}
