/*
 Copyright (c) 2025 bit2byte contributors

 This file is part of bit2byte

 bit2byte is free software: you can redistribute it and/or modify it
 under the terms of the GNU General Public License as published by the
 Free Software Foundation, either version 3 of the License, or
 (at your option) any later version.

 bit2byte is distributed in the hope that it will be useful, but
 WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 GNU General Public License for more details.
 You should have received a copy of the GNU General Public License
 along with bit2byte. If not, see <https://www.gnu.org/licenses/>.
*/

use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::thread::available_parallelism;
use std::time::Instant;

use bit2byte::{
    BitOrder, Bits, ColorLogger, TermResult, pack_into, requant_ci8_cu2,
    unpack_into, unpack_lookup,
};
use clap::Parser;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{info, trace, warn};
use rayon::prelude::*;

#[derive(Parser)]
#[command(name = "bit2byte", version)]
struct Cli {
    /// Transcode mode: P (pack samples down to N bits),
    /// U (unpack N-bit data to one sample per byte),
    /// L (unpack via lookup table),
    /// R (requantize interleaved signed 8-bit complex to packed 2-bit)
    #[arg(short = 'm', long = "mode", default_value = "U")]
    mode: char,

    /// Sample bit width: 1, 2, or 4
    #[arg(short = 'n', long = "nbits", default_value = "2")]
    nbits: usize,

    /// Packed bit order: M (most significant sample first),
    /// or L (least significant sample first)
    #[arg(short = 'e', long = "endianness", default_value = "M")]
    endianness: char,

    /// Block size in bytes for file processing. Only set this if you
    /// know what you're doing.
    #[arg(short = 's', long = "bs", default_value = "65536")]
    block_size: usize,

    /// Split each block across the thread pool
    #[arg(short = 'P', long = "parallel")]
    parallel: bool,

    /// Output directory path for transcoded files. Directory must
    /// already exist. [default: same as input file]
    #[arg(short = 'p', long = "path", default_value = None)]
    path: Option<PathBuf>,

    /// Print diagnostic messages
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Quiet mode: suppress all log output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Input files (use - for stdin/stdout)
    #[arg(name = "FILES")]
    files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Pack,
    Unpack,
    UnpackLookup,
    Requant,
}

impl Mode {
    fn out_extension(self) -> &'static str {
        match self {
            Mode::Pack => "pkd",
            Mode::Unpack | Mode::UnpackLookup => "upk",
            Mode::Requant => "cu2",
        }
    }
}

fn main() -> TermResult {
    match run() {
        Ok(()) => TermResult(Ok(())),
        Err(e) => TermResult(Err(e.into())),
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let logger = ColorLogger::new(cli.quiet, cli.verbose);
    let multi = MultiProgress::new();
    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(log::LevelFilter::Trace);

    let avail_par = available_parallelism().map(|n| n.get()).unwrap_or(1);
    let thread_count = (avail_par / 2).max(1);

    // Configure Rayon pool size to our computed thread_count.
    // build_global can only be called once; ignore error if already set.
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build_global()
    {
        warn!(
            "Rayon pool initialization error ({} threads). Details: {:?}",
            thread_count, e
        );
    } else {
        trace!("Configured Rayon pool with {} threads", thread_count);
    }

    let mode = match cli.mode.to_ascii_lowercase() {
        'p' => Mode::Pack,
        'u' => Mode::Unpack,
        'l' => Mode::UnpackLookup,
        'r' => Mode::Requant,
        _ => {
            return Err(
                "Invalid mode; must be P (pack), U (unpack), L (unpack lookup), or R (requantize)"
                    .into(),
            );
        }
    };

    let order = match cli.endianness.to_ascii_lowercase() {
        'l' => BitOrder::LsbFirst,
        'm' => BitOrder::MsbFirst,
        _ => BitOrder::MsbFirst,
    };

    // Requantization fixes its own width; every other mode takes -n.
    if mode != Mode::Requant {
        Bits::from_nbits(cli.nbits)?;
    }

    // Keep whole sample groups in every block regardless of bit width.
    let block_size = cli.block_size.max(8).next_multiple_of(8);
    if block_size != cli.block_size {
        trace!("Rounded block size up to {} bytes", block_size);
    }

    let mut inputs = if cli.files.is_empty() {
        vec![PathBuf::from("-")]
    } else {
        cli.files.clone()
    };

    inputs.sort();
    inputs.dedup();

    let mut total_inputs = 0;
    let wall_start = Instant::now();

    // Handle stdin conversion once, then remove it so we don't treat it as a file path.
    if inputs.contains(&PathBuf::from("-")) {
        transcode_stdin(mode, cli.nbits, order, cli.parallel, block_size)?;
        total_inputs += 1;
        inputs.retain(|p| p != &PathBuf::from("-"));
    }

    // Filter to remove any glob patterns, yielding all inputted paths
    let paths = inputs
        .iter()
        .filter_map(|input| {
            if input.to_string_lossy().contains('*') {
                warn!(
                    "Unexpanded glob pattern detected in input: \"{}\". Skipping.",
                    input.display()
                );
                None
            } else if !input.is_file() {
                warn!("Input is not a file: \"{}\". Skipping.", input.display());
                None
            } else {
                Some(input.clone())
            }
        })
        .collect::<Vec<_>>();

    total_inputs += paths.len();

    // Parallelize per input using Rayon; short-circuit on first error.
    paths
        .into_par_iter()
        .try_for_each(|path| {
            transcode_file(
                path,
                mode,
                cli.nbits,
                order,
                cli.parallel,
                block_size,
                cli.path.clone(),
                &multi,
            )
        })
        .map_err(|e| -> Box<dyn Error> {
            Box::new(io::Error::new(io::ErrorKind::Other, e))
        })?;

    let total_elapsed = wall_start.elapsed();
    let total_secs = total_elapsed.as_secs();
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;
    info!(
        "Processed {} inputs in {:02}:{:02}:{:02}",
        total_inputs, h, m, s
    );

    Ok(())
}

/// Run transcoding for stdin to stdout. Single threaded, no progress bar.
fn transcode_stdin(
    mode: Mode,
    nbits: usize,
    order: BitOrder,
    parallel: bool,
    block_size: usize,
) -> Result<(), Box<dyn Error>> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = stdin.lock();
    let mut writer = BufWriter::new(stdout.lock());
    transcode_stream(
        &mut reader,
        &mut writer,
        mode,
        nbits,
        order,
        parallel,
        block_size,
        None,
    )
}

/// Run transcoding for a single input file and report progress.
fn transcode_file(
    path: PathBuf,
    mode: Mode,
    nbits: usize,
    order: BitOrder,
    parallel: bool,
    block_size: usize,
    out_dir: Option<PathBuf>,
    multi: &MultiProgress,
) -> Result<(), String> {
    let file_name = if let Some(name) = path.file_name() {
        name.to_string_lossy().into_owned()
    } else {
        return Err(format!("Invalid file path: {}", path.display()));
    };

    let in_file = File::open(&path).map_err(|e| e.to_string())?;
    let in_len = in_file.metadata().map_err(|e| e.to_string())?.len();

    let out_path = {
        let mut p = out_dir
            .or_else(|| path.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        p.push(&file_name);
        p.set_extension(mode.out_extension());
        p
    };
    let out_file = File::create(&out_path).map_err(|e| e.to_string())?;

    let style = ProgressStyle::with_template(
        "{prefix} {bar:20.cyan/blue} {percent}{msg}",
    )
    .map_err(|e| e.to_string())?;

    let pg = multi
        .add(ProgressBar::new(in_len))
        .with_style(style)
        .with_prefix(format!(
            "{} {}",
            "[Transcoding]".bold(),
            file_name.bold()
        ))
        .with_message("%");

    let mut reader = BufReader::new(in_file);
    let mut writer = BufWriter::new(out_file);
    let res = transcode_stream(
        &mut reader,
        &mut writer,
        mode,
        nbits,
        order,
        parallel,
        block_size,
        Some(&pg),
    );
    pg.finish_and_clear();

    match res {
        Ok(()) => {
            info!("{} -> {}", file_name, out_path.display());
            Ok(())
        }
        Err(e) => Err(format!("Error processing {}: {}", file_name, e)),
    }
}

/// Transcode a stream block by block, reusing one output buffer across
/// blocks so steady-state processing does not allocate.
fn transcode_stream(
    reader: &mut impl Read,
    writer: &mut impl Write,
    mode: Mode,
    nbits: usize,
    order: BitOrder,
    parallel: bool,
    block_size: usize,
    progress: Option<&ProgressBar>,
) -> Result<(), Box<dyn Error>> {
    let mut inbuf = vec![0u8; block_size];
    // Worst-case expansion is 8 samples per packed byte.
    let mut outbuf = vec![0u8; block_size * 8];
    let mut scratch: Vec<i8> = Vec::new();

    loop {
        let n = read_block(reader, &mut inbuf)?;
        if n == 0 {
            break;
        }
        let block = &inbuf[..n];
        match mode {
            Mode::Pack => {
                let out = &mut outbuf[..n * nbits / 8];
                pack_into(block, out, nbits, order, parallel)?;
                writer.write_all(out)?;
            }
            Mode::Unpack => {
                let out = &mut outbuf[..n * 8 / nbits];
                unpack_into(block, out, nbits, order, parallel)?;
                writer.write_all(out)?;
            }
            Mode::UnpackLookup => {
                let out = unpack_lookup(block, nbits, order, parallel)?;
                writer.write_all(&out)?;
            }
            Mode::Requant => {
                scratch.clear();
                scratch.extend(block.iter().map(|&b| b as i8));
                let out = requant_ci8_cu2(&scratch)?;
                writer.write_all(&out)?;
            }
        }
        if let Some(pg) = progress {
            pg.inc(n as u64);
        }
    }
    writer.flush()?;
    Ok(())
}

/// Fill `buf` from `reader`, tolerating short reads. Returns the number
/// of bytes read; less than `buf.len()` only at end of stream.
fn read_block(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
