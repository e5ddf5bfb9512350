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
use std::thread::available_parallelism;
use std::time::Instant;

use bit2byte::{
    BitOrder, CodecResult, ColorLogger, TermResult, pack, pack_into,
    requant_ci8_cu2, unpack, unpack_into, unpack_lookup,
};
use clap::Parser;
use log::{info, warn};
use rand::Rng;

#[derive(Parser, Debug)]
#[command(
    name = "bit_bench",
    about = "Measure pack/unpack kernel throughput on random sample streams",
    version
)]
struct Cli {
    /// Array size in bytes
    #[arg(short = 'z', long = "size", default_value = "4194304")]
    size: usize,

    /// Iterations per kernel
    #[arg(short = 'l', long = "loops", default_value = "64")]
    loops: usize,

    /// Packed bit order: M (most significant sample first),
    /// or L (least significant sample first)
    #[arg(short = 'e', long = "endianness", default_value = "M")]
    endianness: char,

    /// Quiet mode: suppress all log output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn main() -> TermResult {
    match run() {
        Ok(()) => TermResult(Ok(())),
        Err(e) => TermResult(Err(e.into())),
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    ColorLogger::new(cli.quiet, false).init();

    let avail_par = available_parallelism().map(|n| n.get()).unwrap_or(1);
    let thread_count = (avail_par / 2).max(1);

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build_global()
    {
        warn!(
            "Rayon pool initialization error ({} threads). Details: {:?}",
            thread_count, e
        );
    }

    let order = match cli.endianness.to_ascii_lowercase() {
        'l' => BitOrder::LsbFirst,
        'm' => BitOrder::MsbFirst,
        _ => BitOrder::MsbFirst,
    };

    // Keep whole sample groups at every width.
    let size = cli.size.max(8).next_multiple_of(8);
    let loops = cli.loops.max(1);

    let mut rng = rand::thread_rng();
    let mut packed = vec![0u8; size];
    rng.fill(&mut packed[..]);

    info!(
        "Benchmarking {} byte arrays, {} loops per kernel, {} threads",
        size, loops, thread_count
    );

    for nbits in [1, 2, 4] {
        let samples = unpack(&packed, nbits, order, false)?;
        let mut unpack_buf = vec![0u8; samples.len()];
        let mut pack_buf = vec![0u8; packed.len()];

        bench(&format!("unpack {}bit", nbits), size, loops, || {
            unpack(&packed, nbits, order, false).map(drop)
        })?;
        bench(&format!("unpack {}bit parallel", nbits), size, loops, || {
            unpack(&packed, nbits, order, true).map(drop)
        })?;
        bench(&format!("unpack {}bit lookup", nbits), size, loops, || {
            unpack_lookup(&packed, nbits, order, false).map(drop)
        })?;
        bench(
            &format!("unpack {}bit lookup parallel", nbits),
            size,
            loops,
            || unpack_lookup(&packed, nbits, order, true).map(drop),
        )?;
        bench(&format!("unpack {}bit buffered", nbits), size, loops, || {
            unpack_into(&packed, &mut unpack_buf, nbits, order, false)
        })?;
        bench(&format!("pack {}bit", nbits), size, loops, || {
            pack(&samples, nbits, order, false).map(drop)
        })?;
        bench(&format!("pack {}bit parallel", nbits), size, loops, || {
            pack(&samples, nbits, order, true).map(drop)
        })?;
        bench(&format!("pack {}bit buffered", nbits), size, loops, || {
            pack_into(&samples, &mut pack_buf, nbits, order, false)
        })?;
    }

    let voltages: Vec<i8> = packed.iter().map(|&b| b as i8).collect();
    bench("requant ci8 -> cu2", size, loops, || {
        requant_ci8_cu2(&voltages).map(drop)
    })?;

    Ok(())
}

/// Time `loops` invocations of a kernel over `bytes` of packed input
/// and report throughput.
fn bench<F>(label: &str, bytes: usize, loops: usize, mut kernel: F) -> CodecResult<()>
where
    F: FnMut() -> CodecResult<()>,
{
    let start = Instant::now();
    for _ in 0..loops {
        kernel()?;
    }
    let secs = start.elapsed().as_secs_f64();
    let throughput = (bytes as f64 * loops as f64) / 1e6 / secs;
    info!("{:<28} {:>9.1} MB/s", label, throughput);
    Ok(())
}
