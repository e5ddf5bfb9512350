// Lookup-table-accelerated unpack. Each table maps a packed byte value
// to the 8/N samples the scalar codec would produce, so the inner loop
// is one index and one bulk copy per input byte. Tables are built at
// compile time and shared read-only across threads for the process
// lifetime; there is no pack-side table because a packed output byte
// depends on 8/N independent input samples.

use crate::bit_layout::Bits;
use crate::model::{BitOrder, CodecResult};
use crate::parallel;

const fn unpack_table<const SPB: usize>(nbits: usize, msb_first: bool) -> [[u8; SPB]; 256] {
    let mask = ((1u16 << nbits) - 1) as u8;
    let mut table = [[0u8; SPB]; 256];
    let mut byte = 0usize;
    while byte < 256 {
        let mut slot = 0usize;
        while slot < SPB {
            let shift = if msb_first {
                8 - nbits * (slot + 1)
            } else {
                nbits * slot
            };
            table[byte][slot] = ((byte >> shift) as u8) & mask;
            slot += 1;
        }
        byte += 1;
    }
    table
}

static TABLE_1BIT_MSB: [[u8; 8]; 256] = unpack_table::<8>(1, true);
static TABLE_1BIT_LSB: [[u8; 8]; 256] = unpack_table::<8>(1, false);
static TABLE_2BIT_MSB: [[u8; 4]; 256] = unpack_table::<4>(2, true);
static TABLE_2BIT_LSB: [[u8; 4]; 256] = unpack_table::<4>(2, false);
static TABLE_4BIT_MSB: [[u8; 2]; 256] = unpack_table::<2>(4, true);
static TABLE_4BIT_LSB: [[u8; 2]; 256] = unpack_table::<2>(4, false);

/// Lookup-accelerated equivalent of [`crate::unpack`]. Bit-identical to
/// the scalar path for every input byte value.
pub fn unpack_lookup(
    packed: &[u8],
    nbits: usize,
    order: BitOrder,
    parallel: bool,
) -> CodecResult<Vec<u8>> {
    let bits = Bits::from_nbits(nbits)?;
    let mut out = vec![0u8; packed.len() * bits.samples_per_byte()];
    match (bits, order) {
        (Bits::One, BitOrder::MsbFirst) => run(packed, &mut out, &TABLE_1BIT_MSB, parallel),
        (Bits::One, BitOrder::LsbFirst) => run(packed, &mut out, &TABLE_1BIT_LSB, parallel),
        (Bits::Two, BitOrder::MsbFirst) => run(packed, &mut out, &TABLE_2BIT_MSB, parallel),
        (Bits::Two, BitOrder::LsbFirst) => run(packed, &mut out, &TABLE_2BIT_LSB, parallel),
        (Bits::Four, BitOrder::MsbFirst) => run(packed, &mut out, &TABLE_4BIT_MSB, parallel),
        (Bits::Four, BitOrder::LsbFirst) => run(packed, &mut out, &TABLE_4BIT_LSB, parallel),
    }
    Ok(out)
}

fn run<const SPB: usize>(
    packed: &[u8],
    out: &mut [u8],
    table: &'static [[u8; SPB]; 256],
    parallel: bool,
) {
    if parallel {
        parallel::dispatch(packed, out, 1, SPB, |i, o| expand(i, o, table));
    } else {
        expand(packed, out, table);
    }
}

fn expand<const SPB: usize>(packed: &[u8], out: &mut [u8], table: &[[u8; SPB]; 256]) {
    for (&byte, samples) in packed.iter().zip(out.chunks_exact_mut(SPB)) {
        samples.copy_from_slice(&table[byte as usize]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::unpack;

    #[test]
    fn matches_scalar_for_every_byte_value() {
        let all_bytes: Vec<u8> = (0..=255).collect();
        for nbits in [1, 2, 4] {
            for order in [BitOrder::MsbFirst, BitOrder::LsbFirst] {
                assert_eq!(
                    unpack_lookup(&all_bytes, nbits, order, false).unwrap(),
                    unpack(&all_bytes, nbits, order, false).unwrap(),
                    "nbits={} order={:?}",
                    nbits,
                    order
                );
            }
        }
    }

    #[test]
    fn known_vector() {
        assert_eq!(
            unpack_lookup(&[0, 2, 7, 23], 4, BitOrder::MsbFirst, false).unwrap(),
            [0, 0, 0, 2, 0, 7, 1, 7]
        );
    }

    #[test]
    fn parallel_matches_serial() {
        let packed: Vec<u8> = (0..128 * 1024).map(|i| (i * 131 + 17) as u8).collect();
        for nbits in [1, 2, 4] {
            for order in [BitOrder::MsbFirst, BitOrder::LsbFirst] {
                assert_eq!(
                    unpack_lookup(&packed, nbits, order, true).unwrap(),
                    unpack_lookup(&packed, nbits, order, false).unwrap()
                );
            }
        }
    }

    #[test]
    fn rejects_unsupported_widths() {
        assert!(unpack_lookup(&[0u8; 4], 8, BitOrder::MsbFirst, false).is_err());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(
            unpack_lookup(&[], 1, BitOrder::LsbFirst, false)
                .unwrap()
                .is_empty()
        );
    }
}
