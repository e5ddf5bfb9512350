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

use crate::bit_layout::{BitLayout, Bits};
use crate::model::{BitOrder, CodecError, CodecResult};
use crate::parallel;

/// Unpack 1, 2 or 4 bit samples from a packed byte stream into one
/// sample per output byte.
///
/// Output length is exactly `packed.len() * 8 / nbits`. Empty input
/// produces empty output.
pub fn unpack(
    packed: &[u8],
    nbits: usize,
    order: BitOrder,
    parallel: bool,
) -> CodecResult<Vec<u8>> {
    let bits = Bits::from_nbits(nbits)?;
    let mut out = vec![0u8; packed.len() * bits.samples_per_byte()];
    run_unpack(packed, &mut out, BitLayout::new(bits, order), parallel);
    Ok(out)
}

/// Buffered variant of [`unpack`]: writes into a caller-supplied buffer
/// instead of allocating, for reuse across repeated calls. The buffer
/// length must equal `packed.len() * 8 / nbits` exactly; validation
/// happens before any samples are written.
pub fn unpack_into(
    packed: &[u8],
    out: &mut [u8],
    nbits: usize,
    order: BitOrder,
    parallel: bool,
) -> CodecResult<()> {
    let bits = Bits::from_nbits(nbits)?;
    let expected = packed.len() * bits.samples_per_byte();
    if out.len() != expected {
        return Err(CodecError::OutputLength {
            expected,
            actual: out.len(),
        });
    }
    run_unpack(packed, out, BitLayout::new(bits, order), parallel);
    Ok(())
}

/// Pack one-sample-per-byte data down to 1, 2 or 4 bit samples.
///
/// Only the low `nbits` of each input byte survive; out-of-range bits
/// are masked off silently, matching what packing hardware does. The
/// input length must be a multiple of `8 / nbits` samples: a ragged
/// tail is rejected rather than truncated, since dropping samples at
/// the end of an acquisition block would be silent data loss.
pub fn pack(
    unpacked: &[u8],
    nbits: usize,
    order: BitOrder,
    parallel: bool,
) -> CodecResult<Vec<u8>> {
    let bits = Bits::from_nbits(nbits)?;
    let group = bits.samples_per_byte();
    if unpacked.len() % group != 0 {
        return Err(CodecError::InputLength {
            len: unpacked.len(),
            group,
        });
    }
    let mut out = vec![0u8; unpacked.len() / group];
    run_pack(unpacked, &mut out, BitLayout::new(bits, order), parallel);
    Ok(out)
}

/// Buffered variant of [`pack`]. The output buffer length must equal
/// `unpacked.len() * nbits / 8` exactly.
pub fn pack_into(
    unpacked: &[u8],
    out: &mut [u8],
    nbits: usize,
    order: BitOrder,
    parallel: bool,
) -> CodecResult<()> {
    let bits = Bits::from_nbits(nbits)?;
    let group = bits.samples_per_byte();
    if unpacked.len() % group != 0 {
        return Err(CodecError::InputLength {
            len: unpacked.len(),
            group,
        });
    }
    let expected = unpacked.len() / group;
    if out.len() != expected {
        return Err(CodecError::OutputLength {
            expected,
            actual: out.len(),
        });
    }
    run_pack(unpacked, out, BitLayout::new(bits, order), parallel);
    Ok(())
}

// Allocating and buffered entry points funnel through these two
// routines; the only difference above is who owns the output buffer.

fn run_unpack(packed: &[u8], out: &mut [u8], layout: BitLayout, parallel: bool) {
    if parallel {
        parallel::dispatch(packed, out, 1, layout.samples_per_byte(), |i, o| {
            unpack_scalar(i, o, layout)
        });
    } else {
        unpack_scalar(packed, out, layout);
    }
}

fn run_pack(unpacked: &[u8], out: &mut [u8], layout: BitLayout, parallel: bool) {
    if parallel {
        parallel::dispatch(unpacked, out, layout.samples_per_byte(), 1, |i, o| {
            pack_scalar(i, o, layout)
        });
    } else {
        pack_scalar(unpacked, out, layout);
    }
}

fn unpack_scalar(packed: &[u8], out: &mut [u8], layout: BitLayout) {
    let spb = layout.samples_per_byte();
    let mask = layout.mask();
    for (&byte, samples) in packed.iter().zip(out.chunks_exact_mut(spb)) {
        for (slot, shift) in samples.iter_mut().zip(layout.shifts()) {
            *slot = (byte >> shift) & mask;
        }
    }
}

fn pack_scalar(unpacked: &[u8], out: &mut [u8], layout: BitLayout) {
    let spb = layout.samples_per_byte();
    let mask = layout.mask();
    for (group, byte) in unpacked.chunks_exact(spb).zip(out.iter_mut()) {
        let mut acc = 0u8;
        for (&sample, shift) in group.iter().zip(layout.shifts()) {
            acc |= (sample & mask) << shift;
        }
        *byte = acc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: [BitOrder; 2] = [BitOrder::MsbFirst, BitOrder::LsbFirst];

    // Deterministic byte fill, large enough to exercise the parallel path.
    fn noise(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 131 + 17) as u8).collect()
    }

    #[test]
    fn unpack_known_vectors_msb_first() {
        let input = [0u8, 2, 7, 23];

        let mut expect_1bit = Vec::new();
        for byte in input {
            for shift in (0..8).rev() {
                expect_1bit.push((byte >> shift) & 1);
            }
        }
        assert_eq!(
            unpack(&input, 1, BitOrder::MsbFirst, false).unwrap(),
            expect_1bit
        );

        assert_eq!(
            unpack(&input, 2, BitOrder::MsbFirst, false).unwrap(),
            [0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 1, 3, 0, 1, 1, 3]
        );

        assert_eq!(
            unpack(&input, 4, BitOrder::MsbFirst, false).unwrap(),
            [0, 0, 0, 2, 0, 7, 1, 7]
        );
    }

    #[test]
    fn unpack_known_vectors_lsb_first() {
        // 23 = 0b00010111: 2-bit fields from the low end are 3, 1, 1, 0.
        assert_eq!(
            unpack(&[23], 2, BitOrder::LsbFirst, false).unwrap(),
            [3, 1, 1, 0]
        );
        assert_eq!(
            unpack(&[0x2F], 4, BitOrder::LsbFirst, false).unwrap(),
            [0xF, 0x2]
        );
    }

    #[test]
    fn pack_unpack_round_trip() {
        for nbits in [1, 2, 4] {
            for order in ORDERS {
                let mask = ((1u16 << nbits) - 1) as u8;
                let samples: Vec<u8> =
                    noise(4096).iter().map(|&b| b & mask).collect();
                let packed = pack(&samples, nbits, order, false).unwrap();
                assert_eq!(packed.len(), samples.len() * nbits / 8);
                let back = unpack(&packed, nbits, order, false).unwrap();
                assert_eq!(back, samples);
            }
        }
    }

    #[test]
    fn unpack_pack_round_trip() {
        // The other direction holds for arbitrary packed bytes.
        for nbits in [1, 2, 4] {
            for order in ORDERS {
                let packed = noise(1024);
                let samples = unpack(&packed, nbits, order, false).unwrap();
                let back = pack(&samples, nbits, order, false).unwrap();
                assert_eq!(back, packed);
            }
        }
    }

    #[test]
    fn pack_masks_out_of_range_samples() {
        // Only the low N bits of each sample survive.
        let packed = pack(&[0xFF, 0xFE, 0x81, 0x03], 2, BitOrder::MsbFirst, false)
            .unwrap();
        assert_eq!(packed, [0b11_10_01_11]);
    }

    #[test]
    fn parallel_matches_serial() {
        for nbits in [1, 2, 4] {
            for order in ORDERS {
                let packed = noise(256 * 1024);
                let serial = unpack(&packed, nbits, order, false).unwrap();
                let par = unpack(&packed, nbits, order, true).unwrap();
                assert_eq!(serial, par);

                let repacked_serial = pack(&serial, nbits, order, false).unwrap();
                let repacked_par = pack(&serial, nbits, order, true).unwrap();
                assert_eq!(repacked_serial, repacked_par);
            }
        }
    }

    #[test]
    fn buffered_matches_allocating() {
        for nbits in [1, 2, 4] {
            for order in ORDERS {
                let packed = noise(512);
                let allocated = unpack(&packed, nbits, order, false).unwrap();
                let mut buffer = vec![0xAAu8; packed.len() * 8 / nbits];
                unpack_into(&packed, &mut buffer, nbits, order, false).unwrap();
                assert_eq!(buffer, allocated);

                let repacked = pack(&allocated, nbits, order, false).unwrap();
                let mut buffer = vec![0xAAu8; packed.len()];
                pack_into(&allocated, &mut buffer, nbits, order, false).unwrap();
                assert_eq!(buffer, repacked);
            }
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        for nbits in [1, 2, 4] {
            for order in ORDERS {
                assert!(unpack(&[], nbits, order, false).unwrap().is_empty());
                assert!(pack(&[], nbits, order, false).unwrap().is_empty());
                unpack_into(&[], &mut [], nbits, order, false).unwrap();
                pack_into(&[], &mut [], nbits, order, false).unwrap();
            }
        }
    }

    #[test]
    fn rejects_unsupported_widths_everywhere() {
        let data = [0u8; 8];
        let mut buf = [0u8; 8];
        for order in ORDERS {
            for parallel in [false, true] {
                assert_eq!(
                    unpack(&data, 3, order, parallel),
                    Err(CodecError::UnsupportedBits(3))
                );
                assert_eq!(
                    pack(&data, 3, order, parallel),
                    Err(CodecError::UnsupportedBits(3))
                );
                assert_eq!(
                    unpack_into(&data, &mut buf, 3, order, parallel),
                    Err(CodecError::UnsupportedBits(3))
                );
                assert_eq!(
                    pack_into(&data, &mut buf, 3, order, parallel),
                    Err(CodecError::UnsupportedBits(3))
                );
            }
        }
    }

    #[test]
    fn rejects_ragged_pack_input() {
        // 10 samples do not divide into 4-sample groups.
        let samples = [1u8; 10];
        assert_eq!(
            pack(&samples, 2, BitOrder::MsbFirst, false),
            Err(CodecError::InputLength { len: 10, group: 4 })
        );
        let mut out = [0u8; 2];
        assert_eq!(
            pack_into(&samples, &mut out, 2, BitOrder::MsbFirst, false),
            Err(CodecError::InputLength { len: 10, group: 4 })
        );
    }

    #[test]
    fn buffered_length_mismatch_is_rejected_before_writing() {
        let packed = noise(16);
        // Sized as if nbits were 3: never correct for any supported width.
        let mut wrong = vec![0xEEu8; packed.len() * 8 / 3];
        let err = unpack_into(&packed, &mut wrong, 2, BitOrder::MsbFirst, false)
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::OutputLength {
                expected: 64,
                actual: 42
            }
        );
        // Nothing was written.
        assert!(wrong.iter().all(|&b| b == 0xEE));

        let samples = vec![1u8; 64];
        let mut wrong = vec![0xEEu8; 3];
        let err = pack_into(&samples, &mut wrong, 2, BitOrder::MsbFirst, false)
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::OutputLength {
                expected: 16,
                actual: 3
            }
        );
        assert!(wrong.iter().all(|&b| b == 0xEE));
    }
}
