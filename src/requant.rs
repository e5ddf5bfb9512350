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

/// Quantizer decision threshold, in counts. Recordings that keep the
/// voltage RMS near half full scale put the optimal 4-level thresholds
/// close to one sigma, i.e. 64 counts on a signed 8-bit sample.
const THRESHOLD: i8 = 64;

/// Requantize interleaved signed 8-bit complex samples down to packed
/// 2-bit complex codes.
///
/// Each real or imaginary component maps to one of four levels:
///
/// | amplitude x      | code |
/// |------------------|------|
/// | x < -64          | 0    |
/// | -64 <= x < 0     | 1    |
/// | 0 <= x < 64      | 2    |
/// | x >= 64          | 3    |
///
/// Codes are packed most-significant-sample first, four to a byte, with
/// the same bit layout [`crate::pack`] uses for `nbits = 2`. The
/// transform is lossy and one-way; unpacking recovers the 2-bit codes,
/// not the original amplitudes. Input length must be a multiple of 4
/// (two complex pairs fill one output byte).
pub fn requant_ci8_cu2(complex8: &[i8]) -> CodecResult<Vec<u8>> {
    let layout = BitLayout::new(Bits::Two, BitOrder::MsbFirst);
    let group = layout.samples_per_byte();
    if complex8.len() % group != 0 {
        return Err(CodecError::InputLength {
            len: complex8.len(),
            group,
        });
    }
    let mut out = vec![0u8; complex8.len() / group];
    for (samples, byte) in complex8.chunks_exact(group).zip(out.iter_mut()) {
        let mut acc = 0u8;
        for (&x, shift) in samples.iter().zip(layout.shifts()) {
            acc |= quantize(x) << shift;
        }
        *byte = acc;
    }
    Ok(out)
}

#[inline]
fn quantize(x: i8) -> u8 {
    if x < -THRESHOLD {
        0
    } else if x < 0 {
        1
    } else if x < THRESHOLD {
        2
    } else {
        3
    }
}
