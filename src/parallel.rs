// Data-parallel dispatch for the pack/unpack kernels. Work is split into
// contiguous chunk pairs whose boundaries fall on whole packed bytes, so
// no sample straddles a chunk and every worker writes a disjoint region
// of the output. The only synchronization is the implicit join at the end
// of the rayon scope.

use rayon::prelude::*;

/// Inputs below this many bytes run on the calling thread; splitting
/// them would cost more than the transcode itself.
pub(crate) const MIN_PARALLEL_BYTES: usize = 16 * 1024;

/// Run `kernel` over aligned (input, output) chunk pairs on the rayon
/// global pool.
///
/// `in_unit` and `out_unit` are the byte counts that correspond to one
/// indivisible group of samples on each side: (1, 8/N) for unpack,
/// (8/N, 1) for pack. Callers guarantee `input.len()` is a multiple of
/// `in_unit` and that the buffers describe the same number of groups.
pub(crate) fn dispatch<F>(
    input: &[u8],
    out: &mut [u8],
    in_unit: usize,
    out_unit: usize,
    kernel: F,
) where
    F: Fn(&[u8], &mut [u8]) + Sync,
{
    debug_assert_eq!(input.len() % in_unit, 0);
    debug_assert_eq!(input.len() / in_unit, out.len() / out_unit);

    if input.len() < MIN_PARALLEL_BYTES {
        kernel(input, out);
        return;
    }

    let groups = input.len() / in_unit;
    let workers = rayon::current_num_threads().max(1);
    let per_chunk = groups.div_ceil(workers);

    input
        .par_chunks(per_chunk * in_unit)
        .zip(out.par_chunks_mut(per_chunk * out_unit))
        .for_each(|(in_chunk, out_chunk)| kernel(in_chunk, out_chunk));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn small_inputs_run_on_the_calling_thread() {
        let input = [0xA5u8; 64];
        let mut out = [0u8; 64];
        let calls = AtomicUsize::new(0);
        dispatch(&input, &mut out, 1, 1, |i, o| {
            calls.fetch_add(1, Ordering::SeqCst);
            o.copy_from_slice(i);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(out, input);
    }

    #[test]
    fn chunk_pairs_stay_aligned() {
        // 2-bit unpack shape: 1 packed byte expands to 4 samples. Every
        // chunk the kernel sees must keep that 1:4 ratio.
        let input: Vec<u8> = (0..MIN_PARALLEL_BYTES + 13)
            .map(|i| (i * 131 + 17) as u8)
            .collect();
        let mut out = vec![0u8; input.len() * 4];
        dispatch(&input, &mut out, 1, 4, |i, o| {
            assert_eq!(i.len() * 4, o.len());
            for (&b, chunk) in i.iter().zip(o.chunks_exact_mut(4)) {
                chunk.fill(b);
            }
        });
        // Spot check that chunk offsets lined up globally.
        for (i, &b) in input.iter().enumerate() {
            assert_eq!(&out[i * 4..i * 4 + 4], &[b, b, b, b]);
        }
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let input: [u8; 0] = [];
        let mut out: [u8; 0] = [];
        dispatch(&input, &mut out, 1, 8, |_, _| {});
    }
}
