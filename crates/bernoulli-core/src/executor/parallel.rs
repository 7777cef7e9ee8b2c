//! Multi-threaded execution over disjoint buffer slices
//!
//! Executors are immutable, so one instance is shared by every rayon worker;
//! each worker evaluates a contiguous run of groups.

use super::{check_buffers, Executor};
use crate::plan::Block;
use rayon::prelude::*;

/// Below this many output blocks the work is done on the calling thread
pub const MIN_PARALLEL_BLOCKS: usize = 1024;

/// Evaluate `dst.len()` output blocks across the rayon pool
///
/// Output is identical to [`Executor::execute`] on the same buffers.
///
/// # Panics
/// Panics if `src.len() != dst.len() * plan().source_block_count()`.
pub fn execute_parallel<E: Executor + ?Sized>(executor: &E, src: &[Block], dst: &mut [Block]) {
    let stride = executor.plan().source_block_count();
    check_buffers(stride, src.len(), dst.len());

    let chunk = chunk_size(dst.len(), rayon::current_num_threads().min(num_cpus::get()));
    if chunk >= dst.len() {
        executor.execute(src, dst);
        return;
    }

    dst.par_chunks_mut(chunk)
        .zip(src.par_chunks(chunk * stride))
        .for_each(|(out, sources)| executor.execute(sources, out));
}

/// Output blocks handed to each task
fn chunk_size(blocks: usize, threads: usize) -> usize {
    blocks.div_ceil(threads.max(1)).max(MIN_PARALLEL_BLOCKS)
}
