//! AVX2 plan interpreter

use crate::plan::{Block, Op};
use std::arch::x86_64::*;

/// Evaluate one group starting at `sources`
///
/// # Safety
/// AVX2 must be available and `sources` must point to at least
/// `1 + #consuming ops` readable, 32-byte aligned blocks.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn evaluate(ops: &[Op], sources: *const __m256i) -> __m256i {
    let ones = _mm256_set1_epi64x(-1);
    let mut cursor = sources;
    let mut acc = _mm256_load_si256(cursor);
    for op in ops {
        acc = match op {
            Op::Not => _mm256_xor_si256(acc, ones),
            Op::And => {
                cursor = cursor.add(1);
                _mm256_and_si256(acc, _mm256_load_si256(cursor))
            }
            Op::Or => {
                cursor = cursor.add(1);
                _mm256_or_si256(acc, _mm256_load_si256(cursor))
            }
        };
    }
    acc
}

/// Evaluate a single output block
///
/// # Safety
/// AVX2 must be available and `sources.len()` must equal the number of
/// blocks `ops` consumes plus one.
#[target_feature(enable = "avx2")]
pub(super) unsafe fn evaluate_block(ops: &[Op], sources: &[Block]) -> Block {
    let acc = evaluate(ops, sources.as_ptr().cast());
    let mut out = Block::ZERO;
    _mm256_store_si256((&mut out as *mut Block).cast(), acc);
    out
}

/// Evaluate `dst.len()` groups of `stride` source blocks
///
/// # Safety
/// AVX2 must be available, `stride` must equal the number of blocks `ops`
/// consumes plus one, and `src.len() == dst.len() * stride`.
#[target_feature(enable = "avx2")]
pub(super) unsafe fn execute(ops: &[Op], stride: usize, src: &[Block], dst: &mut [Block]) {
    let mut group = src.as_ptr().cast::<__m256i>();
    for out in dst.iter_mut() {
        let acc = evaluate(ops, group);
        _mm256_store_si256((out as *mut Block).cast(), acc);
        group = group.add(stride);
    }
}
