//! AVX2 backend implementation
//!
//! One block maps onto one `ymm` register. Plans are interpreted per block
//! with 256-bit `and`/`or`/`xor` intrinsics; the opcode loop is short
//! (at most 64 entries) and branch-predictable, so it stays in cache across
//! the whole buffer.

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
mod kernels;

use crate::error::{Error, Result};
use crate::plan::ExecutionPlan;

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
use crate::executor::{check_buffers, Executor};
#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
use crate::plan::Block;

/// AVX2 executor for x86_64 processors
#[derive(Clone, Copy, Debug)]
pub struct Avx2Executor {
    plan: ExecutionPlan,
}

impl Avx2Executor {
    /// Create a new AVX2 executor
    ///
    /// Fails with [`Error::FeatureNotAvailable`] when the backend is not
    /// compiled in or the CPU lacks AVX2.
    pub fn new(plan: ExecutionPlan) -> Result<Self> {
        #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
        {
            if !crate::cpu::is_avx2_supported() {
                return Err(Error::FeatureNotAvailable(
                    "AVX2 executor requested but CPU doesn't support AVX2 instructions".to_string(),
                ));
            }
            Ok(Self { plan })
        }
        #[cfg(not(all(target_arch = "x86_64", feature = "avx2")))]
        {
            let _ = plan;
            Err(Error::FeatureNotAvailable(
                "AVX2 executor not available: not compiled with AVX2 support".to_string(),
            ))
        }
    }

    /// Check if AVX2 is available on this CPU
    pub fn is_available() -> bool {
        #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
        {
            crate::cpu::is_avx2_supported()
        }
        #[cfg(not(all(target_arch = "x86_64", feature = "avx2")))]
        {
            false
        }
    }
}

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
impl Executor for Avx2Executor {
    fn backend_name(&self) -> &'static str {
        "avx2"
    }

    fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    fn evaluate_block(&self, sources: &[Block]) -> Block {
        assert_eq!(sources.len(), self.plan.source_block_count());
        // Safety: construction verified AVX2, and `sources` holds exactly the
        // number of blocks the plan consumes.
        unsafe { kernels::evaluate_block(self.plan.operations(), sources) }
    }

    fn execute(&self, src: &[Block], dst: &mut [Block]) {
        let stride = self.plan.source_block_count();
        check_buffers(stride, src.len(), dst.len());
        // Safety: as above, with `src.len() == dst.len() * stride` checked.
        unsafe { kernels::execute(self.plan.operations(), stride, src, dst) }
    }
}

#[cfg(all(test, target_arch = "x86_64", feature = "avx2"))]
mod tests {
    use super::*;
    use crate::executor::ScalarExecutor;
    use crate::plan::Op;

    fn executor(ops: &[Op]) -> Option<Avx2Executor> {
        if !Avx2Executor::is_available() {
            eprintln!("Skipping AVX2 test - not supported on this CPU");
            return None;
        }
        Some(Avx2Executor::new(ExecutionPlan::from_ops(ops).unwrap()).unwrap())
    }

    #[test]
    fn test_avx2_not() {
        let Some(executor) = executor(&[Op::Not]) else { return };
        let mut dst = [Block::ZERO];
        executor.execute(&[Block([0, 1, 2, 3])], &mut dst);
        assert_eq!(dst[0], Block([!0, !1, !2, !3]));
        assert_eq!(executor.backend_name(), "avx2");
    }

    #[test]
    fn test_avx2_and() {
        let Some(executor) = executor(&[Op::And]) else { return };
        let src = [Block([0, 1, 2, 3]), Block([4, 5, 6, 7])];
        let mut dst = [Block::ZERO];
        executor.execute(&src, &mut dst);
        assert_eq!(dst[0], Block([0, 1, 2, 3]));
    }

    #[test]
    fn test_avx2_matches_scalar() {
        let ops = [Op::And, Op::Not, Op::Or, Op::And, Op::Not];
        let Some(executor) = executor(&ops) else { return };
        let scalar = ScalarExecutor::new(*executor.plan());

        let src: Vec<Block> = (0..40u64)
            .map(|i| {
                let x = i.wrapping_mul(0x9E37_79B9_7F4A_7C15);
                Block([x, x.rotate_left(17), !x, x ^ 0xDEAD_BEEF])
            })
            .collect();
        let mut expected = vec![Block::ZERO; 10];
        let mut actual = vec![Block::ZERO; 10];
        scalar.execute(&src, &mut expected);
        executor.execute(&src, &mut actual);
        assert_eq!(actual, expected);

        let mut in_place = src.clone();
        assert_eq!(executor.execute_in_place(&mut in_place), 10);
        assert_eq!(&in_place[..10], &expected[..]);
    }
}
