//! Scalar backend implementation
//!
//! Portable reference executor. Each block is handled as four independent
//! 64-bit words, which the compiler is free to keep in general purpose
//! registers or auto-vectorise.

use crate::executor::Executor;
use crate::plan::{Block, ExecutionPlan, Op};

/// Scalar executor - works on every target
#[derive(Clone, Copy, Debug, Default)]
pub struct ScalarExecutor {
    plan: ExecutionPlan,
}

impl ScalarExecutor {
    pub fn new(plan: ExecutionPlan) -> Self {
        Self { plan }
    }
}

impl Executor for ScalarExecutor {
    fn backend_name(&self) -> &'static str {
        "scalar"
    }

    fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    #[inline]
    fn evaluate_block(&self, sources: &[Block]) -> Block {
        assert_eq!(sources.len(), self.plan.source_block_count());
        let mut acc = sources[0];
        let mut cursor = 1;
        for op in self.plan.operations() {
            acc = match op {
                Op::Not => !acc,
                Op::And => {
                    cursor += 1;
                    acc & sources[cursor - 1]
                }
                Op::Or => {
                    cursor += 1;
                    acc | sources[cursor - 1]
                }
            };
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize;

    #[test]
    fn test_scalar_identity() {
        let executor = ScalarExecutor::default();
        let src = [Block([0, 1, 2, 3]), Block([u64::MAX, 5, 6, 7])];
        let mut dst = [Block::ZERO; 2];
        executor.execute(&src, &mut dst);
        assert_eq!(dst, src);
        assert_eq!(executor.backend_name(), "scalar");
    }

    #[test]
    fn test_scalar_not() {
        let plan = ExecutionPlan::from_ops(&[Op::Not]).unwrap();
        let executor = ScalarExecutor::new(plan);
        let mut dst = [Block::ZERO];
        executor.execute(&[Block([0, 1, 2, 3])], &mut dst);
        assert_eq!(dst[0], Block([!0, !1, !2, !3]));
    }

    #[test]
    fn test_scalar_and() {
        let executor = ScalarExecutor::new(quantize(0.25, 1e-6).unwrap());
        let src = [Block([0, 1, 2, 3]), Block([4, 5, 6, 7])];
        let mut dst = [Block::ZERO];
        executor.execute(&src, &mut dst);
        assert_eq!(dst[0], Block([0, 1, 2, 3]));
    }

    #[test]
    fn test_scalar_or_and_chain() {
        // (b0 & b1) | b2, then complemented
        let plan = ExecutionPlan::from_ops(&[Op::And, Op::Or, Op::Not]).unwrap();
        let executor = ScalarExecutor::new(plan);
        let b0 = Block([0b1100, 0, 0, u64::MAX]);
        let b1 = Block([0b1010, 0, 0, u64::MAX]);
        let b2 = Block([0b0001, u64::MAX, 0, 0]);
        let out = executor.evaluate_block(&[b0, b1, b2]);
        assert_eq!(out, !((b0 & b1) | b2));
    }

    #[test]
    fn test_scalar_groups_advance_by_stride() {
        let executor = ScalarExecutor::new(quantize(0.75, 1e-6).unwrap());
        let src = [
            Block::ONES,
            Block::ONES,
            Block::ONES,
            Block::ZERO,
            Block::ZERO,
            Block::ZERO,
        ];
        let mut dst = [Block::ONES; 3];
        executor.execute(&src, &mut dst);
        assert_eq!(dst, [Block::ZERO, Block::ONES, Block::ONES]);
    }

    #[test]
    #[should_panic]
    fn test_scalar_rejects_short_sources() {
        let plan = ExecutionPlan::from_ops(&[Op::And, Op::Or]).unwrap();
        ScalarExecutor::new(plan).evaluate_block(&[Block::ONES]);
    }

    #[test]
    #[should_panic]
    fn test_scalar_rejects_empty_sources() {
        ScalarExecutor::default().evaluate_block(&[]);
    }

    #[test]
    #[should_panic]
    fn test_scalar_rejects_extra_sources() {
        let plan = ExecutionPlan::from_ops(&[Op::Not]).unwrap();
        ScalarExecutor::new(plan).evaluate_block(&[Block::ONES, Block::ZERO]);
    }
}
