//! Native code generation backend
//!
//! The plan is lowered once, at construction, into a straight-line native
//! function that evaluates one group of source blocks. Executing a buffer is
//! then a loop of indirect calls with no opcode interpretation.

mod codegen;

use crate::cpu;
use crate::error::{Error, Result};
use crate::executor::{check_buffers, Executor, InstructionSet};
use crate::plan::{Block, ExecutionPlan};
use cranelift_jit::JITModule;
use std::fmt;
use tracing::{debug, warn};

/// Executor running Cranelift-generated machine code
pub struct JitExecutor {
    plan: ExecutionPlan,
    instruction_set: InstructionSet,
    kernel: codegen::KernelFn,
    // Owns the executable memory behind `kernel`; released in Drop.
    module: Option<JITModule>,
}

// Safety: after finalization the module is never mutated, and the generated
// code only touches the buffers passed to it.
unsafe impl Send for JitExecutor {}
// Safety: see above.
unsafe impl Sync for JitExecutor {}

impl JitExecutor {
    /// Compile `plan` for the requested instruction set
    ///
    /// `General` and `Sse` target the baseline ISA, `Avx` (and an unresolved
    /// `Auto`) let Cranelift use every extension the host reports. `Mmx` has
    /// no 128-bit integer lanes and is rejected.
    pub fn new(plan: ExecutionPlan, instruction_set: InstructionSet) -> Result<Self> {
        let infer_native_flags = match instruction_set {
            InstructionSet::General | InstructionSet::Sse => false,
            InstructionSet::Avx => {
                if !cpu::is_avx2_supported() {
                    return Err(Error::FeatureNotAvailable(
                        "AVX code generation requested but CPU doesn't support AVX2 instructions"
                            .to_string(),
                    ));
                }
                true
            }
            InstructionSet::Auto => true,
            InstructionSet::Mmx => return Err(Error::Unsupported(instruction_set)),
        };

        let compiled = codegen::compile(&plan, infer_native_flags).map_err(|err| {
            warn!(error = %format!("{err:#}"), %instruction_set, "plan compilation failed");
            Error::Codegen(err)
        })?;
        debug!(op_count = plan.op_count(), %instruction_set, "compiled plan to native code");

        Ok(Self {
            plan,
            instruction_set,
            kernel: compiled.func,
            module: Some(compiled.module),
        })
    }

    /// Instruction set the code was generated for
    pub fn instruction_set(&self) -> InstructionSet {
        self.instruction_set
    }
}

impl Executor for JitExecutor {
    fn backend_name(&self) -> &'static str {
        "jit"
    }

    fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    fn evaluate_block(&self, sources: &[Block]) -> Block {
        assert_eq!(sources.len(), self.plan.source_block_count());
        let mut out = Block::ZERO;
        // Safety: the kernel reads exactly `source_block_count` aligned
        // blocks and writes one, and its module is alive while `self` is.
        unsafe { (self.kernel)(sources.as_ptr(), &mut out) };
        out
    }

    fn execute(&self, src: &[Block], dst: &mut [Block]) {
        let stride = self.plan.source_block_count();
        check_buffers(stride, src.len(), dst.len());
        for (sources, out) in src.chunks_exact(stride).zip(dst.iter_mut()) {
            // Safety: as in `evaluate_block`; chunks hold exactly `stride` blocks.
            unsafe { (self.kernel)(sources.as_ptr(), out) };
        }
    }
}

impl Drop for JitExecutor {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // Safety: `kernel` is not reachable once `self` is being dropped.
            unsafe { module.free_memory() };
        }
    }
}

impl fmt::Debug for JitExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JitExecutor")
            .field("plan", &self.plan)
            .field("instruction_set", &self.instruction_set)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ScalarExecutor;
    use crate::plan::Op;
    use crate::quantize;

    #[test]
    fn test_jit_not() {
        let plan = ExecutionPlan::from_ops(&[Op::Not]).unwrap();
        let executor = JitExecutor::new(plan, InstructionSet::General).unwrap();
        let mut dst = [Block::ZERO];
        executor.execute(&[Block([0, 1, 2, 3])], &mut dst);
        assert_eq!(dst[0], Block([!0, !1, !2, !3]));
        assert_eq!(executor.backend_name(), "jit");
    }

    #[test]
    fn test_jit_and() {
        let executor = JitExecutor::new(quantize(0.25, 1e-6).unwrap(), InstructionSet::General).unwrap();
        let src = [Block([0, 1, 2, 3]), Block([4, 5, 6, 7])];
        let mut dst = [Block::ZERO];
        executor.execute(&src, &mut dst);
        assert_eq!(dst[0], Block([0, 1, 2, 3]));
    }

    #[test]
    fn test_jit_identity() {
        let executor = JitExecutor::new(ExecutionPlan::identity(), InstructionSet::Sse).unwrap();
        let src = [Block([9, 8, 7, 6]), Block::ONES];
        let mut dst = [Block::ZERO; 2];
        executor.execute(&src, &mut dst);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_jit_matches_scalar_on_long_plan() {
        let plan = quantize(0.123_456, 1e-12).unwrap();
        let executor = JitExecutor::new(plan, InstructionSet::General).unwrap();
        let scalar = ScalarExecutor::new(plan);

        let stride = plan.source_block_count();
        let src: Vec<Block> = (0..(8 * stride) as u64)
            .map(|i| {
                let x = i.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ 0x5555_AAAA_0F0F_F0F0;
                Block([x, x.rotate_left(7), x.rotate_left(29), !x])
            })
            .collect();
        let mut expected = vec![Block::ZERO; 8];
        let mut actual = vec![Block::ZERO; 8];
        scalar.execute(&src, &mut expected);
        executor.execute(&src, &mut actual);
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_jit_rejects_mmx() {
        assert!(matches!(
            JitExecutor::new(ExecutionPlan::identity(), InstructionSet::Mmx),
            Err(Error::Unsupported(InstructionSet::Mmx))
        ));
    }

    #[test]
    fn test_jit_avx_follows_cpu() {
        let result = JitExecutor::new(ExecutionPlan::identity(), InstructionSet::Avx);
        if cpu::is_avx2_supported() {
            assert_eq!(result.unwrap().instruction_set(), InstructionSet::Avx);
        } else {
            assert!(matches!(result, Err(Error::FeatureNotAvailable(_))));
        }
    }
}
