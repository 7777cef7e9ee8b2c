//! Executor construction from user-facing options
//!
//! The factory quantizes the requested probability, resolves the instruction
//! set against the cached CPU capabilities, and binds the result to exactly
//! one backend. All fallible work happens here; the returned executor cannot
//! fail.

use crate::cpu::cpu_features;
use crate::error::{Error, Result};
use crate::executor::{BoundExecutor, Executor, InstructionSet, ScalarExecutor};
use crate::plan::ExecutionPlan;
use crate::quantize::quantize;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Options for [`create_executor`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorOptions {
    /// Target probability of a set bit, in [0, 1]
    pub probability: f64,
    /// Maximum distance between target and realised probability
    pub tolerance: f64,
    /// Preferred instruction set; `Auto` probes the CPU
    pub instruction_set: InstructionSet,
    /// Lower the plan to native code instead of interpreting it
    pub use_codegen: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            probability: 0.5,
            tolerance: 1e-3,
            instruction_set: InstructionSet::Auto,
            use_codegen: false,
        }
    }
}

impl ExecutorOptions {
    /// Options for `probability` with the default tolerance
    pub fn new(probability: f64) -> Self {
        Self {
            probability,
            ..Self::default()
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_instruction_set(mut self, instruction_set: InstructionSet) -> Self {
        self.instruction_set = instruction_set;
        self
    }

    pub fn with_codegen(mut self, use_codegen: bool) -> Self {
        self.use_codegen = use_codegen;
        self
    }
}

/// Build an executor for the given options
#[instrument(skip_all, fields(
    probability = options.probability,
    tolerance = options.tolerance,
    instruction_set = %options.instruction_set,
    use_codegen = options.use_codegen
))]
pub fn create_executor(options: &ExecutorOptions) -> Result<BoundExecutor> {
    let plan = quantize(options.probability, options.tolerance)?;
    bind_executor(plan, options.instruction_set, options.use_codegen)
}

/// Build an interpreted executor for the best instruction set on this CPU
pub fn create_executor_for(probability: f64, tolerance: f64) -> Result<BoundExecutor> {
    create_executor(&ExecutorOptions::new(probability).with_tolerance(tolerance))
}

/// Bind an existing plan to a backend
///
/// Explicit `Mmx` or `Sse` without code generation fails with
/// [`Error::Unsupported`]; they are never chosen by `Auto`.
pub fn bind_executor(
    plan: ExecutionPlan,
    instruction_set: InstructionSet,
    use_codegen: bool,
) -> Result<BoundExecutor> {
    let resolved = instruction_set.resolve(cpu_features());

    let executor = if use_codegen {
        bind_codegen(plan, resolved)?
    } else {
        match resolved {
            InstructionSet::General | InstructionSet::Auto => {
                BoundExecutor::Scalar(ScalarExecutor::new(plan))
            }
            InstructionSet::Avx => bind_avx2(plan)?,
            InstructionSet::Mmx | InstructionSet::Sse => {
                return Err(Error::Unsupported(resolved));
            }
        }
    };

    debug!(
        backend = executor.backend_name(),
        %resolved,
        op_count = plan.op_count(),
        source_blocks = plan.source_block_count(),
        "bound executor"
    );
    Ok(executor)
}

#[cfg(all(target_arch = "x86_64", feature = "avx2"))]
fn bind_avx2(plan: ExecutionPlan) -> Result<BoundExecutor> {
    Ok(BoundExecutor::Avx2(crate::executor::Avx2Executor::new(plan)?))
}

#[cfg(not(all(target_arch = "x86_64", feature = "avx2")))]
fn bind_avx2(_plan: ExecutionPlan) -> Result<BoundExecutor> {
    Err(Error::FeatureNotAvailable(
        "AVX2 executor not available: not compiled with AVX2 support".to_string(),
    ))
}

#[cfg(feature = "jit")]
fn bind_codegen(plan: ExecutionPlan, instruction_set: InstructionSet) -> Result<BoundExecutor> {
    Ok(BoundExecutor::Jit(crate::executor::JitExecutor::new(
        plan,
        instruction_set,
    )?))
}

#[cfg(not(feature = "jit"))]
fn bind_codegen(_plan: ExecutionPlan, _instruction_set: InstructionSet) -> Result<BoundExecutor> {
    Err(Error::FeatureNotAvailable(
        "code generation not available: not compiled with the `jit` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::is_avx2_supported;

    #[test]
    fn test_default_options() {
        let options = ExecutorOptions::default();
        assert_eq!(options.probability, 0.5);
        assert_eq!(options.tolerance, 1e-3);
        assert_eq!(options.instruction_set, InstructionSet::Auto);
        assert!(!options.use_codegen);
    }

    #[test]
    fn test_options_from_json() {
        let options: ExecutorOptions =
            serde_json::from_str(r#"{"probability":0.2,"instruction_set":"general"}"#).unwrap();
        assert_eq!(
            options,
            ExecutorOptions::new(0.2).with_instruction_set(InstructionSet::General)
        );
    }

    #[test]
    fn test_general_binds_scalar() {
        let options = ExecutorOptions::new(0.3)
            .with_tolerance(1e-4)
            .with_instruction_set(InstructionSet::General);
        let executor = create_executor(&options).unwrap();
        assert_eq!(executor.backend_name(), "scalar");
        assert_eq!(*executor.plan(), quantize(0.3, 1e-4).unwrap());
    }

    #[test]
    fn test_auto_binds_best_backend() {
        let executor = create_executor_for(0.3, 1e-4).unwrap();
        let expected = if cfg!(all(target_arch = "x86_64", feature = "avx2")) && is_avx2_supported() {
            "avx2"
        } else {
            "scalar"
        };
        assert_eq!(executor.backend_name(), expected);
    }

    #[test]
    fn test_unimplemented_instruction_sets() {
        for isa in [InstructionSet::Mmx, InstructionSet::Sse] {
            let options = ExecutorOptions::new(0.3).with_instruction_set(isa);
            assert!(matches!(create_executor(&options), Err(Error::Unsupported(i)) if i == isa));
        }
    }

    #[test]
    fn test_explicit_avx() {
        let options = ExecutorOptions::new(0.3).with_instruction_set(InstructionSet::Avx);
        match create_executor(&options) {
            Ok(executor) => assert_eq!(executor.backend_name(), "avx2"),
            Err(err) => {
                assert!(matches!(err, Error::FeatureNotAvailable(_)));
                assert!(!cfg!(all(target_arch = "x86_64", feature = "avx2")) || !is_avx2_supported());
            }
        }
    }

    #[test]
    fn test_quantization_errors_propagate() {
        assert!(matches!(
            create_executor_for(0.3, 1e-30),
            Err(Error::Unsatisfiable { .. })
        ));
        assert!(matches!(
            create_executor_for(2.0, 1e-3),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[cfg(not(feature = "jit"))]
    #[test]
    fn test_codegen_requires_feature() {
        let options = ExecutorOptions::new(0.3).with_codegen(true);
        assert!(matches!(
            create_executor(&options),
            Err(Error::FeatureNotAvailable(_))
        ));
    }

    #[cfg(feature = "jit")]
    #[test]
    fn test_codegen_binds_jit() {
        let options = ExecutorOptions::new(0.3)
            .with_instruction_set(InstructionSet::General)
            .with_codegen(true);
        let executor = create_executor(&options).unwrap();
        assert_eq!(executor.backend_name(), "jit");
    }
}
