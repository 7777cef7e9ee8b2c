//! Core types for fast Bernoulli bit-stream generation
//!
//! A target probability is compiled into a short boolean circuit over
//! independent fair bits. Evaluating the circuit lane-wise over 256-bit
//! blocks of uniform random data yields 256 Bernoulli(p) samples per block.
//!
//! # Architecture Overview
//!
//! 1. **Quantization** - `(p, tolerance)` becomes an [`ExecutionPlan`]
//! 2. **Capability probe** - CPU features are detected once per process
//! 3. **Executors** - scalar, AVX2 and generated-code backends evaluate plans
//! 4. **Factory** - resolves options to one backend, up front
//!
//! # Example
//!
//! ```rust
//! use bernoulli_core::{create_executor, Block, Executor, ExecutorOptions};
//!
//! let executor = create_executor(&ExecutorOptions::new(0.25).with_tolerance(1e-6)).unwrap();
//! assert_eq!(executor.plan().source_block_count(), 2);
//!
//! let src = [Block([0, 1, 2, 3]), Block([4, 5, 6, 7])];
//! let mut dst = [Block::ZERO];
//! executor.execute(&src, &mut dst);
//! assert_eq!(dst[0], Block([0, 1, 2, 3]));
//! ```

pub mod cpu;
pub mod error;
pub mod executor;
pub mod factory;
pub mod plan;
pub mod quantize;

// Re-export core types
pub use error::{Error, Result};

pub use plan::{
    Block, ExecutionPlan, Op, BLOCK_BITS, BLOCK_SIZE, MAX_PRECISION, WORDS_PER_BLOCK,
};
pub use quantize::quantize;

pub use cpu::{cpu_features, is_avx2_supported, CpuFeatures};

pub use executor::{Avx2Executor, BoundExecutor, Executor, InstructionSet, ScalarExecutor};
#[cfg(feature = "jit")]
pub use executor::JitExecutor;
#[cfg(feature = "parallel")]
pub use executor::parallel::{execute_parallel, MIN_PARALLEL_BLOCKS};

pub use factory::{bind_executor, create_executor, create_executor_for, ExecutorOptions};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        create_executor,
        quantize,
        Block,
        BoundExecutor,
        ExecutionPlan,
        // Executor trait and selection
        Executor,
        ExecutorOptions,
        InstructionSet,
        Result,
    };

    pub use crate::error::Error;

    #[cfg(feature = "parallel")]
    pub use crate::execute_parallel;
}
