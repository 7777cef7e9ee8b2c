//! Fast Bernoulli bit-stream sampling
//!
//! Samples i.i.d. Bernoulli(p) bits at memory bandwidth by compiling `p` into
//! a boolean circuit over fair random bits and evaluating that circuit on
//! 256 lanes at a time.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`bernoulli_core`] - quantizer, execution plans, executors and backend selection
//! - [`bernoulli_sampler`] - random generator, buffer helpers and bit expansion
//!
//! # Example
//!
//! ```rust
//! use fast_bernoulli::prelude::*;
//!
//! let options = SamplerOptions::new(0.1).with_tolerance(1e-6).with_seed(1);
//! let mut sampler = Sampler::new(&options).unwrap();
//!
//! let bits = sampler.sample_bits(10_000);
//! let ones = bits.iter().filter(|&&b| b).count();
//! assert!(ones > 700 && ones < 1300);
//! ```

pub use bernoulli_core;
pub use bernoulli_sampler;

pub use bernoulli_core::{
    bind_executor, cpu_features, create_executor, create_executor_for, quantize, Block,
    BoundExecutor, CpuFeatures, ExecutionPlan, Executor, ExecutorOptions, InstructionSet, Op,
    BLOCK_BITS, BLOCK_SIZE, MAX_PRECISION,
};
#[cfg(feature = "parallel")]
pub use bernoulli_core::execute_parallel;
pub use bernoulli_sampler::{buffer_size, expand, validate, Sampler, SamplerOptions};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use bernoulli_core::prelude::*;
    pub use bernoulli_sampler::{expand, Sampler, SamplerOptions};
}
