//! Random-bit sampler driving a bound executor
//!
//! The sampler owns its random generator. Every sampling call borrows the
//! sampler mutably, so the generator is never shared between concurrent
//! calls; the executor inside is immutable and may be shared freely.

use crate::error::{Error, Result};
use crate::expand::expand;
use crate::validate::validate;
use bernoulli_core::{create_executor, Block, BoundExecutor, ExecutionPlan, Executor, ExecutorOptions};
use bytemuck::PodCastError;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Options for [`Sampler::new`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerOptions {
    /// Probability, tolerance and backend selection
    pub executor: ExecutorOptions,
    /// Fixed generator seed; `None` seeds from the operating system
    pub seed: Option<u64>,
}

impl SamplerOptions {
    pub fn new(probability: f64) -> Self {
        Self {
            executor: ExecutorOptions::new(probability),
            seed: None,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.executor.tolerance = tolerance;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Bernoulli(p) bit sampler
pub struct Sampler<R: RngCore = StdRng> {
    executor: BoundExecutor,
    rng: R,
}

impl Sampler<StdRng> {
    /// Create a sampler with a `StdRng` generator
    pub fn new(options: &SamplerOptions) -> Result<Self> {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(&options.executor, rng)
    }
}

impl<R: RngCore> Sampler<R> {
    /// Create a sampler with a caller-supplied generator
    pub fn with_rng(options: &ExecutorOptions, rng: R) -> Result<Self> {
        let executor = create_executor(options)?;
        Ok(Self::from_executor(executor, rng))
    }

    /// Wrap an already bound executor
    pub fn from_executor(executor: BoundExecutor, rng: R) -> Self {
        debug!(
            backend = executor.backend_name(),
            source_blocks = executor.plan().source_block_count(),
            "sampler ready"
        );
        Self { executor, rng }
    }

    pub fn executor(&self) -> &BoundExecutor {
        &self.executor
    }

    pub fn plan(&self) -> &ExecutionPlan {
        self.executor.plan()
    }

    /// Source buffer size in bytes for `nobits` output bits
    pub fn required_source_bytes(&self, nobits: usize) -> usize {
        self.plan().required_source_bytes(nobits)
    }

    /// Zeroed source buffer large enough for `nobits` output bits
    pub fn make_buffer(&self, nobits: usize) -> Vec<Block> {
        let blocks = ExecutionPlan::output_blocks(nobits) * self.plan().source_block_count();
        vec![Block::ZERO; blocks]
    }

    /// Fill `buf` with random bits and evaluate it in place
    ///
    /// Returns the number of output blocks written to the front of `buf`.
    pub fn sample(&mut self, buf: &mut [Block]) -> Result<usize> {
        let stride = self.plan().source_block_count();
        if buf.len() % stride != 0 {
            return Err(Error::InvalidInput(format!(
                "buffer of {} blocks is not a whole number of {stride}-block groups",
                buf.len()
            )));
        }
        Ok(self.fill_and_execute(buf))
    }

    /// Byte-oriented variant of [`sample`](Self::sample)
    ///
    /// `bytes` must pass [`validate`] and additionally be 32-byte aligned
    /// and sized to whole blocks.
    pub fn sample_bytes(&mut self, bytes: &mut [u8]) -> Result<usize> {
        validate(bytes)?;
        let address = bytes.as_ptr() as usize;
        let size = bytes.len();
        let blocks: &mut [Block] = bytemuck::try_cast_slice_mut(bytes).map_err(|err| match err {
            PodCastError::TargetAlignmentGreaterAndInputNotAligned => {
                Error::WrongPointerAlignment { address }
            }
            PodCastError::OutputSliceWouldHaveSlop => Error::WrongSizeAlignment { size },
            other => Error::InvalidInput(format!("cannot view bytes as blocks: {other:?}")),
        })?;
        self.sample(blocks)
    }

    /// Draw exactly `nobits` samples
    pub fn sample_bits(&mut self, nobits: usize) -> Vec<bool> {
        let mut buf = self.make_buffer(nobits);
        let outputs = self.fill_and_execute(&mut buf);
        expand(&buf[..outputs], nobits)
    }

    fn fill_and_execute(&mut self, buf: &mut [Block]) -> usize {
        for word in buf.iter_mut().flat_map(|block| block.0.iter_mut()) {
            *word = self.rng.next_u64();
        }
        self.executor.execute_in_place(buf)
    }
}

impl<R: RngCore> fmt::Debug for Sampler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
