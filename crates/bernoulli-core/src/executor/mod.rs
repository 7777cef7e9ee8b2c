//! Plan executors with capability-based backend selection
//!
//! This module provides the [`Executor`] trait and its backends. Every
//! backend implements the same contract over 256-bit [`Block`]s:
//!
//! - `ScalarExecutor` - portable, four 64-bit words per block
//! - `Avx2Executor` - one `ymm` register per block (`avx2` feature, x86_64)
//! - `JitExecutor` - plan lowered to native code with Cranelift (`jit` feature)
//!
//! [`BoundExecutor`] is the tagged union handed out by the factory. The
//! backend is chosen once, at construction; each `execute` call pays a
//! single `match`, never a per-block dispatch.
//!
//! # Usage
//!
//! ```rust
//! use bernoulli_core::{quantize, Block, Executor, ScalarExecutor};
//!
//! let plan = quantize(0.25, 1e-6).unwrap();
//! let executor = ScalarExecutor::new(plan);
//!
//! let src = [Block([0, 1, 2, 3]), Block([4, 5, 6, 7])];
//! let mut dst = [Block::ZERO];
//! executor.execute(&src, &mut dst);
//! assert_eq!(dst[0], Block([0, 1, 2, 3]));
//! ```

pub mod backends;
#[cfg(feature = "parallel")]
pub mod parallel;

pub use backends::{Avx2Executor, ScalarExecutor};
#[cfg(feature = "jit")]
pub use backends::JitExecutor;

use crate::cpu::CpuFeatures;
use crate::error::{Error, Result};
use crate::plan::{Block, ExecutionPlan, MAX_PRECISION, WORDS_PER_BLOCK};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Evaluates an execution plan over buffers of uniform random blocks
///
/// Implementations hold only the immutable plan (and, for generated code, an
/// immutable function handle), so one executor may be shared by any number
/// of threads working on disjoint buffers.
pub trait Executor: Send + Sync {
    /// Get the name of this backend
    fn backend_name(&self) -> &'static str;

    /// The plan this executor evaluates
    fn plan(&self) -> &ExecutionPlan;

    /// Evaluate one output block
    ///
    /// `sources` must hold exactly `plan().source_block_count()` blocks.
    fn evaluate_block(&self, sources: &[Block]) -> Block;

    /// Evaluate `dst.len()` output blocks
    ///
    /// Reads `dst.len() * source_block_count` blocks from `src`, advancing
    /// `source_block_count` blocks per output block.
    ///
    /// # Panics
    /// Panics if `src.len() != dst.len() * plan().source_block_count()`.
    fn execute(&self, src: &[Block], dst: &mut [Block]) {
        let stride = self.plan().source_block_count();
        check_buffers(stride, src.len(), dst.len());
        for (sources, out) in src.chunks_exact(stride).zip(dst.iter_mut()) {
            *out = self.evaluate_block(sources);
        }
    }

    /// Evaluate a buffer in place
    ///
    /// The buffer is split into `buf.len() / source_block_count` groups;
    /// output block `i` is written to `buf[i]`, which never precedes an
    /// unread source block. Trailing blocks that do not fill a whole group
    /// are left untouched. Returns the number of output blocks.
    fn execute_in_place(&self, buf: &mut [Block]) -> usize {
        let stride = self.plan().source_block_count();
        let count = buf.len() / stride;
        for i in 0..count {
            let out = self.evaluate_block(&buf[i * stride..(i + 1) * stride]);
            buf[i] = out;
        }
        count
    }

    /// Evaluate plain 64-bit words, four words per block
    ///
    /// Words are staged through an aligned stack buffer, so neither slice
    /// needs block alignment.
    ///
    /// # Panics
    /// Panics if `dst.len()` is not a multiple of four or
    /// `src.len() != dst.len() * plan().source_block_count()`.
    fn execute_words(&self, src: &[u64], dst: &mut [u64]) {
        assert_eq!(
            dst.len() % WORDS_PER_BLOCK,
            0,
            "destination length {} is not a whole number of blocks",
            dst.len()
        );
        let stride = self.plan().source_block_count();
        check_buffers(stride, src.len() / WORDS_PER_BLOCK, dst.len() / WORDS_PER_BLOCK);
        assert_eq!(src.len() % WORDS_PER_BLOCK, 0);

        let mut staged = [Block::ZERO; MAX_PRECISION + 1];
        let staged = &mut staged[..stride];
        for (chunk, out) in src
            .chunks_exact(stride * WORDS_PER_BLOCK)
            .zip(dst.chunks_exact_mut(WORDS_PER_BLOCK))
        {
            for (block, words) in staged.iter_mut().zip(chunk.chunks_exact(WORDS_PER_BLOCK)) {
                block.0.copy_from_slice(words);
            }
            out.copy_from_slice(&self.evaluate_block(staged).0);
        }
    }
}

/// Assert the source/destination sizing contract of [`Executor::execute`]
#[inline]
pub(crate) fn check_buffers(stride: usize, src_blocks: usize, dst_blocks: usize) {
    assert_eq!(
        src_blocks,
        dst_blocks * stride,
        "source holds {src_blocks} blocks, plan needs {stride} per output block for {dst_blocks} outputs"
    );
}

/// Instruction set preference for executor construction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionSet {
    /// Probe the CPU and pick the richest implemented backend
    #[default]
    Auto,
    /// Portable scalar code
    General,
    /// 256-bit integer vectors (AVX2)
    Avx,
    /// Recognised, no backend
    Mmx,
    /// Recognised, no interpreted backend
    Sse,
}

impl InstructionSet {
    /// All selectors, in declaration order
    pub const ALL: [InstructionSet; 5] = [
        InstructionSet::Auto,
        InstructionSet::General,
        InstructionSet::Avx,
        InstructionSet::Mmx,
        InstructionSet::Sse,
    ];

    /// Lower-case name used by `Display`, `FromStr` and serde
    pub fn name(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::General => "general",
            Self::Avx => "avx",
            Self::Mmx => "mmx",
            Self::Sse => "sse",
        }
    }

    /// Replace `Auto` with a concrete selector for the given CPU
    ///
    /// `Auto` resolves to `Avx` when AVX2 is present and the vector backend
    /// is compiled in, otherwise to `General`. It never resolves to the
    /// unimplemented `Sse` or `Mmx`. Explicit selectors are returned as is.
    pub fn resolve(self, features: CpuFeatures) -> Self {
        match self {
            Self::Auto => {
                if cfg!(all(target_arch = "x86_64", feature = "avx2"))
                    && features.contains(CpuFeatures::AVX2)
                {
                    Self::Avx
                } else {
                    Self::General
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for InstructionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InstructionSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|isa| isa.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidParameter(format!("Unknown instruction set '{s}'")))
    }
}

/// Executor bound to one backend at construction time
pub enum BoundExecutor {
    Scalar(ScalarExecutor),
    #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
    Avx2(Avx2Executor),
    #[cfg(feature = "jit")]
    Jit(JitExecutor),
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $call:expr) => {
        match $self {
            BoundExecutor::Scalar($inner) => $call,
            #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
            BoundExecutor::Avx2($inner) => $call,
            #[cfg(feature = "jit")]
            BoundExecutor::Jit($inner) => $call,
        }
    };
}

impl Executor for BoundExecutor {
    fn backend_name(&self) -> &'static str {
        dispatch!(self, e => e.backend_name())
    }

    fn plan(&self) -> &ExecutionPlan {
        dispatch!(self, e => e.plan())
    }

    fn evaluate_block(&self, sources: &[Block]) -> Block {
        dispatch!(self, e => e.evaluate_block(sources))
    }

    fn execute(&self, src: &[Block], dst: &mut [Block]) {
        dispatch!(self, e => e.execute(src, dst))
    }

    fn execute_in_place(&self, buf: &mut [Block]) -> usize {
        dispatch!(self, e => e.execute_in_place(buf))
    }

    fn execute_words(&self, src: &[u64], dst: &mut [u64]) {
        dispatch!(self, e => e.execute_words(src, dst))
    }
}

impl fmt::Debug for BoundExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundExecutor")
            .field("backend", &self.backend_name())
            .field("plan", self.plan())
            .finish()
    }
}
