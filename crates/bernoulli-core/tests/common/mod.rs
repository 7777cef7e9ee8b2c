//! Shared utilities for integration tests
#![allow(dead_code)]

use bernoulli_core::{Block, BoundExecutor, ExecutionPlan, ScalarExecutor};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const SEED: u64 = 0x5EED_B175;

/// Probabilities that exercise short, long and reflected plans
pub fn reference_probabilities() -> Vec<f64> {
    vec![
        0.0,   // All-AND plan
        0.25,  // Single AND
        0.5,   // Identity
        0.625, // Alternating NOT/AND
        0.75,  // Single reflection
        1.0,   // All-ones limit
        0.1,
        0.3,
        0.9,
        1e-4,
        0.999,
    ]
}

/// Output buffer lengths around the usual chunking boundaries
pub fn edge_case_lengths() -> Vec<usize> {
    vec![0, 1, 2, 3, 4, 7, 8, 15, 16, 17, 63, 64, 100]
}

/// Seeded uniform random blocks
pub fn random_blocks(count: usize, seed: u64) -> Vec<Block> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            Block([
                rng.next_u64(),
                rng.next_u64(),
                rng.next_u64(),
                rng.next_u64(),
            ])
        })
        .collect()
}

/// Every backend that can be built in this configuration on this CPU
pub fn available_executors(plan: ExecutionPlan) -> Vec<BoundExecutor> {
    let mut executors = vec![BoundExecutor::Scalar(ScalarExecutor::new(plan))];

    #[cfg(all(target_arch = "x86_64", feature = "avx2"))]
    {
        if let Ok(avx2) = bernoulli_core::Avx2Executor::new(plan) {
            executors.push(BoundExecutor::Avx2(avx2));
        }
    }

    #[cfg(feature = "jit")]
    {
        use bernoulli_core::{InstructionSet, JitExecutor};
        executors.push(BoundExecutor::Jit(
            JitExecutor::new(plan, InstructionSet::General).expect("baseline codegen"),
        ));
        if let Ok(jit) = JitExecutor::new(plan, InstructionSet::Avx) {
            executors.push(BoundExecutor::Jit(jit));
        }
    }

    executors
}

/// Install a test subscriber so `RUST_LOG=debug` shows executor selection
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fraction of set bits across `blocks`
pub fn density(blocks: &[Block]) -> f64 {
    let ones: u64 = blocks.iter().map(|b| u64::from(b.count_ones())).sum();
    ones as f64 / (blocks.len() * bernoulli_core::BLOCK_BITS) as f64
}
