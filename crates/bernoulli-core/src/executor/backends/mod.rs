//! Concrete executor backends
//!
//! No Box, no dyn: each backend is a plain type holding its plan, and
//! [`BoundExecutor`](super::BoundExecutor) selects between them with a
//! single match.

pub mod avx2;
#[cfg(feature = "jit")]
pub mod jit;
pub mod scalar;

pub use avx2::Avx2Executor;
#[cfg(feature = "jit")]
pub use jit::JitExecutor;
pub use scalar::ScalarExecutor;
