//! Error types for plan construction and executor binding
//!
//! Every failure in this crate happens at construction time. Once an
//! executor exists, running it cannot fail.

use crate::executor::InstructionSet;
use thiserror::Error;

/// Core error type for quantization and executor construction
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tolerance cannot be reached within the opcode budget
    #[error("Probability {probability} cannot be quantized within tolerance {tolerance}")]
    Unsatisfiable { probability: f64, tolerance: f64 },

    /// Instruction set is recognised but has no backend
    #[error("Unsupported instruction set: {0}")]
    Unsupported(InstructionSet),

    /// Backend not compiled in or not supported by this CPU
    #[error("Feature not available: {0}")]
    FeatureNotAvailable(String),

    /// IR construction, verification or finalisation failed
    #[error("Code generation failed: {0:#}")]
    Codegen(anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for a probability outside [0, 1]
    pub fn invalid_probability(p: f64) -> Self {
        Self::InvalidParameter(format!("Probability {p} must be in [0, 1]"))
    }

    /// Create an error for a non-positive tolerance
    pub fn invalid_tolerance(tol: f64) -> Self {
        Self::InvalidParameter(format!("Tolerance {tol} must be positive and finite"))
    }
}
