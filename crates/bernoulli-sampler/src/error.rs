//! Error types for buffer validation and sampling

use thiserror::Error;

/// Errors that can occur while sampling
#[derive(Error, Debug)]
pub enum Error {
    /// Buffer does not start on a 16-byte boundary
    #[error("Buffer address {address:#x} is not 16-byte aligned")]
    WrongPointerAlignment { address: usize },

    /// Buffer length is not a multiple of 16 bytes
    #[error("Buffer size {size} is not a multiple of 16 bytes")]
    WrongSizeAlignment { size: usize },

    /// Buffer shape does not fit the plan
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Quantization or executor construction failed
    #[error("Core error: {0}")]
    Core(#[from] bernoulli_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::WrongPointerAlignment { address: 0x1004 };
        assert_eq!(err.to_string(), "Buffer address 0x1004 is not 16-byte aligned");

        let err = Error::WrongSizeAlignment { size: 33 };
        assert_eq!(err.to_string(), "Buffer size 33 is not a multiple of 16 bytes");
    }

    #[test]
    fn test_core_errors_convert() {
        let core = bernoulli_core::Error::Unsupported(bernoulli_core::InstructionSet::Mmx);
        let err: Error = core.into();
        assert!(matches!(err, Error::Core(_)));
        assert_eq!(err.to_string(), "Core error: Unsupported instruction set: mmx");
    }
}
