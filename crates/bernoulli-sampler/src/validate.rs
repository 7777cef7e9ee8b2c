//! Buffer validation and sizing helpers

use crate::error::{Error, Result};
use bernoulli_core::ExecutionPlan;

/// Minimum alignment of caller-provided byte buffers
pub const ALIGNMENT: usize = 16;

/// Check that `bytes` starts and ends on a 16-byte boundary
pub fn validate(bytes: &[u8]) -> Result<()> {
    let address = bytes.as_ptr() as usize;
    if address % ALIGNMENT != 0 {
        return Err(Error::WrongPointerAlignment { address });
    }
    if bytes.len() % ALIGNMENT != 0 {
        return Err(Error::WrongSizeAlignment { size: bytes.len() });
    }
    Ok(())
}

/// Bytes needed to hold `nobits` sampled bits, rounded up to whole blocks
#[inline]
pub fn buffer_size(nobits: usize) -> usize {
    ExecutionPlan::required_destination_bytes(nobits)
}
