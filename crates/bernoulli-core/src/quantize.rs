//! Probability quantization by bisection with reflection
//!
//! Each bisection step gains one bit of fixed-point precision by ANDing the
//! accumulator with a fresh uniform bit, which halves the probability mass it
//! can represent. When the target lies in the upper half of the bracket the
//! problem is reflected into its complement first and a NOT is recorded.
//! Opcodes are produced outermost-first and reversed once at the end into
//! evaluation order.

use crate::error::{Error, Result};
use crate::plan::{ExecutionPlan, Op, MAX_PRECISION};
use tracing::debug;

/// Compile `(probability, tolerance)` into an execution plan
///
/// Succeeds once the bisection bracket is within `tolerance` of the target on
/// both sides, or the target sits exactly on a bisection midpoint. Fails with
/// [`Error::Unsatisfiable`] when the opcode budget runs out first.
///
/// # Examples
///
/// ```rust
/// use bernoulli_core::{quantize, Op};
///
/// let plan = quantize(0.75, 1e-6).unwrap();
/// assert_eq!(plan.operations(), &[Op::And, Op::Not]);
/// assert_eq!(plan.source_block_count(), 2);
/// ```
pub fn quantize(probability: f64, tolerance: f64) -> Result<ExecutionPlan> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(Error::invalid_probability(probability));
    }
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(Error::invalid_tolerance(tolerance));
    }

    let mut ops = [Op::And; MAX_PRECISION];
    let mut n_ops = 0;
    let mut prob = probability;
    let (mut lhs, mut rhs) = (0.0_f64, 1.0_f64);

    // A step may record two opcodes, so keep two slots in reserve.
    while n_ops + 1 < MAX_PRECISION {
        let mid = lhs + 0.5 * (rhs - lhs);

        if (prob - lhs <= tolerance && rhs - prob <= tolerance) || mid == prob {
            ops[..n_ops].reverse();
            let plan = ExecutionPlan::from_ops(&ops[..n_ops])?;
            debug!(
                probability,
                tolerance,
                op_count = plan.op_count(),
                realised = plan.probability(),
                "quantized probability"
            );
            return Ok(plan);
        }

        if prob > mid {
            ops[n_ops] = Op::Not;
            n_ops += 1;
            prob = 1.0 - prob;
            lhs = 1.0 - rhs;
            rhs = 1.0 - mid;
        } else {
            rhs = mid;
        }

        ops[n_ops] = Op::And;
        n_ops += 1;
    }

    debug!(probability, tolerance, "opcode budget exhausted");
    Err(Error::Unsatisfiable {
        probability,
        tolerance,
    })
}
