//! Execution plans and the fixed-width blocks they operate on
//!
//! An [`ExecutionPlan`] is the compiled form of a target probability: a
//! short sequence of boolean opcodes applied lane-wise to 256-bit blocks of
//! uniform random bits. Every backend reads blocks through the same
//! [`Block`] type, so the grouping of source words into blocks is identical
//! regardless of which executor evaluates the plan.

use crate::error::{Error, Result};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Maximum number of opcodes in a plan
pub const MAX_PRECISION: usize = 64;

/// Width of one block in bytes
pub const BLOCK_SIZE: usize = 32;

/// Width of one block in bits
pub const BLOCK_BITS: usize = BLOCK_SIZE * 8;

/// Number of 64-bit words in one block
pub const WORDS_PER_BLOCK: usize = BLOCK_SIZE / std::mem::size_of::<u64>();

/// Boolean opcode applied to the accumulator block
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Complement the accumulator; consumes no source block
    Not = 0,
    /// AND the accumulator with the next source block
    And = 1,
    /// OR the accumulator with the next source block
    Or = 2,
}

impl Op {
    /// Whether this opcode reads a fresh source block
    #[inline]
    pub fn consumes_block(self) -> bool {
        !matches!(self, Op::Not)
    }
}

/// 256 bits of sample data, aligned for aligned vector loads
///
/// Each bit position is an independent lane: a plan is evaluated once per
/// lane, in parallel across the whole block.
#[repr(C, align(32))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block(pub [u64; WORDS_PER_BLOCK]);

// Safety: Block is a plain array of u64 with size == alignment == 32, so it
// has no padding and every bit pattern is valid.
unsafe impl Zeroable for Block {}
// Safety: see above.
unsafe impl Pod for Block {}

impl Block {
    /// All lanes cleared
    pub const ZERO: Block = Block([0; WORDS_PER_BLOCK]);

    /// All lanes set
    pub const ONES: Block = Block([u64::MAX; WORDS_PER_BLOCK]);

    /// Block with every word set to `word`
    #[inline]
    pub const fn splat(word: u64) -> Self {
        Block([word; WORDS_PER_BLOCK])
    }

    /// Number of set lanes
    #[inline]
    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }
}

impl Not for Block {
    type Output = Block;

    #[inline(always)]
    fn not(self) -> Block {
        let [a, b, c, d] = self.0;
        Block([!a, !b, !c, !d])
    }
}

impl BitAnd for Block {
    type Output = Block;

    #[inline(always)]
    fn bitand(self, rhs: Block) -> Block {
        let [a, b, c, d] = self.0;
        let [e, f, g, h] = rhs.0;
        Block([a & e, b & f, c & g, d & h])
    }
}

impl BitOr for Block {
    type Output = Block;

    #[inline(always)]
    fn bitor(self, rhs: Block) -> Block {
        let [a, b, c, d] = self.0;
        let [e, f, g, h] = rhs.0;
        Block([a | e, b | f, c | g, d | h])
    }
}

/// Compiled boolean circuit approximating a target probability
///
/// Opcodes are stored in evaluation order: the accumulator starts as the
/// first source block and the opcodes are applied front to back. The plan is
/// immutable once built.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "PlanRepr", try_from = "PlanRepr")]
pub struct ExecutionPlan {
    ops: [Op; MAX_PRECISION],
    op_count: usize,
    source_block_count: usize,
}

impl ExecutionPlan {
    /// Plan that copies its single source block unchanged (p = 0.5)
    pub const fn identity() -> Self {
        Self {
            ops: [Op::And; MAX_PRECISION],
            op_count: 0,
            source_block_count: 1,
        }
    }

    /// Build a plan from opcodes in evaluation order
    ///
    /// The source block count is derived from the opcodes, so the
    /// `1 + #And + #Or` invariant holds by construction.
    pub fn from_ops(ops: &[Op]) -> Result<Self> {
        if ops.len() > MAX_PRECISION {
            return Err(Error::InvalidInput(format!(
                "Plan has {} opcodes, at most {MAX_PRECISION} allowed",
                ops.len()
            )));
        }

        let mut plan = Self::identity();
        plan.ops[..ops.len()].copy_from_slice(ops);
        plan.op_count = ops.len();
        plan.source_block_count = 1 + ops.iter().filter(|op| op.consumes_block()).count();
        Ok(plan)
    }

    /// Opcodes in evaluation order
    #[inline]
    pub fn operations(&self) -> &[Op] {
        &self.ops[..self.op_count]
    }

    /// Number of valid opcodes
    #[inline]
    pub fn op_count(&self) -> usize {
        self.op_count
    }

    /// Source blocks consumed per output block
    #[inline]
    pub fn source_block_count(&self) -> usize {
        self.source_block_count
    }

    /// Whether the plan passes its input through unchanged
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.op_count == 0
    }

    /// Exact probability realised by the circuit on fair, independent bits
    pub fn probability(&self) -> f64 {
        self.operations().iter().fold(0.5, |p, op| match op {
            Op::Not => 1.0 - p,
            Op::And => 0.5 * p,
            Op::Or => 0.5 * (1.0 + p),
        })
    }

    /// Output blocks needed to hold `nobits` sampled bits
    #[inline]
    pub fn output_blocks(nobits: usize) -> usize {
        nobits.div_ceil(BLOCK_BITS)
    }

    /// Destination buffer size in bytes for `nobits` sampled bits
    ///
    /// `nobits` is rounded up to the next multiple of 256.
    #[inline]
    pub fn required_destination_bytes(nobits: usize) -> usize {
        Self::output_blocks(nobits) * BLOCK_SIZE
    }

    /// Source buffer size in bytes for `nobits` sampled bits
    #[inline]
    pub fn required_source_bytes(&self, nobits: usize) -> usize {
        Self::required_destination_bytes(nobits) * self.source_block_count
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("operations", &self.operations())
            .field("op_count", &self.op_count)
            .field("source_block_count", &self.source_block_count)
            .finish()
    }
}

/// Renders the circuit as a formula over input bits `b0, b1, ...`
impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("b0");
        let mut depth = 0;
        for op in self.operations() {
            if depth != 0 {
                out = format!("({out})");
            }
            out = match op {
                Op::Not => format!("not {out}"),
                Op::And => {
                    depth += 1;
                    format!("b{depth} and {out}")
                }
                Op::Or => {
                    depth += 1;
                    format!("b{depth} or {out}")
                }
            };
        }
        f.write_str(&out)
    }
}

/// Serialized form of a plan; the block count is re-derived on load
#[derive(Serialize, Deserialize)]
struct PlanRepr {
    operations: Vec<Op>,
}

impl From<ExecutionPlan> for PlanRepr {
    fn from(plan: ExecutionPlan) -> Self {
        Self {
            operations: plan.operations().to_vec(),
        }
    }
}

impl TryFrom<PlanRepr> for ExecutionPlan {
    type Error = Error;

    fn try_from(repr: PlanRepr) -> Result<Self> {
        ExecutionPlan::from_ops(&repr.operations)
    }
}
