//! Unpacking of sampled blocks into individual bits

use bernoulli_core::{Block, BLOCK_BITS};

/// Unpack the first `nobits` bits of `blocks`, least significant bit first
///
/// Bit `k` is bit `k % 64` of 64-bit word `k / 64`, counting words across
/// block boundaries.
///
/// # Panics
/// Panics if `blocks` holds fewer than `nobits` bits.
pub fn expand(blocks: &[Block], nobits: usize) -> Vec<bool> {
    assert!(
        nobits <= blocks.len() * BLOCK_BITS,
        "requested {nobits} bits from {} blocks",
        blocks.len()
    );
    let words: &[u64] = bytemuck::cast_slice(blocks);
    (0..nobits)
        .map(|k| (words[k / 64] >> (k % 64)) & 1 == 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_bit_order() {
        let blocks = [Block([0b101, 0, 1 << 63, 0]), Block([1, 0, 0, 0])];
        let bits = expand(&blocks, 2 * BLOCK_BITS);
        assert_eq!(bits.len(), 512);
        assert!(bits[0] && !bits[1] && bits[2]);
        assert!(bits[2 * 64 + 63]);
        assert!(bits[256]);
        assert_eq!(bits.iter().filter(|&&b| b).count(), 4);
    }

    #[test]
    fn test_expand_truncates() {
        let bits = expand(&[Block::ONES], 10);
        assert_eq!(bits, vec![true; 10]);
        assert!(expand(&[], 0).is_empty());
    }

    #[test]
    #[should_panic(expected = "requested 257 bits from 1 blocks")]
    fn test_expand_rejects_overrun() {
        expand(&[Block::ZERO], 257);
    }
}
