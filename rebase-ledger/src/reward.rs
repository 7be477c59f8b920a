//! Reward lottery winner selection
//!
//! A recipient wins when the trailing bytes of its address equal the trailing
//! bytes of the current pseudo block hash.
//!
//! # Known weakness
//!
//! This is NOT a source of secure randomness. The pseudo block hash comes from
//! a seeded `StdRng`, so anyone who knows the seed (or observes one draw and
//! the draw count) can predict every winner and grind addresses to match.
//! Treat the lottery as a promotional side channel, never as a fairness
//! guarantee.

use crate::types::Address;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Width of a pseudo block hash
pub const BLOCK_HASH_LEN: usize = 32;

/// Deterministic stream of pseudo block hashes
#[derive(Debug, Clone)]
pub struct SeededEntropy {
    rng: StdRng,
    draws: u64,
}

impl SeededEntropy {
    /// Seed the stream with a caller-supplied value
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            draws: 0,
        }
    }

    /// Draw the next pseudo block hash
    pub fn next_block_hash(&mut self) -> [u8; BLOCK_HASH_LEN] {
        let mut hash = [0u8; BLOCK_HASH_LEN];
        self.rng.fill_bytes(&mut hash);
        self.draws += 1;
        hash
    }

    /// Number of hashes drawn so far
    pub fn draws(&self) -> u64 {
        self.draws
    }
}

/// Compare the trailing `match_bytes` of `block_hash` and `account`
///
/// `match_bytes` is clamped to `1..=20`. An all-zero hash (no draw yet) never
/// selects anyone.
pub fn is_winner(block_hash: &[u8; BLOCK_HASH_LEN], account: &Address, match_bytes: usize) -> bool {
    if block_hash.iter().all(|b| *b == 0) {
        return false;
    }

    let width = match_bytes.clamp(1, 20);
    let hash_tail = &block_hash[BLOCK_HASH_LEN - width..];
    let account_tail = &account.as_bytes()[20 - width..];

    hash_tail == account_tail
}
