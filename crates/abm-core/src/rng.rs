//! Deterministic per-person RNG and shard seed derivation.
//!
//! # Determinism strategy
//!
//! Each person gets an independent `SmallRng` seeded by:
//!
//!   seed = shard_seed XOR (person_id * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive person IDs uniformly across the seed space.
//! This means:
//!
//! - Persons never share RNG state, so draws are independent across persons
//!   and insensitive to processing order.
//! - Re-running a shard with the same master seed reproduces every draw.
//! - There is no ambient process-wide RNG anywhere in the simulator; every
//!   sampling call receives `&mut PersonRng` explicitly.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::PersonId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Derive the seed for one worker shard from the run's master seed.
///
/// Shard indices are small consecutive integers; the mixing multiply keeps
/// the derived seeds far apart.
#[inline]
pub fn shard_seed(master_seed: u64, shard_index: u64) -> u64 {
    master_seed ^ (shard_index + 1).wrapping_mul(MIXING_CONSTANT)
}

// ── PersonRng ─────────────────────────────────────────────────────────────────

/// Per-person deterministic RNG.
///
/// Created by the worker at the start of a person's simulation and passed by
/// mutable reference into every choice-model sampling call for that person.
pub struct PersonRng(SmallRng);

impl PersonRng {
    /// Seed deterministically from a shard seed and a person ID.
    pub fn new(shard_seed: u64, person: PersonId) -> Self {
        let seed = shard_seed ^ person.0.wrapping_mul(MIXING_CONSTANT);
        PersonRng(SmallRng::seed_from_u64(seed))
    }

    /// A uniform draw in `[0, 1)` — the input of cumulative-distribution
    /// sampling.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }
}
