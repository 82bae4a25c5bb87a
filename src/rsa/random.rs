// Random State
// Seeded random source handed by reference to everything that needs randomness

use num_bigint::RandBigInt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::bigint::RsaBigInt;

/// Owned, explicitly seeded random generator.
///
/// One instance lives for the duration of a command and is dropped at its
/// end. It is not `Sync`-shared; callers that need it from several threads
/// must synchronize externally.
#[derive(Debug)]
pub struct RandState {
    rng: StdRng,
}

impl RandState {
    /// Initialize the generator from `seed`. Equal seeds give equal streams.
    pub fn new(seed: u64) -> Self {
        log::trace!("random state seeded with {}", seed);
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform integer in [0, 2^bits)
    pub fn random_bits(&mut self, bits: u64) -> RsaBigInt {
        self.rng.gen_biguint(bits)
    }

    /// Uniform integer in [0, bound). `bound` must be non-zero.
    pub fn random_below(&mut self, bound: &RsaBigInt) -> RsaBigInt {
        self.rng.gen_biguint_below(bound)
    }

    /// Uniform u64 in [0, bound). `bound` must be non-zero.
    pub fn random_below_u64(&mut self, bound: u64) -> u64 {
        self.rng.gen_range(0..bound)
    }
}
