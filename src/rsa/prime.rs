// Prime Generation
// Miller-Rabin primality test and random prime search

use num_integer::Integer;
use num_traits::One;

use super::bigint::{pow_mod, reserve_bits, RsaBigInt};
use super::cancel::CancelToken;
use super::error::{RsaError, RsaResult};
use super::random::RandState;

/// Miller-Rabin primality test
/// Returns true if n is probably prime; a composite survives `iters`
/// rounds with probability at most 4^-iters.
///
/// n < 2 is composite.
pub fn is_prime(n: &RsaBigInt, iters: u64, rng: &mut RandState) -> bool {
    let two = RsaBigInt::from(2u8);
    if n < &two {
        return false;
    }
    if n == &two || n == &RsaBigInt::from(3u8) {
        return true;
    }
    if n.is_even() {
        return false;
    }

    // Write n-1 as r * 2^s with r odd
    let n_minus_one = n - 1u8;
    let mut r = n_minus_one.clone();
    let mut s = 0u64;
    while r.is_even() {
        r >>= 1;
        s += 1;
    }

    // witnesses come from [2, n-2]
    let witness_span = n - 3u8;

    for _ in 0..iters {
        let a = rng.random_below(&witness_span) + 2u8;
        let mut y = pow_mod(&a, &r, n);

        if y.is_one() || y == n_minus_one {
            continue;
        }

        let mut j = 1;
        while j < s && y != n_minus_one {
            y = pow_mod(&y, &two, n);
            // nontrivial square root of 1
            if y.is_one() {
                return false;
            }
            j += 1;
        }

        if y != n_minus_one {
            return false;
        }
    }

    true
}

/// Generate a random probable prime of exactly `bits` bits
pub fn make_prime(bits: u64, iters: u64, rng: &mut RandState) -> RsaResult<RsaBigInt> {
    make_prime_cancellable(bits, iters, rng, &CancelToken::new())
}

/// [`make_prime`] that gives up with [`RsaError::Cancelled`] once `cancel` fires.
///
/// The search is unbounded. A random `bits`-bit integer is prime with
/// probability about 1/(bits * ln 2), so the expected number of draws grows
/// linearly in `bits` and long runs are vanishingly unlikely.
pub fn make_prime_cancellable(
    bits: u64,
    iters: u64,
    rng: &mut RandState,
    cancel: &CancelToken,
) -> RsaResult<RsaBigInt> {
    if bits < 2 {
        return Err(RsaError::InvalidParameter(format!(
            "prime bit length must be at least 2, got {}",
            bits
        )));
    }
    reserve_bits(bits)?;

    let top_bit = RsaBigInt::one() << (bits - 1);
    let mut attempts = 0u64;

    loop {
        cancel.check()?;
        attempts += 1;

        let candidate = rng.random_bits(bits) | &top_bit;
        if is_prime(&candidate, iters, rng) {
            log::trace!("found {}-bit prime after {} candidates", bits, attempts);
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::from_u64;
    use num_traits::Zero;

    #[test]
    fn test_is_prime_small() {
        let mut rng = RandState::new(1);
        // 2 is prime
        assert!(is_prime(&from_u64(2), 5, &mut rng));
        // 3 is prime
        assert!(is_prime(&from_u64(3), 5, &mut rng));
        // 5 is prime, smallest with a witness range
        assert!(is_prime(&from_u64(5), 5, &mut rng));
        // 7 is prime
        assert!(is_prime(&from_u64(7), 5, &mut rng));
        // 4 is not prime
        assert!(!is_prime(&from_u64(4), 5, &mut rng));
        // 9 is not prime
        assert!(!is_prime(&from_u64(9), 5, &mut rng));
    }

    #[test]
    fn test_is_prime_below_two() {
        let mut rng = RandState::new(1);
        assert!(!is_prime(&RsaBigInt::zero(), 10, &mut rng));
        assert!(!is_prime(&RsaBigInt::one(), 10, &mut rng));
    }

    #[test]
    fn test_known_values_across_rounds() {
        let mut rng = RandState::new(99);
        for iters in [1, 10, 50] {
            assert!(is_prime(&from_u64(7919), iters, &mut rng));
            assert!(is_prime(&from_u64(104_729), iters, &mut rng));
            assert!(is_prime(&from_u64(2_147_483_647), iters, &mut rng));

            // Carmichael numbers
            for c in [561u64, 1105, 1729, 2465, 2821, 6601] {
                assert!(!is_prime(&from_u64(c), iters, &mut rng), "{} with {} rounds", c, iters);
            }
        }
    }

    #[test]
    fn test_agrees_with_trial_division() {
        let mut rng = RandState::new(3);
        for n in 0..2000u64 {
            let expected = n >= 2 && (2..n).take_while(|d| d * d <= n).all(|d| n % d != 0);
            assert_eq!(is_prime(&from_u64(n), 20, &mut rng), expected, "n = {}", n);
        }
    }

    #[test]
    fn test_make_prime() {
        let mut rng = RandState::new(2024);
        let p = make_prime(256, 50, &mut rng).unwrap();
        assert!(p.bits() == 255 || p.bits() == 256);
        assert!(is_prime(&p, 50, &mut rng));
    }

    #[test]
    fn test_make_prime_small_bits() {
        let mut rng = RandState::new(5);
        for bits in 2..12u64 {
            let p = make_prime(bits, 20, &mut rng).unwrap();
            assert_eq!(p.bits(), bits);
            assert!(is_prime(&p, 20, &mut rng));
        }
        assert!(matches!(
            make_prime(1, 20, &mut rng),
            Err(RsaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_make_prime_huge_bits() {
        let mut rng = RandState::new(5);
        assert!(matches!(
            make_prime(1 << 62, 1, &mut rng),
            Err(RsaError::AllocationFailure { .. })
        ));
    }

    #[test]
    fn test_make_prime_cancelled() {
        let mut rng = RandState::new(5);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            make_prime_cancellable(512, 20, &mut rng, &cancel),
            Err(RsaError::Cancelled)
        ));
    }
}
