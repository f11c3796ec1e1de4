//! Random round targets
//!
//! Targets are drawn by rejection sampling: shuffle the catalog, take a random
//! number of cards from the front and keep the draw if it is legal. With the
//! fixed 12-card catalog and at most 4 cards the rejected fraction is small,
//! so a draw almost always succeeds within a handful of attempts.

use crate::error::GenerateError;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{is_legal_target, Card, LegalityOptions};
use std::collections::BTreeSet;

/// Upper bound on draws before giving up on a catalog
pub const MAX_ATTEMPTS: u32 = 10_000;

/// Draws a legal target of `min..=max` cards from `catalog`
pub fn random_target<R: Rng + ?Sized>(
    catalog: &[Card],
    min: usize,
    max: usize,
    options: LegalityOptions,
    rng: &mut R,
) -> Result<BTreeSet<Card>, GenerateError> {
    if catalog.is_empty() {
        return Err(GenerateError::EmptyCatalog);
    }
    if min > max || max > catalog.len() {
        return Err(GenerateError::Bounds {
            min,
            max,
            available: catalog.len(),
        });
    }

    let mut deck = catalog.to_vec();
    for _ in 0..MAX_ATTEMPTS {
        deck.shuffle(rng);
        let count = rng.gen_range(min..=max);
        let chosen = &deck[..count];
        if is_legal_target(chosen, options) {
            return Ok(chosen.iter().copied().collect());
        }
    }

    Err(GenerateError::Exhausted(MAX_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio_test::assert_err;

    #[test]
    fn test_targets_respect_bounds_and_legality() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let target =
                random_target(&Card::ALL, 2, 4, LegalityOptions::default(), &mut rng).unwrap();
            assert!((2..=4).contains(&target.len()));
            assert!(is_legal_target(&target, LegalityOptions::default()));
        }
    }

    #[test]
    fn test_fixed_size_targets() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let target =
                random_target(&Card::ALL, 3, 3, LegalityOptions::default(), &mut rng).unwrap();
            assert_eq!(target.len(), 3);
        }
    }

    #[test]
    fn test_strict_targets_avoid_grey_triples() {
        let strict = LegalityOptions {
            allow_black_mix: false,
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let target = random_target(&Card::ALL, 3, 4, strict, &mut rng).unwrap();
            assert!(is_legal_target(&target, strict));
        }
    }

    #[test]
    fn test_all_sizes_are_reachable() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = BTreeSet::new();
        for _ in 0..500 {
            let target =
                random_target(&Card::ALL, 2, 4, LegalityOptions::default(), &mut rng).unwrap();
            seen.insert(target.len());
        }
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_empty_catalog_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = random_target(&[], 2, 4, LegalityOptions::default(), &mut rng);
        assert_eq!(assert_err!(result), GenerateError::EmptyCatalog);
    }

    #[test]
    fn test_impossible_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = random_target(&Card::ALL[..3], 2, 4, LegalityOptions::default(), &mut rng);
        assert_eq!(
            assert_err!(result),
            GenerateError::Bounds {
                min: 2,
                max: 4,
                available: 3
            }
        );

        let result = random_target(&Card::ALL, 4, 2, LegalityOptions::default(), &mut rng);
        assert!(matches!(result, Err(GenerateError::Bounds { .. })));
    }

    #[test]
    fn test_gives_up_on_hopeless_catalog() {
        let mut rng = StdRng::seed_from_u64(1);
        let catalog = [Card::K10, Card::K30, Card::K60, Card::C10];
        let result = random_target(&catalog, 4, 4, LegalityOptions::default(), &mut rng);
        assert_eq!(assert_err!(result), GenerateError::Exhausted(MAX_ATTEMPTS));
    }
}
