use crate::cards::Card;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Cards dealt to each player at the start of a match.
pub const HAND_SIZE: usize = 5;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DealError {
    #[error("catalog has {available} cards, cannot deal {requested}")]
    InsufficientCatalog { requested: usize, available: usize },
}

/// Draw `size` distinct cards from `catalog` using the provided RNG.
///
/// Repetition is only excluded within the returned hand; the catalog itself
/// is shared by every player and match.
///
/// ```
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use triad_rs::cards::{CardCatalog, Catalog};
/// use triad_rs::deck::{deal, HAND_SIZE};
///
/// let catalog = Catalog::starter();
/// let mut rng = ChaCha8Rng::seed_from_u64(7);
/// let hand = deal(catalog.all_cards(), HAND_SIZE, &mut rng).unwrap();
/// assert_eq!(hand.len(), 5);
/// ```
pub fn deal<R: Rng + ?Sized>(
    catalog: &[Card],
    size: usize,
    rng: &mut R,
) -> Result<Vec<Card>, DealError> {
    if size > catalog.len() {
        return Err(DealError::InsufficientCatalog { requested: size, available: catalog.len() });
    }
    Ok(index::sample(rng, catalog.len(), size).into_iter().map(|i| catalog[i].clone()).collect())
}

/// Deal with a seeded RNG for reproducibility.
pub fn deal_seeded(catalog: &[Card], size: usize, seed: u64) -> Result<Vec<Card>, DealError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    deal(catalog, size, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardCatalog, Catalog};
    use std::collections::HashSet;

    #[test]
    fn seeded_deal_is_reproducible() {
        let catalog = Catalog::starter();
        let a = deal_seeded(catalog.all_cards(), HAND_SIZE, 42).unwrap();
        let b = deal_seeded(catalog.all_cards(), HAND_SIZE, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hand_has_no_duplicates() {
        let catalog = Catalog::starter();
        for seed in 0..50 {
            let hand = deal_seeded(catalog.all_cards(), HAND_SIZE, seed).unwrap();
            let ids: HashSet<_> = hand.iter().map(|c| c.id).collect();
            assert_eq!(ids.len(), HAND_SIZE);
        }
    }

    #[test]
    fn whole_catalog_can_be_dealt() {
        let catalog = Catalog::starter();
        let all = deal_seeded(catalog.all_cards(), catalog.len(), 1).unwrap();
        assert_eq!(all.len(), catalog.len());
    }

    #[test]
    fn oversized_request_fails() {
        let catalog = Catalog::starter();
        let cards = &catalog.all_cards()[..4];
        assert_eq!(
            deal_seeded(cards, HAND_SIZE, 0),
            Err(DealError::InsufficientCatalog { requested: 5, available: 4 })
        );
    }
}
