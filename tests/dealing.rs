use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use triad_rs::cards::{Card, CardCatalog, CardId, Catalog, Element, Strengths};
use triad_rs::config::EngineConfig;
use triad_rs::deck::{deal, DealError, HAND_SIZE};
use triad_rs::service::{MatchService, SetupServiceError};
use triad_rs::store::MemoryStore;

fn catalog(n: u32) -> Catalog {
    Catalog::from_cards(
        (1..=n)
            .map(|i| {
                let strengths = Strengths::new(2, 2, 2, 2).unwrap();
                Card::new(CardId(i), format!("Card {i}"), strengths, Element::None, 1)
            })
            .collect(),
    )
    .unwrap()
}

#[test]
fn ten_card_catalog_deals_distinct_hands() {
    let catalog = catalog(10);
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    for _ in 0..200 {
        let hand = deal(catalog.all_cards(), HAND_SIZE, &mut rng).unwrap();
        let ids: HashSet<CardId> = hand.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), HAND_SIZE);
        assert!(ids.iter().all(|id| catalog.card_by_id(*id).is_some()));
    }
}

#[test]
fn every_card_eventually_shows_up() {
    let catalog = catalog(10);
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut seen = HashSet::new();
    for _ in 0..100 {
        let hand = deal(catalog.all_cards(), HAND_SIZE, &mut rng).unwrap();
        seen.extend(hand.into_iter().map(|c| c.id));
    }
    assert_eq!(seen.len(), 10);
}

#[test]
fn small_catalog_is_rejected() {
    let catalog = catalog(4);
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    assert_eq!(
        deal(catalog.all_cards(), HAND_SIZE, &mut rng),
        Err(DealError::InsufficientCatalog { requested: HAND_SIZE, available: 4 })
    );
}

#[test]
fn match_is_not_created_when_hands_cannot_be_dealt() {
    let svc = MatchService::new(MemoryStore::new(), catalog(4), &EngineConfig::default());
    let err = svc.create_match(&"ann".into(), Some(&"AI".into())).unwrap_err();
    assert!(matches!(err, SetupServiceError::Deal(DealError::InsufficientCatalog { .. })));
    assert_eq!(svc.store().match_count(), 0);
}

#[test]
fn same_seed_deals_same_opening_hands() {
    let config = EngineConfig::default().with_deal_seed(99);
    let a = MatchService::new(MemoryStore::new(), Catalog::starter(), &config);
    let b = MatchService::new(MemoryStore::new(), Catalog::starter(), &config);
    let ha = a.create_match(&"ann".into(), None).unwrap().hand;
    let hb = b.create_match(&"ann".into(), None).unwrap().hand;
    assert_eq!(ha, hb);
}
