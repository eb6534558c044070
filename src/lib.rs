//! triad-rs: Triple Triad match engine
//!
//! Goals:
//! - Many independent matches progressing safely under concurrent moves
//! - Pure, deterministic rules: validation, capture resolution, scoring
//! - No panics for invalid input; use `Result` for recoverable errors
//!
//! ## Quick start: play a move
//! ```
//! use triad_rs::cards::Catalog;
//! use triad_rs::config::EngineConfig;
//! use triad_rs::service::{MatchService, PlayRequest};
//! use triad_rs::store::MemoryStore;
//!
//! let svc = MatchService::new(MemoryStore::new(), Catalog::starter(), &EngineConfig::default());
//! let setup = svc.create_match(&"ann".into(), Some(&"AI".into())).unwrap();
//!
//! let req = PlayRequest {
//!     match_id: setup.record.id(),
//!     player: "ann".into(),
//!     card: setup.hand[0].id,
//!     x: 1,
//!     y: 1,
//! };
//! let report = svc.play_card(&req).unwrap();
//! assert_eq!(report.outcome.next_turn, Some("AI".into()));
//! assert_eq!(report.record.player1_score() + report.record.player2_score(), 10);
//! ```
//!
//! ## Headless driver
//! Run a batch of concurrent random matches with:
//! ```sh
//! cargo run --bin triad -- --matches 8 --seed 42
//! ```

pub mod board;
pub mod capture;
pub mod cards;
pub mod config;
pub mod coordinator;
pub mod deck;
pub mod engine;
pub mod game;
pub mod hand;
pub mod hub;
pub mod service;
pub mod store;
pub mod validate;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
