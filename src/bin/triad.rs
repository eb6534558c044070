//! Headless driver: plays a batch of concurrent matches with random legal
//! moves, two player threads per match.

use anyhow::{anyhow, Context};
use clap::Parser;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::path::PathBuf;
use std::thread;
use tracing::{info, warn};
use triad_rs::board::Position;
use triad_rs::cards::Catalog;
use triad_rs::config::EngineConfig;
use triad_rs::engine::MatchEngine;
use triad_rs::game::{MatchId, MatchStatus, MoveError, PlayerId};
use triad_rs::service::{MatchService, PlayError, PlayRequest};
use triad_rs::store::MemoryStore;

/// Run concurrent Triple Triad matches between random players
#[derive(Parser, Debug)]
#[command(name = "triad")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of matches to play at once
    #[arg(short, long, default_value = "4")]
    matches: usize,

    /// Seed for dealing and move selection (default: random)
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON card catalog (default: built-in starter set)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Lock wait per move in milliseconds
    #[arg(long)]
    lock_timeout_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = EngineConfig::from_env()?;
    if let Some(ms) = args.lock_timeout_ms {
        config.lock_timeout_ms = ms;
    }
    let seed = args.seed.or(config.deal_seed).unwrap_or_else(|| rand::rng().random());
    config.deal_seed = Some(seed);

    let catalog = match &args.catalog {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            Catalog::from_json(&raw)?
        }
        None => Catalog::starter(),
    };
    info!(version = triad_rs::VERSION, seed, cards = catalog.len(), "starting");

    let engine = MatchService::new(MemoryStore::new(), catalog, &config);
    let mut tables = Vec::with_capacity(args.matches);
    for i in 0..args.matches {
        let host = PlayerId::new(format!("p{i}-host"));
        let guest = PlayerId::new(format!("p{i}-guest"));
        let id = engine.create_match(&host, None)?.record.id();
        let events = engine.subscribe(id);
        engine.join_match(id, &guest)?;
        tables.push((id, [host, guest], events));
    }

    thread::scope(|s| -> anyhow::Result<()> {
        let mut handles = Vec::new();
        for (n, (id, players, _)) in tables.iter().enumerate() {
            for (k, player) in players.iter().enumerate() {
                let rng = ChaCha8Rng::seed_from_u64(seed ^ ((n as u64) << 1 | k as u64));
                let engine = &engine;
                handles.push(s.spawn(move || play_out(engine, *id, player, rng)));
            }
        }
        for h in handles {
            h.join().map_err(|_| anyhow!("player thread panicked"))??;
        }
        Ok(())
    })?;

    for (id, _, mut events) in tables {
        let view = engine.match_status(id)?;
        let r = &view.record;
        let mut received = 0;
        while events.try_recv().is_ok() {
            received += 1;
        }
        let winner = r.winner().map_or_else(|| "draw".to_string(), ToString::to_string);
        println!(
            "match {id}: {} {}-{} {} -> {winner} ({received} events)",
            r.player1(),
            r.player1_score(),
            r.player2_score(),
            r.player2().map_or("-", PlayerId::as_str),
        );
    }
    Ok(())
}

fn play_out<E: MatchEngine>(
    engine: &E,
    id: MatchId,
    me: &PlayerId,
    mut rng: ChaCha8Rng,
) -> anyhow::Result<()> {
    loop {
        let view = engine.match_status(id)?;
        if view.record.status() != MatchStatus::Active {
            return Ok(());
        }
        if view.record.current_turn() != Some(me) {
            thread::yield_now();
            continue;
        }

        let taken: HashSet<Position> = view.placements.iter().map(|p| p.position).collect();
        let free: Vec<Position> = Position::all().filter(|p| !taken.contains(p)).collect();
        let hand = engine.hand(id, me)?;
        let (Some(cell), Some(card)) = (free.choose(&mut rng), hand.choose(&mut rng)) else {
            return Err(anyhow!("{me} has no legal move in match {id}"));
        };

        let req = PlayRequest {
            match_id: id,
            player: me.clone(),
            card: card.id,
            x: cell.x(),
            y: cell.y(),
        };
        match engine.play_card(&req) {
            Ok(_) => {}
            Err(PlayError::Move(MoveError::NotYourTurn { .. } | MoveError::CellOccupied(_))) => {
                warn!(%id, player = %me, "stale view, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
}
