//! Versioned, compressed saved-game snapshots
//!
//! A save is a zstd-compressed JSON envelope of the full game: settings,
//! initial position and the per-move records with their status
//! snapshots. Loading replays the history and either reproduces the
//! game exactly or fails without exposing partial state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::board::Color;
use crate::error::{Error, Result};
use crate::game::{repair_records, Game, GameOutcome, GameSettings, GameState, MoveRecord};
use crate::notation;

/// Current envelope version. Version 1 predates per-record
/// `index`/`color` fields; those are repaired on load.
pub const SAVE_VERSION: u32 = 2;

fn legacy_version() -> u32 {
    1
}

/// The on-disk envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGame {
    #[serde(default = "legacy_version")]
    pub version: u32,
    pub settings: GameSettings,
    pub initial_fen: String,
    pub records: Vec<MoveRecord>,
    #[serde(default)]
    pub state: Option<GameState>,
    #[serde(default)]
    pub outcome: Option<GameOutcome>,
}

/// Serializes and compresses a game.
pub fn to_bytes(game: &Game) -> Result<Vec<u8>> {
    let saved = SavedGame {
        version: SAVE_VERSION,
        settings: game.settings().clone(),
        initial_fen: game.initial_fen().to_string(),
        records: game.records().to_vec(),
        state: Some(game.state()),
        outcome: game.outcome(),
    };
    let json = serde_json::to_vec(&saved)?;
    Ok(zstd::encode_all(json.as_slice(), 0)?)
}

/// Decompresses and restores a game. All-or-nothing: any replay or
/// integrity failure returns an error and no game.
pub fn from_bytes(bytes: &[u8]) -> Result<Game> {
    let json = zstd::decode_all(bytes)?;
    let saved: SavedGame = serde_json::from_slice(&json)?;
    restore(saved)
}

pub fn save_file<P: AsRef<Path>>(path: P, game: &Game) -> Result<()> {
    fs::write(path, to_bytes(game)?)?;
    Ok(())
}

pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Game> {
    from_bytes(&fs::read(path)?)
}

fn restore(mut saved: SavedGame) -> Result<Game> {
    if saved.version < SAVE_VERSION {
        debug!(version = saved.version, "upgrading legacy save");
    }
    let first_to_move = notation::parse_fen(&saved.initial_fen)?.turn;
    repair_records(&mut saved.records, first_to_move);

    let mut settings = saved.settings;
    settings.initial_fen = Some(saved.initial_fen.clone());
    let mut game = Game::new(settings)?;
    game.start();

    for record in &saved.records {
        let replayed = game.replay_move(&record.coordinate)?;
        if replayed.fen_after != record.fen_after {
            return Err(Error::Save(format!(
                "history mismatch at ply {}: {} != {}",
                record.index, replayed.fen_after, record.fen_after
            )));
        }
        if let Some(comment) = &record.comment {
            game.attach_comment_to_last(comment.clone());
        }
    }

    if let Some(last) = saved.records.last() {
        if let Some(ms) = last.status.white_ms {
            game.clocks_mut().set_remaining_ms(Color::White, ms);
        }
        if let Some(ms) = last.status.black_ms {
            game.clocks_mut().set_remaining_ms(Color::Black, ms);
        }
    }

    // Checkmate, stalemate and draws re-derive from the replay; a
    // timeout or a stop cannot and comes from the envelope.
    match (saved.state, saved.outcome) {
        (_, Some(GameOutcome::Timeout { winner })) if game.outcome().is_none() => {
            game.flag_timeout(winner.opponent());
        }
        (Some(GameState::Stopped), _) => game.stop(),
        _ => {}
    }

    Ok(game)
}
