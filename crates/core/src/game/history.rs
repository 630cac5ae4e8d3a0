//! Immutable per-move history records and status snapshots

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::board::{Color, Square};
use crate::moves::CastlingRights;

/// Everything beyond piece placement that a move leaves behind: enough,
/// together with the record's FEN, to restore the game exactly for undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStatus {
    pub rights: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove: u32,
    /// Repetition table: position key → number of occurrences so far.
    pub positions: HashMap<String, u32>,
    #[serde(default)]
    pub white_ms: Option<u64>,
    #[serde(default)]
    pub black_ms: Option<u64>,
}

/// One completed turn (castling counts as one turn). Append-only and
/// immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Ply index, 0-based. Absent in old save files; repaired on load.
    #[serde(default)]
    pub index: u32,
    /// Mover color. Absent in old save files; repaired on load.
    #[serde(default)]
    pub color: Option<Color>,
    /// Coordinate notation, e.g. "e2e4" or "e7e8q".
    pub coordinate: String,
    pub san: String,
    pub lan: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
    /// Position after the move, full six-field FEN.
    pub fen_after: String,
    pub status: GameStatus,
}

/// Re-derives `index` and `color` from ply position for records loaded
/// from saves that predate those fields.
pub fn repair_records(records: &mut [MoveRecord], first_to_move: Color) {
    for (i, record) in records.iter_mut().enumerate() {
        record.index = i as u32;
        if record.color.is_none() {
            record.color = Some(if i % 2 == 0 {
                first_to_move
            } else {
                first_to_move.opponent()
            });
        }
    }
}
