//! Error types for chess-arbiter-core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-distinguishable reason code for a rejected move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveReason {
    /// Empty or whitespace-only move text
    EmptyInput,
    /// Text does not address valid squares
    BadNotation,
    /// No piece on the source square
    NoPieceOnSource,
    /// Source piece does not belong to the side to move
    WrongColor,
    /// Destination holds a piece of the mover's own color
    OwnPieceOnTarget,
    /// Move is not in the legal-move set (unreachable destination, or the
    /// king would be left attacked)
    NotLegal,
    /// Promotion letter is not one of N, B, R, Q
    BadPromotionPiece,
    /// Promotion suffix supplied on a move that is not a pawn reaching
    /// the last rank
    PromotionNotAllowed,
    /// Castling right missing, path blocked, or path attacked
    CannotCastle,
    /// The game is no longer in progress
    GameOver,
}

impl MoveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveReason::EmptyInput => "empty_input",
            MoveReason::BadNotation => "bad_notation",
            MoveReason::NoPieceOnSource => "no_piece_on_source",
            MoveReason::WrongColor => "wrong_color",
            MoveReason::OwnPieceOnTarget => "own_piece_on_target",
            MoveReason::NotLegal => "not_legal",
            MoveReason::BadPromotionPiece => "bad_promotion_piece",
            MoveReason::PromotionNotAllowed => "promotion_not_allowed",
            MoveReason::CannotCastle => "cannot_castle",
            MoveReason::GameOver => "game_over",
        }
    }
}

impl std::fmt::Display for MoveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid square notation: {0:?}")]
    InvalidNotation(String),

    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    /// A rejected move, carrying the offending text, a reason code and
    /// the FEN at the time of failure.
    #[error("invalid move {text:?} ({reason}) in position {fen}")]
    InvalidMove {
        text: String,
        reason: MoveReason,
        fen: String,
    },

    #[error("PGN parsing error: {0}")]
    Pgn(String),

    #[error("saved game error: {0}")]
    Save(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
