//! Chess Arbiter Core Library
//!
//! A chess rules engine and game-session orchestrator: board and piece
//! model, full move legality (standard and Chess960), terminal-state
//! detection, FEN/SAN/PGN, and async coordination of human and engine
//! turns with clocks and speculative pondering. Move search itself is
//! delegated to an injected engine collaborator.

pub mod board;
pub mod engine;
pub mod error;
pub mod game;
pub mod moves;
pub mod notation;
pub mod pgn;
pub mod player;
pub mod storage;

pub use board::{Board, Color, Piece, PieceId, PieceKind, Shade, Square};
pub use error::{Error, MoveReason, Result};
pub use game::{
    DrawKind, Game, GameOutcome, GameSession, GameSettings, GameState, MoveRecord, SessionEvent,
};
pub use player::{CastleConfirmer, Player, PromotionChooser};
