//! Collaborator contracts for external engine players
//!
//! The core never speaks a wire protocol itself; a concrete adapter
//! (UCI, CECP, ...) implements [`EnginePlayer`] and is injected into the
//! session orchestrator.

mod book;

pub use book::{pick_weighted, BookMove, OpeningBook};

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// A position evaluation as reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn score (positive = white advantage)
    Centipawns(i32),
    /// Forced mate in N (positive = white mates, negative = black mates)
    Mate(i32),
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => {
                let score = *cp as f32 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            Evaluation::Mate(moves) => write!(f, "M{}", moves),
        }
    }
}

/// Cooperative cancellation source for a single in-flight search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Clock situation handed to the engine with a search request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockState {
    pub white_ms: u64,
    pub black_ms: u64,
    pub white_increment_ms: u64,
    pub black_increment_ms: u64,
}

/// Bounds on a search.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchLimits {
    pub depth: Option<u8>,
    pub max_time: Option<Duration>,
}

/// What a completed search returns: the move to play, and optionally
/// the reply the engine expects (the ponder suggestion).
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: String,
    pub ponder: Option<String>,
}

/// Free-form engine configuration, applied verbatim by the adapter.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions(HashMap<String, String>);

impl EngineOptions {
    pub fn new() -> EngineOptions {
        EngineOptions::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// The engine-player capability the orchestrator drives. Adapters own
/// the subprocess and the wire protocol; everything here is in terms of
/// FEN strings and coordinate moves.
#[async_trait]
pub trait EnginePlayer: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Positions the engine at `initial_fen` with `moves` played on top.
    async fn set_position(&self, initial_fen: &str, moves: &[String]) -> Result<()>;

    /// Searches for the best move under the given clocks and limits.
    /// Implementations poll `cancel` and return early when it fires.
    async fn best_move(
        &self,
        clocks: &ClockState,
        limits: &SearchLimits,
        cancel: CancelToken,
    ) -> Result<SearchOutcome>;

    /// Speculative search on the opponent's anticipated reply; returns
    /// the move the engine would answer with.
    async fn ponder(
        &self,
        initial_fen: &str,
        moves: &[String],
        cancel: CancelToken,
    ) -> Result<String>;

    /// Tells the engine a move was played on its behalf without search.
    async fn force_move(&self, mv: &str) -> Result<()>;

    /// Aborts the current search, if any.
    async fn stop_search(&self) -> Result<()>;

    async fn enter_analyze(&self) -> Result<()>;

    async fn exit_analyze(&self) -> Result<()>;

    /// One-off evaluation of an arbitrary position.
    async fn analyze(&self, fen: &str, depth: Option<u8>) -> Result<Evaluation>;

    async fn apply_options(&self, options: &EngineOptions) -> Result<()>;
}
