//! Players and the synchronous collaborator callbacks

use std::fmt;
use std::sync::Arc;

use crate::board::{Color, PieceKind, Square};
use crate::engine::{EnginePlayer, OpeningBook};

/// Context handed to a promotion chooser: the pawn move awaiting a
/// piece choice.
#[derive(Debug, Clone, Copy)]
pub struct PromotionContext {
    pub color: Color,
    pub from: Square,
    pub to: Square,
}

/// Chooses the promotion piece when a human move omits the letter.
pub trait PromotionChooser: Send + Sync {
    fn choose(&self, ctx: &PromotionContext) -> PieceKind;
}

/// Confirms that an ambiguous king move (Chess960: a one-step king move
/// onto a castling target) was meant as castling.
pub trait CastleConfirmer: Send + Sync {
    fn confirm(&self) -> bool;
}

/// A participant in the game. Closed set: the orchestrator matches on
/// the variant, there is no runtime type inspection.
#[derive(Clone)]
pub enum Player {
    Human {
        name: String,
    },
    Engine {
        name: String,
        handle: Arc<dyn EnginePlayer>,
        book: Option<Arc<dyn OpeningBook>>,
    },
}

impl Player {
    pub fn human(name: impl Into<String>) -> Player {
        Player::Human { name: name.into() }
    }

    pub fn engine(name: impl Into<String>, handle: Arc<dyn EnginePlayer>) -> Player {
        Player::Engine {
            name: name.into(),
            handle,
            book: None,
        }
    }

    pub fn engine_with_book(
        name: impl Into<String>,
        handle: Arc<dyn EnginePlayer>,
        book: Arc<dyn OpeningBook>,
    ) -> Player {
        Player::Engine {
            name: name.into(),
            handle,
            book: Some(book),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Player::Human { name } => name,
            Player::Engine { name, .. } => name,
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Player::Human { .. })
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Human { name } => write!(f, "Human({})", name),
            Player::Engine { name, book, .. } => {
                write!(f, "Engine({}, book: {})", name, book.is_some())
            }
        }
    }
}
