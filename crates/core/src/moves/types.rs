//! Move and undo-token value types, castling rights bookkeeping

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color, File, PieceId, PieceKind, Square};
use crate::error::{Error, Result};

/// Which wing a castling move goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastleSide {
    King,
    Queen,
}

impl CastleSide {
    /// File the king ends up on (fixed in both standard and Chess960).
    pub fn king_target_file(&self) -> File {
        match self {
            CastleSide::King => File::G,
            CastleSide::Queen => File::C,
        }
    }

    /// File the rook ends up on.
    pub fn rook_target_file(&self) -> File {
        match self {
            CastleSide::King => File::F,
            CastleSide::Queen => File::D,
        }
    }
}

/// Castling eligibility per color and wing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white_king: bool,
    pub white_queen: bool,
    pub black_king: bool,
    pub black_queen: bool,
}

impl CastlingRights {
    pub fn all() -> CastlingRights {
        CastlingRights {
            white_king: true,
            white_queen: true,
            black_king: true,
            black_queen: true,
        }
    }

    pub fn none() -> CastlingRights {
        CastlingRights {
            white_king: false,
            white_queen: false,
            black_king: false,
            black_queen: false,
        }
    }

    pub fn has(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_king,
            (Color::White, CastleSide::Queen) => self.white_queen,
            (Color::Black, CastleSide::King) => self.black_king,
            (Color::Black, CastleSide::Queen) => self.black_queen,
        }
    }

    pub fn revoke(&mut self, color: Color, side: CastleSide) {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_king = false,
            (Color::White, CastleSide::Queen) => self.white_queen = false,
            (Color::Black, CastleSide::King) => self.black_king = false,
            (Color::Black, CastleSide::Queen) => self.black_queen = false,
        }
    }

    pub fn revoke_all(&mut self, color: Color) {
        self.revoke(color, CastleSide::King);
        self.revoke(color, CastleSide::Queen);
    }

    /// FEN castling field, flags in the fixed K/Q/k/q order, "-" if none.
    pub fn fen(&self) -> String {
        let mut out = String::new();
        if self.white_king {
            out.push('K');
        }
        if self.white_queen {
            out.push('Q');
        }
        if self.black_king {
            out.push('k');
        }
        if self.black_queen {
            out.push('q');
        }
        if out.is_empty() {
            out.push('-');
        }
        out
    }

    pub fn from_fen(field: &str) -> Result<CastlingRights> {
        let mut rights = CastlingRights::none();
        if field == "-" {
            return Ok(rights);
        }
        for c in field.chars() {
            match c {
                'K' => rights.white_king = true,
                'Q' => rights.white_queen = true,
                'k' => rights.black_king = true,
                'q' => rights.black_queen = true,
                _ => {
                    return Err(Error::InvalidFen(format!(
                        "bad castling field {:?}",
                        field
                    )))
                }
            }
        }
        Ok(rights)
    }
}

/// A castling move's rook leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Castle {
    pub side: CastleSide,
    pub rook_from: Square,
}

/// A fully resolved move, ready to apply. For castling, `from`/`to` are
/// the king's squares and the rook leg rides in `castle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    /// Square of the captured piece; differs from `to` for en passant.
    pub capture: Option<Square>,
    pub promotion: Option<PieceKind>,
    pub castle: Option<Castle>,
}

impl Move {
    pub fn plain(from: Square, to: Square) -> Move {
        Move {
            from,
            to,
            capture: None,
            promotion: None,
            castle: None,
        }
    }

    /// Coordinate notation, e.g. "e2e4" or "e7e8q".
    pub fn coordinate(&self) -> String {
        let mut out = format!("{}{}", self.from.notation(), self.to.notation());
        if let Some(kind) = self.promotion {
            out.push(kind.fen_char(Color::Black));
        }
        out
    }
}

/// Everything needed to restore the board to the byte-for-byte state it
/// had before the corresponding [`Board::apply`] call.
#[derive(Debug, Clone, Copy)]
pub struct Undo {
    mover: PieceId,
    from: Square,
    to: Square,
    mover_had_moved: bool,
    kind_before: PieceKind,
    captured: Option<(Square, PieceId)>,
    rook: Option<RookUndo>,
}

#[derive(Debug, Clone, Copy)]
struct RookUndo {
    rook: PieceId,
    from: Square,
    to: Square,
    had_moved: bool,
}

impl Board {
    /// Applies a resolved move and returns the undo token. The move must
    /// have been produced against this exact board state.
    pub fn apply(&mut self, mv: &Move) -> Undo {
        let mover = self.at(mv.from).expect("move source must be occupied");
        let mover_had_moved = self.piece(mover).moved;
        let kind_before = self.piece(mover).kind;

        let captured = mv.capture.map(|sq| {
            let victim = self.at(sq).expect("capture square must be occupied");
            self.set_cell(sq, None);
            (sq, victim)
        });

        // Lift both castling participants before placing either; in
        // Chess960 the king may land on the rook's square or vice versa.
        let rook = mv.castle.map(|c| {
            let rook = self.at(c.rook_from).expect("castling rook must be present");
            let had_moved = self.piece(rook).moved;
            self.set_cell(c.rook_from, None);
            (c, rook, had_moved)
        });

        self.set_cell(mv.from, None);
        self.set_cell(mv.to, Some(mover));
        self.piece_mut(mover).moved = true;

        if let Some(kind) = mv.promotion {
            self.piece_mut(mover).kind = kind;
        }

        let rook = rook.map(|(c, rook, had_moved)| {
            let rook_to = Square::new(c.side.rook_target_file(), mv.from.rank());
            self.set_cell(rook_to, Some(rook));
            self.piece_mut(rook).moved = true;
            RookUndo {
                rook,
                from: c.rook_from,
                to: rook_to,
                had_moved,
            }
        });

        Undo {
            mover,
            from: mv.from,
            to: mv.to,
            mover_had_moved,
            kind_before,
            captured,
            rook,
        }
    }

    /// Reverts a move applied with [`Board::apply`]. Restores cells,
    /// moved flags, promotion kind and any captured piece.
    pub fn revert(&mut self, undo: Undo) {
        if let Some(r) = undo.rook {
            self.set_cell(r.to, None);
        }

        self.set_cell(undo.to, None);
        self.set_cell(undo.from, Some(undo.mover));
        self.piece_mut(undo.mover).moved = undo.mover_had_moved;
        self.piece_mut(undo.mover).kind = undo.kind_before;

        if let Some(r) = undo.rook {
            self.set_cell(r.from, Some(r.rook));
            self.piece_mut(r.rook).moved = r.had_moved;
        }

        if let Some((sq, victim)) = undo.captured {
            self.set_cell(sq, Some(victim));
        }
    }
}
