//! The 8×8 board: 64 cells over an arena of piece records

use rand::Rng;
use std::fmt;

use super::piece::{Color, Piece, PieceId, PieceKind};
use super::square::{File, Square, FILES};
use crate::error::{Error, Result};

/// An 8×8 board. Cells hold at most one piece identity; the pieces
/// themselves live in an arena so identity is stable for the whole game
/// (capture clears the cell but keeps the record, promotion mutates the
/// record's kind in place).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [Option<PieceId>; 64],
    arena: Vec<Piece>,
    /// Starting king files per color, needed to pick the castling rook
    /// in Chess960 (first unmoved rook outward of the king).
    king_files: [File; 2],
}

impl Board {
    /// A board with no pieces at all.
    pub fn empty() -> Board {
        Board {
            cells: [None; 64],
            arena: Vec::new(),
            king_files: [File::E, File::E],
        }
    }

    /// The standard starting position.
    pub fn standard() -> Board {
        Self::with_back_rank([
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ])
    }

    /// A Chess960 starting position, sampled uniformly over the 960
    /// arrangements: bishops on opposite shades, king strictly between
    /// the rooks, queen and knights on the remaining files.
    pub fn chess960<R: Rng>(rng: &mut R) -> Board {
        let mut rank: [Option<PieceKind>; 8] = [None; 8];

        // Opposite-shade bishops: one on an even file, one on an odd file.
        let even = rng.random_range(0..4) * 2;
        let odd = rng.random_range(0..4) * 2 + 1;
        rank[even] = Some(PieceKind::Bishop);
        rank[odd] = Some(PieceKind::Bishop);

        // Queen on one of the six free files.
        let mut free: Vec<usize> = (0..8).filter(|i| rank[*i].is_none()).collect();
        let q = free.remove(rng.random_range(0..free.len()));
        rank[q] = Some(PieceKind::Queen);

        // Knights on two of the remaining five.
        let n1 = free.remove(rng.random_range(0..free.len()));
        rank[n1] = Some(PieceKind::Knight);
        let n2 = free.remove(rng.random_range(0..free.len()));
        rank[n2] = Some(PieceKind::Knight);

        // The last three files get rook, king, rook; the king lands
        // strictly between the rooks by construction.
        free.sort_unstable();
        rank[free[0]] = Some(PieceKind::Rook);
        rank[free[1]] = Some(PieceKind::King);
        rank[free[2]] = Some(PieceKind::Rook);

        Self::with_back_rank(rank.map(|k| k.unwrap()))
    }

    fn with_back_rank(kinds: [PieceKind; 8]) -> Board {
        let mut board = Board::empty();
        for (i, kind) in kinds.into_iter().enumerate() {
            let file = File::from_index(i).unwrap();
            board.place(Square::new(file, 1), Color::White, kind);
            board.place(Square::new(file, 8), Color::Black, kind);
            board.place(Square::new(file, 2), Color::White, PieceKind::Pawn);
            board.place(Square::new(file, 7), Color::Black, PieceKind::Pawn);
            if kind == PieceKind::King {
                board.king_files = [file, file];
            }
        }
        board
    }

    /// Populates a board from the piece-placement field of a FEN string
    /// (ranks 8 to 1, digits for empty runs, uppercase = white).
    pub fn from_board_fen(field: &str) -> Result<Board> {
        let mut board = Board::empty();
        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != 8 {
            return Err(Error::InvalidFen(format!(
                "expected 8 ranks, got {}",
                ranks.len()
            )));
        }

        for (i, rank_text) in ranks.iter().enumerate() {
            let rank = 8 - i as u8;
            let mut file_idx = 0usize;
            for c in rank_text.chars() {
                if let Some(run) = c.to_digit(10) {
                    file_idx += run as usize;
                    continue;
                }
                let (kind, color) = PieceKind::from_fen_char(c)
                    .ok_or_else(|| Error::InvalidFen(format!("bad piece letter {:?}", c)))?;
                let file = File::from_index(file_idx)
                    .ok_or_else(|| Error::InvalidFen(format!("rank {} overflows", rank)))?;
                let sq = Square::new(file, rank);
                let id = board.place(sq, color, kind);
                // A pawn off its home rank has necessarily moved; the
                // double-step rule depends on this after FEN import.
                if kind == PieceKind::Pawn && rank != pawn_home_rank(color) {
                    board.arena[id.index()].moved = true;
                }
                if kind == PieceKind::King && rank == color.back_rank() {
                    board.king_files[color.index()] = file;
                }
                file_idx += 1;
            }
            if file_idx != 8 {
                return Err(Error::InvalidFen(format!(
                    "rank {} has {} files",
                    rank, file_idx
                )));
            }
        }
        Ok(board)
    }

    /// Emits the piece-placement field of a FEN string.
    pub fn board_fen(&self) -> String {
        let mut out = String::new();
        for rank in (1..=8).rev() {
            let mut empty_run = 0;
            for file in FILES {
                let sq = Square::new(file, rank);
                match self.at(sq) {
                    None => empty_run += 1,
                    Some(id) => {
                        if empty_run > 0 {
                            out.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        let p = self.piece(id);
                        out.push(p.kind.fen_char(p.color));
                    }
                }
            }
            if empty_run > 0 {
                out.push_str(&empty_run.to_string());
            }
            if rank > 1 {
                out.push('/');
            }
        }
        out
    }

    /// Creates a new arena record and puts it on `sq`. Any piece already
    /// on the square is orphaned (used only during setup).
    pub fn place(&mut self, sq: Square, color: Color, kind: PieceKind) -> PieceId {
        let id = PieceId(self.arena.len() as u8);
        self.arena.push(Piece {
            color,
            kind,
            moved: false,
            home_shade: sq.shade(),
        });
        self.cells[sq.index()] = Some(id);
        id
    }

    /// Piece identity on a square, if any.
    pub fn at(&self, sq: Square) -> Option<PieceId> {
        self.cells[sq.index()]
    }

    pub fn piece(&self, id: PieceId) -> &Piece {
        &self.arena[id.index()]
    }

    pub(crate) fn piece_mut(&mut self, id: PieceId) -> &mut Piece {
        &mut self.arena[id.index()]
    }

    pub(crate) fn set_cell(&mut self, sq: Square, id: Option<PieceId>) {
        self.cells[sq.index()] = id;
    }

    /// Resolves two-character notation to a square (`InvalidNotation`
    /// on malformed input).
    pub fn square(&self, notation: &str) -> Result<Square> {
        Square::from_notation(notation)
    }

    /// Where a piece currently stands. Linear scan; `None` when the
    /// piece has been captured.
    pub fn square_of(&self, id: PieceId) -> Option<Square> {
        Square::all().find(|sq| self.cells[sq.index()] == Some(id))
    }

    /// The square of the given color's king.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        Square::all().find(|sq| {
            self.at(*sq).is_some_and(|id| {
                let p = self.piece(id);
                p.color == color && p.kind == PieceKind::King
            })
        })
    }

    /// All on-board pieces of a color, with their squares.
    pub fn pieces(&self, color: Color) -> Vec<(Square, PieceId)> {
        Square::all()
            .filter_map(|sq| self.at(sq).map(|id| (sq, id)))
            .filter(|(_, id)| self.piece(*id).color == color)
            .collect()
    }

    /// The file the color's king started the game on.
    pub fn king_file(&self, color: Color) -> File {
        self.king_files[color.index()]
    }

    pub(crate) fn set_king_file(&mut self, color: Color, file: File) {
        self.king_files[color.index()] = file;
    }
}

fn pawn_home_rank(color: Color) -> u8 {
    match color {
        Color::White => 2,
        Color::Black => 7,
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (1..=8).rev() {
            write!(f, "{} ", rank)?;
            for file in FILES {
                match self.at(Square::new(file, rank)) {
                    None => write!(f, " .")?,
                    Some(id) => {
                        let p = self.piece(id);
                        write!(f, " {}", p.kind.fen_char(p.color))?;
                    }
                }
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}
