//! Six-field Forsyth–Edwards Notation

use crate::board::{Board, Color, Square};
use crate::error::{Error, Result};
use crate::moves::CastlingRights;

/// The standard-chess starting position.
pub const STANDARD_START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// All six FEN fields, decomposed.
#[derive(Debug, Clone)]
pub struct FenFields {
    pub board: Board,
    pub turn: Color,
    pub rights: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove: u32,
}

/// Parses a six-field FEN string.
pub fn parse(fen: &str) -> Result<FenFields> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    if parts.len() != 6 {
        return Err(Error::InvalidFen(format!(
            "expected 6 fields, got {}",
            parts.len()
        )));
    }

    let board = Board::from_board_fen(parts[0])?;

    let turn = parts[1]
        .chars()
        .next()
        .and_then(Color::from_fen_char)
        .filter(|_| parts[1].len() == 1)
        .ok_or_else(|| Error::InvalidFen(format!("bad turn field {:?}", parts[1])))?;

    let rights = CastlingRights::from_fen(parts[2])?;

    let en_passant = match parts[3] {
        "-" => None,
        text => Some(
            Square::from_notation(text)
                .map_err(|_| Error::InvalidFen(format!("bad en-passant field {:?}", text)))?,
        ),
    };

    let halfmove_clock: u32 = parts[4]
        .parse()
        .map_err(|_| Error::InvalidFen(format!("bad half-move field {:?}", parts[4])))?;
    let fullmove: u32 = parts[5]
        .parse()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| Error::InvalidFen(format!("bad full-move field {:?}", parts[5])))?;

    Ok(FenFields {
        board,
        turn,
        rights,
        en_passant,
        halfmove_clock,
        fullmove,
    })
}

/// Composes the six-field FEN string.
pub fn compose(
    board: &Board,
    turn: Color,
    rights: &CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove: u32,
) -> String {
    format!(
        "{} {} {} {} {} {}",
        board.board_fen(),
        turn.fen_char(),
        rights.fen(),
        en_passant.map_or_else(|| "-".to_string(), |sq| sq.notation()),
        halfmove_clock,
        fullmove
    )
}

/// The first four FEN fields: the part of the position that matters for
/// repetition counting (clocks excluded).
pub fn repetition_key(fen: &str) -> String {
    fen.split_whitespace()
        .take(4)
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_round_trip() {
        let fields = parse(STANDARD_START).unwrap();
        assert_eq!(fields.turn, Color::White);
        assert_eq!(fields.rights, CastlingRights::all());
        assert_eq!(fields.en_passant, None);
        let out = compose(
            &fields.board,
            fields.turn,
            &fields.rights,
            fields.en_passant,
            fields.halfmove_clock,
            fields.fullmove,
        );
        assert_eq!(out, STANDARD_START);
    }

    #[test]
    fn test_mid_game_round_trip() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let fields = parse(fen).unwrap();
        assert_eq!(fields.turn, Color::Black);
        assert_eq!(
            fields.en_passant,
            Some(Square::from_notation("e3").unwrap())
        );
        let out = compose(
            &fields.board,
            fields.turn,
            &fields.rights,
            fields.en_passant,
            fields.halfmove_clock,
            fields.fullmove,
        );
        assert_eq!(out, fen);
    }

    #[test]
    fn test_malformed_fens_rejected() {
        for fen in [
            "",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KXkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0",
        ] {
            assert!(parse(fen).is_err(), "should reject {:?}", fen);
        }
    }

    #[test]
    fn test_repetition_key_drops_clocks() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 12 34";
        assert_eq!(
            repetition_key(fen),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -"
        );
    }
}
