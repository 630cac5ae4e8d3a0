//! PGN parsing: tag pairs, movetext and game reconstruction

use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::board::Color;
use crate::error::{Error, Result};
use crate::game::{Game, GameSettings};
use crate::notation;

lazy_static! {
    /// One tag pair per line: [Key "Value"]
    static ref TAG_RE: Regex = Regex::new(r#"^\[(\w+)\s+"([^"]*)"\]\s*$"#).unwrap();

    /// One movetext unit: move number, white move, optional comment,
    /// optional black move, optional comment.
    static ref MOVE_RE: Regex = Regex::new(
        r#"(\d+)\.\s*([A-Za-z][A-Za-z0-9=+#!?/-]*)(?:\s*\{([^}]*)\})?(?:\s+([A-Za-z][A-Za-z0-9=+#!?/-]*))?(?:\s*\{([^}]*)\})?"#
    )
    .unwrap();
}

const RESULT_TOKENS: [&str; 3] = ["1-0", "0-1", "1/2-1/2"];

/// The recognized tag pairs: the seven-tag roster, the FEN pair for
/// custom starting positions, and the engine/time bookkeeping extras.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnTags {
    pub event: Option<String>,
    pub site: Option<String>,
    pub date: Option<String>,
    pub round: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub fen: Option<String>,
    pub white_engine: Option<String>,
    pub black_engine: Option<String>,
    pub white_time_left: Option<String>,
    pub black_time_left: Option<String>,
}

impl PgnTags {
    /// Date parsed from the standard `YYYY.MM.DD` layout; `None` when a
    /// field is missing or a `?` placeholder.
    pub fn parse_date(&self) -> Option<(u16, u8, u8)> {
        let text = self.date.as_deref()?;
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != 3 {
            return None;
        }
        let year = parts[0].parse().ok()?;
        let month = parts[1].parse().ok()?;
        let day = parts[2].parse().ok()?;
        Some((year, month, day))
    }
}

/// One ply as read from movetext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgnMove {
    pub san: String,
    pub comment: Option<String>,
}

/// A parsed PGN document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnGame {
    pub tags: PgnTags,
    pub moves: Vec<PgnMove>,
    pub result: Option<String>,
}

/// Parses one PGN document: tag-pair lines first, then movetext.
pub fn parse(text: &str) -> Result<PgnGame> {
    let mut tags = PgnTags::default();
    let mut movetext = String::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(caps) = TAG_RE.captures(line) {
            let value = caps[2].to_string();
            match &caps[1] {
                "Event" => tags.event = Some(value),
                "Site" => tags.site = Some(value),
                "Date" => tags.date = Some(value),
                "Round" => tags.round = Some(value),
                "White" => tags.white = Some(value),
                "Black" => tags.black = Some(value),
                "Result" => tags.result = Some(value),
                "FEN" => tags.fen = Some(value),
                "WhiteEngine" => tags.white_engine = Some(value),
                "BlackEngine" => tags.black_engine = Some(value),
                "WhiteTimeLeft" => tags.white_time_left = Some(value),
                "BlackTimeLeft" => tags.black_time_left = Some(value),
                _ => {}
            }
        } else if !line.is_empty() {
            movetext.push_str(line);
            movetext.push(' ');
        }
    }

    // The trailing result token comes off before tokenizing and is
    // re-attached afterwards.
    let mut movetext = movetext.trim().to_string();
    let mut result = None;
    for token in RESULT_TOKENS {
        if let Some(stripped) = movetext.strip_suffix(token) {
            result = Some(token.to_string());
            movetext = stripped.trim_end().to_string();
            break;
        }
    }
    if result.is_none() {
        if let Some(stripped) = movetext.strip_suffix('*') {
            movetext = stripped.trim_end().to_string();
        }
    }
    if result.is_none() {
        result = tags.result.clone().filter(|r| r != "*");
    }

    let mut moves = Vec::new();
    for caps in MOVE_RE.captures_iter(&movetext) {
        moves.push(PgnMove {
            san: caps[2].to_string(),
            comment: caps.get(3).map(|m| m.as_str().to_string()),
        });
        if let Some(black) = caps.get(4) {
            moves.push(PgnMove {
                san: black.as_str().to_string(),
                comment: caps.get(5).map(|m| m.as_str().to_string()),
            });
        }
    }

    if moves.is_empty() && !movetext.is_empty() {
        return Err(Error::Pgn(format!(
            "no moves recognized in movetext {:?}",
            movetext
        )));
    }

    Ok(PgnGame {
        tags,
        moves,
        result,
    })
}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<PgnGame> {
    parse(&fs::read_to_string(path)?)
}

/// Rebuilds a playable [`Game`] from a parsed document by replaying
/// every move. Either the whole document replays cleanly or an error
/// comes back; no partially loaded game escapes.
pub fn to_game(pgn: &PgnGame) -> Result<Game> {
    let settings = GameSettings {
        initial_fen: pgn.tags.fen.clone(),
        ..GameSettings::default()
    };
    let mut game = Game::new(settings)?;
    game.start();

    for ply in &pgn.moves {
        let turn = game.turn();
        let coordinate = resolve_san(&mut game, turn, &ply.san)
            .ok_or_else(|| Error::Pgn(format!("unresolvable move {:?}", ply.san)))?;
        game.replay_move(&coordinate)?;
        if let Some(comment) = &ply.comment {
            game.attach_comment_to_last(comment.clone());
        }
    }
    Ok(game)
}

fn resolve_san(game: &mut Game, turn: Color, san: &str) -> Option<String> {
    let ctx = game.gen_context();
    let mut board = game.board().clone();
    notation::to_coordinate(&mut board, &ctx, turn, san)
}

/// Parses a PGN document and replays it into a game in one step.
pub fn load_game(text: &str) -> Result<Game> {
    to_game(&parse(text)?)
}

pub fn load_game_file<P: AsRef<Path>>(path: P) -> Result<Game> {
    load_game(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[Event "Casual Game"]
[Site "Berlin"]
[Date "2024.03.17"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 {king pawn} e5 2. Nf3 Nc6 3. Bb5 {the Spanish} a6 1-0
"#;

    #[test]
    fn test_parse_tags_and_moves() {
        let pgn = parse(SAMPLE).unwrap();
        assert_eq!(pgn.tags.white.as_deref(), Some("Alice"));
        assert_eq!(pgn.tags.event.as_deref(), Some("Casual Game"));
        assert_eq!(pgn.result.as_deref(), Some("1-0"));
        assert_eq!(pgn.moves.len(), 6);
        assert_eq!(pgn.moves[0].san, "e4");
        assert_eq!(pgn.moves[0].comment.as_deref(), Some("king pawn"));
        assert_eq!(pgn.moves[1].san, "e5");
        assert_eq!(pgn.moves[1].comment, None);
        assert_eq!(pgn.moves[4].san, "Bb5");
        assert_eq!(pgn.moves[4].comment.as_deref(), Some("the Spanish"));
        assert_eq!(pgn.moves[5].san, "a6");
    }

    #[test]
    fn test_parse_date_field_mapping() {
        let pgn = parse(SAMPLE).unwrap();
        assert_eq!(pgn.tags.parse_date(), Some((2024, 3, 17)));

        let mut tags = PgnTags::default();
        tags.date = Some("????.??.??".to_string());
        assert_eq!(tags.parse_date(), None);
    }

    #[test]
    fn test_game_ending_on_white_move() {
        let pgn = parse("1. f3 e5 2. g4 Qh4# 0-1\n").unwrap();
        assert_eq!(pgn.moves.len(), 4);
        assert_eq!(pgn.moves[3].san, "Qh4#");
        assert_eq!(pgn.result.as_deref(), Some("0-1"));

        let pgn = parse("1. e4 e5 2. Qh5 Nc6 3. Qxf7# 1-0\n").unwrap();
        assert_eq!(pgn.moves.len(), 5);
        assert_eq!(pgn.moves[4].san, "Qxf7#");
    }

    #[test]
    fn test_replay_reconstructs_game() {
        let game = load_game(SAMPLE).unwrap();
        assert_eq!(game.records().len(), 6);
        assert_eq!(game.records()[0].san, "e4");
        assert_eq!(game.records()[0].comment.as_deref(), Some("king pawn"));
        assert_eq!(game.records()[4].san, "Bb5");
        assert!(game.fen().starts_with("r1bqkbnr/1ppp1ppp/p1n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R w"));
    }

    #[test]
    fn test_castling_tokens_replay() {
        let text = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O Nf6 *\n";
        let game = load_game(text).unwrap();
        assert_eq!(game.records()[6].san, "O-O");
        assert_eq!(game.records()[6].coordinate, "e1g1");
    }

    #[test]
    fn test_custom_fen_tag() {
        let text = r#"[FEN "8/4P3/8/8/8/8/8/4K2k w - - 0 1"]

1. e8=Q *
"#;
        let game = load_game(text).unwrap();
        assert_eq!(game.records()[0].san, "e8=Q");
    }

    #[test]
    fn test_unresolvable_move_fails_without_partial_state() {
        let err = load_game("1. e4 Nf4 *\n").unwrap_err();
        assert!(matches!(err, Error::Pgn(_)));
    }

    #[test]
    fn test_garbage_movetext_rejected() {
        assert!(parse("@@@###").is_err());
    }
}
