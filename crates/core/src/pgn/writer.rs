//! PGN emission: tag pairs, numbered movetext, comments, line wrapping

use std::fs;
use std::path::Path;

use crate::board::Color;
use crate::error::Result;
use crate::game::Game;

use super::reader::PgnTags;

const WRAP_COLUMN: usize = 80;

/// Composes a PGN document for a game: the seven-tag roster (with `?`
/// placeholders), the custom tags that are set, and wrapped movetext
/// ending in the result token.
pub fn compose(game: &Game, tags: &PgnTags) -> String {
    let result = game
        .outcome()
        .map(|o| o.result_token().to_string())
        .or_else(|| tags.result.clone())
        .unwrap_or_else(|| "*".to_string());

    let mut out = String::new();
    let mut tag = |key: &str, value: &str| {
        out.push_str(&format!("[{} \"{}\"]\n", key, value));
    };

    tag("Event", tags.event.as_deref().unwrap_or("?"));
    tag("Site", tags.site.as_deref().unwrap_or("?"));
    tag("Date", tags.date.as_deref().unwrap_or("????.??.??"));
    tag("Round", tags.round.as_deref().unwrap_or("?"));
    tag("White", tags.white.as_deref().unwrap_or("?"));
    tag("Black", tags.black.as_deref().unwrap_or("?"));
    tag("Result", &result);

    if game.initial_fen() != crate::notation::STANDARD_START {
        tag("SetUp", "1");
        tag("FEN", game.initial_fen());
    }
    if let Some(engine) = &tags.white_engine {
        tag("WhiteEngine", engine);
    }
    if let Some(engine) = &tags.black_engine {
        tag("BlackEngine", engine);
    }
    if let Some(left) = &tags.white_time_left {
        tag("WhiteTimeLeft", left);
    }
    if let Some(left) = &tags.black_time_left {
        tag("BlackTimeLeft", left);
    }

    out.push('\n');
    out.push_str(&wrap(&movetext(game, &result)));
    out.push('\n');
    out
}

/// Numbered movetext: a number before each white move only, castling in
/// its O-O form, comments in braces, the result token last.
fn movetext(game: &Game, result: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for record in game.records() {
        if record.color == Some(Color::White) {
            words.push(format!("{}.", record.status.fullmove));
        }
        words.push(castle_form(&record.san));
        if let Some(comment) = &record.comment {
            words.push(format!("{{{}}}", comment));
        }
    }
    words.push(result.to_string());
    words.join(" ")
}

/// Maps stray zero-form castling to the letter form PGN requires.
fn castle_form(san: &str) -> String {
    match san {
        "0-0" => "O-O".to_string(),
        "0-0-0" => "O-O-O".to_string(),
        _ => san.to_string(),
    }
}

/// Soft-wraps at the conventional 80 columns, breaking between words.
fn wrap(text: &str) -> String {
    let mut out = String::new();
    let mut column = 0;
    for word in text.split(' ') {
        if column > 0 && column + 1 + word.len() > WRAP_COLUMN {
            out.push('\n');
            column = 0;
        } else if column > 0 {
            out.push(' ');
            column += 1;
        }
        out.push_str(word);
        column += word.len();
    }
    out
}

pub fn write_file<P: AsRef<Path>>(path: P, game: &Game, tags: &PgnTags) -> Result<()> {
    fs::write(path, compose(game, tags))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameSettings;
    use crate::pgn::reader;

    fn played_game(moves: &[&str]) -> Game {
        let mut game = Game::new(GameSettings::default()).unwrap();
        game.start();
        for mv in moves {
            game.do_move(mv).unwrap();
        }
        game
    }

    #[test]
    fn test_numbers_only_before_white_moves() {
        let game = played_game(&["e2e4", "e7e5", "g1f3"]);
        let text = compose(&game, &PgnTags::default());
        assert!(text.contains("1. e4 e5 2. Nf3 *"));
        assert!(text.contains("[Event \"?\"]"));
    }

    #[test]
    fn test_result_token_from_outcome() {
        let game = played_game(&["f2f3", "e7e5", "g2g4", "d8h4"]);
        let text = compose(&game, &PgnTags::default());
        assert!(text.contains("[Result \"0-1\"]"));
        assert!(text.trim_end().ends_with("Qh4# 0-1"));
    }

    #[test]
    fn test_comments_wrapped_in_braces() {
        let mut game = played_game(&["e2e4"]);
        game.attach_comment_to_last("book".to_string());
        let text = compose(&game, &PgnTags::default());
        assert!(text.contains("1. e4 {book} *"));
    }

    #[test]
    fn test_long_movetext_soft_wraps() {
        // Pawn advances never repeat a position, so the game stays open
        // while the movetext outgrows one line.
        let game = played_game(&[
            "a2a3", "a7a6", "b2b3", "b7b6", "c2c3", "c7c6", "d2d3", "d7d6", "e2e3", "e7e6",
            "f2f3", "f7f6", "g2g3", "g7g6", "h2h3", "h7h6", "a3a4", "a6a5", "b3b4", "h6h5",
        ]);
        let text = compose(&game, &PgnTags::default());
        assert!(text.lines().count() >= 10, "movetext did not wrap:\n{}", text);
        for line in text.lines() {
            assert!(line.len() <= WRAP_COLUMN, "overlong line {:?}", line);
        }
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let mut game = played_game(&["e2e4", "c7c5", "g1f3", "d7d6", "f1b5"]);
        game.attach_comment_to_last("pin threat".to_string());
        let mut tags = PgnTags::default();
        tags.white = Some("Engine A".to_string());
        tags.black = Some("Engine B".to_string());
        let text = compose(&game, &tags);

        let reloaded = reader::load_game(&text).unwrap();
        assert_eq!(reloaded.records().len(), game.records().len());
        for (a, b) in game.records().iter().zip(reloaded.records()) {
            assert_eq!(a.san, b.san);
            assert_eq!(a.coordinate, b.coordinate);
            assert_eq!(a.comment, b.comment);
            assert_eq!(a.fen_after, b.fen_after);
        }
        assert_eq!(reloaded.fen(), game.fen());
    }

    #[test]
    fn test_custom_start_round_trip() {
        let mut game = Game::new(GameSettings {
            initial_fen: Some("8/4P3/8/8/8/8/8/4K2k w - - 0 1".to_string()),
            ..GameSettings::default()
        })
        .unwrap();
        game.start();
        game.do_move("e7e8q").unwrap();
        let text = compose(&game, &PgnTags::default());
        assert!(text.contains("[FEN \"8/4P3/8/8/8/8/8/4K2k w - - 0 1\"]"));

        let reloaded = reader::load_game(&text).unwrap();
        assert_eq!(reloaded.records()[0].san, game.records()[0].san);
        assert_eq!(reloaded.fen(), game.fen());
    }
}
