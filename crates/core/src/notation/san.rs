//! Short and long algebraic notation: generation with minimal
//! disambiguation, and resolution of short algebraic text back to a
//! coordinate move

use crate::board::{Board, Color, File, PieceKind, Square};
use crate::moves::{legal_moves, CastleSide, GenContext, Move};

/// Builds the short and long algebraic forms of a resolved move,
/// evaluated against the position *before* the move is applied. Check
/// and mate markers are appended separately via [`decorate`].
pub fn algebraic(board: &mut Board, ctx: &GenContext, mv: &Move) -> (String, String) {
    if let Some(castle) = mv.castle {
        let text = match castle.side {
            CastleSide::King => "O-O".to_string(),
            CastleSide::Queen => "O-O-O".to_string(),
        };
        return (text.clone(), text);
    }

    let id = board.at(mv.from).expect("move source must be occupied");
    let piece = *board.piece(id);
    let capture = mv.capture.is_some();

    let promotion_suffix = mv
        .promotion
        .map(|kind| format!("={}", kind.acronym()))
        .unwrap_or_default();

    let lan = format!(
        "{}{}{}{}{}",
        piece.kind.acronym(),
        mv.from.notation(),
        if capture { "x" } else { "-" },
        mv.to.notation(),
        promotion_suffix
    );

    let san = if piece.kind == PieceKind::Pawn {
        if capture {
            format!(
                "{}x{}{}",
                mv.from.file().to_char(),
                mv.to.notation(),
                promotion_suffix
            )
        } else {
            format!("{}{}", mv.to.notation(), promotion_suffix)
        }
    } else {
        format!(
            "{}{}{}{}",
            piece.kind.acronym(),
            disambiguation(board, ctx, mv, piece.color, piece.kind),
            if capture { "x" } else { "" },
            mv.to.notation()
        )
    };

    (san, lan)
}

/// Minimal disambiguation among same-kind, same-color pieces that could
/// also legally reach the destination: file alone if that settles it,
/// rank alone otherwise, the full origin square as a last resort.
fn disambiguation(
    board: &mut Board,
    ctx: &GenContext,
    mv: &Move,
    color: Color,
    kind: PieceKind,
) -> String {
    let rivals: Vec<Square> = board
        .pieces(color)
        .into_iter()
        .filter(|(sq, id)| *sq != mv.from && board.piece(*id).kind == kind)
        .map(|(sq, _)| sq)
        .collect();

    let reaching: Vec<Square> = rivals
        .into_iter()
        .filter(|sq| legal_moves(board, ctx, *sq).contains(&mv.to))
        .collect();

    if reaching.is_empty() {
        return String::new();
    }
    if !reaching.iter().any(|sq| sq.file() == mv.from.file()) {
        return mv.from.file().to_char().to_string();
    }
    if !reaching.iter().any(|sq| sq.rank() == mv.from.rank()) {
        return mv.from.rank().to_string();
    }
    mv.from.notation()
}

/// Appends the terminal-state marker: "#" for mate, "+" for check.
pub fn decorate(text: &mut String, check: bool, mate: bool) {
    if mate {
        text.push('#');
    } else if check {
        text.push('+');
    }
}

/// Splits short algebraic text into its working parts: annotation
/// suffixes (?!), check/mate markers and capture crosses stripped, the
/// promotion letter extracted.
fn strip(text: &str) -> (String, Option<PieceKind>) {
    let mut body: String = text
        .trim()
        .trim_end_matches(['?', '!'])
        .trim_end_matches(['+', '#'])
        .to_string();

    let mut promotion = None;
    if let Some(pos) = body.rfind('=') {
        promotion = body[pos + 1..].chars().next().and_then(PieceKind::from_letter);
        body.truncate(pos);
    } else if let Some(last) = body.chars().last() {
        // Suffix form without '=', e.g. "e8Q".
        if last.is_ascii_uppercase() && body.len() > 2 {
            if let Some(kind) = PieceKind::from_letter(last) {
                if kind != PieceKind::King && body.chars().next().is_some_and(|c| c.is_ascii_lowercase())
                {
                    promotion = Some(kind);
                    body.pop();
                }
            }
        }
    }

    body.retain(|c| c != 'x');
    (body, promotion)
}

/// Resolves short algebraic text to its coordinate form ("e2e4",
/// "e7e8q") against the current position, or `None` when nothing in the
/// legal-move set matches — callers must treat that as a parse failure.
pub fn to_coordinate(
    board: &mut Board,
    ctx: &GenContext,
    turn: Color,
    text: &str,
) -> Option<String> {
    let (body, promotion) = strip(text);
    if body.is_empty() {
        return None;
    }

    // Castling tokens resolve directly to the precomputed king move.
    if body == "O-O" || body == "0-0" {
        return castle_coordinate(board, turn, CastleSide::King);
    }
    if body == "O-O-O" || body == "0-0-0" {
        return castle_coordinate(board, turn, CastleSide::Queen);
    }

    let mut chars: Vec<char> = body.chars().collect();
    let kind = match chars.first() {
        Some(c) if c.is_ascii_uppercase() => {
            let kind = PieceKind::from_letter(*c)?;
            chars.remove(0);
            kind
        }
        _ => PieceKind::Pawn,
    };

    if chars.len() < 2 {
        return None;
    }
    let dest_text: String = chars.split_off(chars.len() - 2).into_iter().collect();
    let dest = Square::from_notation(&dest_text).ok()?;

    // Whatever remains narrows the candidate set by file and/or rank.
    let mut want_file: Option<File> = None;
    let mut want_rank: Option<u8> = None;
    for c in chars {
        if let Some(file) = File::from_char(c) {
            want_file = Some(file);
        } else if let Some(d) = c.to_digit(10) {
            want_rank = Some(d as u8);
        } else {
            return None;
        }
    }

    let candidates: Vec<Square> = board
        .pieces(turn)
        .into_iter()
        .filter(|(sq, id)| {
            board.piece(*id).kind == kind
                && want_file.is_none_or(|f| sq.file() == f)
                && want_rank.is_none_or(|r| sq.rank() == r)
        })
        .map(|(sq, _)| sq)
        .collect();

    for from in candidates {
        if legal_moves(board, ctx, from).contains(&dest) {
            let mut out = format!("{}{}", from.notation(), dest.notation());
            if let Some(kind) = promotion {
                out.push(kind.fen_char(Color::Black));
            }
            return Some(out);
        }
    }
    None
}

fn castle_coordinate(board: &Board, turn: Color, side: CastleSide) -> Option<String> {
    let king = board.king_square(turn)?;
    let target = Square::new(side.king_target_file(), turn.back_rank());
    Some(format!("{}{}", king.notation(), target.notation()))
}
