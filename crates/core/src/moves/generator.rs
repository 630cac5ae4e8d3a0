//! Pseudo-legal move generation, attack detection and the king-safety filter

use crate::board::{Board, Color, PieceKind, Square};

use super::types::{Castle, CastleSide, CastlingRights, Move};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const BISHOP_RAYS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_RAYS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Game-level context the generator needs beyond piece placement.
#[derive(Debug, Clone, Copy)]
pub struct GenContext {
    pub rights: CastlingRights,
    pub en_passant: Option<Square>,
    pub chess960: bool,
}

impl GenContext {
    /// Context with no castling rights and no en-passant target; enough
    /// for plain reachability questions.
    pub fn bare() -> GenContext {
        GenContext {
            rights: CastlingRights::none(),
            en_passant: None,
            chess960: false,
        }
    }
}

/// Pseudo-legal destinations for the piece on `from`: movement rules
/// only, no king-safety filtering. Castling targets are included when
/// the right is held and [`can_castle`] succeeds.
pub fn pseudo_legal(board: &Board, ctx: &GenContext, from: Square) -> Vec<Square> {
    let Some(id) = board.at(from) else {
        return Vec::new();
    };
    let piece = *board.piece(id);

    let mut dests = match piece.kind {
        PieceKind::Pawn => pawn_moves(board, ctx, from, piece.color, piece.moved),
        PieceKind::Knight => step_moves(board, from, piece.color, &KNIGHT_OFFSETS),
        PieceKind::Bishop => ray_moves(board, from, piece.color, &BISHOP_RAYS),
        PieceKind::Rook => ray_moves(board, from, piece.color, &ROOK_RAYS),
        PieceKind::Queen => {
            let mut v = ray_moves(board, from, piece.color, &BISHOP_RAYS);
            v.extend(ray_moves(board, from, piece.color, &ROOK_RAYS));
            v
        }
        PieceKind::King => step_moves(board, from, piece.color, &KING_OFFSETS),
    };

    if piece.kind == PieceKind::King {
        dests.extend(
            castle_destinations(board, ctx, piece.color)
                .into_iter()
                .map(|(_, target)| target),
        );
    }

    dests
}

fn step_moves(board: &Board, from: Square, color: Color, offsets: &[(i8, i8)]) -> Vec<Square> {
    offsets
        .iter()
        .filter_map(|(df, dr)| from.offset(*df, *dr))
        .filter(|sq| match board.at(*sq) {
            None => true,
            Some(id) => board.piece(id).color != color,
        })
        .collect()
}

fn ray_moves(board: &Board, from: Square, color: Color, rays: &[(i8, i8)]) -> Vec<Square> {
    let mut dests = Vec::new();
    for (df, dr) in rays {
        let mut current = from;
        while let Some(next) = current.offset(*df, *dr) {
            match board.at(next) {
                None => {
                    dests.push(next);
                    current = next;
                }
                Some(id) => {
                    if board.piece(id).color != color {
                        dests.push(next);
                    }
                    break;
                }
            }
        }
    }
    dests
}

fn pawn_moves(
    board: &Board,
    ctx: &GenContext,
    from: Square,
    color: Color,
    moved: bool,
) -> Vec<Square> {
    let mut dests = Vec::new();
    let dir = color.pawn_direction();

    // Single push, and double push only while unmoved with both squares empty.
    if let Some(one) = from.offset(0, dir) {
        if board.at(one).is_none() {
            dests.push(one);
            if !moved {
                if let Some(two) = one.offset(0, dir) {
                    if board.at(two).is_none() {
                        dests.push(two);
                    }
                }
            }
        }
    }

    // Diagonal captures, plus en passant onto the game's target square.
    for df in [-1, 1] {
        let Some(diag) = from.offset(df, dir) else {
            continue;
        };
        match board.at(diag) {
            Some(id) if board.piece(id).color != color => dests.push(diag),
            None if ctx.en_passant == Some(diag) => dests.push(diag),
            _ => {}
        }
    }

    dests
}

/// Is `sq` attacked by any piece of the opponent of `occupant_color`?
///
/// Deliberately built from pseudo-legal piece stepping (pawn capture
/// diagonals, no castling) so legality checking never recurses.
pub fn is_attacked(board: &Board, sq: Square, occupant_color: Color) -> bool {
    let attacker = occupant_color.opponent();

    // Knights and kings: fixed offsets.
    for (df, dr) in KNIGHT_OFFSETS {
        if holds(board, sq.offset(df, dr), attacker, PieceKind::Knight) {
            return true;
        }
    }
    for (df, dr) in KING_OFFSETS {
        if holds(board, sq.offset(df, dr), attacker, PieceKind::King) {
            return true;
        }
    }

    // Pawns attack diagonally toward their own movement direction, so
    // from `sq` we look one rank against it.
    let dir = attacker.pawn_direction();
    for df in [-1, 1] {
        if holds(board, sq.offset(df, -dir), attacker, PieceKind::Pawn) {
            return true;
        }
    }

    // Sliders: walk each ray to the first occupied square.
    for (rays, slider) in [
        (&BISHOP_RAYS, PieceKind::Bishop),
        (&ROOK_RAYS, PieceKind::Rook),
    ] {
        for (df, dr) in rays {
            let mut current = sq;
            while let Some(next) = current.offset(*df, *dr) {
                if let Some(id) = board.at(next) {
                    let p = board.piece(id);
                    if p.color == attacker && (p.kind == PieceKind::Queen || p.kind == slider) {
                        return true;
                    }
                    break;
                }
                current = next;
            }
        }
    }

    false
}

fn holds(board: &Board, sq: Option<Square>, color: Color, kind: PieceKind) -> bool {
    sq.and_then(|sq| board.at(sq)).is_some_and(|id| {
        let p = board.piece(id);
        p.color == color && p.kind == kind
    })
}

/// Is the given color's king currently attacked?
pub fn is_in_check(board: &Board, color: Color) -> bool {
    board
        .king_square(color)
        .is_some_and(|sq| is_attacked(board, sq, color))
}

/// Locates the castling rook for a wing: the first unmoved rook outward
/// of the king's file. Standard setups find the corner rook; Chess960
/// setups find whichever rook the arrangement put there.
pub fn castling_rook(board: &Board, color: Color, side: CastleSide) -> Option<Square> {
    let king = board.king_square(color)?;
    let step = match side {
        CastleSide::King => 1,
        CastleSide::Queen => -1,
    };
    let mut current = king;
    while let Some(next) = current.offset(step, 0) {
        if let Some(id) = board.at(next) {
            let p = board.piece(id);
            if p.color == color && p.kind == PieceKind::Rook && !p.moved {
                return Some(next);
            }
        }
        current = next;
    }
    None
}

/// Full castling feasibility for one wing: the king must not be in
/// check, every square it transits (destination inclusive) must be free
/// of attacks and hold nothing but the castling pair, and the rook's
/// path to its destination must hold nothing but the castling pair.
pub fn can_castle(board: &Board, ctx: &GenContext, color: Color, side: CastleSide) -> bool {
    if !ctx.rights.has(color, side) {
        return false;
    }
    let Some(king) = board.king_square(color) else {
        return false;
    };
    let Some(king_id) = board.at(king) else {
        return false;
    };
    if king.rank() != color.back_rank() || board.piece(king_id).moved {
        return false;
    }
    if is_attacked(board, king, color) {
        return false;
    }
    let Some(rook) = castling_rook(board, color, side) else {
        return false;
    };

    let king_target = Square::new(side.king_target_file(), color.back_rank());
    let rook_target = Square::new(side.rook_target_file(), color.back_rank());

    let participant = |sq: Square| sq == king || sq == rook;

    for sq in path_inclusive(king, king_target) {
        if sq == king {
            continue;
        }
        if board.at(sq).is_some() && !participant(sq) {
            return false;
        }
        if is_attacked(board, sq, color) {
            return false;
        }
    }

    for sq in path_inclusive(rook, rook_target) {
        if board.at(sq).is_some() && !participant(sq) {
            return false;
        }
    }

    true
}

/// Horizontal walk from `from` to `to`, both inclusive.
fn path_inclusive(from: Square, to: Square) -> Vec<Square> {
    let step: i8 = if to.file() >= from.file() { 1 } else { -1 };
    let mut path = vec![from];
    let mut current = from;
    while current != to {
        current = match current.offset(step, 0) {
            Some(sq) => sq,
            None => break,
        };
        path.push(current);
    }
    path
}

/// Castling destinations (king target squares) available to a color.
pub fn castle_destinations(
    board: &Board,
    ctx: &GenContext,
    color: Color,
) -> Vec<(CastleSide, Square)> {
    [CastleSide::King, CastleSide::Queen]
        .into_iter()
        .filter(|side| can_castle(board, ctx, color, *side))
        .map(|side| (side, Square::new(side.king_target_file(), color.back_rank())))
        .collect()
}

/// Resolves a from/to pair into a fully specified [`Move`]: fills in the
/// en-passant victim square and, when `castle` names a wing, the rook
/// leg. Promotion defaulting and validation stay with the caller.
pub fn resolve_move(
    board: &Board,
    ctx: &GenContext,
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
    castle: Option<CastleSide>,
) -> Option<Move> {
    let id = board.at(from)?;
    let piece = board.piece(id);

    if let Some(side) = castle {
        let rook_from = castling_rook(board, piece.color, side)?;
        return Some(Move {
            from,
            to,
            capture: None,
            promotion: None,
            castle: Some(Castle { side, rook_from }),
        });
    }

    let capture = if board.at(to).is_some() {
        Some(to)
    } else if piece.kind == PieceKind::Pawn && ctx.en_passant == Some(to) && from.file() != to.file()
    {
        // En passant: the victim stands one rank behind the target.
        Some(Square::new(to.file(), from.rank()))
    } else {
        None
    };

    Some(Move {
        from,
        to,
        capture,
        promotion,
        castle: None,
    })
}

/// Legal destinations for the piece on `from`. Every pseudo-legal
/// candidate is simulated, the mover's king checked for attacks, and
/// the board reverted before the next candidate; the board is
/// byte-for-byte identical afterwards.
pub fn legal_moves(board: &mut Board, ctx: &GenContext, from: Square) -> Vec<Square> {
    let Some(id) = board.at(from) else {
        return Vec::new();
    };
    let color = board.piece(id).color;
    let is_pawn = board.piece(id).kind == PieceKind::Pawn;
    let castles = if board.piece(id).kind == PieceKind::King {
        castle_destinations(board, ctx, color)
    } else {
        Vec::new()
    };

    let mut legal = Vec::new();
    for to in pseudo_legal(board, ctx, from) {
        if to == from {
            continue;
        }
        // Castling targets were fully validated (attacks included) by
        // can_castle; the remaining candidates get the simulate check.
        if castles.iter().any(|(_, target)| *target == to) {
            legal.push(to);
            continue;
        }
        // Promotion choice cannot affect king safety; queen stands in.
        let promotion = if is_pawn && to.rank() == color.promotion_rank() {
            Some(PieceKind::Queen)
        } else {
            None
        };
        let Some(mv) = resolve_move(board, ctx, from, to, promotion, None) else {
            continue;
        };
        let undo = board.apply(&mv);
        let safe = !is_in_check(board, color);
        board.revert(undo);
        if safe {
            legal.push(to);
        }
    }
    legal
}

/// Does `color` have at least one legal move anywhere? Terminal-state
/// detection exhausts this over every piece.
pub fn has_any_legal_move(board: &mut Board, ctx: &GenContext, color: Color) -> bool {
    let origins: Vec<Square> = board.pieces(color).into_iter().map(|(sq, _)| sq).collect();
    origins
        .into_iter()
        .any(|sq| !legal_moves(board, ctx, sq).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::types::CastlingRights;

    fn sq(n: &str) -> Square {
        Square::from_notation(n).unwrap()
    }

    fn sorted(mut v: Vec<Square>) -> Vec<String> {
        v.sort_by_key(|s| s.index());
        v.into_iter().map(|s| s.notation()).collect()
    }

    #[test]
    fn test_knight_edge_clipping() {
        let board = Board::from_board_fen("8/8/8/8/8/8/8/N3K2k").unwrap();
        let ctx = GenContext::bare();
        assert_eq!(sorted(pseudo_legal(&board, &ctx, sq("a1"))), ["b3", "c2"]);
    }

    #[test]
    fn test_sliders_stop_at_blockers() {
        let board = Board::from_board_fen("8/8/8/3p4/8/1B6/8/4K2k").unwrap();
        let ctx = GenContext::bare();
        let dests = sorted(pseudo_legal(&board, &ctx, sq("b3")));
        // Up-right ray ends on the capturable pawn at d5.
        assert!(dests.contains(&"d5".to_string()));
        assert!(!dests.contains(&"e6".to_string()));
        // Own king blocks nothing on unrelated rays.
        assert!(dests.contains(&"a2".to_string()));
        assert!(dests.contains(&"a4".to_string()));
    }

    #[test]
    fn test_pawn_double_push_rules() {
        let board = Board::standard();
        let ctx = GenContext::bare();
        assert_eq!(sorted(pseudo_legal(&board, &ctx, sq("e2"))), ["e3", "e4"]);

        // A blocked pawn cannot push at all.
        let blocked = Board::from_board_fen("8/8/8/8/8/4p3/4P3/4K2k").unwrap();
        assert!(pseudo_legal(&blocked, &ctx, sq("e2")).is_empty());

        // Both intervening squares must be empty for the double step.
        let hop = Board::from_board_fen("8/8/8/8/4p3/8/4P3/4K2k").unwrap();
        assert_eq!(sorted(pseudo_legal(&hop, &ctx, sq("e2"))), ["e3"]);
    }

    #[test]
    fn test_pawn_en_passant_target() {
        let board = Board::from_board_fen("8/8/8/3pP3/8/8/8/4K2k").unwrap();
        let mut ctx = GenContext::bare();
        ctx.en_passant = Some(sq("d6"));
        let dests = sorted(pseudo_legal(&board, &ctx, sq("e5")));
        assert_eq!(dests, ["d6", "e6"]);

        // Without the target the diagonal is unavailable.
        ctx.en_passant = None;
        assert_eq!(sorted(pseudo_legal(&board, &ctx, sq("e5"))), ["e6"]);
    }

    #[test]
    fn test_is_attacked_by_each_class() {
        let board = Board::from_board_fen("8/8/8/8/8/2n5/1P6/R3K2k").unwrap();
        // Black knight on c3.
        assert!(is_attacked(&board, sq("e2"), Color::White));
        assert!(is_attacked(&board, sq("b1"), Color::White));
        // White pawn on b2 attacks a3 and c3.
        assert!(is_attacked(&board, sq("c3"), Color::Black));
        // White rook ray along the first rank.
        assert!(is_attacked(&board, sq("c1"), Color::Black));
        assert!(!is_attacked(&board, sq("b3"), Color::Black));
    }

    #[test]
    fn test_pawn_push_does_not_attack() {
        let board = Board::from_board_fen("8/8/8/8/8/4p3/8/4K2k").unwrap();
        // The square directly ahead of the black pawn is not attacked.
        assert!(!is_attacked(&board, sq("e2"), Color::White));
        assert!(is_attacked(&board, sq("d2"), Color::White));
        assert!(is_attacked(&board, sq("f2"), Color::White));
    }

    #[test]
    fn test_legal_moves_filters_pins() {
        // The e-file knight is pinned to its king by the rook.
        let mut board = Board::from_board_fen("4r3/8/8/8/8/4N3/8/4K2k").unwrap();
        let ctx = GenContext::bare();
        assert!(!pseudo_legal(&board, &ctx, sq("e3")).is_empty());
        assert!(legal_moves(&mut board, &ctx, sq("e3")).is_empty());
    }

    #[test]
    fn test_legal_moves_leave_board_untouched() {
        let mut board = Board::standard();
        let ctx = GenContext::bare();
        let before = board.clone();
        for square in Square::all() {
            legal_moves(&mut board, &ctx, square);
            assert_eq!(board, before);
        }
    }

    #[test]
    fn test_in_check_must_resolve() {
        // King e1 checked by rook e8; only capture, block or step away.
        let mut board = Board::from_board_fen("4r3/8/8/8/8/8/3Q4/4K2k").unwrap();
        let ctx = GenContext::bare();
        // The queen's only useful squares are the two that block the file.
        let queen_moves = legal_moves(&mut board, &ctx, sq("d2"));
        assert_eq!(sorted(queen_moves), ["e2", "e3"]);
        // King can step off the e-file.
        let king_moves = legal_moves(&mut board, &ctx, sq("e1"));
        assert!(king_moves.iter().all(|s| s.file() != crate::board::File::E));
        assert!(!king_moves.is_empty());
    }

    #[test]
    fn test_castling_paths_and_attacks() {
        let mut ctx = GenContext::bare();
        ctx.rights = CastlingRights::all();

        let clear = Board::from_board_fen("r3k2r/8/8/8/8/8/8/R3K2R").unwrap();
        assert!(can_castle(&clear, &ctx, Color::White, CastleSide::King));
        assert!(can_castle(&clear, &ctx, Color::White, CastleSide::Queen));
        assert!(can_castle(&clear, &ctx, Color::Black, CastleSide::King));

        // Blocked path.
        let blocked = Board::from_board_fen("r3k2r/8/8/8/8/8/8/R3KB1R").unwrap();
        assert!(!can_castle(&blocked, &ctx, Color::White, CastleSide::King));
        assert!(can_castle(&blocked, &ctx, Color::White, CastleSide::Queen));

        // King in check cannot castle at all.
        let checked = Board::from_board_fen("r3k2r/8/8/8/8/8/4r3/R3K2R").unwrap();
        assert!(!can_castle(&checked, &ctx, Color::White, CastleSide::King));
        assert!(!can_castle(&checked, &ctx, Color::White, CastleSide::Queen));

        // Transit square f1 attacked by the rook on f8.
        let transit = Board::from_board_fen("r3kr2/8/8/8/8/8/8/R3K2R").unwrap();
        assert!(!can_castle(&transit, &ctx, Color::White, CastleSide::King));
        assert!(can_castle(&transit, &ctx, Color::White, CastleSide::Queen));

        // Without the right nothing works.
        ctx.rights = CastlingRights::none();
        assert!(!can_castle(&clear, &ctx, Color::White, CastleSide::King));
    }

    #[test]
    fn test_chess960_rook_lookup() {
        // King on c1, rooks on b1 and g1: inner rooks, not corner files.
        let board = Board::from_board_fen("8/8/8/8/8/8/8/1RK3R1").unwrap();
        assert_eq!(
            castling_rook(&board, Color::White, CastleSide::King),
            Some(sq("g1"))
        );
        assert_eq!(
            castling_rook(&board, Color::White, CastleSide::Queen),
            Some(sq("b1"))
        );
    }

    #[test]
    fn test_resolve_move_en_passant_victim() {
        let board = Board::from_board_fen("8/8/8/3pP3/8/8/8/4K2k").unwrap();
        let mut ctx = GenContext::bare();
        ctx.en_passant = Some(sq("d6"));
        let mv = resolve_move(&board, &ctx, sq("e5"), sq("d6"), None, None).unwrap();
        assert_eq!(mv.capture, Some(sq("d5")));
    }

    #[test]
    fn test_legal_move_symmetry() {
        // A destination is legal iff the pseudo-legal generator offered
        // it and simulating it leaves the mover's king unattacked.
        let mut board =
            Board::from_board_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR").unwrap();
        let ctx = GenContext::bare();
        for from in Square::all() {
            let Some(id) = board.at(from) else { continue };
            let color = board.piece(id).color;
            let legal = legal_moves(&mut board, &ctx, from);
            for to in pseudo_legal(&board, &ctx, from) {
                let promotion = (board.piece(id).kind == PieceKind::Pawn
                    && to.rank() == color.promotion_rank())
                .then_some(PieceKind::Queen);
                let mv = resolve_move(&board, &ctx, from, to, promotion, None).unwrap();
                let undo = board.apply(&mv);
                let safe = !is_in_check(&board, color);
                board.revert(undo);
                assert_eq!(
                    legal.contains(&to),
                    safe,
                    "symmetry broken for {} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_has_any_legal_move_totality() {
        // Position after 1.f3 e5 2.g4 Qh4#: white is mated.
        let mut board =
            Board::from_board_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR").unwrap();
        let ctx = GenContext::bare();
        assert!(is_in_check(&board, Color::White));
        assert!(!has_any_legal_move(&mut board, &ctx, Color::White));
        assert!(has_any_legal_move(&mut board, &ctx, Color::Black));
    }
}
