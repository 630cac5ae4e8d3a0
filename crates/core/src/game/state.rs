//! The game state machine: turn order, move validation, terminal and
//! draw detection, history and undo

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::board::{Board, Color, File, PieceKind, Square};
use crate::error::{Error, MoveReason, Result};
use crate::moves::{
    can_castle, has_any_legal_move, is_in_check, legal_moves, resolve_move, CastleSide,
    CastlingRights, GenContext, Move,
};
use crate::notation::{self, algebraic, decorate, repetition_key, STANDARD_START};
use crate::player::{CastleConfirmer, PromotionChooser, PromotionContext};

use super::clock::{Clock, ClockPair};
use super::history::{GameStatus, MoveRecord};

/// How a game is set up: starting position, variant, draw threshold and
/// time control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Custom starting FEN; `None` means the standard position (or a
    /// freshly sampled arrangement when `chess960` is set).
    pub initial_fen: Option<String>,
    pub chess960: bool,
    /// Number of occurrences of one position that draws the game.
    pub repetition_threshold: u32,
    pub white_time_ms: u64,
    pub black_time_ms: u64,
    pub white_increment_ms: u64,
    pub black_increment_ms: u64,
}

impl Default for GameSettings {
    fn default() -> GameSettings {
        GameSettings {
            initial_fen: None,
            chess960: false,
            repetition_threshold: 3,
            white_time_ms: 300_000,
            black_time_ms: 300_000,
            white_increment_ms: 0,
            black_increment_ms: 0,
        }
    }
}

/// Lifecycle of a game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    New,
    InProgress,
    Paused,
    Ended,
    Stopped,
}

/// Why a drawn game is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawKind {
    Repetition,
    BareKings,
    SingleMinor,
    SameShadeBishops,
}

/// Terminal result of an ended game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Checkmate { winner: Color },
    Stalemate,
    Draw(DrawKind),
    Timeout { winner: Color },
}

impl GameOutcome {
    pub fn winner(&self) -> Option<Color> {
        match self {
            GameOutcome::Checkmate { winner } | GameOutcome::Timeout { winner } => Some(*winner),
            GameOutcome::Stalemate | GameOutcome::Draw(_) => None,
        }
    }

    /// PGN result token for this outcome.
    pub fn result_token(&self) -> &'static str {
        match self.winner() {
            Some(Color::White) => "1-0",
            Some(Color::Black) => "0-1",
            None => "1/2-1/2",
        }
    }
}

/// A chess game: one board, the full rules of play, and the append-only
/// move history.
pub struct Game {
    settings: GameSettings,
    initial_fen: String,
    board: Board,
    turn: Color,
    rights: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove: u32,
    positions: HashMap<String, u32>,
    records: Vec<MoveRecord>,
    clocks: ClockPair,
    state: GameState,
    outcome: Option<GameOutcome>,
    promotion_chooser: Option<Arc<dyn PromotionChooser>>,
    castle_confirmer: Option<Arc<dyn CastleConfirmer>>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("settings", &self.settings)
            .field("initial_fen", &self.initial_fen)
            .field("board", &self.board)
            .field("turn", &self.turn)
            .field("rights", &self.rights)
            .field("en_passant", &self.en_passant)
            .field("halfmove_clock", &self.halfmove_clock)
            .field("fullmove", &self.fullmove)
            .field("positions", &self.positions)
            .field("records", &self.records)
            .field("clocks", &self.clocks)
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .field("promotion_chooser", &self.promotion_chooser.is_some())
            .field("castle_confirmer", &self.castle_confirmer.is_some())
            .finish()
    }
}

impl Game {
    /// Sets up a fresh game from settings: custom FEN, standard, or a
    /// newly sampled Chess960 arrangement.
    pub fn new(settings: GameSettings) -> Result<Game> {
        let initial_fen = match &settings.initial_fen {
            Some(fen) => fen.clone(),
            None if settings.chess960 => {
                let board = Board::chess960(&mut rand::rng());
                notation::compose_fen(&board, Color::White, &CastlingRights::all(), None, 0, 1)
            }
            None => STANDARD_START.to_string(),
        };

        let fields = notation::parse_fen(&initial_fen)?;
        let clocks = ClockPair::new(
            Clock::new(
                Duration::from_millis(settings.white_time_ms),
                Duration::from_millis(settings.white_increment_ms),
            ),
            Clock::new(
                Duration::from_millis(settings.black_time_ms),
                Duration::from_millis(settings.black_increment_ms),
            ),
        );

        let mut positions = HashMap::new();
        positions.insert(repetition_key(&initial_fen), 1);

        Ok(Game {
            settings,
            initial_fen,
            board: fields.board,
            turn: fields.turn,
            rights: fields.rights,
            en_passant: fields.en_passant,
            halfmove_clock: fields.halfmove_clock,
            fullmove: fields.fullmove,
            positions,
            records: Vec::new(),
            clocks,
            state: GameState::New,
            outcome: None,
            promotion_chooser: None,
            castle_confirmer: None,
        })
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn initial_fen(&self) -> &str {
        &self.initial_fen
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn last_record(&self) -> Option<&MoveRecord> {
        self.records.last()
    }

    /// Coordinate move list from the initial position, the form engine
    /// adapters consume.
    pub fn move_list(&self) -> Vec<String> {
        self.records.iter().map(|r| r.coordinate.clone()).collect()
    }

    pub fn clocks(&self) -> &ClockPair {
        &self.clocks
    }

    pub fn clocks_mut(&mut self) -> &mut ClockPair {
        &mut self.clocks
    }

    pub fn set_promotion_chooser(&mut self, chooser: Option<Arc<dyn PromotionChooser>>) {
        self.promotion_chooser = chooser;
    }

    pub fn set_castle_confirmer(&mut self, confirmer: Option<Arc<dyn CastleConfirmer>>) {
        self.castle_confirmer = confirmer;
    }

    // -- lifecycle ---------------------------------------------------------

    pub fn start(&mut self) {
        if self.state == GameState::New {
            self.state = GameState::InProgress;
        }
    }

    pub fn pause(&mut self) {
        if self.state == GameState::InProgress {
            self.state = GameState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == GameState::Paused {
            self.state = GameState::InProgress;
        }
    }

    pub fn stop(&mut self) {
        if !matches!(self.state, GameState::Ended | GameState::Stopped) {
            self.state = GameState::Stopped;
        }
    }

    /// Ends the game on time. Returns false when another completion path
    /// already closed the game; exactly one terminal write wins.
    pub fn flag_timeout(&mut self, flagged: Color) -> bool {
        if self.state != GameState::InProgress {
            return false;
        }
        self.state = GameState::Ended;
        self.outcome = Some(GameOutcome::Timeout {
            winner: flagged.opponent(),
        });
        true
    }

    // -- position queries --------------------------------------------------

    /// Full six-field FEN of the current position.
    pub fn fen(&self) -> String {
        notation::compose_fen(
            &self.board,
            self.turn,
            &self.rights,
            self.en_passant,
            self.halfmove_clock,
            self.fullmove,
        )
    }

    pub(crate) fn gen_context(&self) -> GenContext {
        GenContext {
            rights: self.rights,
            en_passant: self.en_passant,
            chess960: self.settings.chess960,
        }
    }

    /// Legal destinations for the piece on a square.
    pub fn legal_moves_from(&mut self, from: Square) -> Vec<Square> {
        let ctx = self.gen_context();
        legal_moves(&mut self.board, &ctx, from)
    }

    pub fn is_check(&self, color: Color) -> bool {
        is_in_check(&self.board, color)
    }

    pub fn is_checkmate(&mut self, color: Color) -> bool {
        let ctx = self.gen_context();
        is_in_check(&self.board, color) && !has_any_legal_move(&mut self.board, &ctx, color)
    }

    pub fn is_stalemate(&mut self, color: Color) -> bool {
        let ctx = self.gen_context();
        !is_in_check(&self.board, color) && !has_any_legal_move(&mut self.board, &ctx, color)
    }

    pub fn is_draw(&self) -> bool {
        self.draw_kind().is_some()
    }

    fn draw_kind(&self) -> Option<DrawKind> {
        let key = repetition_key(&self.fen());
        if self.positions.get(&key).copied().unwrap_or(0) >= self.settings.repetition_threshold {
            return Some(DrawKind::Repetition);
        }

        // Insufficient-material heuristics over the pieces still on the
        // board, kings excluded. Deliberately not exhaustive.
        let mut others = Vec::new();
        for color in [Color::White, Color::Black] {
            for (_, id) in self.board.pieces(color) {
                let piece = *self.board.piece(id);
                if piece.kind != PieceKind::King {
                    others.push(piece);
                }
            }
        }
        match others.as_slice() {
            [] => Some(DrawKind::BareKings),
            [p] if matches!(p.kind, PieceKind::Knight | PieceKind::Bishop) => {
                Some(DrawKind::SingleMinor)
            }
            [a, b]
                if a.kind == PieceKind::Bishop
                    && b.kind == PieceKind::Bishop
                    && a.color != b.color
                    && a.home_shade == b.home_shade =>
            {
                Some(DrawKind::SameShadeBishops)
            }
            _ => None,
        }
    }

    /// The per-color castling move strings in coordinate form (king-side,
    /// queen-side), e.g. ("e1g1", "e1c1") for standard white.
    pub fn castling_strings(&self, color: Color) -> (String, String) {
        let rank = color.back_rank();
        let from = Square::new(self.board.king_file(color), rank);
        (
            format!("{}{}", from.notation(), Square::new(File::G, rank).notation()),
            format!("{}{}", from.notation(), Square::new(File::C, rank).notation()),
        )
    }

    // -- moving ------------------------------------------------------------

    /// Validates and plays one move given as text: coordinate form
    /// ("e2e4", "e7e8q"), a castling token ("O-O", "0-0-0") or the
    /// per-color castling coordinate string. Returns the appended record.
    pub fn do_move(&mut self, text: &str) -> Result<MoveRecord> {
        self.do_move_inner(text, true)
    }

    /// Plays a move from trusted history without the legal-move-set
    /// check (capture/en-passant resolution still applies).
    pub fn replay_move(&mut self, text: &str) -> Result<MoveRecord> {
        self.do_move_inner(text, false)
    }

    fn reject(&self, text: &str, reason: MoveReason) -> Error {
        Error::InvalidMove {
            text: text.to_string(),
            reason,
            fen: self.fen(),
        }
    }

    fn do_move_inner(&mut self, raw: &str, validate: bool) -> Result<MoveRecord> {
        if matches!(self.state, GameState::Ended | GameState::Stopped | GameState::Paused) {
            return Err(self.reject(raw, MoveReason::GameOver));
        }
        if self.state == GameState::New {
            self.state = GameState::InProgress;
        }

        let text = raw.trim();
        if text.is_empty() {
            return Err(self.reject(raw, MoveReason::EmptyInput));
        }

        let mv = match self.recognize_castling(text)? {
            Some(side) => self.build_castle_move(text, side)?,
            None => self.build_normal_move(text, validate)?,
        };

        self.commit(mv)
    }

    /// Castling recognition: the O-O tokens, or the precomputed
    /// per-color castling coordinate strings. In Chess960 a one-step
    /// king move can collide with a castling string; the confirmer
    /// callback settles the intent (castle when absent).
    fn recognize_castling(&mut self, text: &str) -> Result<Option<CastleSide>> {
        let token = text.to_ascii_uppercase().replace('0', "O");
        if token == "O-O" {
            return Ok(Some(CastleSide::King));
        }
        if token == "O-O-O" {
            return Ok(Some(CastleSide::Queen));
        }

        let lower = text.to_ascii_lowercase();
        let (king_string, queen_string) = self.castling_strings(self.turn);
        let side = if lower == king_string {
            CastleSide::King
        } else if lower == queen_string {
            CastleSide::Queen
        } else {
            return Ok(None);
        };

        if self.settings.chess960 && self.castling_string_is_ambiguous(side) {
            let confirmed = self
                .castle_confirmer
                .as_ref()
                .map(|c| c.confirm())
                .unwrap_or(true);
            if !confirmed {
                return Ok(None);
            }
        }
        Ok(Some(side))
    }

    /// True when the castling coordinate string is also reachable as a
    /// plain one-step king move.
    fn castling_string_is_ambiguous(&mut self, side: CastleSide) -> bool {
        let Some(king) = self.board.king_square(self.turn) else {
            return false;
        };
        let target = Square::new(side.king_target_file(), self.turn.back_rank());
        let delta = (king.file().index() as i8 - target.file().index() as i8).abs();
        if delta > 1 {
            return false;
        }
        let ctx = self.gen_context();
        legal_moves(&mut self.board, &ctx, king)
            .into_iter()
            .any(|sq| sq == target)
    }

    fn build_castle_move(&mut self, text: &str, side: CastleSide) -> Result<Move> {
        let ctx = self.gen_context();
        if !can_castle(&self.board, &ctx, self.turn, side) {
            return Err(self.reject(text, MoveReason::CannotCastle));
        }
        let king = self
            .board
            .king_square(self.turn)
            .ok_or_else(|| self.reject(text, MoveReason::CannotCastle))?;
        let target = Square::new(side.king_target_file(), self.turn.back_rank());
        resolve_move(&self.board, &ctx, king, target, None, Some(side))
            .ok_or_else(|| self.reject(text, MoveReason::CannotCastle))
    }

    fn build_normal_move(&mut self, text: &str, validate: bool) -> Result<Move> {
        let lower = text.to_ascii_lowercase();
        if !lower.is_ascii() || (lower.len() != 4 && lower.len() != 5) {
            return Err(self.reject(text, MoveReason::BadNotation));
        }

        let from = Square::from_notation(&lower[0..2])
            .map_err(|_| self.reject(text, MoveReason::BadNotation))?;
        let to = Square::from_notation(&lower[2..4])
            .map_err(|_| self.reject(text, MoveReason::BadNotation))?;
        let promo_letter = lower.chars().nth(4);

        let id = self
            .board
            .at(from)
            .ok_or_else(|| self.reject(text, MoveReason::NoPieceOnSource))?;
        let piece = *self.board.piece(id);
        if piece.color != self.turn {
            return Err(self.reject(text, MoveReason::WrongColor));
        }
        if let Some(target) = self.board.at(to) {
            if self.board.piece(target).color == self.turn {
                return Err(self.reject(text, MoveReason::OwnPieceOnTarget));
            }
        }

        let promoting =
            piece.kind == PieceKind::Pawn && to.rank() == self.turn.promotion_rank();
        let promotion = match promo_letter {
            Some(letter) => {
                if !promoting {
                    return Err(self.reject(text, MoveReason::PromotionNotAllowed));
                }
                let kind = PieceKind::from_letter(letter.to_ascii_uppercase())
                    .filter(PieceKind::is_promotion_target)
                    .ok_or_else(|| self.reject(text, MoveReason::BadPromotionPiece))?;
                Some(kind)
            }
            None if promoting => Some(self.choose_promotion(from, to)),
            None => None,
        };

        if validate {
            let ctx = self.gen_context();
            if !legal_moves(&mut self.board, &ctx, from).contains(&to) {
                return Err(self.reject(text, MoveReason::NotLegal));
            }
        }

        let ctx = self.gen_context();
        resolve_move(&self.board, &ctx, from, to, promotion, None)
            .ok_or_else(|| self.reject(text, MoveReason::NotLegal))
    }

    /// Promotion piece when the move text omitted the letter: the
    /// injected chooser when one is registered, queen otherwise.
    fn choose_promotion(&self, from: Square, to: Square) -> PieceKind {
        let ctx = PromotionContext {
            color: self.turn,
            from,
            to,
        };
        let kind = self
            .promotion_chooser
            .as_ref()
            .map(|chooser| chooser.choose(&ctx))
            .unwrap_or(PieceKind::Queen);
        if kind.is_promotion_target() {
            kind
        } else {
            PieceKind::Queen
        }
    }

    fn commit(&mut self, mv: Move) -> Result<MoveRecord> {
        let mover = self.turn;
        let ctx = self.gen_context();

        let id = self
            .board
            .at(mv.from)
            .ok_or_else(|| self.reject(&mv.coordinate(), MoveReason::NoPieceOnSource))?;
        let mover_piece = *self.board.piece(id);
        let captured = mv
            .capture
            .and_then(|sq| self.board.at(sq).map(|vid| (sq, *self.board.piece(vid))));

        let (mut san, mut lan) = algebraic(&mut self.board, &ctx, &mv);

        self.board.apply(&mv);

        // Castling-rights removal triggers.
        match mover_piece.kind {
            PieceKind::King => self.rights.revoke_all(mover),
            PieceKind::Rook if !mover_piece.moved && mv.from.rank() == mover.back_rank() => {
                self.rights.revoke(mover, self.rook_side(mover, mv.from));
            }
            _ => {}
        }
        if let Some((sq, victim)) = captured {
            if victim.kind == PieceKind::Rook
                && !victim.moved
                && sq.rank() == mover.opponent().back_rank()
            {
                self.rights
                    .revoke(mover.opponent(), self.rook_side(mover.opponent(), sq));
            }
        }

        // En-passant target appears only after a pawn double-step.
        self.en_passant = if mover_piece.kind == PieceKind::Pawn
            && (mv.to.rank() as i8 - mv.from.rank() as i8).abs() == 2
        {
            Some(Square::new(
                mv.from.file(),
                ((mv.to.rank() + mv.from.rank()) / 2) as u8,
            ))
        } else {
            None
        };

        if mover_piece.kind == PieceKind::Pawn || captured.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if mover == Color::Black {
            self.fullmove += 1;
        }
        self.clocks.get_mut(mover).grant_increment();
        self.turn = mover.opponent();

        let fen_after = self.fen();
        *self
            .positions
            .entry(repetition_key(&fen_after))
            .or_insert(0) += 1;

        // Terminal detection: exhaust the opponent's legal moves, then
        // the drawable conditions.
        let ctx = self.gen_context();
        let opponent_in_check = is_in_check(&self.board, self.turn);
        let opponent_can_move = has_any_legal_move(&mut self.board, &ctx, self.turn);
        let mut mate = false;
        if !opponent_can_move {
            self.state = GameState::Ended;
            if opponent_in_check {
                mate = true;
                self.outcome = Some(GameOutcome::Checkmate { winner: mover });
            } else {
                self.outcome = Some(GameOutcome::Stalemate);
            }
        } else if let Some(kind) = self.draw_kind() {
            self.state = GameState::Ended;
            self.outcome = Some(GameOutcome::Draw(kind));
        }

        decorate(&mut san, opponent_in_check, mate);
        decorate(&mut lan, opponent_in_check, mate);

        let record = MoveRecord {
            index: self.records.len() as u32,
            color: Some(mover),
            coordinate: mv.coordinate(),
            san,
            lan,
            comment: None,
            annotation: None,
            fen_after,
            status: self.status_snapshot(),
        };
        self.records.push(record.clone());

        tracing::debug!(
            mv = %record.coordinate,
            san = %record.san,
            state = ?self.state,
            "move committed"
        );

        Ok(record)
    }

    /// Which wing an unmoved rook on `sq` guards, judged against the
    /// starting king file (Chess960-safe).
    fn rook_side(&self, color: Color, sq: Square) -> CastleSide {
        if sq.file() > self.board.king_file(color) {
            CastleSide::King
        } else {
            CastleSide::Queen
        }
    }

    fn status_snapshot(&self) -> GameStatus {
        GameStatus {
            rights: self.rights,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove: self.fullmove,
            positions: self.positions.clone(),
            white_ms: Some(self.clocks.remaining_ms(Color::White)),
            black_ms: Some(self.clocks.remaining_ms(Color::Black)),
        }
    }

    /// Attaches a comment to the most recent record (PGN import).
    pub fn attach_comment_to_last(&mut self, comment: String) {
        if let Some(record) = self.records.last_mut() {
            record.comment = Some(comment);
        }
    }

    // -- undo --------------------------------------------------------------

    /// Removes the last `count` plies and restores the game from the
    /// preceding snapshot (or the initial position when none remain).
    pub fn undo_plies(&mut self, count: usize) -> Result<()> {
        let keep = self.records.len().saturating_sub(count);
        self.records.truncate(keep);
        self.restore_tail()
    }

    fn restore_tail(&mut self) -> Result<()> {
        // The starting king files survive the board swap; a FEN with a
        // displaced king cannot re-derive them.
        let king_files = (
            self.board.king_file(Color::White),
            self.board.king_file(Color::Black),
        );

        match self.records.last().cloned() {
            Some(record) => {
                let fields = notation::parse_fen(&record.fen_after)?;
                self.board = fields.board;
                self.turn = fields.turn;
                self.rights = record.status.rights;
                self.en_passant = record.status.en_passant;
                self.halfmove_clock = record.status.halfmove_clock;
                self.fullmove = record.status.fullmove;
                self.positions = record.status.positions.clone();
                if let Some(ms) = record.status.white_ms {
                    self.clocks.set_remaining_ms(Color::White, ms);
                }
                if let Some(ms) = record.status.black_ms {
                    self.clocks.set_remaining_ms(Color::Black, ms);
                }
            }
            None => {
                let fields = notation::parse_fen(&self.initial_fen)?;
                self.board = fields.board;
                self.turn = fields.turn;
                self.rights = fields.rights;
                self.en_passant = fields.en_passant;
                self.halfmove_clock = fields.halfmove_clock;
                self.fullmove = fields.fullmove;
                self.positions = HashMap::from([(repetition_key(&self.initial_fen), 1)]);
                self.clocks
                    .set_remaining_ms(Color::White, self.settings.white_time_ms);
                self.clocks
                    .set_remaining_ms(Color::Black, self.settings.black_time_ms);
            }
        }

        self.board.set_king_file(Color::White, king_files.0);
        self.board.set_king_file(Color::Black, king_files.1);

        self.outcome = None;
        if self.state == GameState::Ended {
            self.state = GameState::InProgress;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> Game {
        let mut g = Game::new(GameSettings::default()).unwrap();
        g.start();
        g
    }

    fn game_from(fen: &str) -> Game {
        let mut g = Game::new(GameSettings {
            initial_fen: Some(fen.to_string()),
            ..GameSettings::default()
        })
        .unwrap();
        g.start();
        g
    }

    fn reason_of(err: Error) -> MoveReason {
        match err {
            Error::InvalidMove { reason, .. } => reason,
            other => panic!("expected InvalidMove, got {:?}", other),
        }
    }

    #[test]
    fn test_e2e4_produces_expected_fen() {
        let mut g = game();
        let record = g.do_move("e2e4").unwrap();
        assert_eq!(
            record.fen_after,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        assert_eq!(record.san, "e4");
        assert_eq!(record.color, Some(Color::White));
    }

    #[test]
    fn test_fools_mate_ends_the_game() {
        let mut g = game();
        g.do_move("f2f3").unwrap();
        g.do_move("e7e5").unwrap();
        g.do_move("g2g4").unwrap();
        let record = g.do_move("d8h4").unwrap();
        assert_eq!(record.san, "Qh4#");
        assert_eq!(g.state(), GameState::Ended);
        assert_eq!(
            g.outcome(),
            Some(GameOutcome::Checkmate {
                winner: Color::Black
            })
        );
        // No further moves accepted.
        assert_eq!(
            reason_of(g.do_move("e2e4").unwrap_err()),
            MoveReason::GameOver
        );
    }

    #[test]
    fn test_kingside_castle_moves_both_pieces() {
        let mut g = game_from("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let record = g.do_move("e1g1").unwrap();
        assert_eq!(record.san, "O-O");
        let fen = g.fen();
        assert!(fen.starts_with("r3k2r/8/8/8/8/8/8/R4RK1"));
        // Both white rights gone, black rights intact.
        assert!(fen.contains(" kq "));
    }

    #[test]
    fn test_castle_in_check_rejected() {
        let mut g = game_from("r3k2r/8/8/8/4r3/8/8/R3K2R w KQkq - 0 1");
        assert_eq!(
            reason_of(g.do_move("e1g1").unwrap_err()),
            MoveReason::CannotCastle
        );
        assert_eq!(
            reason_of(g.do_move("O-O-O").unwrap_err()),
            MoveReason::CannotCastle
        );
    }

    #[test]
    fn test_castle_token_forms() {
        let mut g = game_from("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        g.do_move("O-O").unwrap();
        let record = g.do_move("0-0-0").unwrap();
        assert_eq!(record.san, "O-O-O");
        assert!(g.fen().starts_with("2kr3r/8/8/8/8/8/8/R4RK1"));
    }

    #[test]
    fn test_rook_move_drops_one_right() {
        let mut g = game_from("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        g.do_move("h1h2").unwrap();
        assert!(g.fen().contains(" Qkq "));
    }

    #[test]
    fn test_rook_capture_drops_opponent_right() {
        let mut g = game_from("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        g.do_move("a1a8").unwrap();
        // White queen-side rook left a1 (drops Q) and took a8 (drops q).
        assert!(g.fen().contains(" Kk "), "fen was {}", g.fen());
    }

    #[test]
    fn test_en_passant_removes_the_passed_pawn() {
        let mut g = game();
        g.do_move("e2e4").unwrap();
        g.do_move("a7a6").unwrap();
        g.do_move("e4e5").unwrap();
        let record = g.do_move("d7d5").unwrap();
        assert!(record.fen_after.contains(" d6 "));
        let record = g.do_move("e5d6").unwrap();
        assert_eq!(record.san, "exd6");
        // The black pawn that stood on d5 is gone; d6 holds the white pawn.
        assert!(record.fen_after.starts_with("rnbqkbnr/1pp1pppp/p2P4/8/8/8/PPPP1PPP/RNBQKBNR"));
    }

    #[test]
    fn test_wrong_color_and_same_color_target() {
        let mut g = game();
        assert_eq!(
            reason_of(g.do_move("e7e5").unwrap_err()),
            MoveReason::WrongColor
        );
        assert_eq!(
            reason_of(g.do_move("d1e1").unwrap_err()),
            MoveReason::OwnPieceOnTarget
        );
        assert_eq!(
            reason_of(g.do_move("e3e4").unwrap_err()),
            MoveReason::NoPieceOnSource
        );
        assert_eq!(
            reason_of(g.do_move("e2e5").unwrap_err()),
            MoveReason::NotLegal
        );
        assert_eq!(reason_of(g.do_move("").unwrap_err()), MoveReason::EmptyInput);
        assert_eq!(
            reason_of(g.do_move("e2x9").unwrap_err()),
            MoveReason::BadNotation
        );
    }

    #[test]
    fn test_invalid_move_carries_fen_and_text() {
        let mut g = game();
        match g.do_move("e7e5").unwrap_err() {
            Error::InvalidMove { text, reason, fen } => {
                assert_eq!(text, "e7e5");
                assert_eq!(reason, MoveReason::WrongColor);
                assert_eq!(fen, STANDARD_START);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_promotion_letter_validation() {
        let mut g = game_from("8/4P3/8/8/8/8/8/4K2k w - - 0 1");
        assert_eq!(
            reason_of(g.do_move("e7e8k").unwrap_err()),
            MoveReason::BadPromotionPiece
        );
        let mut g = game();
        assert_eq!(
            reason_of(g.do_move("e2e4q").unwrap_err()),
            MoveReason::PromotionNotAllowed
        );
    }

    #[test]
    fn test_promotion_defaults_to_queen() {
        let mut g = game_from("8/4P3/8/8/8/8/8/4K2k w - - 0 1");
        let record = g.do_move("e7e8").unwrap();
        assert_eq!(record.san, "e8=Q");
        assert!(record.coordinate.ends_with('q'));
        assert!(record.fen_after.starts_with("4Q3/"));
    }

    #[test]
    fn test_promotion_respects_chooser() {
        struct AlwaysKnight;
        impl PromotionChooser for AlwaysKnight {
            fn choose(&self, _ctx: &PromotionContext) -> PieceKind {
                PieceKind::Knight
            }
        }
        let mut g = game_from("8/4P3/8/8/8/8/8/4K2k w - - 0 1");
        g.set_promotion_chooser(Some(Arc::new(AlwaysKnight)));
        let record = g.do_move("e7e8").unwrap();
        assert_eq!(record.san, "e8=N");
    }

    #[test]
    fn test_repetition_draw_exactly_at_threshold() {
        let mut g = game();
        // Knight shuffles return to the start position (white to move)
        // once per four plies; the initial occurrence counts as the first.
        let cycle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        for mv in &cycle {
            g.do_move(mv).unwrap();
            assert!(!g.is_draw(), "draw too early after {}", mv);
        }
        for (i, mv) in cycle.iter().enumerate() {
            g.do_move(mv).unwrap();
            if i < cycle.len() - 1 {
                assert!(!g.is_draw(), "draw too early in second cycle at {}", mv);
                assert_eq!(g.state(), GameState::InProgress);
            }
        }
        // Third occurrence of the starting position: draw, exactly now.
        assert!(g.is_draw());
        assert_eq!(g.state(), GameState::Ended);
        assert_eq!(g.outcome(), Some(GameOutcome::Draw(DrawKind::Repetition)));
    }

    #[test]
    fn test_stalemate_detected() {
        // Black king a8, white queen c7, white king c8...: classic corner
        // stalemate with black to move after Qc7.
        let mut g = game_from("k7/8/2K5/8/8/8/8/1Q6 w - - 0 1");
        let record = g.do_move("b1b6").unwrap();
        assert_eq!(g.state(), GameState::Ended);
        assert_eq!(g.outcome(), Some(GameOutcome::Stalemate));
        // Stalemate is not check.
        assert!(!record.san.ends_with('+') && !record.san.ends_with('#'));
    }

    #[test]
    fn test_insufficient_material_draws() {
        // The white king takes the last black piece: bare kings.
        let mut g = game_from("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1");
        g.do_move("e1e2").unwrap();
        assert_eq!(g.outcome(), Some(GameOutcome::Draw(DrawKind::BareKings)));

        // The knight takes the last black piece: king + single minor.
        let mut g = game_from("4k3/8/8/8/8/1N6/3r4/4K3 w - - 0 1");
        g.do_move("b3d2").unwrap();
        assert_eq!(g.outcome(), Some(GameOutcome::Draw(DrawKind::SingleMinor)));
    }

    #[test]
    fn test_same_shade_bishops_draw() {
        // White bishop started on f1, black bishop on c8 — both light
        // squares. Capturing the queen leaves the drawn bishop pair.
        let mut g = game_from("2b1k3/8/8/8/8/8/4q3/3K1B2 w - - 0 1");
        g.do_move("f1e2").unwrap();
        assert_eq!(
            g.outcome(),
            Some(GameOutcome::Draw(DrawKind::SameShadeBishops))
        );
    }

    #[test]
    fn test_undo_restores_initial_position() {
        let mut g = game();
        g.do_move("e2e4").unwrap();
        g.do_move("e7e5").unwrap();
        g.undo_plies(2).unwrap();
        assert_eq!(g.fen(), STANDARD_START);
        assert_eq!(g.records().len(), 0);
        assert_eq!(g.turn(), Color::White);
        // The game is playable again.
        g.do_move("d2d4").unwrap();
    }

    #[test]
    fn test_undo_single_ply_restores_snapshot() {
        let mut g = game();
        g.do_move("e2e4").unwrap();
        let fen_after_e4 = g.fen();
        g.do_move("e7e5").unwrap();
        g.undo_plies(1).unwrap();
        assert_eq!(g.fen(), fen_after_e4);
        assert_eq!(g.turn(), Color::Black);
        assert_eq!(g.records().len(), 1);
    }

    #[test]
    fn test_undo_reopens_ended_game() {
        let mut g = game();
        g.do_move("f2f3").unwrap();
        g.do_move("e7e5").unwrap();
        g.do_move("g2g4").unwrap();
        g.do_move("d8h4").unwrap();
        assert_eq!(g.state(), GameState::Ended);
        g.undo_plies(1).unwrap();
        assert_eq!(g.state(), GameState::InProgress);
        assert_eq!(g.outcome(), None);
        // Black can choose differently now.
        g.do_move("d8e7").unwrap();
    }

    #[test]
    fn test_timeout_is_single_shot() {
        let mut g = game();
        g.do_move("e2e4").unwrap();
        assert!(g.flag_timeout(Color::Black));
        assert_eq!(
            g.outcome(),
            Some(GameOutcome::Timeout {
                winner: Color::White
            })
        );
        // Second completion path loses the race.
        assert!(!g.flag_timeout(Color::White));
        assert_eq!(
            reason_of(g.do_move("e7e5").unwrap_err()),
            MoveReason::GameOver
        );
    }

    #[test]
    fn test_moves_rejected_while_paused() {
        let mut g = game();
        g.pause();
        assert_eq!(
            reason_of(g.do_move("e2e4").unwrap_err()),
            MoveReason::GameOver
        );
        g.resume();
        g.do_move("e2e4").unwrap();
    }

    #[test]
    fn test_replay_skips_validation_but_resolves_captures() {
        let mut g = game();
        g.replay_move("e2e4").unwrap();
        g.replay_move("d7d5").unwrap();
        let record = g.replay_move("e4d5").unwrap();
        assert_eq!(record.san, "exd5");
    }

    #[test]
    fn test_checkmate_stalemate_totality() {
        let mut g = game_from("k7/8/1K6/8/8/8/8/7Q w - - 0 1");
        // Before the mating move black still has b8.
        assert!(!g.is_checkmate(Color::Black));
        assert!(!g.is_stalemate(Color::Black));
        let record = g.do_move("h1h8").unwrap();
        assert_eq!(record.san, "Qh8#");
        assert!(g.is_checkmate(Color::Black));
        assert!(!g.is_stalemate(Color::Black));
        assert_eq!(
            g.outcome(),
            Some(GameOutcome::Checkmate {
                winner: Color::White
            })
        );
    }

    #[test]
    fn test_chess960_castling_strings() {
        let mut g = Game::new(GameSettings {
            initial_fen: Some("1rk3r1/pppppppp/8/8/8/8/PPPPPPPP/1RK3R1 w KQkq - 0 1".to_string()),
            chess960: true,
            ..GameSettings::default()
        })
        .unwrap();
        g.start();
        let (king_string, queen_string) = g.castling_strings(Color::White);
        assert_eq!(king_string, "c1g1");
        assert_eq!(queen_string, "c1c1");
    }
}
