//! Async session orchestrator: human and engine turns, clocks,
//! speculative pondering and cancellation

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::board::Color;
use crate::engine::{
    pick_weighted, CancelToken, ClockState, EngineOptions, EnginePlayer, Evaluation, SearchLimits,
};
use crate::error::{Error, Result};
use crate::player::{CastleConfirmer, Player, PromotionChooser};

use super::history::MoveRecord;
use super::state::{Game, GameOutcome, GameSettings, GameState};

const CLOCK_TICK: Duration = Duration::from_millis(100);

/// Events the presentation layer consumes.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    TurnChanged { turn: Color },
    ClockTick { color: Color, remaining_ms: u64 },
    GameEnded { outcome: GameOutcome },
    EngineNotice { color: Color, message: String },
}

/// One in-flight speculative search, keyed in the registry by the
/// pondering engine's color.
struct PonderTask {
    /// The opponent move the engine is betting on.
    expected_reply: String,
    cancel: CancelToken,
    handle: JoinHandle<Option<String>>,
}

/// Orchestrates one game between two players. The rules core stays
/// synchronous behind a mutex; engine searches, pondering and clock
/// ticking run as cancellable tokio tasks.
pub struct GameSession {
    game: Arc<Mutex<Game>>,
    white: Player,
    black: Player,
    events: mpsc::UnboundedSender<SessionEvent>,
    ponders: Arc<Mutex<HashMap<Color, PonderTask>>>,
    primary_cancel: Mutex<Option<CancelToken>>,
    searching: Arc<AtomicBool>,
    clock_task: Mutex<Option<JoinHandle<()>>>,
    search_limits: SearchLimits,
}

impl GameSession {
    /// Builds a session and the event stream its presentation layer
    /// listens on. Exactly one player per color.
    pub fn new(
        settings: GameSettings,
        white: Player,
        black: Player,
    ) -> Result<(GameSession, mpsc::UnboundedReceiver<SessionEvent>)> {
        let game = Game::new(settings)?;
        let (events, receiver) = mpsc::unbounded_channel();
        Ok((
            GameSession {
                game: Arc::new(Mutex::new(game)),
                white,
                black,
                events,
                ponders: Arc::new(Mutex::new(HashMap::new())),
                primary_cancel: Mutex::new(None),
                searching: Arc::new(AtomicBool::new(false)),
                clock_task: Mutex::new(None),
                search_limits: SearchLimits::default(),
            },
            receiver,
        ))
    }

    pub fn set_search_limits(&mut self, limits: SearchLimits) {
        self.search_limits = limits;
    }

    pub fn player_for(&self, color: Color) -> &Player {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn set_promotion_chooser(&self, chooser: Option<Arc<dyn PromotionChooser>>) {
        self.lock_game().set_promotion_chooser(chooser);
    }

    pub fn set_castle_confirmer(&self, confirmer: Option<Arc<dyn CastleConfirmer>>) {
        self.lock_game().set_castle_confirmer(confirmer);
    }

    fn lock_game(&self) -> std::sync::MutexGuard<'_, Game> {
        self.game.lock().unwrap()
    }

    pub fn fen(&self) -> String {
        self.lock_game().fen()
    }

    pub fn turn(&self) -> Color {
        self.lock_game().turn()
    }

    pub fn state(&self) -> GameState {
        self.lock_game().state()
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.lock_game().outcome()
    }

    pub fn records(&self) -> Vec<MoveRecord> {
        self.lock_game().records().to_vec()
    }

    pub fn is_engine_turn(&self) -> bool {
        !self.player_for(self.turn()).is_human()
    }

    /// Starts play: engines come up, the clock task begins ticking.
    pub async fn start(&self) -> Result<()> {
        for color in [Color::White, Color::Black] {
            if let Player::Engine { handle, .. } = self.player_for(color) {
                if let Err(e) = handle.start().await {
                    self.notice(color, format!("engine failed to start: {}", e));
                    return Err(e);
                }
            }
        }

        self.lock_game().start();
        self.spawn_clock_task();
        let _ = self.events.send(SessionEvent::TurnChanged { turn: self.turn() });
        Ok(())
    }

    pub fn pause(&self) {
        self.lock_game().pause();
    }

    pub fn resume(&self) {
        self.lock_game().resume();
    }

    /// Stops the game: the primary search is cancelled, every pondering
    /// task is stopped and awaited, engines shut down. No background
    /// search survives this call.
    pub async fn stop(&self) {
        if let Some(cancel) = self.primary_cancel.lock().unwrap().clone() {
            cancel.cancel();
        }
        self.stop_ponders().await;
        self.lock_game().stop();

        for color in [Color::White, Color::Black] {
            if let Player::Engine { handle, .. } = self.player_for(color) {
                if let Err(e) = handle.stop().await {
                    self.notice(color, format!("engine failed to stop: {}", e));
                }
            }
        }

        if let Some(task) = self.clock_task.lock().unwrap().take() {
            task.abort();
        }
    }

    /// Plays a move supplied by the presentation layer (a human turn).
    pub async fn submit_move(&self, text: &str) -> Result<MoveRecord> {
        let record = self.lock_game().do_move(text)?;
        self.after_move(&record).await;
        Ok(record)
    }

    /// Undoes the last human ply; when the human faces an automated
    /// opponent, the engine's reply comes off with it. Any in-flight
    /// search is cancelled first and the undo blocks until it finishes.
    pub async fn undo_last_human_move(&self) -> Result<()> {
        if let Some(cancel) = self.primary_cancel.lock().unwrap().clone() {
            cancel.cancel();
        }
        while self.searching.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.stop_ponders().await;

        {
            let mut game = self.lock_game();
            let turn = game.turn();
            let plies = if self.player_for(turn).is_human()
                && !self.player_for(turn.opponent()).is_human()
            {
                2
            } else {
                1
            };
            game.undo_plies(plies)?;
        }
        let _ = self.events.send(SessionEvent::TurnChanged { turn: self.turn() });
        Ok(())
    }

    /// Obtains and plays the automated side's move: a matching ponder
    /// result if one is in flight, else an opening-book pick, else a
    /// fresh engine search. On success a new ponder may be launched for
    /// the opponent's anticipated reply.
    pub async fn play_engine_turn(&self) -> Result<MoveRecord> {
        let (turn, initial_fen, moves, clock_state, last_move) = {
            let game = self.lock_game();
            if game.state() != GameState::InProgress {
                return Err(Error::Engine("game is not in progress".into()));
            }
            (
                game.turn(),
                game.initial_fen().to_string(),
                game.move_list(),
                clock_state_of(&game),
                game.last_record().map(|r| r.coordinate.clone()),
            )
        };

        let Player::Engine { handle, book, .. } = self.player_for(turn) else {
            return Err(Error::Engine("side to move is not automated".into()));
        };
        let handle = Arc::clone(handle);
        let book = book.clone();

        let mut chosen: Option<String> = None;
        let mut ponder_suggestion: Option<String> = None;
        let mut searched = false;

        // 1. A pondering result whose guess matched the move actually
        //    played is a hit: its best move is already (being) computed.
        let pondering = {
            let mut registry = self.ponders.lock().unwrap();
            registry.remove(&turn)
        };
        if let Some(task) = pondering {
            if Some(&task.expected_reply) == last_move.as_ref() {
                if let Ok(Some(best)) = task.handle.await {
                    debug!(color = %turn, mv = %best, "ponder hit");
                    chosen = Some(best);
                }
            } else {
                task.cancel.cancel();
                let _ = task.handle.await;
            }
        }

        // 2. Opening book, sampled roulette-wheel over the weights.
        if chosen.is_none() {
            if let Some(book) = &book {
                let candidates = book.moves_from_history(&moves);
                let mut rng = rand::rng();
                if let Some(pick) = pick_weighted(&candidates, &mut rng) {
                    debug!(color = %turn, mv = %pick.mv, "book move");
                    chosen = Some(pick.mv.clone());
                }
            }
        }

        // 3. Full search under the primary cancellation source.
        if chosen.is_none() {
            handle.set_position(&initial_fen, &moves).await?;
            let cancel = CancelToken::new();
            *self.primary_cancel.lock().unwrap() = Some(cancel.clone());
            self.searching.store(true, Ordering::SeqCst);
            let outcome = handle
                .best_move(&clock_state, &self.search_limits, cancel)
                .await;
            self.searching.store(false, Ordering::SeqCst);
            *self.primary_cancel.lock().unwrap() = None;

            match outcome {
                Ok(found) => {
                    chosen = Some(found.best);
                    ponder_suggestion = found.ponder;
                    searched = true;
                }
                Err(e) => {
                    self.notice(turn, format!("search failed: {}", e));
                    return Err(e);
                }
            }
        }

        let mv = chosen.ok_or_else(|| Error::Engine("engine produced no move".into()))?;

        // Book and ponder-hit moves bypass the search path; keep the
        // engine's internal game in step.
        if !searched {
            if let Err(e) = handle.force_move(&mv).await {
                self.notice(turn, format!("force move failed: {}", e));
            }
        }

        let record = self.lock_game().do_move(&mv)?;
        self.after_move(&record).await;

        if let Some(guess) = ponder_suggestion {
            if self.state() == GameState::InProgress {
                let mut moves_with_guess = moves;
                moves_with_guess.push(mv);
                moves_with_guess.push(guess.clone());
                self.spawn_ponder(turn, handle, guess, initial_fen, moves_with_guess);
            }
        }

        Ok(record)
    }

    /// One-off analysis of an arbitrary position via the given side's
    /// engine.
    pub async fn analyze_position(
        &self,
        color: Color,
        fen: &str,
        depth: Option<u8>,
    ) -> Result<Evaluation> {
        let Player::Engine { handle, .. } = self.player_for(color) else {
            return Err(Error::Engine("player is not automated".into()));
        };
        handle.enter_analyze().await?;
        let result = handle.analyze(fen, depth).await;
        handle.exit_analyze().await?;
        result
    }

    /// Forwards configuration to the given side's engine.
    pub async fn configure_engine(&self, color: Color, options: &EngineOptions) -> Result<()> {
        let Player::Engine { handle, .. } = self.player_for(color) else {
            return Err(Error::Engine("player is not automated".into()));
        };
        handle.apply_options(options).await
    }

    // -- internals ---------------------------------------------------------

    fn notice(&self, color: Color, message: String) {
        warn!(color = %color, message = %message, "engine notice");
        let _ = self
            .events
            .send(SessionEvent::EngineNotice { color, message });
    }

    /// Post-commit bookkeeping: stale ponders stopped, events emitted.
    async fn after_move(&self, record: &MoveRecord) {
        if let Some(mover) = record.color {
            // An engine pondering on this mover's reply bet on a specific
            // move; a mismatch stops that search immediately.
            let stale = {
                let mut registry = self.ponders.lock().unwrap();
                let mismatch = registry
                    .get(&mover.opponent())
                    .is_some_and(|task| task.expected_reply != record.coordinate);
                if mismatch {
                    registry.remove(&mover.opponent())
                } else {
                    None
                }
            };
            if let Some(task) = stale {
                debug!(mv = %record.coordinate, expected = %task.expected_reply, "ponder miss");
                task.cancel.cancel();
                let _ = task.handle.await;
            }
        }

        let (state, outcome, turn) = {
            let game = self.lock_game();
            (game.state(), game.outcome(), game.turn())
        };
        if state == GameState::Ended {
            self.stop_ponders().await;
            if let Some(outcome) = outcome {
                let _ = self.events.send(SessionEvent::GameEnded { outcome });
            }
        } else {
            let _ = self.events.send(SessionEvent::TurnChanged { turn });
        }
    }

    fn spawn_ponder(
        &self,
        color: Color,
        handle: Arc<dyn EnginePlayer>,
        expected_reply: String,
        initial_fen: String,
        moves_with_guess: Vec<String>,
    ) {
        let cancel = CancelToken::new();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            match handle
                .ponder(&initial_fen, &moves_with_guess, task_cancel)
                .await
            {
                Ok(best) => Some(best),
                Err(e) => {
                    debug!(error = %e, "ponder ended without a result");
                    None
                }
            }
        });

        let mut registry = self.ponders.lock().unwrap();
        if let Some(old) = registry.insert(
            color,
            PonderTask {
                expected_reply,
                cancel,
                handle: task,
            },
        ) {
            // One ponder per engine: a newer speculation supersedes.
            old.cancel.cancel();
        }
    }

    /// Cancels and awaits every tracked pondering task.
    async fn stop_ponders(&self) {
        let drained: Vec<PonderTask> = {
            let mut registry = self.ponders.lock().unwrap();
            registry.drain().map(|(_, task)| task).collect()
        };
        for task in drained {
            task.cancel.cancel();
            let _ = task.handle.await;
        }
    }

    /// The clock task decrements the side to move on a fixed tick while
    /// the game is in progress; expiry and a concurrently recorded move
    /// race under the game mutex, so exactly one terminal write wins.
    fn spawn_clock_task(&self) {
        let game = Arc::clone(&self.game);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLOCK_TICK);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut finished = false;
                {
                    let mut g = game.lock().unwrap();
                    match g.state() {
                        GameState::InProgress => {
                            let turn = g.turn();
                            let expired = g.clocks_mut().tick(turn, CLOCK_TICK);
                            let remaining_ms = g.clocks().remaining_ms(turn);
                            let _ = events.send(SessionEvent::ClockTick {
                                color: turn,
                                remaining_ms,
                            });
                            if expired && g.flag_timeout(turn) {
                                if let Some(outcome) = g.outcome() {
                                    let _ = events.send(SessionEvent::GameEnded { outcome });
                                }
                                finished = true;
                            }
                        }
                        GameState::New | GameState::Paused => {}
                        GameState::Ended | GameState::Stopped => finished = true,
                    }
                }
                if finished {
                    break;
                }
            }
        });
        *self.clock_task.lock().unwrap() = Some(task);
    }
}

fn clock_state_of(game: &Game) -> ClockState {
    ClockState {
        white_ms: game.clocks().remaining_ms(Color::White),
        black_ms: game.clocks().remaining_ms(Color::Black),
        white_increment_ms: game.settings().white_increment_ms,
        black_increment_ms: game.settings().black_increment_ms,
    }
}
