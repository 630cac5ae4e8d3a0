//! Game state machine, history, clocks and the session orchestrator

mod clock;
mod history;
mod session;
mod state;

pub use clock::{Clock, ClockPair};
pub use history::{repair_records, GameStatus, MoveRecord};
pub use session::{GameSession, SessionEvent};
pub use state::{DrawKind, Game, GameOutcome, GameSettings, GameState};
