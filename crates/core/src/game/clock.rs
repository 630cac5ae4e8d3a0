//! Per-side countdown clocks

use std::time::Duration;

use crate::board::Color;

/// One side's clock: time remaining plus the per-move increment granted
/// when that side completes a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub remaining: Duration,
    pub increment: Duration,
}

impl Clock {
    pub fn new(remaining: Duration, increment: Duration) -> Clock {
        Clock {
            remaining,
            increment,
        }
    }

    /// Deducts elapsed time; returns true when the flag falls.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(elapsed);
        self.remaining.is_zero()
    }

    pub fn grant_increment(&mut self) {
        self.remaining += self.increment;
    }
}

/// Both clocks of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockPair {
    white: Clock,
    black: Clock,
}

impl ClockPair {
    pub fn new(white: Clock, black: Clock) -> ClockPair {
        ClockPair { white, black }
    }

    pub fn get(&self, color: Color) -> &Clock {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn get_mut(&mut self, color: Color) -> &mut Clock {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Deducts from one side; returns true when that side is out of time.
    pub fn tick(&mut self, color: Color, elapsed: Duration) -> bool {
        self.get_mut(color).tick(elapsed)
    }

    pub fn remaining_ms(&self, color: Color) -> u64 {
        self.get(color).remaining.as_millis() as u64
    }

    pub fn set_remaining_ms(&mut self, color: Color, ms: u64) {
        self.get_mut(color).remaining = Duration::from_millis(ms);
    }
}
