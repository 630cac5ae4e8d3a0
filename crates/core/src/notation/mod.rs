//! Textual move and position representations

pub mod fen;
pub mod san;

pub use fen::{compose as compose_fen, parse as parse_fen, repetition_key, STANDARD_START};
pub use san::{algebraic, decorate, to_coordinate};
