//! PGN reading and writing

mod reader;
mod writer;

pub use reader::{load_game, load_game_file, parse, read_file, to_game, PgnGame, PgnMove, PgnTags};
pub use writer::{compose, write_file};
