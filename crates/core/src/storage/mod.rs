//! Saved-game persistence

mod save;

pub use save::{from_bytes, load_file, save_file, to_bytes, SavedGame, SAVE_VERSION};
