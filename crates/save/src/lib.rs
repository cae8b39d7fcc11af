//! Save/load for the city simulation.
//!
//! A save file is a bitcode-encoded [`SaveData`] snapshot, lz4-compressed
//! and wrapped in a checksummed header, written atomically so a crash never
//! clobbers the previous save. Resources registered with the simulation's
//! `SaveableRegistry` ride along in an extension map without this crate
//! knowing their types, so the format survives new systems being added.

mod atomic_write;
mod file_header;
mod save_data;
mod save_error;
mod save_plugin;

pub use save_data::{apply_save_data, gather_save_data, SaveData, SAVE_FORMAT_VERSION};
pub use save_error::SaveError;
pub use save_plugin::{
    default_save_path, load_game, new_game, save_game, LoadGameEvent, NewGameEvent, SaveGameEvent,
    SavePlugin,
};
