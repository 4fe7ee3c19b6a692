//! Data persistence
//!
//! JSON storage layer and user settings.

pub mod settings;
pub mod storage;

pub use settings::Settings;
pub use storage::{config_dir, data_path, load, save};
