//! Application settings management
//!
//! User preferences persisted as JSON.

use std::path::Path;

use audiotap::config::gain::{DEFAULT_GAIN, MAX_GAIN, MIN_GAIN};
use audiotap::config::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::config::upload::DEFAULT_API_URL;
use crate::data::storage;
use crate::error::{AppError, Result};

/// Settings data file name
const SETTINGS_FILE: &str = "settings.json";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // === Audio ===
    /// Volume level (0.0 - 2.0)
    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default)]
    pub muted: bool,

    // === Upload ===
    /// Base URL of the upload service
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Send the file to the server before playing it
    #[serde(default = "default_true")]
    pub upload_before_play: bool,

    // === Engine ===
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_volume() -> f32 {
    DEFAULT_GAIN
}

fn default_server_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            muted: false,
            server_url: default_server_url(),
            upload_before_play: true,
            engine: EngineConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from default storage location
    pub fn load() -> Result<Self> {
        Ok(storage::load::<Settings>(SETTINGS_FILE)?.unwrap_or_default())
    }

    /// Load settings from a specific path; a missing file gives defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(storage::load_from::<Settings>(path)?.unwrap_or_default())
    }

    /// Save settings to default storage location
    pub fn save(&self) -> Result<()> {
        storage::save(SETTINGS_FILE, self)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        storage::save_to(path, self)
    }

    /// Set volume (clamped to the engine's gain range)
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_nan() {
            self.volume = volume.clamp(MIN_GAIN, MAX_GAIN);
        }
    }

    /// Get effective volume (considering mute)
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Engine config with the initial gain taken from the volume settings.
    ///
    /// A hand-edited volume outside the gain range is clamped here, the same
    /// way `set_volume` clamps it.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let config = EngineConfig {
            initial_gain: self.effective_volume().clamp(MIN_GAIN, MAX_GAIN),
            ..self.engine.clone()
        };
        config.validate().map_err(|e| AppError::Config(e.to_string()))?;
        Ok(config)
    }
}
