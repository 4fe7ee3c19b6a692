//! Configuration for the audiotap engine
//!
//! Constants live in per-concern modules; [`EngineConfig`] bundles the
//! tunables a caller may override at runtime.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TapError};

/// Analysis-related configuration
pub mod audio {
    /// Analyser transform window (samples)
    pub const FFT_SIZE: usize = 2048;

    /// Smallest accepted transform window
    pub const MIN_FFT_SIZE: usize = 32;

    /// Largest accepted transform window
    pub const MAX_FFT_SIZE: usize = 32768;

    /// Level mapped to byte 0 in the byte spectrum
    pub const MIN_DECIBELS: f32 = -100.0;

    /// Level mapped to byte 255 in the byte spectrum
    pub const MAX_DECIBELS: f32 = -30.0;

    /// Weight of the previous snapshot when smoothing bins (0.0-1.0)
    pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;

    /// Frames the render path accumulates before publishing to the analyser
    pub const RENDER_QUANTUM_FRAMES: usize = 128;
}

/// Gain stage configuration
pub mod gain {
    pub const DEFAULT_GAIN: f32 = 1.0;
    pub const MIN_GAIN: f32 = 0.0;
    pub const MAX_GAIN: f32 = 2.0;
}

/// Timeout configuration
pub mod timeouts {
    /// Maximum time `load` waits for a decode in seconds
    pub const DECODE_TIMEOUT_SECS: u64 = 30;

    /// Maximum time to wait for the output device to open in seconds
    pub const CONTEXT_INIT_TIMEOUT_SECS: u64 = 5;
}

/// Channel capacities
pub mod channels {
    /// Engine event channel capacity; events beyond this are dropped
    pub const EVENT_CAPACITY: usize = 64;
}

/// Runtime-tunable engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub initial_gain: f32,
    pub decode_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fft_size: audio::FFT_SIZE,
            smoothing_time_constant: audio::SMOOTHING_TIME_CONSTANT,
            min_decibels: audio::MIN_DECIBELS,
            max_decibels: audio::MAX_DECIBELS,
            initial_gain: gain::DEFAULT_GAIN,
            decode_timeout_secs: timeouts::DECODE_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    /// Check every field against the ranges the graph can honour
    pub fn validate(&self) -> Result<()> {
        let n = self.fft_size;
        if !n.is_power_of_two() || !(audio::MIN_FFT_SIZE..=audio::MAX_FFT_SIZE).contains(&n) {
            return Err(TapError::Config(format!(
                "fft_size must be a power of two in {}..={}, got {}",
                audio::MIN_FFT_SIZE,
                audio::MAX_FFT_SIZE,
                n
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(TapError::Config(format!(
                "smoothing_time_constant must be in 0.0..=1.0, got {}",
                self.smoothing_time_constant
            )));
        }
        let (lo, hi) = (self.min_decibels, self.max_decibels);
        if lo.is_nan() || hi.is_nan() || lo >= hi {
            return Err(TapError::Config(format!(
                "min_decibels ({}) must be below max_decibels ({})",
                self.min_decibels, self.max_decibels
            )));
        }
        if !(gain::MIN_GAIN..=gain::MAX_GAIN).contains(&self.initial_gain) {
            return Err(TapError::Config(format!(
                "initial_gain must be in {}..={}, got {}",
                gain::MIN_GAIN,
                gain::MAX_GAIN,
                self.initial_gain
            )));
        }
        if self.decode_timeout_secs == 0 {
            return Err(TapError::Config(
                "decode_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of frequency bins the analyser reports
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}
