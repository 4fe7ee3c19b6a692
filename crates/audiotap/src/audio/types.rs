//! Shared audio types
//!
//! Pure data types used across the audio subsystem.

use std::fmt;
use std::time::Duration;

/// Lifecycle of the engine facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// No processing context yet
    #[default]
    Uninitialized,
    /// Context and graph exist, no source loaded
    Idle,
    /// A source is wired and ready to start
    Loaded,
    /// The loaded source is rendering
    Playing,
}

impl EngineState {
    pub fn has_source(&self) -> bool {
        matches!(self, EngineState::Loaded | EngineState::Playing)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Uninitialized => write!(f, "Uninitialized"),
            EngineState::Idle => write!(f, "Idle"),
            EngineState::Loaded => write!(f, "Loaded"),
            EngineState::Playing => write!(f, "Playing"),
        }
    }
}

/// Codec information for a decoded buffer
#[derive(Debug, Clone, PartialEq)]
pub struct CodecInfo {
    pub codec_name: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: Option<u32>,
    /// Total duration of the decoded audio
    pub duration: Duration,
}

impl fmt::Display for CodecInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel_str = match self.channels {
            1 => "Mono".to_string(),
            2 => "Stereo".to_string(),
            n => format!("{} ch", n),
        };
        write!(f, "{}", self.codec_name)?;
        write!(f, " · {} Hz", self.sample_rate)?;
        if let Some(bits) = self.bits_per_sample {
            write!(f, " · {}-bit", bits)?;
        }
        write!(f, " · {}", channel_str)?;
        write!(f, " · {:.2} s", self.duration.as_secs_f64())
    }
}

/// Events emitted by the audio engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Processing context opened
    Initialized,
    /// A new source was decoded and wired
    Loaded(CodecInfo),
    /// A decode finished with an error
    LoadFailed(String),
    /// Playback started
    Started,
    /// Playback halted by `stop` or by replacing the source
    Stopped,
    /// The source played through to the end of its buffer
    Ended,
}

/// Progress of a non-blocking load
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// No load outstanding
    Idle,
    /// Decode still running
    Pending,
    /// Decode finished and the source is wired
    Loaded(CodecInfo),
}
