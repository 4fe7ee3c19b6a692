//! Audiotap — audio signal graph engine
//!
//! Decodes an audio file into PCM and plays it through a fixed
//! Source → Analyser → Gain → Output graph with transport control and
//! on-demand spectrum snapshots.
//!
//! ## Quick start
//!
//! ```no_run
//! use audiotap::audio::AudioEngine;
//!
//! let mut engine = AudioEngine::new();
//! engine.initialize()?;
//! engine.load(std::fs::read("clip.wav")?)?;
//! engine.play()?;
//! let bins = engine.sample();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod config;
pub mod error;
