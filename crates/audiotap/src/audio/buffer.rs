//! Decoded PCM buffer
//!
//! `DecodedBuffer` is the immutable output of the decoder: interleaved f32
//! samples plus the channel count and rate the source encoded. Cloning is
//! cheap; the samples are shared.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TapError};

use super::types::CodecInfo;

#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
    codec_name: String,
    bits_per_sample: Option<u32>,
}

impl DecodedBuffer {
    /// Wrap interleaved samples. The sample count must be a whole number of frames.
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        if channels == 0 {
            return Err(TapError::Decode("Buffer has no channels".to_string()));
        }
        if sample_rate == 0 {
            return Err(TapError::Decode("Buffer has a zero sample rate".to_string()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(TapError::Decode(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples: samples.into(),
            channels,
            sample_rate,
            codec_name: "PCM 32-bit Float".to_string(),
            bits_per_sample: None,
        })
    }

    /// Attach the name of the codec the samples came from
    pub fn with_codec(mut self, codec_name: impl Into<String>, bits_per_sample: Option<u32>) -> Self {
        self.codec_name = codec_name.into();
        self.bits_per_sample = bits_per_sample;
        self
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub(crate) fn shared_samples(&self) -> Arc<[f32]> {
        self.samples.clone()
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn codec_info(&self) -> CodecInfo {
        CodecInfo {
            codec_name: self.codec_name.clone(),
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            duration: self.duration(),
        }
    }
}
