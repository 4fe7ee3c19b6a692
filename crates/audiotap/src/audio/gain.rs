//! Gain stage
//!
//! `GainNode` owns the shared gain value; `GainStage` applies it on the render
//! path. The value is stored as f32 bits in an atomic so the control thread
//! can change it mid-playback without locking.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rodio::Source;

use crate::config::gain::{MAX_GAIN, MIN_GAIN};
use crate::error::{Result, TapError};

use super::node::{AudioNode, NodeId};

#[derive(Debug, Clone)]
pub struct GainNode {
    id: NodeId,
    gain: Arc<AtomicU32>,
}

impl AudioNode for GainNode {
    fn id(&self) -> NodeId {
        self.id
    }
}

impl GainNode {
    pub(crate) fn new(id: NodeId, initial: f32) -> Self {
        Self {
            id,
            gain: Arc::new(AtomicU32::new(initial.clamp(MIN_GAIN, MAX_GAIN).to_bits())),
        }
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    /// Set the gain, clamped to `MIN_GAIN..=MAX_GAIN`. Returns the applied value.
    pub fn set_gain(&self, value: f32) -> Result<f32> {
        if value.is_nan() {
            return Err(TapError::InvalidGain(value));
        }
        let applied = value.clamp(MIN_GAIN, MAX_GAIN);
        self.gain.store(applied.to_bits(), Ordering::Relaxed);
        Ok(applied)
    }

    /// Wrap a render-path source so it is scaled by this node's gain
    pub(crate) fn stage<S>(&self, source: S) -> GainStage<S>
    where
        S: Source<Item = f32>,
    {
        GainStage {
            inner: source,
            gain: self.gain.clone(),
        }
    }
}

/// Render-path wrapper multiplying every sample by the current gain
pub struct GainStage<S> {
    inner: S,
    gain: Arc<AtomicU32>,
}

impl<S> Iterator for GainStage<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.inner.next()?;
        Some(sample * f32::from_bits(self.gain.load(Ordering::Relaxed)))
    }
}

impl<S> Source for GainStage<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}
