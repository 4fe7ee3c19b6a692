//! Analysis tap
//!
//! `AnalyserNode` keeps the most recent `fft_size` mono samples that passed
//! through the graph and turns them into spectrum snapshots on demand.
//! `AnalyzingTap` wraps a `rodio::Source` on the render path and feeds the
//! node without altering the samples.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::Source;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::config::audio::RENDER_QUANTUM_FRAMES;
use crate::config::EngineConfig;

use super::node::{AudioNode, NodeId};

/// Analyser parameters, fixed for the node's lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserOptions {
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl From<&EngineConfig> for AnalyserOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            fft_size: config.fft_size,
            smoothing_time_constant: config.smoothing_time_constant,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }
}

impl Default for AnalyserOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

struct AnalyserState {
    /// Circular window of mono samples; `write_pos` is the oldest slot
    ring: Vec<f32>,
    write_pos: usize,
    /// Smoothed linear magnitude per bin
    smoothed: Vec<f32>,
    frames_seen: u64,
}

/// Spectrum tap shared between the control thread and the render path
#[derive(Clone)]
pub struct AnalyserNode {
    id: NodeId,
    options: AnalyserOptions,
    state: Arc<Mutex<AnalyserState>>,
    fft: Arc<dyn Fft<f32>>,
    window: Arc<[f32]>,
}

impl AudioNode for AnalyserNode {
    fn id(&self) -> NodeId {
        self.id
    }
}

impl AnalyserNode {
    pub(crate) fn new(id: NodeId, options: AnalyserOptions) -> Self {
        let n = options.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(n);
        let window: Vec<f32> = (0..n).map(|i| blackman(i, n)).collect();
        Self {
            id,
            options,
            state: Arc::new(Mutex::new(AnalyserState {
                ring: vec![0.0; n],
                write_pos: 0,
                smoothed: vec![0.0; n / 2],
                frames_seen: 0,
            })),
            fft,
            window: window.into(),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.options.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.options.fft_size / 2
    }

    pub fn min_decibels(&self) -> f32 {
        self.options.min_decibels
    }

    pub fn max_decibels(&self) -> f32 {
        self.options.max_decibels
    }

    pub fn smoothing_time_constant(&self) -> f32 {
        self.options.smoothing_time_constant
    }

    /// Total mono frames written since creation or the last `clear`
    pub fn frames_seen(&self) -> u64 {
        self.state.lock().map(|s| s.frames_seen).unwrap_or(0)
    }

    /// Append mono frames to the window (render path)
    pub(crate) fn write(&self, frames: &[f32]) {
        if let Ok(mut state) = self.state.lock() {
            let n = state.ring.len();
            for &sample in frames {
                let pos = state.write_pos;
                state.ring[pos] = sample;
                state.write_pos = (pos + 1) % n;
            }
            state.frames_seen += frames.len() as u64;
        }
    }

    /// Forget all buffered samples and smoothing history
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.ring.iter_mut().for_each(|s| *s = 0.0);
            state.smoothed.iter_mut().for_each(|s| *s = 0.0);
            state.write_pos = 0;
            state.frames_seen = 0;
        }
    }

    /// Window contents ordered oldest to newest
    fn window_samples(&self) -> Vec<f32> {
        match self.state.lock() {
            Ok(state) => {
                let (newer, older) = state.ring.split_at(state.write_pos);
                older.iter().chain(newer.iter()).copied().collect()
            }
            Err(_) => vec![0.0; self.options.fft_size],
        }
    }

    /// Smoothed spectrum in dB per bin (`-inf` for silent bins)
    pub fn float_frequency_data(&self) -> Vec<f32> {
        let n = self.options.fft_size;
        let mut buffer: Vec<Complex<f32>> = self
            .window_samples()
            .iter()
            .zip(self.window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        let tau = self.options.smoothing_time_constant;
        let norm = 1.0 / n as f32;
        let mut smoothed = vec![0.0f32; n / 2];

        if let Ok(mut state) = self.state.lock() {
            for (k, prev) in state.smoothed.iter_mut().enumerate() {
                let magnitude = buffer[k].norm() * norm;
                let mut next = tau * *prev + (1.0 - tau) * magnitude;
                if !next.is_finite() {
                    next = 0.0;
                }
                *prev = next;
                smoothed[k] = next;
            }
        }

        smoothed.into_iter().map(|m| 20.0 * m.log10()).collect()
    }

    /// Spectrum mapped linearly from [min_decibels, max_decibels] onto 0..=255
    pub fn byte_frequency_data(&self) -> Vec<u8> {
        let lo = self.options.min_decibels;
        let range = self.options.max_decibels - lo;
        self.float_frequency_data()
            .into_iter()
            .map(|db| {
                let scaled = (255.0 / range * (db - lo)).floor();
                // NaN and -inf both land on 0
                if scaled.is_nan() {
                    0
                } else {
                    scaled.clamp(0.0, 255.0) as u8
                }
            })
            .collect()
    }

    /// Waveform bytes centred on 128
    pub fn byte_time_domain_data(&self) -> Vec<u8> {
        self.window_samples()
            .into_iter()
            .map(|s| (128.0 * (1.0 + s)).floor().clamp(0.0, 255.0) as u8)
            .collect()
    }
}

fn blackman(i: usize, n: usize) -> f32 {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    let x = i as f32 / n as f32;
    A0 - A1 * (2.0 * std::f32::consts::PI * x).cos() + A2 * (4.0 * std::f32::consts::PI * x).cos()
}

/// Render-path wrapper that mirrors samples into an `AnalyserNode`
pub struct AnalyzingTap<S> {
    inner: S,
    analyser: AnalyserNode,
    channels: u16,
    sample_rate: u32,
    frame_sum: f32,
    channel_idx: u16,
    quantum: Vec<f32>,
    drained: bool,
}

impl<S> AnalyzingTap<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, analyser: AnalyserNode) -> Self {
        let channels = source.channels().max(1);
        let sample_rate = source.sample_rate();
        Self {
            inner: source,
            analyser,
            channels,
            sample_rate,
            frame_sum: 0.0,
            channel_idx: 0,
            quantum: Vec::with_capacity(RENDER_QUANTUM_FRAMES),
            drained: false,
        }
    }

    fn flush(&mut self) {
        if !self.quantum.is_empty() {
            self.analyser.write(&self.quantum);
            self.quantum.clear();
        }
    }
}

impl<S> Iterator for AnalyzingTap<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(sample) = self.inner.next() else {
            if !self.drained {
                self.drained = true;
                self.flush();
                // Nothing feeds the window once the source is done
                self.analyser.clear();
            }
            return None;
        };

        // Down-mix to mono, one frame at a time
        self.frame_sum += sample;
        self.channel_idx += 1;
        if self.channel_idx == self.channels {
            self.quantum.push(self.frame_sum / self.channels as f32);
            self.frame_sum = 0.0;
            self.channel_idx = 0;
            if self.quantum.len() >= RENDER_QUANTUM_FRAMES {
                self.flush();
            }
        }

        Some(sample)
    }
}

impl<S> Source for AnalyzingTap<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}
