//! Audio engine
//!
//! Facade over the processing context and the signal graph. Calls are made
//! from one control thread; decoding runs on a background thread and
//! rendering on the output's own thread. Lifecycle changes are reported as
//! [`EngineEvent`]s on a bounded channel.

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::config::channels::EVENT_CAPACITY;
use crate::config::EngineConfig;
use crate::error::{Result, TapError};

use super::analyzer::AnalyserNode;
use super::buffer::DecodedBuffer;
use super::context::{AudioBackend, DeviceBackend, OfflineBackend, OfflineRenderer, ProcessingContext};
use super::graph::{Connection, SignalGraph, SourceState};
use super::node::ContextId;
use super::types::{CodecInfo, EngineEvent, EngineState, LoadStatus};

/// Context plus the graph built in it; exists once initialized
struct Live {
    context: ProcessingContext,
    graph: SignalGraph,
}

/// A decode that has been started but not yet wired
struct PendingLoad {
    rx: Receiver<Result<DecodedBuffer>>,
    started: Instant,
}

pub struct AudioEngine {
    config: EngineConfig,
    backend: Box<dyn AudioBackend>,
    live: Option<Live>,
    pending: Option<PendingLoad>,
    event_tx: Sender<EngineEvent>,
    event_rx: Receiver<EngineEvent>,
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine {
    /// Engine playing through the default output device.
    ///
    /// Nothing is acquired until [`initialize`](Self::initialize).
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_backend(config, DeviceBackend)
    }

    pub fn with_backend(config: EngineConfig, backend: impl AudioBackend + 'static) -> Self {
        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
        Self {
            config,
            backend: Box::new(backend),
            live: None,
            pending: None,
            event_tx,
            event_rx,
        }
    }

    /// Headless engine plus the handle that pulls its output
    pub fn offline(config: EngineConfig) -> (Self, OfflineRenderer) {
        let backend = OfflineBackend::new();
        let renderer = backend.renderer();
        (Self::with_backend(config, backend), renderer)
    }

    fn emit(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("event queue full, dropping event");
        }
    }

    /// Open the processing context and build the graph.
    ///
    /// Calling again once initialized keeps the existing context. On failure
    /// the engine stays uninitialized and the call may be retried.
    pub fn initialize(&mut self) -> Result<()> {
        if self.live.is_some() {
            debug!("initialize: already initialized");
            return Ok(());
        }
        self.config.validate()?;

        let mut context = ProcessingContext::open(self.backend.as_ref(), self.event_tx.clone())?;
        let graph = SignalGraph::build(&mut context, &self.config)?;
        info!(
            context = context.id(),
            backend = context.backend_name(),
            fft_size = self.config.fft_size,
            "audio engine initialized"
        );
        self.live = Some(Live { context, graph });
        self.emit(EngineEvent::Initialized);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.live.is_some()
    }

    pub fn context_id(&self) -> Option<ContextId> {
        self.live.as_ref().map(|l| l.context.id())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        match &self.live {
            None => EngineState::Uninitialized,
            Some(live) => match live.graph.source_state() {
                SourceState::Empty | SourceState::Finished => EngineState::Idle,
                SourceState::Loaded => EngineState::Loaded,
                SourceState::Playing => EngineState::Playing,
            },
        }
    }

    /// Fold a natural end into the state as an implicit stop
    fn reconcile(&mut self) {
        if let Some(live) = self.live.as_mut() {
            if live.graph.reap_finished(&mut live.context) {
                debug!("source reached its end");
            }
        }
    }

    fn live_mut(&mut self) -> Result<&mut Live> {
        self.live.as_mut().ok_or(TapError::NotInitialized)
    }

    // --- Loading ---

    /// Decode `bytes` and wire the result as the current source, blocking
    /// until the decode finishes or the configured timeout passes.
    pub fn load(&mut self, bytes: Vec<u8>) -> Result<CodecInfo> {
        self.load_with_hint(bytes, None)
    }

    /// Like [`load`](Self::load), with a container hint such as `"mp3"`
    pub fn load_with_hint(&mut self, bytes: Vec<u8>, format_hint: Option<&str>) -> Result<CodecInfo> {
        self.begin_load(bytes, format_hint)?;
        let Some(pending) = self.pending.take() else {
            return Err(TapError::Audio("Load was not started".to_string()));
        };

        let timeout = Duration::from_secs(self.config.decode_timeout_secs);
        match pending.rx.recv_timeout(timeout) {
            Ok(result) => self.finish_load(result),
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_secs = self.config.decode_timeout_secs, "decode timed out");
                self.emit(EngineEvent::LoadFailed("Decode timed out".to_string()));
                Err(TapError::Timeout(format!(
                    "Decode did not finish within {}s",
                    self.config.decode_timeout_secs
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.finish_load(Err(TapError::Decode("Decode thread terminated".to_string())))
            }
        }
    }

    /// Start decoding without waiting; follow up with [`poll_load`](Self::poll_load).
    ///
    /// Only one load may be outstanding at a time.
    pub fn begin_load(&mut self, bytes: Vec<u8>, format_hint: Option<&str>) -> Result<()> {
        if self.pending.is_some() {
            return Err(TapError::LoadInProgress);
        }
        let live = self.live_mut()?;
        let rx = live.context.decode_audio_data(bytes, format_hint)?;
        debug!(hint = ?format_hint, "decode started");
        self.pending = Some(PendingLoad {
            rx,
            started: Instant::now(),
        });
        Ok(())
    }

    /// Check on an outstanding load, wiring the source once it is decoded
    pub fn poll_load(&mut self) -> Result<LoadStatus> {
        let Some(pending) = self.pending.take() else {
            return Ok(LoadStatus::Idle);
        };
        match pending.rx.try_recv() {
            Ok(result) => self.finish_load(result).map(LoadStatus::Loaded),
            Err(TryRecvError::Empty) => {
                let limit = Duration::from_secs(self.config.decode_timeout_secs);
                if pending.started.elapsed() >= limit {
                    warn!(timeout_secs = self.config.decode_timeout_secs, "decode timed out");
                    self.emit(EngineEvent::LoadFailed("Decode timed out".to_string()));
                    return Err(TapError::Timeout(format!(
                        "Decode did not finish within {}s",
                        self.config.decode_timeout_secs
                    )));
                }
                self.pending = Some(pending);
                Ok(LoadStatus::Pending)
            }
            Err(TryRecvError::Disconnected) => {
                self.finish_load(Err(TapError::Decode("Decode thread terminated".to_string())))
                    .map(LoadStatus::Loaded)
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Abandon an outstanding load; its result is dropped when it arrives
    pub fn discard_pending_load(&mut self) -> bool {
        let discarded = self.pending.take().is_some();
        if discarded {
            debug!("pending load discarded");
        }
        discarded
    }

    fn finish_load(&mut self, result: Result<DecodedBuffer>) -> Result<CodecInfo> {
        let buffer = match result {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!(error = %e, "load failed");
                self.emit(EngineEvent::LoadFailed(e.to_string()));
                return Err(e);
            }
        };

        self.reconcile();
        let info = buffer.codec_info();
        let live = self.live_mut()?;
        let node = live.context.create_buffer_source(buffer);
        let stopped = live.graph.attach_source(&mut live.context, node)?;
        if stopped {
            self.emit(EngineEvent::Stopped);
        }
        info!(codec = %info, "source loaded");
        self.emit(EngineEvent::Loaded(info.clone()));
        Ok(info)
    }

    // --- Transport ---

    /// Start the loaded source.
    ///
    /// A no-op when nothing is loaded; `AlreadyPlaying` if it is running.
    pub fn play(&mut self) -> Result<()> {
        self.reconcile();
        let Some(live) = self.live.as_mut() else {
            debug!("play ignored: not initialized");
            return Ok(());
        };
        if live.graph.start_source(&mut live.context)? {
            info!("playback started");
            self.emit(EngineEvent::Started);
        } else {
            debug!("play ignored: no source loaded");
        }
        Ok(())
    }

    /// Halt and discard the current source. A no-op when nothing is loaded.
    ///
    /// A stopped source cannot be restarted; load again to replay.
    pub fn stop(&mut self) -> Result<()> {
        self.reconcile();
        let Some(live) = self.live.as_mut() else {
            return Ok(());
        };
        let was_playing = live.graph.detach_source(&mut live.context);
        if was_playing {
            info!("playback stopped");
            self.emit(EngineEvent::Stopped);
        }
        Ok(())
    }

    // --- Volume ---

    /// Set the gain, clamped to 0.0..=2.0; returns the applied value
    pub fn set_volume(&mut self, value: f32) -> Result<f32> {
        let live = self.live.as_ref().ok_or(TapError::NotInitialized)?;
        let applied = live.graph.gain().set_gain(value)?;
        debug!(requested = value, applied, "volume set");
        Ok(applied)
    }

    pub fn volume(&self) -> Option<f32> {
        self.live.as_ref().map(|l| l.graph.gain().gain())
    }

    // --- Analysis ---

    /// Current spectrum as one byte per frequency bin, `None` before init.
    ///
    /// Each call advances the analyser's smoothing by one step, so two
    /// back-to-back calls over the same window can differ.
    pub fn sample(&self) -> Option<Vec<u8>> {
        self.analyser().map(AnalyserNode::byte_frequency_data)
    }

    /// Current spectrum in dB per bin
    pub fn float_spectrum(&self) -> Option<Vec<f32>> {
        self.analyser().map(AnalyserNode::float_frequency_data)
    }

    /// Most recent `fft_size` samples as bytes centred on 128
    pub fn waveform(&self) -> Option<Vec<u8>> {
        self.analyser().map(AnalyserNode::byte_time_domain_data)
    }

    pub fn analyser(&self) -> Option<&AnalyserNode> {
        self.live.as_ref().map(|l| l.graph.analyser())
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    // --- Introspection ---

    /// Format of the current source
    pub fn codec_info(&self) -> Option<CodecInfo> {
        self.live.as_ref().and_then(|l| l.graph.codec_info())
    }

    pub fn connections(&self) -> Vec<Connection> {
        self.live
            .as_ref()
            .map(|l| l.graph.connections().to_vec())
            .unwrap_or_default()
    }

    /// Non-blocking poll for the next event
    pub fn try_recv_event(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Event receiver for use with `select!`
    pub fn event_receiver(&self) -> &Receiver<EngineEvent> {
        &self.event_rx
    }
}
