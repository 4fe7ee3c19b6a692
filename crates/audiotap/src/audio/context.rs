//! Processing context
//!
//! Owns the output the graph renders into and acts as the node factory.
//! Output is pluggable through [`AudioBackend`]: [`DeviceBackend`] plays
//! through the default device via rodio, [`OfflineBackend`] renders on demand
//! through an [`OfflineRenderer`] handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rodio::{OutputStreamBuilder, Sink, Source};
use tracing::{debug, info};

use crate::config::timeouts::CONTEXT_INIT_TIMEOUT_SECS;
use crate::error::{Result, TapError};

use super::analyzer::{AnalyserNode, AnalyserOptions, AnalyzingTap};
use super::buffer::DecodedBuffer;
use super::decoder::start_decode;
use super::gain::{GainNode, GainStage};
use super::node::{ContextId, NodeId, NodeKind};
use super::source::{BufferPlayer, SourceNode};
use super::types::EngineEvent;

/// Everything downstream of a started source, as the output sees it
pub type RenderChain = GainStage<AnalyzingTap<BufferPlayer>>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Where rendered audio goes
pub trait RenderTarget: Send {
    /// Begin rendering `chain` now
    fn connect(&mut self, chain: RenderChain);

    /// Drop whatever is rendering
    fn disconnect(&mut self);
}

/// Factory for render targets; opening one acquires the audio subsystem
pub trait AudioBackend: Send {
    fn name(&self) -> &str;

    fn open(&self) -> Result<Box<dyn RenderTarget>>;
}

/// Plays through the system's default output device
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceBackend;

impl AudioBackend for DeviceBackend {
    fn name(&self) -> &str {
        "device"
    }

    /// Opens the output stream on a dedicated `"audio-context"` thread.
    ///
    /// Blocks until the device is open (or fails), for at most
    /// `CONTEXT_INIT_TIMEOUT_SECS`.
    fn open(&self) -> Result<Box<dyn RenderTarget>> {
        let (init_tx, init_rx) = bounded::<std::result::Result<Sink, String>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        let thread = thread::Builder::new()
            .name("audio-context".to_string())
            .spawn(move || {
                // Output streams may be !Send, so the stream never leaves this thread
                let mut stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = init_tx.send(Err(format!("Failed to open audio output: {}", e)));
                        return;
                    }
                };
                stream.log_on_drop(false);

                let sink = Sink::connect_new(stream.mixer());
                if init_tx.send(Ok(sink)).is_err() {
                    return;
                }

                // Park until the target is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|e| {
                TapError::SubsystemUnavailable(format!("Failed to spawn audio thread: {}", e))
            })?;

        let sink = match init_rx.recv_timeout(Duration::from_secs(CONTEXT_INIT_TIMEOUT_SECS)) {
            Ok(Ok(sink)) => sink,
            Ok(Err(msg)) => return Err(TapError::SubsystemUnavailable(msg)),
            Err(RecvTimeoutError::Timeout) => {
                return Err(TapError::SubsystemUnavailable(format!(
                    "Audio output did not open within {}s",
                    CONTEXT_INIT_TIMEOUT_SECS
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(TapError::SubsystemUnavailable(
                    "Audio thread terminated during init".to_string(),
                ))
            }
        };

        Ok(Box::new(DeviceTarget {
            sink,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        }))
    }
}

struct DeviceTarget {
    sink: Sink,
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl RenderTarget for DeviceTarget {
    fn connect(&mut self, chain: RenderChain) {
        self.sink.append(chain);
        self.sink.play();
    }

    fn disconnect(&mut self) {
        // Empties the queue and pauses until the next connect
        self.sink.clear();
    }
}

impl Drop for DeviceTarget {
    fn drop(&mut self) {
        self.sink.stop();
        drop(self.shutdown_tx.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Pull-based output used for headless rendering and tests
#[derive(Clone, Default)]
pub struct OfflineRenderer {
    slot: Arc<Mutex<Option<RenderChain>>>,
}

impl OfflineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a chain is currently connected
    pub fn is_connected(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Render up to `frames` frames of interleaved output.
    ///
    /// Returns an empty block when nothing is connected. If the chain ends
    /// inside the block the remainder is silence and the chain is released.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let Ok(mut slot) = self.slot.lock() else {
            return Vec::new();
        };
        let Some(chain) = slot.as_mut() else {
            return Vec::new();
        };

        let wanted = frames * chain.channels() as usize;
        let mut out = Vec::with_capacity(wanted);
        let mut finished = false;
        while out.len() < wanted {
            match chain.next() {
                Some(sample) => out.push(sample),
                None => {
                    finished = true;
                    break;
                }
            }
        }
        if finished {
            out.resize(wanted, 0.0);
            *slot = None;
        }
        out
    }

    /// Render until the connected chain ends; returns every sample
    pub fn render_to_end(&self) -> Vec<f32> {
        let Ok(mut slot) = self.slot.lock() else {
            return Vec::new();
        };
        match slot.take() {
            Some(chain) => chain.collect(),
            None => Vec::new(),
        }
    }
}

/// Backend whose output is pulled through an [`OfflineRenderer`]
#[derive(Clone, Default)]
pub struct OfflineBackend {
    renderer: OfflineRenderer,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for pulling rendered audio
    pub fn renderer(&self) -> OfflineRenderer {
        self.renderer.clone()
    }
}

impl AudioBackend for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    fn open(&self) -> Result<Box<dyn RenderTarget>> {
        Ok(Box::new(OfflineTarget {
            renderer: self.renderer.clone(),
        }))
    }
}

struct OfflineTarget {
    renderer: OfflineRenderer,
}

impl RenderTarget for OfflineTarget {
    fn connect(&mut self, chain: RenderChain) {
        if let Ok(mut slot) = self.renderer.slot.lock() {
            *slot = Some(chain);
        }
    }

    fn disconnect(&mut self) {
        if let Ok(mut slot) = self.renderer.slot.lock() {
            *slot = None;
        }
    }
}

/// Real-time processing context: output handle plus node factory
pub struct ProcessingContext {
    id: ContextId,
    next_node: u64,
    destination: NodeId,
    backend_name: String,
    target: Box<dyn RenderTarget>,
    events: Sender<EngineEvent>,
}

impl ProcessingContext {
    /// Acquire the audio subsystem through `backend`
    pub fn open(backend: &dyn AudioBackend, events: Sender<EngineEvent>) -> Result<Self> {
        let target = backend.open()?;
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        info!(context = id, backend = backend.name(), "processing context opened");
        Ok(Self {
            id,
            next_node: 1,
            destination: NodeId {
                context: id,
                kind: NodeKind::Destination,
                index: 0,
            },
            backend_name: backend.name().to_string(),
            target,
            events,
        })
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// The output sink every graph ends in
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    fn allocate(&mut self, kind: NodeKind) -> NodeId {
        let index = self.next_node;
        self.next_node += 1;
        NodeId {
            context: self.id,
            kind,
            index,
        }
    }

    pub fn create_analyser(&mut self, options: AnalyserOptions) -> AnalyserNode {
        let id = self.allocate(NodeKind::Analyser);
        debug!(node = %id, fft_size = options.fft_size, "created analyser");
        AnalyserNode::new(id, options)
    }

    pub fn create_gain(&mut self, initial: f32) -> GainNode {
        let id = self.allocate(NodeKind::Gain);
        debug!(node = %id, initial, "created gain");
        GainNode::new(id, initial)
    }

    pub fn create_buffer_source(&mut self, buffer: DecodedBuffer) -> SourceNode {
        let id = self.allocate(NodeKind::Source);
        debug!(node = %id, frames = buffer.frames(), "created buffer source");
        SourceNode::new(id, buffer, self.events.clone())
    }

    /// Decode `bytes` off the calling thread
    pub fn decode_audio_data(
        &self,
        bytes: Vec<u8>,
        format_hint: Option<&str>,
    ) -> Result<Receiver<Result<DecodedBuffer>>> {
        start_decode(bytes, format_hint.map(str::to_string))
    }

    pub(crate) fn start_rendering(&mut self, chain: RenderChain) {
        self.target.connect(chain);
    }

    pub(crate) fn stop_rendering(&mut self) {
        self.target.disconnect();
    }
}

impl Drop for ProcessingContext {
    fn drop(&mut self) {
        self.target.disconnect();
        debug!(context = self.id, "processing context closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::SourceNode;

    struct UnavailableBackend;

    impl AudioBackend for UnavailableBackend {
        fn name(&self) -> &str {
            "unavailable"
        }

        fn open(&self) -> Result<Box<dyn RenderTarget>> {
            Err(TapError::SubsystemUnavailable("no device".to_string()))
        }
    }

    fn offline_context() -> (ProcessingContext, OfflineRenderer) {
        let backend = OfflineBackend::new();
        let renderer = backend.renderer();
        let (tx, _rx) = bounded(8);
        (ProcessingContext::open(&backend, tx).unwrap(), renderer)
    }

    fn chain_for(ctx: &mut ProcessingContext, samples: Vec<f32>, channels: u16) -> RenderChain {
        let analyser = ctx.create_analyser(AnalyserOptions::default());
        let gain = ctx.create_gain(1.0);
        let buffer = DecodedBuffer::new(channels, 44100, samples).unwrap();
        let node: SourceNode = ctx.create_buffer_source(buffer);
        let (player, _playing) = node.start();
        gain.stage(AnalyzingTap::new(player, analyser))
    }

    // --- Lifecycle ---

    #[test]
    fn open_failure_is_subsystem_unavailable() {
        let (tx, _rx) = bounded(1);
        let result = ProcessingContext::open(&UnavailableBackend, tx);
        assert!(matches!(result, Err(TapError::SubsystemUnavailable(_))));
    }

    #[test]
    fn contexts_get_distinct_ids() {
        let (a, _) = offline_context();
        let (b, _) = offline_context();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.backend_name(), "offline");
    }

    #[test]
    fn nodes_carry_their_context() {
        let (mut ctx, _) = offline_context();
        let analyser = ctx.create_analyser(AnalyserOptions::default());
        let gain = ctx.create_gain(1.0);
        use crate::audio::node::AudioNode;
        assert_eq!(analyser.context_id(), ctx.id());
        assert_eq!(gain.context_id(), ctx.id());
        assert_eq!(ctx.destination().context, ctx.id());
        assert_ne!(analyser.id(), gain.id());
    }

    // --- Offline rendering ---

    #[test]
    fn render_without_chain_is_empty() {
        let (_ctx, renderer) = offline_context();
        assert!(!renderer.is_connected());
        assert!(renderer.render(64).is_empty());
    }

    #[test]
    fn render_pulls_interleaved_frames() {
        let (mut ctx, renderer) = offline_context();
        let chain = chain_for(&mut ctx, vec![0.25; 200], 2);
        ctx.start_rendering(chain);
        assert!(renderer.is_connected());
        let block = renderer.render(10);
        assert_eq!(block.len(), 20);
        assert!(block.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn render_pads_and_releases_at_end() {
        let (mut ctx, renderer) = offline_context();
        let chain = chain_for(&mut ctx, vec![0.5; 6], 1);
        ctx.start_rendering(chain);
        let block = renderer.render(10);
        assert_eq!(block.len(), 10);
        assert_eq!(&block[..6], &[0.5; 6]);
        assert!(block[6..].iter().all(|&s| s == 0.0));
        assert!(!renderer.is_connected());
    }

    #[test]
    fn stop_rendering_disconnects() {
        let (mut ctx, renderer) = offline_context();
        let chain = chain_for(&mut ctx, vec![0.5; 100], 1);
        ctx.start_rendering(chain);
        ctx.stop_rendering();
        assert!(!renderer.is_connected());
    }

    #[test]
    fn render_to_end_drains_chain() {
        let (mut ctx, renderer) = offline_context();
        let chain = chain_for(&mut ctx, vec![0.1; 300], 1);
        ctx.start_rendering(chain);
        assert_eq!(renderer.render_to_end().len(), 300);
        assert!(!renderer.is_connected());
    }

    #[test]
    fn dropping_context_disconnects() {
        let (mut ctx, renderer) = offline_context();
        let chain = chain_for(&mut ctx, vec![0.1; 300], 1);
        ctx.start_rendering(chain);
        drop(ctx);
        assert!(!renderer.is_connected());
    }

    // --- Device backend ---

    #[test]
    fn device_backend_opens_or_reports_unavailable() {
        // CI machines often have no sound card; either outcome is valid
        let (tx, _rx) = bounded(1);
        match ProcessingContext::open(&DeviceBackend, tx) {
            Ok(ctx) => assert_eq!(ctx.backend_name(), "device"),
            Err(e) => assert!(matches!(e, TapError::SubsystemUnavailable(_))),
        }
    }
}
