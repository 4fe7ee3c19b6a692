//! Signal graph: Source → Analyser → Gain → Destination
//!
//! The analyser→gain→destination chain is wired once when the graph is
//! built. Sources come and go: attaching a new one tears the previous one
//! down first, so at most one source edge exists at any time.

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{Result, TapError};

use super::analyzer::{AnalyserNode, AnalyserOptions, AnalyzingTap};
use super::context::ProcessingContext;
use super::gain::GainNode;
use super::node::{AudioNode, ContextId, NodeId};
use super::source::{PlayingSource, SourceNode};
use super::types::CodecInfo;

/// A directed edge between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from: NodeId,
    pub to: NodeId,
}

/// What the source slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Empty,
    Loaded,
    Playing,
    /// Started and ran out of samples, not yet reaped
    Finished,
}

enum SourceSlot {
    Empty,
    Loaded(SourceNode),
    Playing(PlayingSource),
}

pub struct SignalGraph {
    context: ContextId,
    analyser: AnalyserNode,
    gain: GainNode,
    destination: NodeId,
    source: SourceSlot,
    connections: Vec<Connection>,
}

impl SignalGraph {
    /// Create the analyser and gain in `ctx` and wire them to its destination
    pub fn build(ctx: &mut ProcessingContext, config: &EngineConfig) -> Result<Self> {
        let analyser = ctx.create_analyser(AnalyserOptions::from(config));
        let gain = ctx.create_gain(config.initial_gain);
        let mut graph = Self {
            context: ctx.id(),
            analyser,
            gain,
            destination: ctx.destination(),
            source: SourceSlot::Empty,
            connections: Vec::with_capacity(3),
        };
        graph.connect(graph.analyser.id(), graph.gain.id())?;
        graph.connect(graph.gain.id(), graph.destination)?;
        Ok(graph)
    }

    fn check_context(&self, node: NodeId) -> Result<()> {
        if node.context != self.context {
            return Err(TapError::ContextMismatch {
                node: node.to_string(),
            });
        }
        Ok(())
    }

    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.check_context(from)?;
        self.check_context(to)?;
        let edge = Connection { from, to };
        if !self.connections.contains(&edge) {
            self.connections.push(edge);
        }
        Ok(())
    }

    fn disconnect_all_from(&mut self, node: NodeId) {
        self.connections.retain(|c| c.from != node);
    }

    pub fn context_id(&self) -> ContextId {
        self.context
    }

    pub fn analyser(&self) -> &AnalyserNode {
        &self.analyser
    }

    pub fn gain(&self) -> &GainNode {
        &self.gain
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of edges leaving a source node
    pub fn source_edge_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|c| c.from.kind == super::node::NodeKind::Source)
            .count()
    }

    pub fn source_state(&self) -> SourceState {
        match &self.source {
            SourceSlot::Empty => SourceState::Empty,
            SourceSlot::Loaded(_) => SourceState::Loaded,
            SourceSlot::Playing(p) if p.has_ended() => SourceState::Finished,
            SourceSlot::Playing(_) => SourceState::Playing,
        }
    }

    /// Format of the attached source, if any
    pub fn codec_info(&self) -> Option<CodecInfo> {
        match &self.source {
            SourceSlot::Empty => None,
            SourceSlot::Loaded(node) => Some(node.buffer().codec_info()),
            SourceSlot::Playing(p) => Some(p.codec_info().clone()),
        }
    }

    /// Replace the current source with `node`, wired into the analyser.
    ///
    /// A node from another context is rejected before anything changes.
    /// Returns true when a playing source was stopped by the replacement.
    pub fn attach_source(&mut self, ctx: &mut ProcessingContext, node: SourceNode) -> Result<bool> {
        self.check_context(node.id())?;
        let was_playing = self.detach_source(ctx);
        self.connect(node.id(), self.analyser.id())?;
        debug!(node = %node.id(), "source attached");
        self.source = SourceSlot::Loaded(node);
        Ok(was_playing)
    }

    /// Tear down the current source. Returns true if it was playing.
    pub fn detach_source(&mut self, ctx: &mut ProcessingContext) -> bool {
        match std::mem::replace(&mut self.source, SourceSlot::Empty) {
            SourceSlot::Empty => false,
            SourceSlot::Loaded(node) => {
                self.disconnect_all_from(node.id());
                false
            }
            SourceSlot::Playing(playing) => {
                ctx.stop_rendering();
                self.analyser.clear();
                self.disconnect_all_from(playing.id());
                debug!(node = %playing.id(), ended = playing.has_ended(), "source detached");
                !playing.has_ended()
            }
        }
    }

    /// Start the loaded source.
    ///
    /// Returns `Ok(false)` with nothing loaded and `AlreadyPlaying` when the
    /// current source is already running.
    pub fn start_source(&mut self, ctx: &mut ProcessingContext) -> Result<bool> {
        match std::mem::replace(&mut self.source, SourceSlot::Empty) {
            SourceSlot::Empty => Ok(false),
            SourceSlot::Playing(playing) => {
                self.source = SourceSlot::Playing(playing);
                Err(TapError::AlreadyPlaying)
            }
            SourceSlot::Loaded(node) => {
                let (player, playing) = node.start();
                let chain = self.gain.stage(AnalyzingTap::new(player, self.analyser.clone()));
                ctx.start_rendering(chain);
                self.source = SourceSlot::Playing(playing);
                Ok(true)
            }
        }
    }

    /// Drop a source that played to its end. Returns true if one was reaped.
    pub fn reap_finished(&mut self, ctx: &mut ProcessingContext) -> bool {
        if self.source_state() != SourceState::Finished {
            return false;
        }
        self.detach_source(ctx);
        true
    }
}
