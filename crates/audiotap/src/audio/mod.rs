//! Audio subsystem
//!
//! Decoding, the processing context, the node graph and spectrum analysis.
//!

pub mod analyzer;
pub mod buffer;
pub mod context;
pub mod decoder;
pub mod engine;
pub mod gain;
pub mod graph;
pub mod node;
pub mod source;
pub mod types;

#[cfg(test)]
mod test_util;

pub use analyzer::{AnalyserNode, AnalyserOptions, AnalyzingTap};
pub use buffer::DecodedBuffer;
pub use context::{AudioBackend, DeviceBackend, OfflineBackend, OfflineRenderer, ProcessingContext};
pub use decoder::{decode, hint_for_mime};
pub use engine::AudioEngine;
pub use gain::GainNode;
pub use graph::{Connection, SignalGraph, SourceState};
pub use node::{AudioNode, ContextId, NodeId, NodeKind};
pub use source::SourceNode;
pub use types::{CodecInfo, EngineEvent, EngineState, LoadStatus};
