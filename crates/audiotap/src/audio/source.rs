//! One-shot buffer source
//!
//! A `SourceNode` is bound to exactly one decoded buffer and can be started
//! once: `start` consumes it. The render half (`BufferPlayer`) raises an end
//! flag and emits `EngineEvent::Ended` when the buffer runs out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use rodio::Source;

use super::buffer::DecodedBuffer;
use super::node::{AudioNode, NodeId};
use super::types::{CodecInfo, EngineEvent};

pub struct SourceNode {
    id: NodeId,
    buffer: DecodedBuffer,
    events: Sender<EngineEvent>,
}

impl AudioNode for SourceNode {
    fn id(&self) -> NodeId {
        self.id
    }
}

impl SourceNode {
    pub(crate) fn new(id: NodeId, buffer: DecodedBuffer, events: Sender<EngineEvent>) -> Self {
        Self { id, buffer, events }
    }

    pub fn buffer(&self) -> &DecodedBuffer {
        &self.buffer
    }

    /// Start the node. Consuming `self` makes a second start impossible.
    pub(crate) fn start(self) -> (BufferPlayer, PlayingSource) {
        let ended = Arc::new(AtomicBool::new(false));
        let player = BufferPlayer {
            samples: self.buffer.shared_samples(),
            pos: 0,
            channels: self.buffer.channels(),
            sample_rate: self.buffer.sample_rate(),
            duration: self.buffer.duration(),
            ended: ended.clone(),
            events: self.events,
        };
        let playing = PlayingSource {
            id: self.id,
            info: self.buffer.codec_info(),
            ended,
        };
        (player, playing)
    }
}

/// Control-side handle to a started source
#[derive(Debug)]
pub struct PlayingSource {
    id: NodeId,
    info: CodecInfo,
    ended: Arc<AtomicBool>,
}

impl AudioNode for PlayingSource {
    fn id(&self) -> NodeId {
        self.id
    }
}

impl PlayingSource {
    /// Whether the player reached the end of its buffer
    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    pub fn codec_info(&self) -> &CodecInfo {
        &self.info
    }
}

/// Render-side reader over a decoded buffer
pub struct BufferPlayer {
    samples: Arc<[f32]>,
    pos: usize,
    channels: u16,
    sample_rate: u32,
    duration: Duration,
    ended: Arc<AtomicBool>,
    events: Sender<EngineEvent>,
}

impl Iterator for BufferPlayer {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(&sample) = self.samples.get(self.pos) {
            self.pos += 1;
            return Some(sample);
        }
        if !self.ended.swap(true, Ordering::AcqRel) {
            // Never block the render path on a full event queue
            let _ = self.events.try_send(EngineEvent::Ended);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.samples.len().saturating_sub(self.pos);
        (remaining, Some(remaining))
    }
}

impl Source for BufferPlayer {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::node::NodeKind;
    use crossbeam_channel::bounded;

    fn source_node(samples: Vec<f32>, channels: u16) -> (SourceNode, crossbeam_channel::Receiver<EngineEvent>) {
        let (tx, rx) = bounded(4);
        let id = NodeId {
            context: 0,
            kind: NodeKind::Source,
            index: 0,
        };
        let buffer = DecodedBuffer::new(channels, 44100, samples).unwrap();
        (SourceNode::new(id, buffer, tx), rx)
    }

    #[test]
    fn player_yields_buffer_in_order() {
        let (node, _rx) = source_node(vec![0.1, 0.2, 0.3, 0.4], 2);
        let (player, _playing) = node.start();
        assert_eq!(player.channels(), 2);
        assert_eq!(player.sample_rate(), 44100);
        let out: Vec<f32> = player.collect();
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn end_of_buffer_sets_flag_and_emits_once() {
        let (node, rx) = source_node(vec![0.5; 8], 1);
        let (mut player, playing) = node.start();
        assert!(!playing.has_ended());

        while player.next().is_some() {}
        assert!(playing.has_ended());
        assert!(player.next().is_none());

        assert_eq!(rx.try_recv(), Ok(EngineEvent::Ended));
        assert!(rx.try_recv().is_err(), "Ended must be emitted once");
    }

    #[test]
    fn dropping_player_early_is_not_an_end() {
        let (node, rx) = source_node(vec![0.5; 8], 1);
        let (mut player, playing) = node.start();
        player.next();
        drop(player);
        assert!(!playing.has_ended());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_event_queue_does_not_block() {
        let (tx, _rx) = bounded(0);
        let id = NodeId {
            context: 0,
            kind: NodeKind::Source,
            index: 1,
        };
        let buffer = DecodedBuffer::new(1, 8000, vec![0.0; 2]).unwrap();
        let (player, playing) = SourceNode::new(id, buffer, tx).start();
        assert_eq!(player.count(), 2);
        assert!(playing.has_ended());
    }

    #[test]
    fn total_duration_matches_buffer() {
        let (node, _rx) = source_node(vec![0.0; 44100], 1);
        let (player, playing) = node.start();
        assert_eq!(player.total_duration(), Some(Duration::from_secs(1)));
        assert_eq!(playing.codec_info().duration, Duration::from_secs(1));
    }
}
