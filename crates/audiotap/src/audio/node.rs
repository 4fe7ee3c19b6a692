//! Node identity
//!
//! Every node carries the id of the processing context that created it, so
//! the graph can refuse to wire nodes from different contexts.

use std::fmt;

/// Identifies one processing context within the process
pub type ContextId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Source,
    Analyser,
    Gain,
    Destination,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Source => write!(f, "source"),
            NodeKind::Analyser => write!(f, "analyser"),
            NodeKind::Gain => write!(f, "gain"),
            NodeKind::Destination => write!(f, "destination"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub context: ContextId,
    pub kind: NodeKind,
    pub index: u64,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@ctx{}", self.kind, self.index, self.context)
    }
}

/// Anything that can appear in the signal graph
pub trait AudioNode {
    fn id(&self) -> NodeId;

    fn context_id(&self) -> ContextId {
        self.id().context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display() {
        let id = NodeId {
            context: 2,
            kind: NodeKind::Gain,
            index: 7,
        };
        assert_eq!(id.to_string(), "gain#7@ctx2");
    }

    #[test]
    fn node_ids_differ_by_context() {
        let a = NodeId {
            context: 1,
            kind: NodeKind::Source,
            index: 0,
        };
        let b = NodeId { context: 2, ..a };
        assert_ne!(a, b);
    }
}
