use indexmap::IndexMap;

use metrolink_graph::{NetworkGraph, NodeId};
use metrolink_tram::{NodeState, TramSignature};

/// A candidate sighting not yet promoted to a real [`metrolink_tram::Tram`]
/// (spec §4.E.3's debounce: "seen in two consecutive ticks with consistent
/// attributes"). Lives only in the locator's working state, never in a
/// [`NodeState`] bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSighting {
    pub signature: TramSignature,
    pub predecessor: NodeId,
}

/// Everything the locator carries from tick to tick, keyed by node.
#[derive(Debug, Clone)]
pub struct EngineState {
    nodes: IndexMap<NodeId, NodeState>,
    pending_approaching: IndexMap<NodeId, Vec<PendingSighting>>,
}

impl EngineState {
    /// One entry per node in `graph`, in the graph's own node order.
    pub fn new(graph: &NetworkGraph) -> Self {
        Self {
            nodes: graph.nodes().map(|id| (id, NodeState::default())).collect(),
            pending_approaching: graph.nodes().map(|id| (id, Vec::new())).collect(),
        }
    }

    pub fn node(&self, id: NodeId) -> &NodeState {
        &self.nodes[&id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeState {
        &mut self.nodes[&id]
    }

    pub fn nodes(&self) -> &IndexMap<NodeId, NodeState> {
        &self.nodes
    }

    pub fn pending(&self, id: NodeId) -> &[PendingSighting] {
        &self.pending_approaching[&id]
    }

    pub fn set_pending(&mut self, id: NodeId, pending: Vec<PendingSighting>) {
        self.pending_approaching[&id] = pending;
    }
}
