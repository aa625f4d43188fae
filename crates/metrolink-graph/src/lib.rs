//! The static platform graph (spec §4.A). Nodes and edges are born once at
//! process start and never change afterwards; everything here is a pure
//! lookup over an arena of platforms.

use std::fmt;

use indexmap::IndexMap;

mod builder;

pub use builder::{GraphBuildError, NetworkGraphBuilder, PlatformDescription};

/// Index of a platform in the graph's node arena. Cheap to copy, stable for
/// the lifetime of the graph (design note §9: indices, not object
/// references, so predecessor/successor sets never form ownership cycles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn new(index: usize) -> Self {
        Self(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single boarding face. Identity is `"{station}_{platform}"`.
#[derive(Debug, Clone)]
pub struct Node {
    pub station: String,
    pub platform: String,
    pub canonical_id: String,
    pub map_pos: (f64, f64),
    preds: Vec<NodeId>,
    succs: Vec<NodeId>,
}

impl Node {
    pub fn is_terminus_origin(&self) -> bool {
        self.preds.is_empty()
    }

    pub fn is_terminus_destination(&self) -> bool {
        self.succs.is_empty()
    }
}

/// The immutable directed graph of all platforms.
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    nodes: Vec<Node>,
    edges: Vec<(NodeId, NodeId)>,
    by_canonical_id: IndexMap<String, NodeId>,
    stations: IndexMap<String, Vec<NodeId>>,
}

impl NetworkGraph {
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::new)
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn stations(&self) -> impl Iterator<Item = &str> {
        self.stations.keys().map(String::as_str)
    }

    pub fn platforms_of(&self, station: &str) -> &[NodeId] {
        self.stations
            .get(station)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn preds(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].preds
    }

    pub fn succs(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].succs
    }

    pub fn map_pos(&self, node: NodeId) -> (f64, f64) {
        self.nodes[node.index()].map_pos
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_by_canonical_id(&self, canonical_id: &str) -> Option<NodeId> {
        self.by_canonical_id.get(canonical_id).copied()
    }

    pub fn canonical_id(&self, node: NodeId) -> &str {
        &self.nodes[node.index()].canonical_id
    }

    pub fn is_known_station(&self, name: &str) -> bool {
        self.stations.contains_key(name)
    }

    /// The unique predecessor of `node` that lies on some path to `dest`,
    /// i.e. the predecessor used to seed an Approaching sighting (§4.E.3).
    /// Returns `None` when there is no predecessor, or more than one
    /// predecessor reaches `dest` — an ambiguous case the locator must skip.
    pub fn predecessor_toward(&self, node: NodeId, dest: NodeId) -> Option<NodeId> {
        let preds = self.preds(node);
        if preds.is_empty() {
            return None;
        }
        if preds.len() == 1 {
            return Some(preds[0]);
        }
        let mut candidates = preds
            .iter()
            .copied()
            .filter(|&pred| self.can_reach(pred, dest));
        let first = candidates.next()?;
        if candidates.next().is_some() {
            None
        } else {
            Some(first)
        }
    }

    /// The platform at `station` reachable from `from`, used by the
    /// predictor to turn a tram's destination station into a concrete walk
    /// target (spec §4.F). Stations normally expose a single platform in
    /// the running direction; when more than one platform shares the name,
    /// the first one `from` can actually reach wins.
    pub fn destination_node(&self, from: NodeId, station: &str) -> Option<NodeId> {
        self.platforms_of(station)
            .iter()
            .copied()
            .find(|&candidate| self.can_reach(from, candidate))
    }

    fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        visited[from.index()] = true;
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            for &succ in self.succs(current) {
                if !visited[succ.index()] {
                    visited[succ.index()] = true;
                    stack.push(succ);
                }
            }
        }
        false
    }
}
