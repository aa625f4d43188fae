use std::fmt;

use indexmap::IndexMap;

use crate::{NetworkGraph, Node, NodeId};

/// One row of the network description consumed at construction time. Where
/// that description comes from (bundled JSON, a config file, ...) is out of
/// scope for this crate; only the shape matters.
#[derive(Debug, Clone)]
pub struct PlatformDescription {
    pub station: String,
    pub platform: String,
    pub map_pos: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphBuildError {
    DuplicatePlatform(String),
    UnknownEdgeEndpoint(String),
    NotWeaklyConnected,
    Empty,
}

impl fmt::Display for GraphBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicatePlatform(id) => write!(f, "duplicate platform id: {id}"),
            Self::UnknownEdgeEndpoint(id) => {
                write!(f, "edge references unknown platform id: {id}")
            }
            Self::NotWeaklyConnected => {
                write!(f, "network description is not weakly connected")
            }
            Self::Empty => write!(f, "network description has no platforms"),
        }
    }
}

impl std::error::Error for GraphBuildError {}

/// Builds a [`NetworkGraph`] from a sequence of platforms and edges. The
/// only requirement spec.md places on the source description (§4.A) is that
/// it forms a weakly connected directed graph with each node tagged by
/// station name and platform code; this builder enforces exactly that.
#[derive(Debug, Default)]
pub struct NetworkGraphBuilder {
    platforms: Vec<PlatformDescription>,
    edges: Vec<(String, String)>,
}

impl NetworkGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn platform(
        mut self,
        station: impl Into<String>,
        platform: impl Into<String>,
        map_pos: (f64, f64),
    ) -> Self {
        self.platforms.push(PlatformDescription {
            station: station.into(),
            platform: platform.into(),
            map_pos,
        });
        self
    }

    pub fn with_platforms(mut self, platforms: Vec<PlatformDescription>) -> Self {
        self.platforms.extend(platforms);
        self
    }

    pub fn edge(mut self, from_canonical_id: impl Into<String>, to_canonical_id: impl Into<String>) -> Self {
        self.edges.push((from_canonical_id.into(), to_canonical_id.into()));
        self
    }

    pub fn build(self) -> Result<NetworkGraph, GraphBuildError> {
        if self.platforms.is_empty() {
            return Err(GraphBuildError::Empty);
        }

        let mut nodes = Vec::with_capacity(self.platforms.len());
        let mut by_canonical_id = IndexMap::with_capacity(self.platforms.len());
        let mut stations: IndexMap<String, Vec<NodeId>> = IndexMap::new();

        for desc in self.platforms {
            let canonical_id = format!("{}_{}", desc.station, desc.platform);
            if by_canonical_id.contains_key(&canonical_id) {
                return Err(GraphBuildError::DuplicatePlatform(canonical_id));
            }
            let id = NodeId::new(nodes.len());
            stations.entry(desc.station.clone()).or_default().push(id);
            nodes.push(Node {
                station: desc.station,
                platform: desc.platform,
                canonical_id: canonical_id.clone(),
                map_pos: desc.map_pos,
                preds: Vec::new(),
                succs: Vec::new(),
            });
            by_canonical_id.insert(canonical_id, id);
        }

        let mut edges = Vec::with_capacity(self.edges.len());
        for (from, to) in self.edges {
            let from_id = by_canonical_id
                .get(&from)
                .copied()
                .ok_or(GraphBuildError::UnknownEdgeEndpoint(from))?;
            let to_id = by_canonical_id
                .get(&to)
                .copied()
                .ok_or(GraphBuildError::UnknownEdgeEndpoint(to))?;
            nodes[from_id.index()].succs.push(to_id);
            nodes[to_id.index()].preds.push(from_id);
            edges.push((from_id, to_id));
        }

        let graph = NetworkGraph {
            nodes,
            edges,
            by_canonical_id,
            stations,
        };

        if !is_weakly_connected(&graph) {
            return Err(GraphBuildError::NotWeaklyConnected);
        }

        Ok(graph)
    }
}

fn is_weakly_connected(graph: &NetworkGraph) -> bool {
    let total = graph.nodes.len();
    if total <= 1 {
        return true;
    }
    let mut visited = vec![false; total];
    let mut stack = vec![NodeId::new(0)];
    visited[0] = true;
    let mut count = 1;
    while let Some(current) = stack.pop() {
        for &neighbor in graph.preds(current).iter().chain(graph.succs(current)) {
            if !visited[neighbor.index()] {
                visited[neighbor.index()] = true;
                count += 1;
                stack.push(neighbor);
            }
        }
    }
    count == total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_disconnected_islands() {
        let result = NetworkGraphBuilder::new()
            .platform("A", "1", (0.0, 0.0))
            .platform("B", "1", (1.0, 0.0))
            .build();
        assert_eq!(result.unwrap_err(), GraphBuildError::NotWeaklyConnected);
    }

    #[test]
    fn rejects_duplicate_platforms() {
        let result = NetworkGraphBuilder::new()
            .platform("A", "1", (0.0, 0.0))
            .platform("A", "1", (0.0, 0.0))
            .build();
        assert_eq!(
            result.unwrap_err(),
            GraphBuildError::DuplicatePlatform("A_1".to_owned())
        );
    }

    #[test]
    fn rejects_edges_to_unknown_platforms() {
        let result = NetworkGraphBuilder::new()
            .platform("A", "1", (0.0, 0.0))
            .edge("A_1", "B_1")
            .build();
        assert_eq!(
            result.unwrap_err(),
            GraphBuildError::UnknownEdgeEndpoint("B_1".to_owned())
        );
    }
}
