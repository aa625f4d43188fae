//! Bounded rolling samples of per-node dwell times and per-edge transit
//! times, and the running averages derived from them (spec §4.B).
//!
//! Eviction is size-based rather than time-based on purpose: transit times
//! drift with timetable and track works, and an unbounded average would be
//! too slow to react. Size-based eviction also keeps behaviour deterministic
//! under test.

use std::collections::{HashMap, VecDeque};

use chrono::Duration;
use metrolink_graph::NodeId;

pub const DEFAULT_DWELL_CAP: usize = 32;
pub const DEFAULT_TRANSIT_CAP: usize = 32;

/// A transit edge, keyed the same way predictions are: an ordered pair of
/// platforms that are physically adjacent in the running direction.
pub type Edge = (NodeId, NodeId);

#[derive(Debug, Clone)]
pub struct LearnedStore {
    dwell_cap: usize,
    transit_cap: usize,
    dwell: HashMap<NodeId, VecDeque<Duration>>,
    transit: HashMap<Edge, VecDeque<Duration>>,
}

impl LearnedStore {
    pub fn new(dwell_cap: usize, transit_cap: usize) -> Self {
        Self {
            dwell_cap: dwell_cap.max(1),
            transit_cap: transit_cap.max(1),
            dwell: HashMap::new(),
            transit: HashMap::new(),
        }
    }

    /// Appends a dwell sample for `node`, evicting the oldest entry once the
    /// cap is exceeded. Invariant P3/4: only positive durations are kept.
    pub fn record_dwell(&mut self, node: NodeId, duration: Duration) {
        if duration <= Duration::zero() {
            return;
        }
        let samples = self.dwell.entry(node).or_default();
        samples.push_back(duration);
        while samples.len() > self.dwell_cap {
            samples.pop_front();
        }
    }

    /// Appends a transit sample for the edge `(from, to)`, evicting the
    /// oldest entry once the cap is exceeded.
    pub fn record_transit(&mut self, from: NodeId, to: NodeId, duration: Duration) {
        if duration <= Duration::zero() {
            return;
        }
        let samples = self.transit.entry((from, to)).or_default();
        samples.push_back(duration);
        while samples.len() > self.transit_cap {
            samples.pop_front();
        }
    }

    pub fn average_dwell(&self, node: NodeId) -> Option<Duration> {
        average(self.dwell.get(&node))
    }

    pub fn dwell_sample_count(&self, node: NodeId) -> usize {
        self.dwell.get(&node).map_or(0, VecDeque::len)
    }

    /// Returns the average transit time for `(from, to)` together with the
    /// number of samples backing it, or `(None, 0)` when there is no data
    /// yet (this is the expected warm-up state, not an error).
    pub fn average_transit(&self, from: NodeId, to: NodeId) -> (Option<Duration>, usize) {
        let samples = self.transit.get(&(from, to));
        (average(samples), samples.map_or(0, VecDeque::len))
    }

    pub fn transit_sample_count(&self, from: NodeId, to: NodeId) -> usize {
        self.transit.get(&(from, to)).map_or(0, VecDeque::len)
    }

    pub fn nodes_without_average<'a>(
        &'a self,
        nodes: impl Iterator<Item = NodeId> + 'a,
    ) -> Vec<NodeId> {
        nodes
            .filter(|node| self.average_dwell(*node).is_none())
            .collect()
    }

    pub fn edges_without_average<'a>(&'a self, edges: &'a [Edge]) -> Vec<Edge> {
        edges
            .iter()
            .copied()
            .filter(|&(from, to)| self.average_transit(from, to).0.is_none())
            .collect()
    }
}

fn average(samples: Option<&VecDeque<Duration>>) -> Option<Duration> {
    let samples = samples?;
    if samples.is_empty() {
        return None;
    }
    let total: Duration = samples.iter().fold(Duration::zero(), |acc, d| acc + *d);
    Some(total / samples.len() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrolink_graph::NetworkGraphBuilder;

    fn node(index: usize) -> NodeId {
        let graph = NetworkGraphBuilder::new()
            .platform("A", "1", (0.0, 0.0))
            .platform("B", "1", (1.0, 0.0))
            .edge("A_1", "B_1")
            .build()
            .unwrap();
        graph.nodes().nth(index).unwrap()
    }

    #[test]
    fn average_is_none_when_empty() {
        let store = LearnedStore::new(DEFAULT_DWELL_CAP, DEFAULT_TRANSIT_CAP);
        assert_eq!(store.average_dwell(node(0)), None);
    }

    #[test]
    fn negative_or_zero_samples_are_rejected() {
        let mut store = LearnedStore::new(4, 4);
        store.record_dwell(node(0), Duration::seconds(-5));
        store.record_dwell(node(0), Duration::zero());
        assert_eq!(store.dwell_sample_count(node(0)), 0);
    }

    #[test]
    fn cap_evicts_oldest_sample() {
        let mut store = LearnedStore::new(2, 2);
        let n = node(0);
        store.record_dwell(n, Duration::seconds(10));
        store.record_dwell(n, Duration::seconds(20));
        store.record_dwell(n, Duration::seconds(30));
        assert_eq!(store.dwell_sample_count(n), 2);
        // average over the surviving 20s/30s samples, not the evicted 10s.
        assert_eq!(store.average_dwell(n), Some(Duration::seconds(25)));
    }

    #[test]
    fn transit_average_reports_sample_count() {
        let mut store = LearnedStore::new(4, 4);
        let a = node(0);
        let b = node(1);
        store.record_transit(a, b, Duration::seconds(90));
        store.record_transit(a, b, Duration::seconds(110));
        let (avg, count) = store.average_transit(a, b);
        assert_eq!(avg, Some(Duration::seconds(100)));
        assert_eq!(count, 2);
    }
}
