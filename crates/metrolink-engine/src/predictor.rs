//! The forward predictor (spec §4.F). Two passes per tick, both overwriting
//! any predictions left over from the previous tick: located trams (`Here`/
//! `Departed`) walk forward from their actual position; `Approaching`/
//! `Starting` trams walk forward from the arrival their sighting implied.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;

use metrolink_graph::{NetworkGraph, NodeId};
use metrolink_learning::LearnedStore;
use metrolink_tram::{Destination, NodeState, Status, Tram};

use crate::state::EngineState;

/// Hop-distances to a fixed destination, computed once per walk. Built by a
/// reverse breadth-first search over predecessor edges starting at `dest`,
/// so `dist[n]` is the number of edges on a shortest path from `n` to `dest`.
struct Topology {
    dist: HashMap<NodeId, usize>,
}

impl Topology {
    fn to(graph: &NetworkGraph, dest: NodeId) -> Self {
        let mut dist = HashMap::new();
        let mut queue = std::collections::VecDeque::new();
        dist.insert(dest, 0usize);
        queue.push_back(dest);
        while let Some(node) = queue.pop_front() {
            let d = dist[&node];
            for &pred in graph.preds(node) {
                if !dist.contains_key(&pred) {
                    dist.insert(pred, d + 1);
                    queue.push_back(pred);
                }
            }
        }
        Self { dist }
    }
}

pub fn run_tick(graph: &NetworkGraph, state: &mut EngineState, learning: &LearnedStore) {
    clear_predictions(graph, state);
    predict_located(graph, state, learning);
    predict_unlocated(graph, state, learning);
}

fn clear_predictions(graph: &NetworkGraph, state: &mut EngineState) {
    for node in graph.nodes() {
        let node_state = state.node_mut(node);
        for tram in node_state
            .here
            .iter_mut()
            .chain(node_state.departed.iter_mut())
            .chain(node_state.approaching.iter_mut())
            .chain(node_state.starting.iter_mut())
        {
            tram.predictions.clear();
        }
    }
}

/// Pass 1 (spec §4.F): `Here` and `Departed` trams, whose current position
/// and dwell/departure instant are known exactly.
fn predict_located(graph: &NetworkGraph, state: &mut EngineState, learning: &LearnedStore) {
    for node in graph.nodes() {
        let here_count = state.node(node).here.len();
        for i in 0..here_count {
            let predictions = {
                let node_state = state.node(node);
                let tram = &node_state.here[i];
                let base = here_base(node, node_state, tram, learning);
                walk_from(graph, learning, node, base, &tram.dest)
            };
            state.node_mut(node).here[i].predictions = predictions;
        }

        let departed_count = state.node(node).departed.len();
        for i in 0..departed_count {
            let predictions = {
                let node_state = state.node(node);
                let tram = &node_state.departed[i];
                let base = tram.departed_at.unwrap_or(tram.arrived_at);
                walk_from(graph, learning, node, base, &tram.dest)
            };
            state.node_mut(node).departed[i].predictions = predictions;
        }
    }
}

/// `base = arrivedAt + averageDwell(n)`, or plain `arrivedAt` when the
/// platform's current status for this tram reads `Departing` (spec §4.F
/// pass 1, step 1). The live status is read off the node's latest decoded
/// rows — a `Tram` itself carries no status, only the bucket it currently
/// sits in.
fn here_base(node: NodeId, node_state: &NodeState, tram: &Tram, learning: &LearnedStore) -> DateTime<Utc> {
    let is_departing = node_state
        .pid_rows
        .iter()
        .find(|row| tram.matches_row(row))
        .map(|row| row.status == Status::Departing)
        .unwrap_or(false);
    if is_departing {
        return tram.arrived_at;
    }
    match learning.average_dwell(node) {
        Some(dwell) => tram.arrived_at + dwell,
        None => tram.arrived_at,
    }
}

/// Pass 2 (spec §4.F): `Approaching`/`Starting` trams, whose base is the
/// arrival their sighting implied rather than an instant already observed.
fn predict_unlocated(graph: &NetworkGraph, state: &mut EngineState, learning: &LearnedStore) {
    for node in graph.nodes() {
        let approaching_count = state.node(node).approaching.len();
        for i in 0..approaching_count {
            let predictions = {
                let tram = &state.node(node).approaching[i];
                sighted_predictions(graph, learning, node, tram)
            };
            state.node_mut(node).approaching[i].predictions = predictions;
        }

        let starting_count = state.node(node).starting.len();
        for i in 0..starting_count {
            let predictions = {
                let tram = &state.node(node).starting[i];
                sighted_predictions(graph, learning, node, tram)
            };
            state.node_mut(node).starting[i].predictions = predictions;
        }
    }
}

fn sighted_predictions(
    graph: &NetworkGraph,
    learning: &LearnedStore,
    node: NodeId,
    tram: &Tram,
) -> IndexMap<NodeId, DateTime<Utc>> {
    let Some(base) = tram.wait_anchor else {
        return IndexMap::new();
    };
    let mut out = IndexMap::new();
    out.insert(node, base);

    let Some(dest_node) = resolve_dest(graph, node, &tram.dest) else {
        return out;
    };
    if dest_node == node {
        return out;
    }
    let Some(dwell) = learning.average_dwell(node) else {
        return out;
    };
    let topo = Topology::to(graph, dest_node);
    out.extend(walk_forward(graph, learning, node, dest_node, base + dwell, &topo));
    out
}

/// Shared by pass 1: resolves the destination node and walks forward from
/// `node` with `base` as the instant the tram leaves `node`.
fn walk_from(
    graph: &NetworkGraph,
    learning: &LearnedStore,
    node: NodeId,
    base: DateTime<Utc>,
    dest: &Destination,
) -> IndexMap<NodeId, DateTime<Utc>> {
    let Some(dest_node) = resolve_dest(graph, node, dest) else {
        return IndexMap::new();
    };
    if dest_node == node {
        return IndexMap::new();
    }
    let topo = Topology::to(graph, dest_node);
    walk_forward(graph, learning, node, dest_node, base, &topo)
}

fn resolve_dest(graph: &NetworkGraph, from: NodeId, dest: &Destination) -> Option<NodeId> {
    graph.destination_node(from, dest.station_name()?)
}

/// The shared forward walk (spec §4.F, steps 2-4): at each edge `(u, v)` add
/// `averageTransit(u, v)` and record `predictions[v]`; add `averageDwell(v)`
/// before leaving `v`, except at the destination. Stops silently, keeping
/// whatever predictions were already recorded, the moment a required
/// average is missing or the destination becomes unreachable.
fn walk_forward(
    graph: &NetworkGraph,
    learning: &LearnedStore,
    mut current: NodeId,
    dest: NodeId,
    mut clock: DateTime<Utc>,
    topo: &Topology,
) -> IndexMap<NodeId, DateTime<Utc>> {
    let mut out = IndexMap::new();
    loop {
        if current == dest {
            break;
        }
        let Some(next) = next_hop(graph, learning, current, dest, topo) else {
            break;
        };
        let Some(transit) = learning.average_transit(current, next).0 else {
            break;
        };
        clock += transit;
        out.insert(next, clock);
        if next == dest {
            break;
        }
        let Some(dwell) = learning.average_dwell(next) else {
            break;
        };
        clock += dwell;
        current = next;
    }
    out
}

/// Picks the successor of `current` on a shortest path to `dest` (spec
/// §4.F step 2). Ties are broken by the lower average total transit time to
/// `dest` via that successor, falling back to node id when averages are
/// unavailable — "ultimate tie-break deterministic by node id" per spec.
fn next_hop(
    graph: &NetworkGraph,
    learning: &LearnedStore,
    current: NodeId,
    dest: NodeId,
    topo: &Topology,
) -> Option<NodeId> {
    let cur_dist = *topo.dist.get(&current)?;
    if cur_dist == 0 {
        return None;
    }
    let mut candidates: Vec<NodeId> = graph
        .succs(current)
        .iter()
        .copied()
        .filter(|succ| topo.dist.get(succ) == Some(&(cur_dist - 1)))
        .collect();
    match candidates.len() {
        0 => None,
        1 => Some(candidates[0]),
        _ => {
            candidates.sort_by(|a, b| {
                let cost_a = cost_via(graph, learning, current, *a, dest, topo);
                let cost_b = cost_via(graph, learning, current, *b, dest, topo);
                match (cost_a, cost_b) {
                    (Some(x), Some(y)) => x.cmp(&y).then(a.cmp(b)),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => a.cmp(b),
                }
            });
            Some(candidates[0])
        }
    }
}

fn cost_via(
    graph: &NetworkGraph,
    learning: &LearnedStore,
    from: NodeId,
    via: NodeId,
    dest: NodeId,
    topo: &Topology,
) -> Option<Duration> {
    let edge = learning.average_transit(from, via).0?;
    let rest = total_avg_transit(graph, learning, via, dest, topo)?;
    Some(edge + rest)
}

/// Minimal average transit time from `from` to `dest` along any shortest
/// path, or `None` if no shortest-path successor has a learned average yet.
/// Recursion strictly follows decreasing hop-distance, so it always
/// terminates even though the underlying graph may contain cycles.
fn total_avg_transit(
    graph: &NetworkGraph,
    learning: &LearnedStore,
    from: NodeId,
    dest: NodeId,
    topo: &Topology,
) -> Option<Duration> {
    if from == dest {
        return Some(Duration::zero());
    }
    let cur_dist = *topo.dist.get(&from)?;
    if cur_dist == 0 {
        return Some(Duration::zero());
    }
    let mut best: Option<Duration> = None;
    for &succ in graph.succs(from) {
        if topo.dist.get(&succ) != Some(&(cur_dist - 1)) {
            continue;
        }
        let Some(edge) = learning.average_transit(from, succ).0 else {
            continue;
        };
        let Some(rest) = total_avg_transit(graph, learning, succ, dest, topo) else {
            continue;
        };
        let total = edge + rest;
        best = Some(match best {
            Some(b) if b <= total => b,
            _ => total,
        });
    }
    best
}
