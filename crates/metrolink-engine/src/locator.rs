//! The per-tick state machine (spec §4.E). Phases run in the fixed order
//! E.1 → E.5; each reads state the previous phase already wrote.

use chrono::Duration;
use log::warn;

use metrolink_graph::{NetworkGraph, NodeId};
use metrolink_learning::LearnedStore;
use metrolink_tram::{Location, PidRow, Tram};

use crate::state::{EngineState, PendingSighting};

pub fn default_departed_retention_floor() -> Duration {
    Duration::seconds(120)
}

/// Runs all five locator phases for one tick. `decoded` holds, per node,
/// the rows/message/timestamp the decoder produced this tick (absent for
/// nodes whose record was stale or missing this tick).
pub fn run_tick(
    graph: &NetworkGraph,
    state: &mut EngineState,
    learning: &mut LearnedStore,
    retention_floor: Duration,
) {
    departures(graph, state, learning);
    arrivals(graph, state, learning);
    seed_approaching(graph, state);
    expire_stale(graph, state, learning, retention_floor);
    seed_starting(graph, state);
}

/// 4.E.1 — Here → Departed.
fn departures(graph: &NetworkGraph, state: &mut EngineState, learning: &mut LearnedStore) {
    for node in graph.nodes() {
        let last_upstream = state.node(node).last_upstream_time;
        let rows = state.node(node).pid_rows.clone();
        let node_state = state.node_mut(node);
        let Some(last_upstream) = last_upstream else {
            continue;
        };

        let mut remaining = Vec::with_capacity(node_state.here.len());
        for mut tram in std::mem::take(&mut node_state.here) {
            if rows.iter().any(|row| row_is_present_match(row, &tram)) {
                remaining.push(tram);
                continue;
            }
            let departed_at = last_upstream;
            let dwell = departed_at - tram.arrived_at;
            learning.record_dwell(node, dwell);
            tram.departed_at = Some(departed_at);
            tram.location = Location::At(node);
            node_state.departed.push(tram);
        }
        node_state.here = remaining;
    }
}

fn row_is_present_match(row: &PidRow, tram: &Tram) -> bool {
    row.is_present() && tram.matches_row(row)
}

/// 4.E.2 — promote Approaching (or a Starting predecessor) into Here.
fn arrivals(graph: &NetworkGraph, state: &mut EngineState, learning: &mut LearnedStore) {
    for node in graph.nodes() {
        let last_upstream = state.node(node).last_upstream_time;
        let Some(last_upstream) = last_upstream else {
            continue;
        };
        let present_rows: Vec<PidRow> = state
            .node(node)
            .pid_rows
            .iter()
            .filter(|row| row.is_present())
            .cloned()
            .collect();

        for row in present_rows {
            if let Some(mut tram) = take_oldest_match(&mut state.node_mut(node).approaching, &row)
            {
                let transit_source = match tram.location {
                    Location::Between {
                        from,
                        departed_at: Some(departed_at),
                        ..
                    } => Some((from, departed_at)),
                    _ => None,
                };
                tram.arrived_at = last_upstream;
                tram.location = Location::At(node);
                state.node_mut(node).here.push(tram);
                if let Some((from, departed_at)) = transit_source {
                    learning.record_transit(from, node, last_upstream - departed_at);
                }
                continue;
            }

            if let Some(pred) = graph.preds(node).iter().copied().find(|&pred| {
                starting_match(&state.node(pred).starting, &row).is_some()
            }) {
                let mut tram = take_starting_match(&mut state.node_mut(pred).starting, &row)
                    .expect("just located a matching Starting entry");
                let departed_at = state.node(pred).last_upstream_time.unwrap_or(last_upstream);
                tram.arrived_at = last_upstream;
                tram.location = Location::At(node);
                state.node_mut(node).here.push(tram);
                learning.record_transit(pred, node, last_upstream - departed_at);
                continue;
            }

            // Unmatched present row: a tram newly observed with no prior location.
            let tram = Tram::new(
                row.dest.clone(),
                row.via.clone(),
                row.carriages,
                Location::At(node),
                last_upstream,
            );
            state.node_mut(node).here.push(tram);
        }
    }
}

fn take_oldest_match(bucket: &mut Vec<Tram>, row: &PidRow) -> Option<Tram> {
    let index = bucket.iter().position(|tram| tram.matches_row(row))?;
    Some(bucket.remove(index))
}

fn starting_match<'a>(bucket: &'a [Tram], row: &PidRow) -> Option<&'a Tram> {
    bucket.iter().find(|tram| tram.matches_row(row))
}

fn take_starting_match(bucket: &mut Vec<Tram>, row: &PidRow) -> Option<Tram> {
    let index = bucket.iter().position(|tram| tram.matches_row(row))?;
    Some(bucket.remove(index))
}

/// 4.E.3 — seed Approaching from `Due` rows, debounced over two ticks.
fn seed_approaching(graph: &NetworkGraph, state: &mut EngineState) {
    for node in graph.nodes() {
        let Some(last_upstream) = state.node(node).last_upstream_time else {
            continue;
        };
        let due_rows: Vec<PidRow> = state
            .node(node)
            .pid_rows
            .iter()
            .filter(|row| row.is_due_approaching())
            .cloned()
            .collect();

        let previously_pending = state.pending(node).to_vec();
        let mut still_pending = Vec::new();

        for row in due_rows {
            let signature = row.signature();
            let already_tracked = state.node(node).here.iter().any(|t| t.matches_row(&row))
                || state
                    .node(node)
                    .approaching
                    .iter()
                    .any(|t| t.matches_row(&row));
            if already_tracked {
                continue;
            }

            let Some(target) = predecessor_target(graph, node, &row) else {
                warn!("node {node}: row has no concrete destination node (sentinel dest), skipping approaching seed");
                continue;
            };
            let Some(predecessor) = graph.predecessor_toward(node, target) else {
                warn!("node {node}: ambiguous or missing predecessor for Due row, skipping seed");
                continue;
            };

            let candidate = PendingSighting {
                signature: signature.clone(),
                predecessor,
            };

            if previously_pending.contains(&candidate) {
                let tram = Tram::new(
                    row.dest.clone(),
                    row.via.clone(),
                    row.carriages,
                    Location::Between {
                        from: predecessor,
                        to: node,
                        departed_at: None,
                    },
                    last_upstream,
                )
                .with_wait_anchor(last_upstream + Duration::minutes(row.wait_minutes));
                state.node_mut(node).approaching.push(tram);
            } else {
                still_pending.push(candidate);
            }
        }

        state.set_pending(node, still_pending);
    }
}

/// The predecessor search needs a concrete destination node to walk toward.
/// A tram's `dest` may be a sentinel (`Terminates Here`, `See Tram Front`,
/// `Not in Service`) with no graph node at all — spec §8 B2 — in which case
/// there is no `inferredFromDest` target and the row is treated the same as
/// an ambiguous predecessor: logged and skipped (spec §4.E.3/§7).
fn predecessor_target(graph: &NetworkGraph, node: NodeId, row: &PidRow) -> Option<NodeId> {
    let name = row.dest.station_name()?;
    graph
        .platforms_of(name)
        .iter()
        .copied()
        .find(|&candidate| candidate != node)
}

/// 4.E.4 — expire stale Departed (and, by the same retention heuristic,
/// Starting entries that never saw a follow-on departure row — spec.md
/// defines no explicit Starting lifecycle, so this generalises the only
/// retention rule it does give).
fn expire_stale(
    graph: &NetworkGraph,
    state: &mut EngineState,
    learning: &LearnedStore,
    retention_floor: Duration,
) {
    for node in graph.nodes() {
        let Some(now) = state.node(node).last_upstream_time else {
            continue;
        };
        let window = retention_window(graph, node, learning, retention_floor);

        let node_state = state.node_mut(node);
        node_state
            .departed
            .retain(|tram| match tram.departed_at {
                Some(departed_at) => now - departed_at <= window,
                None => true,
            });
        node_state
            .starting
            .retain(|tram| now - tram.arrived_at <= window);
    }
}

fn retention_window(
    graph: &NetworkGraph,
    node: NodeId,
    learning: &LearnedStore,
    floor: Duration,
) -> Duration {
    let outgoing_avg: Vec<Duration> = graph
        .succs(node)
        .iter()
        .filter_map(|&succ| learning.average_transit(node, succ).0)
        .collect();
    if outgoing_avg.is_empty() {
        return floor;
    }
    let total: Duration = outgoing_avg.iter().fold(Duration::zero(), |acc, d| acc + *d);
    let avg = total / outgoing_avg.len() as i32;
    std::cmp::max(avg * 2, floor)
}

/// 4.E.5 — seed Starting at terminus nodes (no predecessors).
fn seed_starting(graph: &NetworkGraph, state: &mut EngineState) {
    for node in graph.nodes() {
        if !graph.preds(node).is_empty() {
            continue;
        }
        let Some(last_upstream) = state.node(node).last_upstream_time else {
            continue;
        };
        let rows = state.node(node).pid_rows.clone();

        for row in rows {
            let already_tracked = state.node(node).here.iter().any(|t| t.matches_row(&row))
                || state
                    .node(node)
                    .approaching
                    .iter()
                    .any(|t| t.matches_row(&row))
                || state
                    .node(node)
                    .starting
                    .iter()
                    .any(|t| t.matches_row(&row));
            if already_tracked {
                continue;
            }
            let tram = Tram::new(
                row.dest.clone(),
                row.via.clone(),
                row.carriages,
                Location::At(node),
                last_upstream,
            )
            .with_wait_anchor(last_upstream + Duration::minutes(row.wait_minutes));
            state.node_mut(node).starting.push(tram);
        }
    }
}
