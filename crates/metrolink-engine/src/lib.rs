//! The update cycle (spec §4.E-§4.G): per-tick decode → locate → predict,
//! the engine state it threads through, and the scheduler that drives it
//! once a second and publishes a [`Snapshot`] readers can consume safely.

pub mod locator;
pub mod predictor;
pub mod scheduler;
pub mod snapshot;
pub mod state;

pub use scheduler::{Scheduler, SchedulerConfig};
pub use snapshot::{Snapshot, SnapshotHandle};
pub use state::EngineState;

use chrono::Duration;
use log::warn;

use metrolink_decode::{decode_record, DecodeOutcome};
use metrolink_feed::{AliasTable, RawPidRecord};
use metrolink_graph::NetworkGraph;
use metrolink_learning::LearnedStore;

/// Runs one full tick (spec §2's data flow: feed → D → C → E → F) over a
/// batch of raw records already fetched for this cycle. Unknown platforms
/// and decode failures are logged and skipped (§7); they never abort the
/// rest of the tick.
pub fn run_tick(
    graph: &NetworkGraph,
    state: &mut EngineState,
    learning: &mut LearnedStore,
    aliases: &dyn AliasTable,
    records: &[RawPidRecord],
    retention_floor: Duration,
) {
    decode_all(graph, state, aliases, records);
    locator::run_tick(graph, state, learning, retention_floor);
    predictor::run_tick(graph, state, learning);
}

fn decode_all(
    graph: &NetworkGraph,
    state: &mut EngineState,
    aliases: &dyn AliasTable,
    records: &[RawPidRecord],
) {
    for record in records {
        let canonical_id = record.canonical_id();
        let Some(node) = graph.node_by_canonical_id(&canonical_id) else {
            warn!("unknown platform in feed record: {canonical_id}");
            continue;
        };

        let prev_last_upstream = state.node(node).last_upstream_time;
        let outcome = match decode_record(prev_last_upstream, record, aliases, graph) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("node {node} ({canonical_id}): {err}");
                continue;
            }
        };

        let DecodeOutcome::Updated {
            last_upstream_time,
            message,
            rows,
        } = outcome
        else {
            continue;
        };

        let node_state = state.node_mut(node);
        node_state.last_upstream_time = Some(last_upstream_time);
        node_state.message = message;
        node_state.pid_rows = rows;
    }
}
