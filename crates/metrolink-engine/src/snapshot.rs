//! The immutable post-tick view published once per successful cycle (spec
//! §5). Readers (the API layer, tests) only ever see a whole `Snapshot`,
//! never a tick half-applied across phases.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use metrolink_graph::NetworkGraph;
use metrolink_learning::LearnedStore;

use crate::state::EngineState;

/// A frozen view of the graph, runtime state and learned parameters as they
/// stood right after a tick finished. Cheap to clone (an `Arc` underneath);
/// cloning the fields themselves only happens once, when the scheduler
/// publishes a new tick.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub graph: Arc<NetworkGraph>,
    pub state: EngineState,
    pub learning: LearnedStore,
    pub local_update_time: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty(graph: Arc<NetworkGraph>, dwell_cap: usize, transit_cap: usize) -> Self {
        let state = EngineState::new(&graph);
        Self {
            learning: LearnedStore::new(dwell_cap, transit_cap),
            state,
            graph,
            local_update_time: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// `/health`'s freshness contract (spec §6/§7): `now - local_update_time <= 30s`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.local_update_time <= max_age
    }
}

/// A cloneable reader handle over the most recently published [`Snapshot`].
/// Many readers (API handlers, tests) may hold one; only the scheduler ever
/// sends into the paired [`watch::Sender`].
pub type SnapshotHandle = watch::Receiver<Arc<Snapshot>>;

pub fn channel(initial: Snapshot) -> (watch::Sender<Arc<Snapshot>>, SnapshotHandle) {
    watch::channel(Arc::new(initial))
}
