//! The cooperative update loop (spec §4.G, §5): one writer ticking at a
//! fixed interval, publishing a new [`Snapshot`] after every successful
//! cycle for any number of readers to consume.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use log::{error, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use metrolink_feed::{AliasTable, FeedClient};
use metrolink_graph::NetworkGraph;
use metrolink_learning::LearnedStore;

use crate::snapshot::{self, Snapshot, SnapshotHandle};
use crate::state::EngineState;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub dwell_cap: usize,
    pub transit_cap: usize,
    pub tick_interval: StdDuration,
    pub departed_retention_floor: Duration,
    pub feed_timeout: StdDuration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dwell_cap: metrolink_learning::DEFAULT_DWELL_CAP,
            transit_cap: metrolink_learning::DEFAULT_TRANSIT_CAP,
            tick_interval: StdDuration::from_secs(1),
            departed_retention_floor: crate::locator::default_departed_retention_floor(),
            feed_timeout: StdDuration::from_secs(5),
        }
    }
}

/// Owns the one writer side of the engine. `spawn` starts the background
/// task and hands back a reader handle readers (the API layer, tests) can
/// clone freely; the [`CancellationToken`] lets the caller stop the loop
/// between phases or while an outbound feed request is in flight.
pub struct Scheduler;

impl Scheduler {
    pub fn spawn(
        graph: Arc<NetworkGraph>,
        feed: Arc<dyn FeedClient>,
        aliases: Arc<dyn AliasTable>,
        config: SchedulerConfig,
    ) -> (SnapshotHandle, CancellationToken, JoinHandle<()>) {
        let initial = Snapshot::empty(graph.clone(), config.dwell_cap, config.transit_cap);
        let (tx, rx) = snapshot::channel(initial);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            run(graph, feed, aliases, config, tx, task_cancel).await;
        });

        (rx, cancel, handle)
    }
}

async fn run(
    graph: Arc<NetworkGraph>,
    feed: Arc<dyn FeedClient>,
    aliases: Arc<dyn AliasTable>,
    config: SchedulerConfig,
    tx: tokio::sync::watch::Sender<Arc<Snapshot>>,
    cancel: CancellationToken,
) {
    let mut state = EngineState::new(&graph);
    let mut learning = LearnedStore::new(config.dwell_cap, config.transit_cap);
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                warn!("scheduler received stop signal, draining last snapshot");
                break;
            }
            _ = ticker.tick() => {
                if cancel.is_cancelled() {
                    break;
                }
                run_one_cycle(&graph, &feed, aliases.as_ref(), &config, &mut state, &mut learning, &tx, &cancel).await;
            }
        }
    }
}

async fn run_one_cycle(
    graph: &Arc<NetworkGraph>,
    feed: &Arc<dyn FeedClient>,
    aliases: &dyn AliasTable,
    config: &SchedulerConfig,
    state: &mut EngineState,
    learning: &mut LearnedStore,
    tx: &tokio::sync::watch::Sender<Arc<Snapshot>>,
    cancel: &CancellationToken,
) {
    let fetch = tokio::time::timeout(config.feed_timeout, feed.fetch());
    let records = tokio::select! {
        _ = cancel.cancelled() => return,
        result = fetch => result,
    };

    let records = match records {
        Ok(Ok(records)) => records,
        Ok(Err(err)) => {
            warn!("feed unavailable this tick: {err}");
            return;
        }
        Err(_) => {
            warn!("feed request timed out after {:?}", config.feed_timeout);
            return;
        }
    };

    crate::run_tick(
        graph,
        state,
        learning,
        aliases,
        &records,
        config.departed_retention_floor,
    );

    let snapshot = Snapshot {
        graph: graph.clone(),
        state: state.clone(),
        learning: learning.clone(),
        local_update_time: Utc::now(),
    };

    if tx.send(Arc::new(snapshot)).is_err() {
        error!("no snapshot readers remain, scheduler continuing anyway");
    }
}
