//! Wiring for a standalone Metrolink prediction server (spec §4.K): load
//! configuration, build the static graph, start the update loop (when a
//! feed is actually configured) and serve the read-only HTTP API
//! alongside it, both holding the same snapshot handle.

mod network;

use std::sync::Arc;

use log::{info, warn};

use metrolink_api::AppState;
use metrolink_engine::{Scheduler, SchedulerConfig, Snapshot};
use metrolink_feed::{DefaultAliasTable, TfgmFeedClient};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = metrolink_config::load(&metrolink_config::default_search_path());
    let graph = Arc::new(network::bundled_network());
    info!(
        "loaded bundled network: {} platforms, {} stations",
        graph.nodes().count(),
        graph.stations().count()
    );

    let snapshot_handle = if config.polling_enabled && config.subscription_key.is_some() {
        let feed = Arc::new(TfgmFeedClient::new(config.subscription_key.clone()));
        let aliases = Arc::new(DefaultAliasTable);
        let scheduler_config = SchedulerConfig {
            dwell_cap: config.dwell_cap,
            transit_cap: config.transit_cap,
            tick_interval: config.tick_interval,
            departed_retention_floor: chrono::Duration::from_std(config.departed_retention_floor)
                .expect("configured retention floor fits in a chrono::Duration"),
            feed_timeout: std::time::Duration::from_secs(5),
        };
        let (handle, _cancel, _join) =
            Scheduler::spawn(graph.clone(), feed, aliases, scheduler_config);
        info!("scheduler started, polling every {:?}", config.tick_interval);
        handle
    } else {
        warn!("no subscription key configured (or polling disabled) — serving the static graph only");
        let snapshot = Snapshot::empty(graph.clone(), config.dwell_cap, config.transit_cap);
        let (_tx, rx) = metrolink_engine::snapshot::channel(snapshot);
        rx
    };

    let state = AppState {
        snapshot: snapshot_handle,
        cors_origin: config.cors_origin.clone(),
    };
    let router = metrolink_api::routes(state);

    let bind_addr = format!("{}:{}", config.bind_host, config.bind_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|err| panic!("could not bind to {bind_addr}: {err}"));
    info!("listening on {bind_addr}");

    axum::serve(listener, router)
        .await
        .expect("http server exited unexpectedly");
}
