//! The read-only HTTP surface (spec §4.J/§6). Every handler only reads
//! fields off the most recently published [`metrolink_engine::Snapshot`];
//! none of them ever touch the locator, predictor or scheduler directly.

mod dto;
mod error;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use metrolink_engine::{Snapshot, SnapshotHandle};

pub use error::ApiError;

const FRESHNESS_WINDOW: i64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub snapshot: SnapshotHandle,
    pub cors_origin: String,
}

/// Builds the router. `cors_origin` mirrors the original implementation's
/// `Access-Control-Allow-Origin` config value — a single configured origin
/// (or `*`), not a negotiated allow-list.
pub fn routes(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origin);
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/station/", get(list_stations))
        .route("/station/:station/", get(station_info))
        .route("/station/:station/:platform/", get(platform_info))
        .route("/debug/", get(debug_info))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow = if origin == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::exact(origin.parse().expect("configured cors_origin is a valid header value"))
    };
    CorsLayer::new()
        .allow_origin(allow)
        .allow_methods([axum::http::Method::GET])
}

async fn index() -> impl IntoResponse {
    Json(json!({
        "paths": [
            "/",
            "/health",
            "/station/",
            "/station/{name}/",
            "/station/{name}/{platform}/",
            "/debug/",
        ],
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot.borrow().clone();
    if snapshot.is_fresh(Utc::now(), Duration::seconds(FRESHNESS_WINDOW)) {
        (axum::http::StatusCode::OK, "ok")
    } else {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "stale")
    }
}

async fn list_stations(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot.borrow().clone();
    let mut stations: Vec<String> = snapshot.graph.stations().map(str::to_owned).collect();
    stations.sort();
    Json(dto::StationList { stations })
}

#[derive(Debug, Deserialize)]
struct StationQuery {
    #[serde(default = "default_true")]
    include_predictions: bool,
    #[serde(default)]
    include_departed: bool,
}

async fn station_info(
    State(state): State<AppState>,
    Path(station): Path<String>,
    Query(query): Query<StationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.snapshot.borrow().clone();
    if !snapshot.graph.is_known_station(&station) {
        return Err(ApiError::StationNotFound(station));
    }

    let mut platforms = Vec::new();
    for node in snapshot.graph.platforms_of(&station).iter().copied() {
        let node_info = &snapshot.state.node(node);
        platforms.push(dto::PlatformSummary {
            platform: snapshot.graph.node(node).platform.clone(),
            message: node_info.message.clone(),
            last_updated: node_info.last_upstream_time,
            trams: query
                .include_predictions
                .then(|| node_info.here.iter().map(dto::tram_summary).collect()),
            departed: query
                .include_departed
                .then(|| node_info.departed.iter().map(dto::tram_summary).collect()),
        });
    }

    Ok(Json(dto::StationInfo {
        station,
        last_updated: snapshot.local_update_time,
        platforms,
    }))
}

#[derive(Debug, Deserialize)]
struct PlatformQuery {
    #[serde(default = "default_true")]
    predictions: bool,
    #[serde(default = "default_true")]
    message: bool,
    #[serde(default)]
    meta: bool,
    #[serde(default)]
    departed: bool,
}

fn default_true() -> bool {
    true
}

async fn platform_info(
    State(state): State<AppState>,
    Path((station, platform)): Path<(String, String)>,
    Query(query): Query<PlatformQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.snapshot.borrow().clone();
    let canonical_id = format!("{station}_{platform}");
    let Some(node) = snapshot.graph.node_by_canonical_id(&canonical_id) else {
        return Err(ApiError::PlatformNotFound(canonical_id));
    };
    let node_state = snapshot.state.node(node);

    let mut response = dto::PlatformInfo {
        platform,
        station,
        last_updated: node_state.last_upstream_time,
        predictions: None,
        here: None,
        message: None,
        map_pos: None,
        average_dwell_time_secs: None,
        predecessors: None,
        departed: None,
    };

    if query.predictions {
        response.predictions = Some(
            node_state
                .outward_predictions(node)
                .into_iter()
                .map(dto::predicted_arrival)
                .collect(),
        );
        response.here = Some(node_state.here.iter().map(dto::tram_summary).collect());
    }

    if query.message {
        response.message = node_state.message.clone();
    }

    if query.meta {
        response.map_pos = Some(snapshot.graph.map_pos(node));
        response.average_dwell_time_secs = snapshot
            .learning
            .average_dwell(node)
            .map(|d| d.num_seconds());
        response.predecessors = Some(
            snapshot
                .graph
                .preds(node)
                .iter()
                .map(|&pred| {
                    let average_transit_secs = snapshot
                        .learning
                        .average_transit(pred, node)
                        .0
                        .map(|d| d.num_seconds());
                    (
                        snapshot.graph.canonical_id(pred).to_owned(),
                        dto::PredecessorInfo {
                            average_transit_secs,
                        },
                    )
                })
                .collect(),
        );
    }

    if query.departed {
        response.departed = Some(node_state.departed.iter().map(dto::tram_summary).collect());
    }

    Ok(Json(response))
}

async fn debug_info(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot: Arc<Snapshot> = state.snapshot.borrow().clone();
    let graph = &snapshot.graph;

    let missing_platforms: Vec<String> = snapshot
        .learning
        .nodes_without_average(graph.nodes())
        .into_iter()
        .map(|n| graph.canonical_id(n).to_owned())
        .collect();
    let missing_edges: Vec<(String, String)> = snapshot
        .learning
        .edges_without_average(graph.edges())
        .into_iter()
        .map(|(from, to)| (graph.canonical_id(from).to_owned(), graph.canonical_id(to).to_owned()))
        .collect();

    let mut here = indexmap::IndexMap::new();
    let mut departed = indexmap::IndexMap::new();
    let mut starting = indexmap::IndexMap::new();
    let mut approaching = indexmap::IndexMap::new();
    for node in graph.nodes() {
        let node_state = snapshot.state.node(node);
        let id = graph.canonical_id(node).to_owned();
        if !node_state.here.is_empty() {
            here.insert(id.clone(), node_state.here.len());
        }
        if !node_state.departed.is_empty() {
            departed.insert(id.clone(), node_state.departed.len());
        }
        if !node_state.starting.is_empty() {
            starting.insert(id.clone(), node_state.starting.len());
        }
        if !node_state.approaching.is_empty() {
            approaching.insert(id, node_state.approaching.len());
        }
    }

    Json(dto::DebugInfo {
        missing_averages: dto::MissingAverages {
            platforms: missing_platforms,
            edges: missing_edges,
        },
        trams: dto::TramCounts {
            here,
            departed,
            starting,
            approaching,
        },
    })
}
