//! Wire shapes returned by the HTTP surface. Kept separate from the engine's
//! own types (spec §4.J handlers never expose `NodeId` or internal bucket
//! names) — consumers see station/platform strings and plain JSON values.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use metrolink_tram::{PredictedArrival, Tram};

#[derive(Debug, Serialize)]
pub struct StationList {
    pub stations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PlatformSummary {
    pub platform: String,
    pub message: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trams: Option<Vec<TramSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departed: Option<Vec<TramSummary>>,
}

#[derive(Debug, Serialize)]
pub struct StationInfo {
    pub station: String,
    pub last_updated: DateTime<Utc>,
    pub platforms: Vec<PlatformSummary>,
}

#[derive(Debug, Serialize)]
pub struct TramSummary {
    pub dest: String,
    pub via: Option<String>,
    pub carriages: &'static str,
    pub arrived_at: DateTime<Utc>,
}

pub fn tram_summary(tram: &Tram) -> TramSummary {
    TramSummary {
        dest: dest_name(&tram.dest),
        via: tram.via.clone(),
        carriages: carriages_name(tram.carriages),
        arrived_at: tram.arrived_at,
    }
}

fn dest_name(dest: &metrolink_tram::Destination) -> String {
    match dest {
        metrolink_tram::Destination::Station(name) => name.clone(),
        metrolink_tram::Destination::TerminatesHere => "Terminates Here".to_owned(),
        metrolink_tram::Destination::SeeTramFront => "See Tram Front".to_owned(),
        metrolink_tram::Destination::NotInService => "Not in Service".to_owned(),
    }
}

fn carriages_name(carriages: metrolink_tram::Carriages) -> &'static str {
    match carriages {
        metrolink_tram::Carriages::Single => "Single",
        metrolink_tram::Carriages::Double => "Double",
    }
}

#[derive(Debug, Serialize)]
pub struct TramPrediction {
    pub dest: String,
    pub via: Option<String>,
    pub carriages: &'static str,
    pub source_bucket: &'static str,
    pub predicted_arrive_time: DateTime<Utc>,
}

pub fn predicted_arrival(prediction: PredictedArrival) -> TramPrediction {
    TramPrediction {
        dest: dest_name(&prediction.signature.dest),
        via: prediction.signature.via,
        carriages: carriages_name(prediction.signature.carriages),
        source_bucket: prediction.source_bucket,
        predicted_arrive_time: prediction.predicted_arrive_time,
    }
}

#[derive(Debug, Serialize)]
pub struct PredecessorInfo {
    pub average_transit_secs: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PlatformInfo {
    pub platform: String,
    pub station: String,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<TramPrediction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub here: Option<Vec<TramSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_pos: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_dwell_time_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predecessors: Option<IndexMap<String, PredecessorInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departed: Option<Vec<TramSummary>>,
}

#[derive(Debug, Serialize)]
pub struct MissingAverages {
    pub platforms: Vec<String>,
    pub edges: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
pub struct TramCounts {
    pub here: IndexMap<String, usize>,
    pub departed: IndexMap<String, usize>,
    pub starting: IndexMap<String, usize>,
    pub approaching: IndexMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub struct DebugInfo {
    pub missing_averages: MissingAverages,
    pub trams: TramCounts,
}
