//! Shared runtime data model (spec §3): decoded PID rows, the reified tram
//! objects the locator maintains, and the four buckets attached to every
//! platform.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use metrolink_graph::NodeId;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Carriages {
    Single,
    Double,
}

/// A destination slot, either a canonical station or one of the three
/// sentinel strings the upstream feed uses (spec §3).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Station(String),
    TerminatesHere,
    SeeTramFront,
    NotInService,
}

impl Destination {
    pub const SENTINELS: [&'static str; 3] =
        ["Terminates Here", "See Tram Front", "Not in Service"];

    pub fn station_name(&self) -> Option<&str> {
        match self {
            Destination::Station(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Arrived,
    Departing,
    Due,
    Other(String),
}

/// One decoded destination slot (spec §3/§4.D).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PidRow {
    pub dest: Destination,
    pub via: Option<String>,
    pub carriages: Carriages,
    pub status: Status,
    pub wait_minutes: i64,
}

impl PidRow {
    /// Status implies the tram is physically at the platform right now:
    /// `Arrived`, `Departing`, or `Due` with a zero wait (spec §4.E.1/E.2).
    pub fn is_present(&self) -> bool {
        matches!(self.status, Status::Arrived | Status::Departing)
            || (self.status == Status::Due && self.wait_minutes <= 0)
    }

    /// Status implies the tram has not yet reached the platform but is
    /// counting down (spec §4.E.3).
    pub fn is_due_approaching(&self) -> bool {
        self.status == Status::Due && self.wait_minutes >= 1
    }

    pub fn signature(&self) -> TramSignature {
        TramSignature {
            dest: self.dest.clone(),
            via: self.via.clone(),
            carriages: self.carriages,
        }
    }
}

/// The `(dest, via, carriages)` triple used for structural tram identity —
/// trams carry no stable external id (spec §9 design notes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TramSignature {
    pub dest: Destination,
    pub via: Option<String>,
    pub carriages: Carriages,
}

/// Where a tram currently is: parked at a platform, or travelling the edge
/// between two adjacent platforms having left `from` at `departed_at` (when
/// known — a freshly seeded Approaching sighting may not have an exact
/// departure instant, only an inferred predecessor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    At(NodeId),
    Between {
        from: NodeId,
        to: NodeId,
        departed_at: Option<DateTime<Utc>>,
    },
}

/// A reified tram object, created by the locator (spec §3/§4.E).
#[derive(Debug, Clone)]
pub struct Tram {
    pub dest: Destination,
    pub via: Option<String>,
    pub carriages: Carriages,
    pub location: Location,
    pub arrived_at: DateTime<Utc>,
    pub departed_at: Option<DateTime<Utc>>,
    /// For a tram still in `Approaching`/`Starting`: the arrival this sighting
    /// implied at the moment it was created, i.e. the PID row's
    /// `lastUpdated + wait` (spec §4.F pass 2's base timestamp). `None` once
    /// a tram is actually located — its real `arrived_at` supersedes it.
    pub wait_anchor: Option<DateTime<Utc>>,
    pub predictions: IndexMap<NodeId, DateTime<Utc>>,
}

impl Tram {
    pub fn new(
        dest: Destination,
        via: Option<String>,
        carriages: Carriages,
        location: Location,
        arrived_at: DateTime<Utc>,
    ) -> Self {
        Self {
            dest,
            via,
            carriages,
            location,
            arrived_at,
            departed_at: None,
            wait_anchor: None,
            predictions: IndexMap::new(),
        }
    }

    pub fn with_wait_anchor(mut self, wait_anchor: DateTime<Utc>) -> Self {
        self.wait_anchor = Some(wait_anchor);
        self
    }

    pub fn signature(&self) -> TramSignature {
        TramSignature {
            dest: self.dest.clone(),
            via: self.via.clone(),
            carriages: self.carriages,
        }
    }

    pub fn matches_row(&self, row: &PidRow) -> bool {
        self.signature() == row.signature()
    }
}

/// The four tram buckets and decoded PID state attached to every platform
/// (spec §3). Mutation is confined to the decoder (pid_rows/message/last
/// upstream time) and the locator/predictor (buckets/predictions).
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    pub last_upstream_time: Option<DateTime<Utc>>,
    pub pid_rows: Vec<PidRow>,
    pub message: Option<String>,
    pub here: Vec<Tram>,
    pub departed: Vec<Tram>,
    pub approaching: Vec<Tram>,
    pub starting: Vec<Tram>,
}

impl NodeState {
    /// All predictions currently attached to any tram at (or passing) this
    /// node, gathered and sorted ascending (spec §4.F, final paragraph).
    pub fn outward_predictions(&self, this_node: NodeId) -> Vec<PredictedArrival> {
        let mut out = Vec::new();
        for (bucket, trams) in [
            ("here", &self.here),
            ("departed", &self.departed),
            ("approaching", &self.approaching),
            ("starting", &self.starting),
        ] {
            for tram in trams {
                if let Some(&time) = tram.predictions.get(&this_node) {
                    out.push(PredictedArrival {
                        signature: tram.signature(),
                        source_bucket: bucket,
                        predicted_arrive_time: time,
                    });
                }
            }
        }
        out.sort_by_key(|p| p.predicted_arrive_time);
        out
    }
}

#[derive(Debug, Clone)]
pub struct PredictedArrival {
    pub signature: TramSignature,
    pub source_bucket: &'static str,
    pub predicted_arrive_time: DateTime<Utc>,
}
